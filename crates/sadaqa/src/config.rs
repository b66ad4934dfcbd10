//! Configuration and secrets.
//!
//! Tunables come from a TOML file where every section is optional and
//! falls back to defaults. Credentials never live in the file: they are
//! read once from the environment (after loading `.env` with `dotenvy`)
//! into [`Secrets`] and passed to the clients that need them.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:3000"
//!
//! [ingest]
//! max_file_bytes = 10485760
//! chunk_size = 1000
//! chunk_overlap = 200
//!
//! [embedding]
//! provider = "gemini"        # gemini | openai | disabled
//! model = "text-embedding-004"
//! dims = 768
//!
//! [store]
//! backend = "pinecone"       # pinecone | sqlite | memory
//!
//! [chat]
//! response_language = "French"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use sadaqa_core::answer::{DEFAULT_MODELS, RETRIEVAL_TOP_K};
use sadaqa_core::chunk::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use sadaqa_core::store::UPSERT_BATCH_SIZE;

/// Default Pinecone index name.
pub const DEFAULT_PINECONE_INDEX: &str = "casa-ramadan-2026";
/// Default Pinecone environment (region).
pub const DEFAULT_PINECONE_ENVIRONMENT: &str = "us-east-1";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub ingest: IngestConfig,
    pub embedding: EmbeddingConfig,
    pub store: StoreConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IngestConfig {
    pub max_file_bytes: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub upsert_batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            upsert_batch_size: UPSERT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub dims: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "text-embedding-004".to_string(),
            dims: 768,
            max_retries: 3,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: String,
    /// SQLite database file for the `sqlite` backend.
    pub sqlite_path: PathBuf,
    /// Pinecone data-plane host. Resolved from the index name when unset.
    pub pinecone_host: Option<String>,
    pub pinecone_api_version: String,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "pinecone".to_string(),
            sqlite_path: PathBuf::from("./data/sadaqa.sqlite"),
            pinecone_host: None,
            pinecone_api_version: "2025-01".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    /// Generation models in priority order.
    pub models: Vec<String>,
    pub top_k: usize,
    pub response_language: String,
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            top_k: RETRIEVAL_TOP_K,
            response_language: "French".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Read and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields the defaults.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found; using defaults");
        let config = Config::default();
        validate(&config)?;
        Ok(config)
    }
}

fn validate(config: &Config) -> Result<()> {
    // Ingest
    if config.ingest.chunk_size == 0 {
        bail!("ingest.chunk_size must be > 0");
    }
    if config.ingest.max_file_bytes == 0 {
        bail!("ingest.max_file_bytes must be > 0");
    }
    if config.ingest.upsert_batch_size == 0 {
        bail!("ingest.upsert_batch_size must be > 0");
    }

    // Embedding
    if config.embedding.dims == 0 {
        bail!("embedding.dims must be > 0");
    }
    match config.embedding.provider.as_str() {
        "gemini" | "openai" | "disabled" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be gemini, openai, or disabled.",
            other
        ),
    }
    if config.embedding.is_enabled() && config.embedding.model.trim().is_empty() {
        bail!(
            "embedding.model must be specified when provider is '{}'",
            config.embedding.provider
        );
    }

    // Store
    match config.store.backend.as_str() {
        "pinecone" | "sqlite" | "memory" => {}
        other => bail!(
            "Unknown store backend: '{}'. Must be pinecone, sqlite, or memory.",
            other
        ),
    }

    // Chat
    if config.chat.models.is_empty() {
        bail!("chat.models must list at least one model");
    }
    if config.chat.top_k == 0 {
        bail!("chat.top_k must be >= 1");
    }

    Ok(())
}

/// Credentials and deployment names read from the environment.
///
/// Empty variables count as unset.
#[derive(Clone, Default)]
pub struct Secrets {
    pub gemini_api_key: Option<String>,
    pub pinecone_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub pinecone_index_name: Option<String>,
    pub pinecone_environment: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "***"))
            .field("pinecone_api_key", &self.pinecone_api_key.as_ref().map(|_| "***"))
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "***"))
            .field("pinecone_index_name", &self.pinecone_index_name)
            .field("pinecone_environment", &self.pinecone_environment)
            .finish()
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Secrets {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded environment file");
        }
        Self {
            gemini_api_key: env_var("GEMINI_API_KEY"),
            pinecone_api_key: env_var("PINECONE_API_KEY"),
            openai_api_key: env_var("OPENAI_API_KEY"),
            pinecone_index_name: env_var("PINECONE_INDEX_NAME"),
            pinecone_environment: env_var("PINECONE_ENVIRONMENT"),
        }
    }

    pub fn index_name(&self) -> &str {
        self.pinecone_index_name
            .as_deref()
            .unwrap_or(DEFAULT_PINECONE_INDEX)
    }

    pub fn environment(&self) -> &str {
        self.pinecone_environment
            .as_deref()
            .unwrap_or(DEFAULT_PINECONE_ENVIRONMENT)
    }

    pub fn require_gemini(&self) -> sadaqa_core::Result<&str> {
        self.gemini_api_key.as_deref().ok_or_else(|| {
            sadaqa_core::Error::Configuration(
                "GEMINI_API_KEY is not set. Add it to your environment or .env file.".to_string(),
            )
        })
    }

    pub fn require_pinecone(&self) -> sadaqa_core::Result<&str> {
        self.pinecone_api_key.as_deref().ok_or_else(|| {
            sadaqa_core::Error::Configuration(
                "PINECONE_API_KEY is not set. Add it to your environment or .env file.".to_string(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_uses_defaults() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.ingest.chunk_size, 1000);
        assert_eq!(config.ingest.chunk_overlap, 200);
        assert_eq!(config.ingest.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(config.embedding.provider, "gemini");
        assert_eq!(config.embedding.dims, 768);
        assert_eq!(config.store.backend, "pinecone");
        assert_eq!(config.chat.models[0], "gemini-2.5-pro");
        assert_eq!(config.chat.top_k, 5);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let file = write_config("[store]\nbackend = \"memory\"\n\n[embedding]\nprovider = \"disabled\"\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.store.backend, "memory");
        assert!(!config.embedding.is_enabled());
        assert_eq!(config.embedding.dims, 768);
    }

    #[test]
    fn rejects_unknown_backend() {
        let file = write_config("[store]\nbackend = \"redis\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unknown store backend"));
    }

    #[test]
    fn rejects_zero_chunk_size() {
        let file = write_config("[ingest]\nchunk_size = 0\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:3000");
    }

    #[test]
    fn secrets_defaults_and_requirements() {
        let secrets = Secrets::default();
        assert_eq!(secrets.index_name(), "casa-ramadan-2026");
        assert_eq!(secrets.environment(), "us-east-1");
        let err = secrets.require_gemini().unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
        assert!(secrets.require_pinecone().is_err());
    }

    #[test]
    fn secrets_debug_hides_keys() {
        let secrets = Secrets {
            gemini_api_key: Some("sk-very-secret".into()),
            ..Secrets::default()
        };
        assert!(!format!("{secrets:?}").contains("very-secret"));
    }
}
