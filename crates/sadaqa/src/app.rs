//! Application wiring.
//!
//! [`App`] owns the configuration, the secrets, and the clients built from
//! them. The embedder is built up front since it never needs a key to
//! exist. The vector store and the text generator are built on first use,
//! because building them is where missing credentials surface as
//! [`Error::Configuration`]. The server has to start (and answer
//! `/check-env`) without them.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OnceCell;

use sadaqa_core::answer::AnswerOptions;
use sadaqa_core::embedding::Embedder;
use sadaqa_core::generate::TextGenerator;
use sadaqa_core::store::memory::InMemoryStore;
use sadaqa_core::store::VectorStore;
use sadaqa_core::{Error, Result};

use crate::config::{Config, Secrets};
use crate::db;
use crate::embedding::create_provider;
use crate::gemini::GeminiGenerator;
use crate::pinecone::PineconeStore;
use crate::sqlite_store::SqliteVectorStore;

pub struct App {
    config: Config,
    secrets: Secrets,
    embedder: Embedder,
    store: OnceCell<Arc<dyn VectorStore>>,
    generator: OnceCell<Arc<dyn TextGenerator>>,
}

impl App {
    pub fn new(config: Config, secrets: Secrets) -> anyhow::Result<Self> {
        let provider = create_provider(&config.embedding, &secrets)?;
        Ok(Self {
            config,
            secrets,
            embedder: Embedder::new(provider),
            store: OnceCell::new(),
            generator: OnceCell::new(),
        })
    }

    /// Use `store` instead of the configured backend.
    pub fn with_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = OnceCell::from(store);
        self
    }

    /// Use `generator` instead of the Gemini client.
    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = OnceCell::from(generator);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn secrets(&self) -> &Secrets {
        &self.secrets
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    pub fn answer_options(&self) -> AnswerOptions {
        AnswerOptions {
            models: self.config.chat.models.clone(),
            top_k: self.config.chat.top_k,
            response_language: self.config.chat.response_language.clone(),
        }
    }

    /// The configured vector store, built once.
    pub async fn store(&self) -> Result<Arc<dyn VectorStore>> {
        self.store
            .get_or_try_init(|| self.build_store())
            .await
            .cloned()
    }

    /// The text generator, built once. Requires `GEMINI_API_KEY`.
    pub async fn generator(&self) -> Result<Arc<dyn TextGenerator>> {
        self.generator
            .get_or_try_init(|| async {
                let api_key = self.secrets.require_gemini()?;
                let generator = GeminiGenerator::new(&self.config.chat, api_key)
                    .map_err(|e| Error::Configuration(format!("could not build Gemini client: {e}")))?;
                Ok::<Arc<dyn TextGenerator>, Error>(Arc::new(generator))
            })
            .await
            .cloned()
    }

    async fn build_store(&self) -> Result<Arc<dyn VectorStore>> {
        let store: Arc<dyn VectorStore> = match self.config.store.backend.as_str() {
            "pinecone" => {
                let api_key = self.secrets.require_pinecone()?;
                tracing::debug!(
                    index = self.secrets.index_name(),
                    environment = self.secrets.environment(),
                    "connecting to Pinecone"
                );
                let store = PineconeStore::new(&self.config.store, api_key, self.secrets.index_name())
                    .map_err(|e| Error::Configuration(format!("could not build Pinecone client: {e}")))?;
                Arc::new(store)
            }
            "sqlite" => {
                let pool = db::connect(&self.config.store.sqlite_path)
                    .await
                    .map_err(|e| {
                        Error::Configuration(format!(
                            "could not open SQLite store at {}: {e}",
                            self.config.store.sqlite_path.display()
                        ))
                    })?;
                Arc::new(SqliteVectorStore::new(pool))
            }
            "memory" => Arc::new(InMemoryStore::new()),
            other => {
                return Err(Error::Configuration(format!(
                    "unknown store backend '{other}'"
                )))
            }
        };
        tracing::info!(store = store.name(), "vector store ready");
        Ok(store)
    }
}

/// Which environment variables are set. Values are never reported.
#[derive(Debug, Clone, Serialize)]
pub struct EnvReport {
    pub status: &'static str,
    pub configured: bool,
    pub variables: EnvVariables,
    pub message: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvVariables {
    #[serde(rename = "GEMINI_API_KEY")]
    pub gemini_api_key: bool,
    #[serde(rename = "PINECONE_API_KEY")]
    pub pinecone_api_key: bool,
    #[serde(rename = "PINECONE_INDEX_NAME")]
    pub pinecone_index_name: bool,
    #[serde(rename = "PINECONE_ENVIRONMENT")]
    pub pinecone_environment: bool,
}

pub fn check_env(secrets: &Secrets) -> EnvReport {
    let variables = EnvVariables {
        gemini_api_key: secrets.gemini_api_key.is_some(),
        pinecone_api_key: secrets.pinecone_api_key.is_some(),
        pinecone_index_name: secrets.pinecone_index_name.is_some(),
        pinecone_environment: secrets.pinecone_environment.is_some(),
    };
    let configured = variables.gemini_api_key
        && variables.pinecone_api_key
        && variables.pinecone_index_name
        && variables.pinecone_environment;

    EnvReport {
        status: if configured { "ok" } else { "error" },
        configured,
        variables,
        message: if configured {
            "All environment variables are configured."
        } else {
            "Some environment variables are missing. Check your environment or .env file."
        },
    }
}
