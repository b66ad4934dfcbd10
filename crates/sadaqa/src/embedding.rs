//! Embedding provider implementations.
//!
//! Concrete [`EmbeddingProvider`]s for the app crate:
//! - **[`DisabledProvider`]**: always errors, so every text gets the
//!   simulated fallback vector. Used offline and in tests.
//! - **[`GeminiEmbedder`](crate::gemini::GeminiEmbedder)**: Google
//!   `text-embedding-004` with task types.
//! - **[`OpenAIProvider`]**: the OpenAI embeddings API.
//!
//! # Provider Selection
//!
//! Use [`create_provider`] to instantiate the provider named by the
//! configuration:
//!
//! ```rust
//! # use sadaqa::config::{EmbeddingConfig, Secrets};
//! # use sadaqa::embedding::create_provider;
//! let config = EmbeddingConfig { provider: "disabled".into(), ..Default::default() };
//! let provider = create_provider(&config, &Secrets::default()).unwrap();
//! assert_eq!(provider.model_name(), "disabled");
//! ```
//!
//! # Retry Strategy
//!
//! Remote providers retry transient errors with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Whatever error remains after retries is absorbed by
//! [`Embedder`](sadaqa_core::embedding::Embedder), which substitutes the
//! simulated vector.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use sadaqa_core::embedding::{EmbeddingProvider, TaskType};

use crate::config::{EmbeddingConfig, Secrets};
use crate::gemini::GeminiEmbedder;

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// POST a JSON body, retrying transient failures.
///
/// `label` names the upstream in error messages.
pub(crate) async fn post_json_with_retry(
    request: impl Fn() -> reqwest::RequestBuilder,
    body: &serde_json::Value,
    max_retries: u32,
    label: &str,
) -> Result<serde_json::Value> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::debug!(upstream = label, attempt, ?delay, "retrying request");
            tokio::time::sleep(delay).await;
        }

        match request().json(body).send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response.json().await?);
                }

                let body_text = response.text().await.unwrap_or_default();

                // Rate limited or server error: retry
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(anyhow!("{} API error {}: {}", label, status, body_text));
                    continue;
                }

                // Client error (not 429): don't retry
                bail!("{} API error {}: {}", label, status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("{} request failed after retries", label)))
}

/// Build an HTTP client with the configured timeout.
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

// ============ Disabled Provider ============

/// A provider that always fails, so the simulated fallback is used.
///
/// Keeps the configured dimension so stored vectors stay uniform.
pub struct DisabledProvider {
    dims: usize,
}

impl DisabledProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, _text: &str, _task: TaskType) -> Result<Vec<f32>> {
        bail!("Embedding provider is disabled")
    }
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// Calls `POST /v1/embeddings` one text at a time; batching and
/// concurrency are handled by the core embedder. The task type is ignored.
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    dims: usize,
    max_retries: u32,
}

impl OpenAIProvider {
    /// A missing `OPENAI_API_KEY` is not fatal here: calls fail and the
    /// embedder falls back.
    pub fn new(config: &EmbeddingConfig, secrets: &Secrets) -> Result<Self> {
        if secrets.openai_api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY is not set; embeddings will be simulated");
        }
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key: secrets.openai_api_key.clone(),
            model: config.model.clone(),
            dims: config.dims,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, text: &str, _task: TaskType) -> Result<Vec<f32>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("OPENAI_API_KEY not set"))?;

        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });

        let json = post_json_with_retry(
            || {
                self.client
                    .post(OPENAI_EMBEDDINGS_URL)
                    .header("Authorization", format!("Bearer {}", api_key))
            },
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await?;

        parse_openai_response(&json)?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Empty embedding response"))
    }
}

/// Extract the `data[].embedding` arrays in order.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data array"))?;

    data.iter()
        .map(|item| {
            item.get("embedding")
                .and_then(|e| e.as_array())
                .map(|values| parse_vector(values))
                .ok_or_else(|| anyhow!("Invalid OpenAI response: missing embedding"))
        })
        .collect()
}

pub(crate) fn parse_vector(values: &[serde_json::Value]) -> Vec<f32> {
    values
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect()
}

/// Create the [`EmbeddingProvider`] named by `config.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"gemini"` | [`GeminiEmbedder`] |
/// | `"openai"` | [`OpenAIProvider`] |
/// | `"disabled"` | [`DisabledProvider`] |
pub fn create_provider(
    config: &EmbeddingConfig,
    secrets: &Secrets,
) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiEmbedder::new(config, secrets)?)),
        "openai" => Ok(Arc::new(OpenAIProvider::new(config, secrets)?)),
        "disabled" => Ok(Arc::new(DisabledProvider::new(config.dims))),
        other => bail!("Unknown embedding provider: {}", other),
    }
}
