//! Text generation trait.
//!
//! A [`TextGenerator`] turns a prompt into a [`TextStream`] of text
//! fragments for a named model. Failing to *start* a stream is reported
//! through the returned `Result` so callers can try another model; errors
//! after streaming began arrive in-band as the stream's last item.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

/// Ordered text fragments of one answer. An `Err` item ends the stream.
pub type TextStream = BoxStream<'static, Result<String, GenerationError>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The model does not exist or the account cannot use it.
    #[error("model {model} unavailable: {message}")]
    ModelUnavailable { model: String, message: String },

    /// Anything else: network, quota, malformed response.
    #[error("{0}")]
    Failed(String),
}

impl GenerationError {
    /// Classify a provider error message. Messages mentioning a 404 or a
    /// missing model mark the model as unavailable.
    pub fn from_message(model: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("404") || lower.contains("not found") {
            GenerationError::ModelUnavailable {
                model: model.to_string(),
                message,
            }
        } else {
            GenerationError::Failed(message)
        }
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Start generating `prompt` with `model`.
    async fn stream(&self, model: &str, prompt: &str) -> Result<TextStream, GenerationError>;
}
