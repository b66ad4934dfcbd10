//! Error taxonomy for the ingestion and answering pipeline.
//!
//! Only the variants here ever reach a caller. Provider and retrieval
//! degradations are absorbed where they happen (logged with `tracing`)
//! and never show up as an [`Error`].

use thiserror::Error;

/// Formats accepted by the text extractor, listed in user-facing messages.
pub const ACCEPTED_FORMATS: &str = "PDF, TXT, XLSX, XLS";

/// Pipeline errors surfaced to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// A required credential or configuration value is missing.
    #[error("{0}")]
    Configuration(String),

    /// The uploaded file is neither a known MIME type nor a known extension.
    #[error("unsupported file type '{0}'; accepted formats: {ACCEPTED_FORMATS}")]
    UnsupportedFormat(String),

    /// The file was recognised but could not be decoded.
    #[error("could not read {format} file: {message}")]
    Extraction { format: String, message: String },

    /// Malformed input, rejected before any external call.
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// A pure function was called with parameters it cannot honour.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A vector-store upsert batch failed. Earlier batches stay written.
    #[error(
        "vector store write failed after {batches_written} of {total_batches} batches; \
         the document may be partially indexed: {message}"
    )]
    StoreWrite {
        batches_written: usize,
        total_batches: usize,
        message: String,
    },

    /// Every candidate generation model failed to start streaming.
    #[error(
        "no generation model available (tried: {}); last error: {last_error}",
        attempted.join(", ")
    )]
    NoModelAvailable {
        attempted: Vec<String>,
        last_error: String,
    },
}

impl Error {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// A single sentence suitable for showing to the end user.
    ///
    /// Configuration and validation messages are returned as-is since they
    /// are their own remediation. Generation exhaustion points the user at
    /// their credentials and model access.
    pub fn user_message(&self) -> String {
        match self {
            Error::Configuration(msg) => format!("Configuration error: {msg}"),
            Error::NoModelAvailable {
                attempted,
                last_error,
            } => format!(
                "No generation model is available (tried: {}; last error: {}). \
                 Check that your API key is valid and that your account has access to these models.",
                attempted.join(", "),
                last_error
            ),
            Error::StoreWrite { .. } => format!("Indexing failed: {self}."),
            other => {
                let mut msg = other.to_string();
                if let Some(first) = msg.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                format!("{msg}.")
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
