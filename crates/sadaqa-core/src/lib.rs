//! # Sadaqa Core
//!
//! Pure pipeline logic for Sadaqa: data models, keyword tables, document
//! classification, family extraction, chunking, embedding fallback and
//! batching, the vector store abstraction, and retrieval-augmented
//! answering.
//!
//! This crate does no network or file I/O of its own. Embedding
//! providers, text generators, and vector stores are traits implemented
//! by the `sadaqa` app crate (and by the in-memory store here).
//!
//! # Pipeline
//!
//! ```text
//! write: text ─► analysis ─► chunk ─► embedding ─► store::upsert_in_batches
//! read:  question ─► embedding ─► store::query ─► answer ─► TextStream
//! ```

pub mod analysis;
pub mod answer;
pub mod chunk;
pub mod classify;
pub mod embedding;
pub mod error;
pub mod families;
pub mod generate;
pub mod keywords;
pub mod models;
pub mod store;

pub use error::{Error, Result};
