//! # Sadaqa
//!
//! **Document ingestion and retrieval-augmented chat for charity associations.**
//!
//! Staff upload family lists, inventories, and Zakat guides (PDF, TXT,
//! XLSX, XLS). Each document is classified, families are extracted from
//! its cells or prose, and its text is chunked, embedded, and written to a
//! vector index. Questions are answered by a Gemini model grounded on the
//! closest chunks.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌───────────────────┐   ┌──────────────┐
//! │  Upload    │──▶│ Extract + Analyze │──▶│ Chunk+Embed  │──┐
//! │ PDF/TXT/XL │   │ (sadaqa-core)     │   │              │  │
//! └────────────┘   └───────────────────┘   └──────────────┘  ▼
//!                                                      ┌──────────────┐
//!                         ┌──────────┐  top-K          │ Vector store │
//!    Question ──embed────▶│ Assistant│◀────────────────│ Pinecone /   │
//!                         │ (Gemini) │                 │ SQLite / mem │
//!                         └────┬─────┘                 └──────────────┘
//!                              ▼
//!                        streamed answer
//! ```
//!
//! The pure pipeline (classification, family extraction, chunking,
//! embedding fallback, batching, answering state machine) lives in
//! `sadaqa-core`. This crate adds the I/O around it.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment secrets |
//! | [`extract`] | Text extraction from PDF, plain text, and workbooks |
//! | [`embedding`] | Embedding providers (OpenAI, disabled) and the shared HTTP retry loop |
//! | [`gemini`] | Gemini embeddings and streamed generation |
//! | [`pinecone`] | Pinecone REST vector store |
//! | [`sqlite_store`] | Local SQLite vector store |
//! | [`db`] | SQLite connection pool and schema |
//! | [`app`] | Wiring of config, secrets, and clients; environment report |
//! | [`ingest`] | Ingestion entry point |
//! | [`chat`] | Chat entry point |
//! | [`server`] | HTTP server (Axum) with CORS |
//! | [`logging`] | Tracing subscriber setup |

pub mod app;
pub mod chat;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod gemini;
pub mod ingest;
pub mod logging;
pub mod pinecone;
pub mod server;
pub mod sqlite_store;

pub use app::App;
pub use sadaqa_core::store;
