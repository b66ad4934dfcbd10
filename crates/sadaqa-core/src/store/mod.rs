//! Vector store abstraction.
//!
//! The [`VectorStore`] trait covers the two operations the pipeline needs:
//! writing records and querying the nearest ones. Backends (Pinecone,
//! SQLite, in-memory) plug in behind it.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::Error;
use crate::models::{QueryMatch, VectorRecord};

/// Records written per store call during ingestion.
pub const UPSERT_BATCH_SIZE: usize = 100;

/// Field-equality filter on record metadata. All entries must match.
pub type MetadataFilter = BTreeMap<String, serde_json::Value>;

/// Abstract vector index.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](VectorStore::upsert) | Insert or replace records by id |
/// | [`query`](VectorStore::query) | Nearest records to a vector, best first |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &str;

    /// Write `records` in a single backend call.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()>;

    /// Return at most `top_k` matches ordered by descending score.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryMatch>>;
}

/// True if `metadata` carries every key of `filter` with an equal value.
pub fn matches_filter(metadata: &serde_json::Value, filter: Option<&MetadataFilter>) -> bool {
    filter.map_or(true, |f| {
        f.iter().all(|(key, expected)| metadata.get(key) == Some(expected))
    })
}

/// Write `records` sequentially in batches of `batch_size`.
///
/// Stops at the first failing batch. Batches already written stay written,
/// and the error says how many made it.
pub async fn upsert_in_batches(
    store: &dyn VectorStore,
    records: &[VectorRecord],
    batch_size: usize,
) -> crate::error::Result<usize> {
    let batch_size = batch_size.max(1);
    let total_batches = records.len().div_ceil(batch_size);

    for (written, batch) in records.chunks(batch_size).enumerate() {
        if let Err(e) = store.upsert(batch).await {
            tracing::error!(
                store = store.name(),
                batch = written + 1,
                total_batches,
                error = %e,
                "vector store upsert failed"
            );
            return Err(Error::StoreWrite {
                batches_written: written,
                total_batches,
                message: e.to_string(),
            });
        }
        tracing::debug!(
            store = store.name(),
            batch = written + 1,
            total_batches,
            records = batch.len(),
            "upserted batch"
        );
    }

    Ok(total_batches)
}
