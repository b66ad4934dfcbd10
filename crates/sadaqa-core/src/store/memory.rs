//! In-memory [`VectorStore`] implementation for tests and demos.
//!
//! Records live in a `HashMap` behind `std::sync::RwLock`. Query is
//! brute-force cosine similarity over every stored vector.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{QueryMatch, VectorRecord};

use super::{matches_filter, MetadataFilter, VectorStore};

struct StoredRecord {
    values: Vec<f32>,
    metadata: serde_json::Value,
}

/// In-memory vector store.
pub struct InMemoryStore {
    records: RwLock<HashMap<String, StoredRecord>>,
    upsert_calls: RwLock<usize>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            upsert_calls: RwLock::new(0),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of [`VectorStore::upsert`] calls received so far.
    pub fn upsert_calls(&self) -> usize {
        *self.upsert_calls.read().unwrap()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        let mut stored = self.records.write().unwrap();
        for record in records {
            stored.insert(
                record.id.clone(),
                StoredRecord {
                    values: record.values.clone(),
                    metadata: serde_json::to_value(&record.metadata)?,
                },
            );
        }
        *self.upsert_calls.write().unwrap() += 1;
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryMatch>> {
        let stored = self.records.read().unwrap();
        let mut matches: Vec<QueryMatch> = stored
            .iter()
            .filter(|(_, r)| matches_filter(&r.metadata, filter))
            .map(|(id, r)| QueryMatch {
                id: id.clone(),
                score: cosine_similarity(vector, &r.values),
                metadata: r.metadata.clone(),
            })
            .collect();
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }
}
