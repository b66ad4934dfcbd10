//! SQLite-backed [`VectorStore`].
//!
//! Vectors are stored as little-endian `f32` BLOBs next to their metadata
//! JSON. Queries load every vector and rank by cosine similarity, which is
//! fine for the few thousand chunks a single association produces.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use sadaqa_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use sadaqa_core::models::{QueryMatch, VectorRecord};
use sadaqa_core::store::{matches_filter, MetadataFilter, VectorStore};

pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM vectors")
            .fetch_one(&self.pool)
            .await?)
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            let metadata_json = serde_json::to_string(&record.metadata)?;
            sqlx::query(
                r#"
                INSERT INTO vectors (id, filename, chunk_index, embedding, metadata_json)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    filename = excluded.filename,
                    chunk_index = excluded.chunk_index,
                    embedding = excluded.embedding,
                    metadata_json = excluded.metadata_json
                "#,
            )
            .bind(&record.id)
            .bind(&record.metadata.filename)
            .bind(record.metadata.chunk_index as i64)
            .bind(vec_to_blob(&record.values))
            .bind(&metadata_json)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryMatch>> {
        let rows = sqlx::query("SELECT id, embedding, metadata_json FROM vectors")
            .fetch_all(&self.pool)
            .await?;

        let mut matches: Vec<QueryMatch> = rows
            .iter()
            .filter_map(|row| {
                let metadata_json: String = row.get("metadata_json");
                let metadata: serde_json::Value =
                    serde_json::from_str(&metadata_json).unwrap_or(serde_json::json!({}));
                if !matches_filter(&metadata, filter) {
                    return None;
                }
                let blob: Vec<u8> = row.get("embedding");
                Some(QueryMatch {
                    id: row.get("id"),
                    score: cosine_similarity(vector, &blob_to_vec(&blob)),
                    metadata,
                })
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
