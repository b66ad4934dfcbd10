//! Pinecone REST gateway.
//!
//! Implements [`VectorStore`] over the Pinecone data plane:
//! `POST /vectors/upsert` and `POST /query`. The data-plane host is taken
//! from `[store].pinecone_host` when configured, otherwise looked up once
//! from the control plane (`GET https://api.pinecone.io/indexes/<name>`)
//! and cached for the life of the store.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use sadaqa_core::models::{QueryMatch, VectorRecord};
use sadaqa_core::store::{MetadataFilter, VectorStore};

use crate::config::StoreConfig;
use crate::embedding::http_client;

const CONTROL_PLANE: &str = "https://api.pinecone.io";

pub struct PineconeStore {
    client: reqwest::Client,
    api_key: String,
    api_version: String,
    index_name: String,
    host: OnceCell<String>,
}

impl PineconeStore {
    pub fn new(config: &StoreConfig, api_key: &str, index_name: &str) -> Result<Self> {
        let host = OnceCell::new();
        if let Some(configured) = config.pinecone_host.as_deref() {
            host.set(normalize_host(configured))
                .map_err(|_| anyhow!("Pinecone host already set"))?;
        }
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key: api_key.to_string(),
            api_version: config.pinecone_api_version.clone(),
            index_name: index_name.to_string(),
            host,
        })
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", &self.api_version)
    }

    async fn host(&self) -> Result<&str> {
        let host = self
            .host
            .get_or_try_init(|| async {
                let url = format!("{}/indexes/{}", CONTROL_PLANE, self.index_name);
                let response = self
                    .request(reqwest::Method::GET, &url)
                    .send()
                    .await
                    .context("Failed to reach the Pinecone control plane")?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    bail!(
                        "Pinecone index '{}' lookup failed ({}): {}",
                        self.index_name,
                        status,
                        body
                    );
                }

                let description: IndexDescription = response.json().await?;
                tracing::debug!(index = %self.index_name, host = %description.host, "resolved Pinecone host");
                Ok::<_, anyhow::Error>(normalize_host(&description.host))
            })
            .await?;
        Ok(host.as_str())
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.host().await?, path);
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Pinecone request to {} failed", path))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Pinecone API error {} on {}: {}", status, path, body);
        }
        Ok(response)
    }
}

/// Accept hosts with or without a scheme.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[derive(Deserialize)]
struct IndexDescription {
    host: String,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<PineconeMatch>,
}

#[derive(Deserialize)]
struct PineconeMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

/// Pinecone filter syntax: `{"field": {"$eq": value}}` per entry.
fn filter_to_pinecone(filter: &MetadataFilter) -> serde_json::Value {
    let map = filter
        .iter()
        .map(|(key, value)| (key.clone(), serde_json::json!({ "$eq": value })))
        .collect::<serde_json::Map<_, _>>();
    serde_json::Value::Object(map)
}

fn into_matches(response: QueryResponse) -> Vec<QueryMatch> {
    response
        .matches
        .into_iter()
        .map(|m| QueryMatch {
            id: m.id,
            score: m.score,
            metadata: m.metadata.unwrap_or_else(|| serde_json::json!({})),
        })
        .collect()
}

#[async_trait]
impl VectorStore for PineconeStore {
    fn name(&self) -> &str {
        "pinecone"
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.post("/vectors/upsert", &UpsertRequest { vectors: records })
            .await?;
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryMatch>> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            filter: filter.filter(|f| !f.is_empty()).map(filter_to_pinecone),
        };
        let response: QueryResponse = self.post("/query", &request).await?.json().await?;
        Ok(into_matches(response))
    }
}
