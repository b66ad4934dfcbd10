//! Google Gemini clients: embeddings and streamed generation.
//!
//! Both talk to the Generative Language REST API (`v1beta`) and send the
//! key in the `x-goog-api-key` header.
//!
//! Generation uses `streamGenerateContent?alt=sse`. A spawned task decodes
//! the body with `eventsource-stream` and forwards text fragments over a
//! bounded channel, so a consumer that stops reading stops the task at its
//! next send.

use std::pin::pin;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use sadaqa_core::embedding::{EmbeddingProvider, TaskType};
use sadaqa_core::generate::{GenerationError, TextGenerator, TextStream};

use crate::config::{ChatConfig, EmbeddingConfig, Secrets};
use crate::embedding::{http_client, parse_vector, post_json_with_retry};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Fragments buffered between the SSE reader task and the consumer.
const STREAM_CHANNEL_CAPACITY: usize = 32;

// ============ Embeddings ============

/// `text-embedding-004` (or another Gemini embedding model) via `embedContent`.
pub struct GeminiEmbedder {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    dims: usize,
    max_retries: u32,
}

impl GeminiEmbedder {
    /// A missing `GEMINI_API_KEY` is not fatal: calls fail and the
    /// embedder falls back to simulated vectors.
    pub fn new(config: &EmbeddingConfig, secrets: &Secrets) -> Result<Self> {
        if secrets.gemini_api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set; embeddings will be simulated");
        }
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key: secrets.gemini_api_key.clone(),
            model: config.model.clone(),
            dims: config.dims,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, text: &str, task: TaskType) -> Result<Vec<f32>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("GEMINI_API_KEY not set"))?;

        let url = format!("{}/models/{}:embedContent", API_BASE, self.model);
        let body = serde_json::json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [{ "text": text }] },
            "taskType": task.as_str(),
        });

        let json = post_json_with_retry(
            || self.client.post(&url).header("x-goog-api-key", api_key),
            &body,
            self.max_retries,
            "Gemini",
        )
        .await?;

        parse_embedding_response(&json)
    }
}

/// Accepts `{"embedding": {"values": [...]}}` and the bare-array variant.
fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let embedding = json
        .get("embedding")
        .ok_or_else(|| anyhow!("Invalid Gemini response: missing embedding"))?;

    if let Some(values) = embedding.get("values").and_then(|v| v.as_array()) {
        return Ok(parse_vector(values));
    }
    if let Some(values) = embedding.as_array() {
        return Ok(parse_vector(values));
    }
    Err(anyhow!("Unexpected Gemini embedding response format"))
}

// ============ Generation ============

/// Streams answers from Gemini chat models.
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
}

impl GeminiGenerator {
    pub fn new(config: &ChatConfig, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn stream(&self, model: &str, prompt: &str) -> Result<TextStream, GenerationError> {
        let url = format!("{}/models/{}:streamGenerateContent?alt=sse", API_BASE, model);
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Failed(format!("request to {model} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = api_error_message(&text).unwrap_or(text);
            return Err(GenerationError::from_message(
                model,
                format!("HTTP {}: {}", status.as_u16(), message),
            ));
        }

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let model = model.to_string();
        tokio::spawn(async move {
            forward_events(response.bytes_stream(), &model, tx).await;
        });

        Ok(ReceiverStream::new(rx).boxed())
    }
}

/// Read SSE events from `body` and send each text fragment to `tx`.
///
/// Stops after the first transport error or in-band error, or when the
/// receiver is dropped.
async fn forward_events<S, B, E>(
    body: S,
    model: &str,
    tx: mpsc::Sender<Result<String, GenerationError>>,
) where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut events = pin!(body.eventsource());

    while let Some(event) = events.next().await {
        let item = match event {
            Ok(event) => match fragment_text(&event.data) {
                Ok(Some(text)) => Ok(text),
                Ok(None) => continue,
                Err(e) => Err(e),
            },
            Err(e) => {
                tracing::warn!(model = %model, error = %e, "answer stream interrupted");
                Err(GenerationError::Failed(format!("stream interrupted: {e}")))
            }
        };
        let terminal = item.is_err();
        if tx.send(item).await.is_err() || terminal {
            return;
        }
    }
}

/// Text carried by one streamed response chunk, if any.
fn fragment_text(data: &str) -> Result<Option<String>, GenerationError> {
    if data == "[DONE]" {
        return Ok(None);
    }
    let json: serde_json::Value = serde_json::from_str(data)
        .map_err(|e| GenerationError::Failed(format!("malformed stream chunk: {e}")))?;

    if let Some(error) = json.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error");
        return Err(GenerationError::Failed(message.to_string()));
    }

    let text: String = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect()
        })
        .unwrap_or_default();

    Ok((!text.is_empty()).then_some(text))
}

/// `error.message` from a Google API error body.
fn api_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .pointer("/error/message")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_embedding_shapes() {
        let nested = serde_json::json!({"embedding": {"values": [0.25, 0.5]}});
        assert_eq!(parse_embedding_response(&nested).unwrap(), vec![0.25, 0.5]);
        let flat = serde_json::json!({"embedding": [1.0]});
        assert_eq!(parse_embedding_response(&flat).unwrap(), vec![1.0]);
        assert!(parse_embedding_response(&serde_json::json!({"x": 1})).is_err());
    }

    async fn collect_forwarded(chunks: Vec<&'static str>) -> Vec<Result<String, GenerationError>> {
        let body = futures::stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<_, std::io::Error>(c.as_bytes().to_vec())),
        );
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        forward_events(body, "gemini-2.5-pro", tx).await;
        ReceiverStream::new(rx).collect().await
    }

    #[tokio::test]
    async fn forwards_fragments_split_across_chunks() {
        let items = collect_forwarded(vec![
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Bon\"}]}}]}\r\n\r\nda",
            "ta: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"jour é\"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"finishReason\":\"STOP\"}]}\r\n\r\n",
        ])
        .await;
        let texts: Vec<String> = items.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["Bon", "jour é"]);
    }

    #[tokio::test]
    async fn in_band_error_ends_the_stream() {
        let items = collect_forwarded(vec![
            "data: {\"error\":{\"code\":500,\"message\":\"internal\"}}\n\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"late\"}]}}]}\n\n",
        ])
        .await;
        assert_eq!(items, vec![Err(GenerationError::Failed("internal".into()))]);
    }

    #[test]
    fn fragment_text_joins_parts() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"Bon"},{"text":"jour"}]}}]}"#;
        assert_eq!(fragment_text(data).unwrap(), Some("Bonjour".to_string()));
    }

    #[test]
    fn fragment_without_text_is_skipped() {
        let data = r#"{"candidates":[{"finishReason":"STOP"}]}"#;
        assert_eq!(fragment_text(data).unwrap(), None);
        assert_eq!(fragment_text("[DONE]").unwrap(), None);
    }

    #[test]
    fn in_band_error_becomes_failure() {
        let data = r#"{"error":{"code":500,"message":"internal"}}"#;
        assert_eq!(
            fragment_text(data).unwrap_err(),
            GenerationError::Failed("internal".into())
        );
    }

    #[test]
    fn extracts_api_error_message() {
        let body = r#"{"error":{"code":404,"message":"models/x is not found","status":"NOT_FOUND"}}"#;
        assert_eq!(api_error_message(body).as_deref(), Some("models/x is not found"));
        assert_eq!(api_error_message("<html>"), None);
    }
}
