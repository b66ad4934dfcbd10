//! Embedding provider trait, batching, and the offline fallback.
//!
//! Defines the [`EmbeddingProvider`] trait that all embedding backends
//! implement and the [`Embedder`] that wraps one. The embedder never fails:
//! when the provider errors or returns a vector of the wrong dimension, it
//! substitutes [`simulated_embedding`], a deterministic pseudo-vector of
//! the configured dimension. Retrieval quality degrades but ingestion and
//! chat keep working.
//!
//! Concrete provider implementations (Gemini, OpenAI, disabled) live in
//! the `sadaqa` app crate.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;

/// Number of texts embedded concurrently within one batch.
pub const EMBEDDING_BATCH_SIZE: usize = 5;

/// What the vector will be used for. Providers that support task-specific
/// embeddings use it; the others ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    /// Indexed document content.
    RetrievalDocument,
    /// A user question.
    RetrievalQuery,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::RetrievalDocument => "RETRIEVAL_DOCUMENT",
            TaskType::RetrievalQuery => "RETRIEVAL_QUERY",
        }
    }
}

/// Trait for embedding providers.
///
/// Implementations report failures through `Err`; they never fall back
/// themselves. Falling back is the [`Embedder`]'s job.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-004"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `768`).
    fn dims(&self) -> usize;
    /// Embed a single text.
    async fn embed(&self, text: &str, task: TaskType) -> Result<Vec<f32>>;
}

/// Deterministic pseudo-embedding used when the provider is unavailable.
///
/// A 32-bit rolling hash (`h = h * 31 + unit`, wrapping) over the UTF-16
/// code units of `text`, then `sin((h + i) * 0.001) * 0.5` per dimension.
/// It carries no semantics; it exists so records can still be written.
pub fn simulated_embedding(text: &str, dims: usize) -> Vec<f32> {
    let hash = text.encode_utf16().fold(0i32, |h, unit| {
        h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit))
    });
    (0..dims)
        .map(|i| (((f64::from(hash) + i as f64) * 0.001).sin() * 0.5) as f32)
        .collect()
}

/// Embedding front-end with fallback and bounded-concurrency batching.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    pub fn dims(&self) -> usize {
        self.provider.dims()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Embed one text. Always returns a vector of [`dims`](Self::dims) values.
    pub async fn embed(&self, text: &str, task: TaskType) -> Vec<f32> {
        let dims = self.dims();
        match self.provider.embed(text, task).await {
            Ok(vector) if vector.len() == dims => vector,
            Ok(vector) => {
                tracing::warn!(
                    model = self.model_name(),
                    expected = dims,
                    got = vector.len(),
                    "embedding has wrong dimension; using simulated embedding"
                );
                simulated_embedding(text, dims)
            }
            Err(e) => {
                tracing::warn!(
                    model = self.model_name(),
                    error = %e,
                    "embedding provider failed; using simulated embedding"
                );
                simulated_embedding(text, dims)
            }
        }
    }

    /// Embed many texts, preserving order.
    ///
    /// Texts are grouped by [`EMBEDDING_BATCH_SIZE`]; the members of a group
    /// run concurrently and groups run one after another. Each text falls
    /// back independently.
    pub async fn embed_batch(&self, texts: &[String], task: TaskType) -> Vec<Vec<f32>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for group in texts.chunks(EMBEDDING_BATCH_SIZE) {
            let embedded = join_all(group.iter().map(|t| self.embed(t, task))).await;
            vectors.extend(embedded);
        }
        vectors
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// # Example
///
/// ```rust
/// use sadaqa_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode a BLOB written by [`vec_to_blob`]. Trailing bytes short of a
/// full `f32` are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .filter_map(|chunk| chunk.try_into().ok().map(f32::from_le_bytes))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`.
///
/// Empty vectors, mismatched lengths, and zero-norm vectors score `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}
