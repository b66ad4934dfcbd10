//! Retrieval-augmented answering.
//!
//! An [`Assistant`] answers one question at a time through a fixed sequence
//! of states:
//!
//! ```text
//! Idle → Embedding → Retrieving → Generating → Streaming → Done
//! ```
//!
//! Retrieval failures degrade to an empty context. Generation walks an
//! ordered model list until one starts streaming; if none does, the
//! question fails with [`Error::NoModelAvailable`].

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::embedding::{Embedder, TaskType};
use crate::error::{Error, Result};
use crate::generate::{GenerationError, TextGenerator, TextStream};
use crate::models::{QueryMatch, RetrievedPassage};
use crate::store::VectorStore;

/// Passages retrieved per question.
pub const RETRIEVAL_TOP_K: usize = 5;
/// Longest accepted question, in characters.
pub const MAX_QUESTION_CHARS: usize = 2000;
/// Separator between context blocks in the prompt.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Generation models, most preferred first.
pub const DEFAULT_MODELS: &[&str] = &[
    "gemini-2.5-pro",
    "gemini-2.5-flash",
    "gemini-2.5-pro-exp",
    "gemini-2.5-flash-exp",
    "gemini-2.0-flash-exp",
    "gemini-2.0-flash",
    "gemini-1.5-flash",
    "gemini-1.5-pro",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AnswerState {
    Idle,
    Embedding,
    Retrieving,
    Generating,
    Streaming,
    Done,
}

#[derive(Debug, Clone)]
pub struct AnswerOptions {
    pub models: Vec<String>,
    pub top_k: usize,
    /// Language the assistant is told to answer in.
    pub response_language: String,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            top_k: RETRIEVAL_TOP_K,
            response_language: "French".to_string(),
        }
    }
}

/// A started answer.
pub struct Answer {
    /// Model that accepted the prompt.
    pub model: String,
    pub passages: Vec<RetrievedPassage>,
    pub prompt: String,
    pub stream: TextStream,
}

/// Reject empty or overlong questions before any external call.
pub fn validate_question(question: &str) -> Result<&str> {
    if question.trim().is_empty() {
        return Err(Error::validation("message", "must not be empty"));
    }
    if question.chars().count() > MAX_QUESTION_CHARS {
        return Err(Error::validation(
            "message",
            format!("must be at most {MAX_QUESTION_CHARS} characters"),
        ));
    }
    Ok(question)
}

/// Turn a store match into a labelled passage.
///
/// The label is `<filename> (Chunk <n>)` with a 1-based chunk number; the
/// chunk part is omitted when the record has no index.
pub fn passage_from_match(m: &QueryMatch) -> RetrievedPassage {
    let source = m.filename().unwrap_or("Document");
    let source_label = match m.chunk_index() {
        Some(idx) => format!("{} (Chunk {})", source, idx + 1),
        None => source.to_string(),
    };
    RetrievedPassage {
        source_label,
        similarity_score: m.score,
        text: m.text().to_string(),
    }
}

/// Render passages as `[Source: …, Score: 0.000]` blocks.
pub fn context_block(passages: &[RetrievedPassage]) -> String {
    passages
        .iter()
        .map(|p| {
            format!(
                "[Source: {}, Score: {:.3}]\n{}",
                p.source_label, p.similarity_score, p.text
            )
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

fn system_instruction(language: &str) -> String {
    format!(
        "You are the Sadaqa Assistant, an assistant for charity associations in Casablanca during Ramadan.

Your role is to help volunteers and donors with:
- Information about families in need, by district
- Managing Zakat and Sadaqa donations
- Organising Quffat Ramadan distributions
- Coordinating collective Iftars
- Zakat guides and rules
- Tracking inventories and needs

Important instructions:
- Always answer in {language}, clearly, with empathy and respect
- When context from indexed documents is available, use it first
- Cite your sources when you use specific information
- If the context has no precise information, say so clearly
- Be precise with numbers, dates, and district names"
    )
}

/// Assemble the full prompt. An empty `context` selects the variant that
/// suggests ingesting documents.
pub fn build_prompt(question: &str, context: &str, language: &str) -> String {
    let system = system_instruction(language);
    if context.is_empty() {
        format!(
            "{system}\n\n=== USER QUESTION ===\n{question}\n\n\
             Answer in general terms. If you have no specific information, \
             suggest that the user ingest relevant documents."
        )
    } else {
        format!(
            "{system}\n\n=== AVAILABLE CONTEXT (indexed documents) ===\n{context}\n\n\
             === USER QUESTION ===\n{question}\n\n\
             Answer based on the context above. If it contains relevant information, \
             use it. Otherwise, answer in general terms."
        )
    }
}

/// Per-question state tracker.
struct Run {
    state: AnswerState,
}

impl Run {
    fn new() -> Self {
        Self {
            state: AnswerState::Idle,
        }
    }

    fn advance(&mut self, next: AnswerState) {
        debug_assert!(next > self.state, "{:?} -> {:?}", self.state, next);
        tracing::debug!(from = ?self.state, to = ?next, "answer state");
        self.state = next;
    }
}

pub struct Assistant {
    embedder: Embedder,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn TextGenerator>,
    options: AnswerOptions,
}

impl Assistant {
    pub fn new(
        embedder: Embedder,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn TextGenerator>,
        options: AnswerOptions,
    ) -> Self {
        Self {
            embedder,
            store,
            generator,
            options,
        }
    }

    pub fn options(&self) -> &AnswerOptions {
        &self.options
    }

    /// Answer `question`, returning once a model has started streaming.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let question = validate_question(question)?;
        let mut run = Run::new();

        run.advance(AnswerState::Embedding);
        let vector = self.embedder.embed(question, TaskType::RetrievalQuery).await;

        run.advance(AnswerState::Retrieving);
        let passages = self.retrieve(&vector).await;

        run.advance(AnswerState::Generating);
        let prompt = build_prompt(
            question,
            &context_block(&passages),
            &self.options.response_language,
        );
        let (model, stream) = self.start_stream(&prompt).await?;

        run.advance(AnswerState::Streaming);
        tracing::info!(model = %model, passages = passages.len(), "streaming answer");

        let finished_model = model.clone();
        let done = stream::once(async move {
            tracing::debug!(to = ?AnswerState::Done, model = %finished_model, "answer state");
            None::<std::result::Result<String, GenerationError>>
        })
        .filter_map(futures::future::ready);

        Ok(Answer {
            model,
            passages,
            prompt,
            stream: stream.chain(done).boxed(),
        })
    }

    /// Top-K passages for `vector`. Store errors yield no passages.
    async fn retrieve(&self, vector: &[f32]) -> Vec<RetrievedPassage> {
        match self.store.query(vector, self.options.top_k, None).await {
            Ok(matches) => matches.iter().map(passage_from_match).collect(),
            Err(e) => {
                tracing::warn!(
                    store = self.store.name(),
                    error = %e,
                    "retrieval failed; answering without context"
                );
                Vec::new()
            }
        }
    }

    /// Try each model in order until one starts streaming.
    async fn start_stream(&self, prompt: &str) -> Result<(String, TextStream)> {
        let mut attempted = Vec::new();
        let mut last_error = String::from("no generation model configured");

        for model in &self.options.models {
            attempted.push(model.clone());
            match self.generator.stream(model, prompt).await {
                Ok(stream) => return Ok((model.clone(), stream)),
                Err(e @ GenerationError::ModelUnavailable { .. }) => {
                    tracing::info!(model = %model, error = %e, "model unavailable; trying next");
                    last_error = e.to_string();
                }
                Err(e) => {
                    tracing::warn!(model = %model, error = %e, "model failed; trying next");
                    last_error = e.to_string();
                }
            }
        }

        Err(Error::NoModelAvailable {
            attempted,
            last_error,
        })
    }
}
