//! Chat entry point.
//!
//! Checks credentials, then hands the question to an
//! [`Assistant`](sadaqa_core::answer::Assistant). Anything that prevents an
//! answer from starting comes back as a single message instead of a
//! stream, so callers only ever render text.

use sadaqa_core::answer::{validate_question, Assistant};
use sadaqa_core::generate::TextStream;
use sadaqa_core::models::RetrievedPassage;
use sadaqa_core::Result;

use crate::app::App;

pub enum ChatReply {
    /// Answer fragments, in order. An `Err` item ends the answer.
    Stream {
        model: String,
        passages: Vec<RetrievedPassage>,
        stream: TextStream,
    },
    /// Configuration problem or failure, as one user-facing sentence.
    Message(String),
}

impl std::fmt::Debug for ChatReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatReply::Stream {
                model, passages, ..
            } => f
                .debug_struct("Stream")
                .field("model", model)
                .field("passages", &passages.len())
                .finish_non_exhaustive(),
            ChatReply::Message(message) => f.debug_tuple("Message").field(message).finish(),
        }
    }
}

pub async fn chat(app: &App, message: &str) -> ChatReply {
    match start(app, message).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(error = %e, "chat failed");
            ChatReply::Message(e.user_message())
        }
    }
}

async fn start(app: &App, message: &str) -> Result<ChatReply> {
    let question = validate_question(message)?;

    // A missing Gemini key is reported before a missing Pinecone key.
    let generator = app.generator().await?;
    let store = app.store().await?;

    let assistant = Assistant::new(
        app.embedder().clone(),
        store,
        generator,
        app.answer_options(),
    );
    let answer = assistant.answer(question).await?;

    Ok(ChatReply::Stream {
        model: answer.model,
        passages: answer.passages,
        stream: answer.stream,
    })
}
