//! HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ingest` | Index an uploaded document (multipart field `file`) |
//! | `POST` | `/chat` | Answer `{ "message": "..." }` as a `text/plain` stream |
//! | `GET`  | `/check-env` | Which environment variables are set |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! `/ingest` always answers with the ingestion outcome
//! (`{ success, message?, error?, extractedFamilies?, documentType? }`),
//! with status 200 on success and 400 otherwise.
//!
//! `/chat` streams the answer as chunked plain text. When no answer can be
//! started (missing key, no model available) the reply is instead JSON
//! `{ "message": "..." }` with status 200, so clients can show it as-is.
//! An error after streaming started aborts the response body.
//!
//! # Error Contract
//!
//! Request-level errors use one schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "Invalid message: must not be empty." } }
//! ```

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use sadaqa_core::answer::validate_question;
use sadaqa_core::models::UploadedDocument;

use crate::app::{check_env, App, EnvReport};
use crate::chat::{chat, ChatReply};
use crate::ingest::{ingest, IngestOutcome};

/// Multipart framing allowance on top of the file size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
struct AppState {
    app: Arc<App>,
}

pub fn router(app: Arc<App>) -> Router {
    let body_limit = app.config().ingest.max_file_bytes + MULTIPART_OVERHEAD;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ingest", post(handle_ingest))
        .route("/chat", post(handle_chat))
        .route("/check-env", get(handle_check_env))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(AppState { app })
}

/// Serve until the process is terminated.
pub async fn run_server(app: Arc<App>) -> anyhow::Result<()> {
    let bind_addr = app.config().server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "server listening");
    println!("Sadaqa server listening on http://{}", bind_addr);

    axum::serve(listener, router(app)).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /check-env ============

async fn handle_check_env(State(state): State<AppState>) -> Json<EnvReport> {
    Json(check_env(state.app.secrets()))
}

// ============ POST /ingest ============

async fn handle_ingest(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<IngestOutcome>), AppError> {
    let mut document = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let mime_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("Could not read uploaded file: {e}")))?;
        document = Some(UploadedDocument {
            filename,
            mime_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let document = document.ok_or_else(|| bad_request("No file provided (expected field 'file')."))?;
    let outcome = ingest(&state.app, document).await;
    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(outcome)))
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Serialize)]
struct ChatMessage {
    message: String,
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, AppError> {
    validate_question(&request.message).map_err(|e| bad_request(e.user_message()))?;

    match chat(&state.app, &request.message).await {
        ChatReply::Stream { model, stream, .. } => {
            let body = Body::from_stream(stream.map(|item| {
                item.map_err(|e| {
                    tracing::warn!(error = %e, "answer stream ended with an error");
                    std::io::Error::other(e.to_string())
                })
            }));
            Ok((
                [
                    (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                    (header::HeaderName::from_static("x-sadaqa-model"), model),
                ],
                body,
            )
                .into_response())
        }
        ChatReply::Message(message) => Ok(Json(ChatMessage { message }).into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Secrets};

    fn state() -> AppState {
        let mut config = Config::default();
        config.embedding.provider = "disabled".into();
        config.store.backend = "memory".into();
        AppState {
            app: Arc::new(App::new(config, Secrets::default()).unwrap()),
        }
    }

    #[tokio::test]
    async fn health_reports_version() {
        let Json(body) = handle_health().await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn empty_chat_message_is_bad_request() {
        let err = handle_chat(
            State(state()),
            Json(ChatRequest {
                message: "   ".into(),
            }),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("must not be empty"));
    }

    #[tokio::test]
    async fn chat_without_key_answers_with_message() {
        let response = handle_chat(
            State(state()),
            Json(ChatRequest {
                message: "Quelles familles à Maarif ?".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }

    #[tokio::test]
    async fn check_env_without_variables() {
        let Json(report) = handle_check_env(State(state())).await;
        assert!(!report.configured);
        assert!(!report.variables.gemini_api_key);
    }
}
