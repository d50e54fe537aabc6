//! RAG answer HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Status document |
//! | `POST` | `/ask` | Answer `{"question": "..."}` with `{"answer": "..."}` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "store_unavailable", "message": "vector store at ./db/store.sqlite is missing or empty; ..." } }
//! ```
//!
//! | Code | Status | Cause |
//! |------|--------|-------|
//! | `bad_request` | 400 | malformed body or empty question |
//! | `store_unavailable` | 503 | store missing or empty |
//! | `upstream_error` | 502 | embedding or chat model call failed |
//! | `internal` | 500 | anything else |
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use docqa_core::rag::AnswerChain;

use crate::ask::build_chain;
use crate::config::Config;
use crate::error::{classify, ErrorKind};

pub const PROJECT_NAME: &str = "docqa RAG Q&A";

#[derive(Clone)]
struct AppState {
    chain: Arc<AnswerChain>,
}

/// Start the server on `[server].bind`. Runs until Ctrl+C, then closes the
/// store.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let (chain, store) = build_chain(config)?;
    let bind_addr = config.server.bind.clone();

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    println!("docqa server listening on http://{}", bind_addr);
    println!("  POST /ask");
    let served = axum::serve(listener, router(Arc::new(chain)))
        .with_graceful_shutdown(shutdown_signal())
        .await;
    store.close().await;
    served?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// Build the router around an answer chain.
pub fn router(chain: Arc<AnswerChain>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/ask", post(handle_ask))
        .layer(cors)
        .with_state(AppState { chain })
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

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let (status, code) = match classify(&err) {
            ErrorKind::Storage => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
            ErrorKind::Remote => (StatusCode::BAD_GATEWAY, "upstream_error"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        if status.is_server_error() {
            tracing::warn!("answer failed: {:#}", err);
        }
        AppError {
            status,
            code,
            message: format!("{:#}", err),
        }
    }
}

// ============ GET / ============

#[derive(Serialize)]
struct RootResponse {
    message: String,
    status: String,
    project: String,
    rag_chain_ready: bool,
}

async fn handle_root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Hello World".to_string(),
        status: "running".to_string(),
        project: PROJECT_NAME.to_string(),
        rag_chain_ready: true,
    })
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
}

async fn handle_ask(
    State(state): State<AppState>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AppError> {
    let Json(req) = body.map_err(|rejection| bad_request(rejection.body_text()))?;
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    let answer = state.chain.answer(&req.question).await?;
    Ok(Json(AskResponse { answer }))
}
