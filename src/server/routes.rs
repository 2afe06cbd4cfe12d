//! Axum routes for the relay.
//!
//! - `POST /generate` — moderate `userPrompt`, call the model, moderate the answer

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::core::engine::GenerateEngine;
use crate::core::CompletionClient;
use crate::domain::model::{ErrorBody, GenerateRequest, GenerateResponse};
use crate::utils::error::{ErrorCategory, RelayError};

pub const INVALID_BODY_MESSAGE: &str = "Request body must be JSON with a string `userPrompt` field.";

/// Shared, read-only state handed to every request.
pub struct AppState<C: CompletionClient> {
    pub engine: Arc<GenerateEngine<C>>,
}

impl<C: CompletionClient> AppState<C> {
    pub fn new(engine: GenerateEngine<C>) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

impl<C: CompletionClient> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

pub fn app_router<C: CompletionClient + 'static>(state: AppState<C>) -> Router {
    Router::new()
        .route("/generate", post(generate_handler::<C>))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

type ErrorReply = (StatusCode, Json<ErrorBody>);

async fn generate_handler<C: CompletionClient + 'static>(
    State(state): State<AppState<C>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ErrorReply> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!("Rejected malformed /generate body: {}", rejection.body_text());
        error_reply(
            &state.engine,
            &RelayError::InvalidRequest {
                message: INVALID_BODY_MESSAGE.to_string(),
            },
        )
    })?;

    match state.engine.run(&request.user_prompt).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            if e.category() != ErrorCategory::Client {
                tracing::error!("❌ AI request failed: {} (Category: {:?})", e, e.category());
                tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            }
            Err(error_reply(&state.engine, &e))
        }
    }
}

fn error_reply<C: CompletionClient>(engine: &GenerateEngine<C>, err: &RelayError) -> ErrorReply {
    let messages = engine.messages();
    let error = match err {
        RelayError::InputRejected => messages.rejection.clone(),
        RelayError::InvalidRequest { message } => message.clone(),
        _ => messages.failure.clone(),
    };
    (err.status_code(), Json(ErrorBody { error }))
}
