use crate::config::persona::Persona;
use crate::history::HistoryWindow;
use crate::llm::chat::{ ChatClient, LlmError };
use crate::models::chat::{ ChatMessage, ChatReply, ErrorBody, HealthStatus };
use std::num::NonZeroU32;
use std::sync::Arc;
use axum::{
    body::Bytes,
    routing::{ get, post },
    Json,
    Router,
    extract::State,
    response::{ IntoResponse, Response },
    http::StatusCode,
};
use governor::{ RateLimiter, Quota, state::{ InMemoryState, NotKeyed }, clock::DefaultClock };
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::cors::{ Any, CorsLayer };
use uuid::Uuid;
use log::{ info, warn, error };

pub const NOT_CONFIGURED_REPLY: &str =
    "I'm not configured yet — the engineer needs to add a GROQ_API_KEY to .env to activate me!";
pub const RETRY_REPLY: &str = "I ran into an issue — try again in a moment.";
pub const RATE_LIMITED_REPLY: &str =
    "I'm getting a lot of questions right now — give me a moment and ask again.";

pub type ChatRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Request-shape failures. These are the only errors a visitor ever sees as an
/// HTTP error; everything past validation degrades to a 200 reply.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid JSON body")]
    InvalidJson,
    #[error("Invalid messages payload")]
    InvalidMessages,
    #[error("Invalid message at index {index}: {reason}")]
    InvalidEntry {
        index: usize,
        reason: String,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.to_string() };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<dyn ChatClient>,
    pub persona: Persona,
    pub window: HistoryWindow,
    pub limiter: Option<Arc<ChatRateLimiter>>,
}

impl AppState {
    pub fn new(chat: Arc<dyn ChatClient>, persona: Persona, window: HistoryWindow) -> Self {
        Self { chat, persona, window, limiter: None }
    }

    /// Caps upstream calls process-wide. `0` leaves the proxy unlimited.
    pub fn with_rate_limit(mut self, per_minute: u32) -> Self {
        self.limiter = NonZeroU32::new(per_minute).map(|n| {
            Arc::new(RateLimiter::direct(Quota::per_minute(n)))
        });
        self
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/health", get(health_handler))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}

/// Pulls `messages` out of a raw body. The body is parsed by hand so that a
/// missing content type or a non-array `messages` both end up as a 400 with
/// the same envelope.
pub fn parse_messages(body: &[u8]) -> Result<Vec<ChatMessage>, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| ApiError::InvalidJson)?;
    let entries = match value.get("messages") {
        Some(Value::Array(entries)) => entries,
        _ => return Err(ApiError::InvalidMessages),
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            ChatMessage::deserialize(entry).map_err(|e| ApiError::InvalidEntry {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

fn fallback_reply(err: &LlmError) -> &'static str {
    match err {
        LlmError::NotConfigured => NOT_CONFIGURED_REPLY,
        _ => RETRY_REPLY,
    }
}

async fn chat_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChatReply>, ApiError> {
    let request_id = Uuid::new_v4();
    let messages = parse_messages(&body).map_err(|e| {
        warn!("[chat-api] {} rejected: {}", request_id, e);
        e
    })?;

    // Only requests that would reach upstream draw from the quota.
    if let Some(limiter) = state.limiter.as_ref().filter(|_| state.chat.is_configured()) {
        if limiter.check().is_err() {
            warn!("[chat-api] {} rate limit reached, skipping upstream call", request_id);
            return Ok(Json(ChatReply { reply: RATE_LIMITED_REPLY.to_string() }));
        }
    }

    let trimmed = state.window.trim(&messages);
    info!(
        "[chat-api] {} forwarding {} of {} messages",
        request_id,
        trimmed.len(),
        messages.len()
    );

    let reply = match state.chat.complete(state.persona.prompt(), trimmed).await {
        Ok(reply) => reply,
        Err(e) => {
            error!("[chat-api] {} {}", request_id, e);
            fallback_reply(&e).to_string()
        }
    };

    Ok(Json(ChatReply { reply }))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthStatus {
        status: "ok".into(),
        model: state.chat.get_model(),
        configured: state.chat.is_configured(),
    })
}
