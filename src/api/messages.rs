use crate::api::state::AppState;
use crate::error::{AppError, Result};
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

const MESSAGE_COOLDOWN: Duration = Duration::from_secs(300);
const MAX_MESSAGE_LEN: usize = 280;
const RECENT_LIMIT: usize = 20;

#[derive(Deserialize)]
pub struct SubmitMessage {
    message: String,
}

#[derive(Serialize)]
struct Submitted {
    status: &'static str,
}

/// `GET /messages`: last ≤20 messages, newest first, client key redacted.
pub async fn list_messages(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.messages.recent(RECENT_LIMIT).await)
}

/// `POST /message`: validates, rate-limits per client key, then appends to
/// the ring. Invalid bodies are 400, rate-limit violations are 429 with a
/// `wait_seconds` field, store failures are 500.
pub async fn submit_message(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<SubmitMessage>,
) -> Result<impl IntoResponse> {
    let trimmed = body.message.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::Validation("message must be non-empty and at most 280 characters".into()));
    }

    let client_key = addr.ip().to_string();
    {
        let mut limiter = state.message_rate_limit.lock().await;
        if let Some(last) = limiter.get(&client_key) {
            let elapsed = last.elapsed();
            if elapsed < MESSAGE_COOLDOWN {
                let wait_seconds = (MESSAGE_COOLDOWN - elapsed).as_secs();
                return Err(AppError::RateLimited { wait_seconds });
            }
        }
        limiter.insert(client_key.clone(), Instant::now());
    }

    state.messages.push(trimmed.to_string(), client_key).await?;
    Ok(Json(Submitted { status: "received" }))
}
