use crate::api::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[derive(Serialize)]
struct Stats {
    uptime: String,
    uptime_seconds: u64,
    tracks_played: u64,
    total_listeners_served: u64,
    current_listeners: u64,
    api_started: chrono::DateTime<chrono::Utc>,
}

/// `GET /stats`. `tracks_played`/`total_listeners_served` are process-local
/// monotonic counters that reset on restart, folded forward on every
/// `/now-playing` read rather than tracked here.
pub async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime_seconds = state.started_at.elapsed().as_secs();
    let hours = uptime_seconds / 3600;
    let minutes = (uptime_seconds % 3600) / 60;

    Json(Stats {
        uptime: format!("{}h {}m", hours, minutes),
        uptime_seconds,
        tracks_played: state.tracks_played.load(Ordering::Relaxed),
        total_listeners_served: state.total_listeners_served.load(Ordering::Relaxed),
        current_listeners: state.publisher.cached_listener_count().await,
        api_started: state.started_at_utc,
    })
}
