use crate::api::state::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// `GET /` and `GET /now-playing`: the current track, never cached by
/// intermediaries so listeners always see a fresh read.
pub async fn now_playing(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut current = state.publisher.read().await.unwrap_or_default();
    current.listeners = state.publisher.cached_listener_count().await;

    state.record_now_playing_observation(current.track.as_deref(), current.listeners).await;

    ([(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")], Json(current))
}
