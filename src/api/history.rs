use crate::api::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct HistoryResponse {
    enabled: bool,
    recent: Vec<crate::models::PlayRecord>,
    stats: crate::models::HistoryStats,
    most_played: Vec<crate::models::MostPlayedEntry>,
}

/// `GET /history`: always `enabled: true` since the history store is a
/// required service, not an optional one — unlike the Python original,
/// which only wired history in when the sibling module happened to import.
pub async fn history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let recent = state.history.recent_plays(50).await;
    let stats = state.history.stats().await;
    let most_played = state.history.most_played(10).await;

    Json(HistoryResponse { enabled: true, recent, stats, most_played })
}
