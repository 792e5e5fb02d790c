pub mod discogs;
pub mod health;
pub mod history;
pub mod messages;
pub mod now_playing;
pub mod qr;
pub mod state;
pub mod stats;

pub use state::AppState;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Builds the full router: read endpoints, the rate-limited write
/// endpoint, and a permissive CORS layer, matching the teacher's
/// `Router::new()...layer(CorsLayer::new()...)` composition.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    Router::new()
        .route("/", get(now_playing::now_playing))
        .route("/now-playing", get(now_playing::now_playing))
        .route("/health", get(health::health))
        .route("/stats", get(stats::stats))
        .route("/history", get(history::history))
        .route("/messages", get(messages::list_messages))
        .route("/message", post(messages::submit_message))
        .route("/discogs", get(discogs::discogs))
        .route("/qr", get(qr::qr))
        .layer(cors)
        .with_state(state)
}
