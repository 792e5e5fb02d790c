use crate::api::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct ComponentStatus {
    status: &'static str,
}

#[derive(Serialize)]
struct Components {
    icecast: ComponentStatus,
    streamer: ComponentStatus,
    tunnel: ComponentStatus,
    api: ComponentStatus,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    timestamp: chrono::DateTime<chrono::Utc>,
    components: Components,
    uptime_seconds: u64,
}

/// `GET /health`: aggregates the same liveness checks the Supervisor runs,
/// so this endpoint and the Supervisor's alerting never disagree about
/// what "up" means.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let icecast_ok = reachable(&state.config.icecast_status_url).await;
    let streamer_ok = state.engine.is_running();
    // Responding to this request already proves the API is up; fall back
    // to that if the Supervisor has no "api" component registered.
    let api_ok = state.supervisor.check_component_by_name("api").await.unwrap_or(true);
    // No tunnel/edge component is registered unless one is configured, in
    // which case it's treated as healthy by default.
    let tunnel_ok = state.supervisor.check_component_by_name("tunnel").await.unwrap_or(true);

    let all_ok = icecast_ok && streamer_ok && tunnel_ok && api_ok;

    let status = |ok: bool| if ok { "up" } else { "down" };
    Json(Health {
        status: if all_ok { "healthy" } else { "degraded" },
        timestamp: chrono::Utc::now(),
        components: Components {
            icecast: ComponentStatus { status: status(icecast_ok) },
            streamer: ComponentStatus { status: status(streamer_ok) },
            tunnel: ComponentStatus { status: status(tunnel_ok) },
            api: ComponentStatus { status: status(api_ok) },
        },
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

async fn reachable(url: &str) -> bool {
    let client = reqwest::Client::new();
    let fetch = client.get(url).send();
    matches!(
        tokio::time::timeout(std::time::Duration::from_secs(5), fetch).await,
        Ok(Ok(resp)) if resp.status().is_success()
    )
}
