mod api;
mod config;
mod error;
mod models;
mod services;

use crate::api::AppState;
use crate::config::Config;
use crate::services::{
    supervisor::{Component, ComponentCheck},
    AssetIndex, CommandChannel, HistoryStore, MessageStore, ScheduleResolver, StatePublisher, StreamingEngine, Supervisor,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tower_http::compression::CompressionLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SUPERVISOR_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wvoid_radio=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("configuration loaded");

    let index = Arc::new(AssetIndex::new(config.clone()));
    let scanned = index.rescan().await?;
    tracing::info!("asset index built: {} assets", scanned);

    let history = Arc::new(HistoryStore::connect(&config.history_db_path).await?);
    let schedule = Arc::new(ScheduleResolver::load(&config).await?);
    let commands = Arc::new(CommandChannel::new(config.command_file.clone()));
    let publisher = Arc::new(StatePublisher::new(config.now_playing_paths.clone(), config.icecast_status_url.clone()));
    let messages = Arc::new(MessageStore::load(config.messages_path.clone()).await);

    let engine = Arc::new(StreamingEngine::new(
        config.clone(),
        index.clone(),
        history.clone(),
        schedule.clone(),
        commands.clone(),
        publisher.clone(),
    ));

    let runtime_handle = tokio::runtime::Handle::current();
    engine.clone().start(runtime_handle.clone());
    tracing::info!("streaming engine started");

    let supervisor = Arc::new(build_supervisor(&config, engine.clone(), runtime_handle.clone()));
    let supervisor_running = Arc::new(AtomicBool::new(true));
    {
        let supervisor = supervisor.clone();
        let running = supervisor_running.clone();
        tokio::spawn(async move {
            supervisor.run_loop(SUPERVISOR_INTERVAL, running).await;
        });
    }

    let app_state = Arc::new(AppState {
        config: config.clone(),
        index,
        history,
        commands,
        publisher,
        engine: engine.clone(),
        messages,
        supervisor: supervisor.clone(),
        started_at: Instant::now(),
        started_at_utc: chrono::Utc::now(),
        tracks_played: AtomicU64::new(0),
        total_listeners_served: AtomicU64::new(0),
        last_seen_track: Mutex::new(None),
        message_rate_limit: Mutex::new(HashMap::new()),
    });

    let app = api::router(app_state).layer(CompressionLayer::new());

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    tracing::info!("starting HTTP API on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown_engine = engine.clone();
    let shutdown_supervisor_running = supervisor_running.clone();
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(shutdown_engine, shutdown_supervisor_running))
        .await?;

    Ok(())
}

/// Wires the liveness checks and restart hooks the Supervisor runs,
/// grounded on `watchdog.py`'s `COMPONENTS` table: Icecast and the
/// HTTP API are checked by URL, the streaming engine is checked by its
/// own `is_running` flag and restarted in-place, and the tunnel/edge
/// proxy is checked by URL when one is configured. Icecast and the
/// tunnel are external collaborators this process cannot restart
/// in-place, so both alert-only; the streaming engine is the one
/// component the Supervisor can actually bring back up itself.
fn build_supervisor(config: &Config, engine: Arc<StreamingEngine>, rt: tokio::runtime::Handle) -> Supervisor {
    let icecast = Component {
        name: "icecast".to_string(),
        check: ComponentCheck::Url(config.icecast_status_url.clone()),
        critical: true,
        restart: None,
    };

    let streamer_check_engine = engine.clone();
    let streamer_restart_engine = engine.clone();
    let streamer = Component {
        name: "streamer".to_string(),
        check: ComponentCheck::Process(Box::new(move || streamer_check_engine.is_running())),
        critical: true,
        restart: Some(Box::new(move || {
            streamer_restart_engine.stop();
            streamer_restart_engine.clone().start(rt.clone());
        })),
    };

    let api = Component {
        name: "api".to_string(),
        check: ComponentCheck::Url(format!("http://127.0.0.1:{}/health", config.server_port)),
        critical: true,
        restart: None,
    };

    let mut components = vec![icecast, streamer, api];
    if let Some(tunnel_status_url) = &config.tunnel_status_url {
        components.push(Component {
            name: "tunnel".to_string(),
            check: ComponentCheck::Url(tunnel_status_url.clone()),
            critical: false,
            restart: None,
        });
    }

    Supervisor::new(components, config.supervisor_alert_webhook.clone())
}

async fn shutdown_signal(engine: Arc<StreamingEngine>, supervisor_running: Arc<AtomicBool>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, stopping streaming engine");
    supervisor_running.store(false, std::sync::atomic::Ordering::Relaxed);
    engine.stop();
}
