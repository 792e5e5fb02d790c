use crate::config::Config;
use crate::services::{AssetIndex, CommandChannel, HistoryStore, MessageStore, StatePublisher, StreamingEngine, Supervisor};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Shared handles every API handler reaches through, mirroring the
/// teacher's `AppState` in shape: one `Arc` per long-lived service, plus a
/// couple of small in-process counters this layer owns outright.
pub struct AppState {
    pub config: Config,
    pub index: Arc<AssetIndex>,
    pub history: Arc<HistoryStore>,
    pub commands: Arc<CommandChannel>,
    pub publisher: Arc<StatePublisher>,
    pub engine: Arc<StreamingEngine>,
    pub messages: Arc<MessageStore>,
    pub supervisor: Arc<Supervisor>,
    pub started_at: Instant,
    pub started_at_utc: chrono::DateTime<chrono::Utc>,
    pub tracks_played: AtomicU64,
    pub total_listeners_served: AtomicU64,
    pub last_seen_track: Mutex<Option<String>>,
    pub message_rate_limit: Mutex<HashMap<String, Instant>>,
}

impl AppState {
    /// Called on every `/now-playing` read: diffs the served track against
    /// the previous call and folds the counters forward, the in-process
    /// analogue of `now_playing_server.py`'s `track_stats_update`.
    pub async fn record_now_playing_observation(&self, track: Option<&str>, listeners: u64) {
        let mut last_seen = self.last_seen_track.lock().await;
        if let Some(current) = track {
            if last_seen.as_deref() != Some(current) {
                self.tracks_played.fetch_add(1, Ordering::Relaxed);
                *last_seen = Some(current.to_string());
            }
        }
        if listeners > 0 {
            self.total_listeners_served.fetch_add(listeners, Ordering::Relaxed);
        }
    }
}
