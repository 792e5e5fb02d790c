use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single row in the play history store. `vibe` is stored as its
/// lowercase-snake-case tag (e.g. `"electronic_chill"`) so the schema stays
/// plain TEXT, matching the original SQLite table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlayRecord {
    pub id: i64,
    pub filepath: String,
    pub track_name: String,
    pub artist: String,
    pub vibe: String,
    pub time_period: String,
    pub listeners: i64,
    pub played_at: DateTime<Utc>,
}

/// Aggregate statistics returned by `HistoryStore::stats()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total_plays: i64,
    pub unique_tracks: i64,
    pub total_listeners: i64,
    pub by_time_period: std::collections::HashMap<String, i64>,
    pub by_vibe: std::collections::HashMap<String, i64>,
    pub first_play: Option<DateTime<Utc>>,
    pub last_play: Option<DateTime<Utc>>,
}

/// Summary row for `get_most_played`: total listeners reached across all
/// plays of a track, and when it was last played.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MostPlayedEntry {
    pub filepath: String,
    pub track_name: String,
    pub artist: String,
    pub play_count: i64,
    pub total_listeners: i64,
    pub last_played: DateTime<Utc>,
}
