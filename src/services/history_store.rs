//! Play History Store (§4.B)
//!
//! Backed by a local SQLite database (`~/.wvoid/history.db`), grounded on
//! `play_history.py`'s schema and query shapes but translated to `sqlx`.
//! Reads degrade to empty defaults and writes are fire-and-forget: nothing
//! here may block the streaming thread.

use crate::error::Result;
use crate::models::{HistoryStats, MostPlayedEntry, PlayRecord};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;
use tracing::{error, warn};

#[derive(Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub async fn connect(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new().max_connections(5).connect(&url).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS plays (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filepath TEXT NOT NULL,
                track_name TEXT NOT NULL,
                artist TEXT NOT NULL,
                vibe TEXT NOT NULL,
                time_period TEXT NOT NULL,
                listeners INTEGER NOT NULL DEFAULT 0,
                played_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_plays_filepath ON plays(filepath)")
            .execute(&pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_plays_played_at ON plays(played_at)")
            .execute(&pool)
            .await?;

        Ok(Self { pool })
    }

    /// Best-effort write. Errors are logged, never propagated: the
    /// streaming thread must never stall on a history write.
    pub async fn record_play(
        &self,
        filepath: &str,
        track_name: &str,
        artist: &str,
        vibe: &str,
        time_period: &str,
        listeners: i64,
    ) {
        let result = sqlx::query(
            "INSERT INTO plays (filepath, track_name, artist, vibe, time_period, listeners, played_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(filepath)
        .bind(track_name)
        .bind(artist)
        .bind(vibe)
        .bind(time_period)
        .bind(listeners)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            error!("failed to record play for {}: {}", filepath, e);
        }
    }

    /// Was `filepath` played within the last `hours` hours? Any query
    /// error is treated as "no" so history outages never block playback.
    pub async fn was_played_recently(&self, filepath: &str, hours: i64) -> bool {
        let cutoff = Utc::now() - chrono::Duration::hours(hours);
        let result: std::result::Result<Option<(i64,)>, sqlx::Error> = sqlx::query_as(
            "SELECT 1 FROM plays WHERE filepath = ? AND played_at > ? LIMIT 1",
        )
        .bind(filepath)
        .bind(cutoff.to_rfc3339())
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(row) => row.is_some(),
            Err(e) => {
                warn!("was_played_recently query failed, assuming not played: {}", e);
                false
            }
        }
    }

    /// Filter a candidate list down to those NOT played within `hours`
    /// hours. On store failure, returns the candidates unfiltered rather
    /// than blocking selection.
    pub async fn filter_recent(&self, candidates: Vec<String>, hours: i64) -> Vec<String> {
        let mut keep = Vec::with_capacity(candidates.len());
        for path in candidates {
            if !self.was_played_recently(&path, hours).await {
                keep.push(path);
            }
        }
        keep
    }

    pub async fn recent_plays(&self, limit: i64) -> Vec<PlayRecord> {
        sqlx::query_as::<_, PlayRecord>(
            "SELECT id, filepath, track_name, artist, vibe, time_period, listeners, played_at \
             FROM plays ORDER BY played_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            warn!("recent_plays query failed, returning empty: {}", e);
            Vec::new()
        })
    }

    pub async fn most_played(&self, limit: i64) -> Vec<MostPlayedEntry> {
        sqlx::query_as::<_, MostPlayedEntry>(
            "SELECT filepath, MAX(track_name) AS track_name, MAX(artist) AS artist, \
             COUNT(*) AS play_count, SUM(listeners) AS total_listeners, MAX(played_at) AS last_played \
             FROM plays GROUP BY filepath ORDER BY play_count DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            warn!("most_played query failed, returning empty: {}", e);
            Vec::new()
        })
    }

    pub async fn stats(&self) -> HistoryStats {
        let totals: Option<(i64, i64, Option<i64>, Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT COUNT(*), COUNT(DISTINCT filepath), SUM(listeners), MIN(played_at), MAX(played_at) FROM plays",
        )
        .fetch_optional(&self.pool)
        .await
        .unwrap_or(None);

        let (total_plays, unique_tracks, total_listeners, first_play, last_play) = totals
            .map(|(p, u, l, f, la)| (p, u, l.unwrap_or(0), f, la))
            .unwrap_or((0, 0, 0, None, None));

        let by_time_period = self.group_counts("time_period").await;
        let by_vibe = self.group_counts("vibe").await;

        HistoryStats {
            total_plays,
            unique_tracks,
            total_listeners,
            by_time_period,
            by_vibe,
            first_play: first_play.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|d| d.with_timezone(&Utc)),
            last_play: last_play.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|d| d.with_timezone(&Utc)),
        }
    }

    async fn group_counts(&self, column: &str) -> HashMap<String, i64> {
        let query = format!("SELECT {column} AS k, COUNT(*) AS c FROM plays GROUP BY {column}");
        let rows: Vec<(String, i64)> = sqlx::query_as(&query).fetch_all(&self.pool).await.unwrap_or_else(|e| {
            warn!("group_counts({}) failed, returning empty: {}", column, e);
            Vec::new()
        });
        rows.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_then_recent_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("history.db");
        let store = HistoryStore::connect(&db_path).await.unwrap();

        store.record_play("/music/a.mp3", "A", "Artist", "jazz", "evening", 12).await;
        assert!(store.was_played_recently("/music/a.mp3", 24).await);
        assert!(!store.was_played_recently("/music/b.mp3", 24).await);

        let recent = store.recent_plays(10).await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].filepath, "/music/a.mp3");

        let stats = store.stats().await;
        assert_eq!(stats.total_plays, 1);
        assert_eq!(stats.unique_tracks, 1);
    }
}
