//! State Publisher (§4.F)
//!
//! Publishes `NowPlaying` atomically (write-tmp-then-rename) to every
//! configured path, and maintains a short-lived cache of the Icecast
//! listener count so readers never block on a live status-json.xsl fetch.

use crate::error::{AppError, Result};
use crate::models::NowPlaying;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

const LISTENER_CACHE_TTL: Duration = Duration::from_secs(15);
const LISTENER_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

struct CachedListeners {
    count: u64,
    fetched_at: Instant,
}

pub struct StatePublisher {
    paths: Vec<PathBuf>,
    status_url: String,
    http: reqwest::Client,
    listeners: RwLock<CachedListeners>,
}

impl StatePublisher {
    pub fn new(paths: Vec<PathBuf>, status_url: String) -> Self {
        Self {
            paths,
            status_url,
            http: reqwest::Client::new(),
            listeners: RwLock::new(CachedListeners { count: 0, fetched_at: Instant::now() - LISTENER_CACHE_TTL }),
        }
    }

    /// Write `now_playing.json` to every configured path via a
    /// write-tmp-then-rename, so no reader can ever observe a partially
    /// written file.
    pub async fn publish(&self, state: &NowPlaying) -> Result<()> {
        let body = serde_json::to_vec_pretty(state).map_err(|e| AppError::Internal(e.into()))?;
        for path in &self.paths {
            let tmp_path = tmp_sibling(path);
            tokio::fs::write(&tmp_path, &body).await?;
            tokio::fs::rename(&tmp_path, path).await?;
        }
        Ok(())
    }

    pub async fn read(&self) -> Option<NowPlaying> {
        let path = self.paths.first()?;
        let raw = tokio::fs::read(path).await.ok()?;
        serde_json::from_slice(&raw).ok()
    }

    /// Current cached listener count, refreshing from Icecast if the
    /// cache has expired. A failed or timed-out fetch leaves the previous
    /// value in place rather than reporting zero.
    pub async fn cached_listener_count(&self) -> u64 {
        {
            let cache = self.listeners.read().await;
            if cache.fetched_at.elapsed() < LISTENER_CACHE_TTL {
                return cache.count;
            }
        }
        self.refresh_listener_count().await
    }

    async fn refresh_listener_count(&self) -> u64 {
        let fetch = self.http.get(&self.status_url).send();
        let result = tokio::time::timeout(LISTENER_FETCH_TIMEOUT, fetch).await;

        let fetched = match result {
            Ok(Ok(resp)) => resp.json::<serde_json::Value>().await.ok(),
            Ok(Err(e)) => {
                warn!("icecast status fetch failed: {}", e);
                None
            }
            Err(_) => {
                warn!("icecast status fetch timed out");
                None
            }
        };

        let mut cache = self.listeners.write().await;
        if let Some(json) = fetched {
            if let Some(n) = json
                .pointer("/icestats/source/listeners")
                .and_then(|v| v.as_u64())
            {
                cache.count = n;
            }
        }
        cache.fetched_at = Instant::now();
        debug!("listener count cache refreshed: {}", cache.count);
        cache.count
    }
}

fn tmp_sibling(path: &std::path::Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_is_atomic_and_readable() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("now_playing.json");
        let publisher = StatePublisher::new(vec![path.clone()], "http://localhost:1/status-json.xsl".into());

        let state = NowPlaying { track: Some("test".into()), ..Default::default() };
        publisher.publish(&state).await.unwrap();

        let read_back = publisher.read().await.unwrap();
        assert_eq!(read_back.track, Some("test".into()));
        assert!(!tmp_sibling(&path).exists());
    }
}
