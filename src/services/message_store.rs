//! Listener message ring (part of §4.H's `POST/GET /message`).
//!
//! Grounded on `now_playing_server.py`'s `save_message`/`get_messages`:
//! appends to a JSON file, keeps only the newest 100 entries, and never
//! exposes the submitter's IP to readers.

use crate::error::{AppError, Result};
use crate::models::{ListenerMessage, PublicMessage};
use std::collections::VecDeque;
use std::path::PathBuf;
use tokio::sync::RwLock;

const MAX_MESSAGES: usize = 100;

pub struct MessageStore {
    path: PathBuf,
    messages: RwLock<VecDeque<ListenerMessage>>,
}

impl MessageStore {
    pub async fn load(path: PathBuf) -> Self {
        let messages = tokio::fs::read(&path)
            .await
            .ok()
            .and_then(|raw| serde_json::from_slice::<Vec<ListenerMessage>>(&raw).ok())
            .map(VecDeque::from)
            .unwrap_or_default();
        Self { path, messages: RwLock::new(messages) }
    }

    /// Append a message, evicting the oldest if the ring is full, then
    /// persist to disk.
    pub async fn push(&self, message: String, ip: String) -> Result<()> {
        let mut messages = self.messages.write().await;
        messages.push_back(ListenerMessage { message, timestamp: chrono::Utc::now(), read: false, ip });
        while messages.len() > MAX_MESSAGES {
            messages.pop_front();
        }
        let snapshot: Vec<&ListenerMessage> = messages.iter().collect();
        let body = serde_json::to_vec_pretty(&snapshot).map_err(|e| AppError::Internal(e.into()))?;
        drop(messages);
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, body).await?;
        Ok(())
    }

    /// Newest-first public view, IP redacted.
    pub async fn recent(&self, limit: usize) -> Vec<PublicMessage> {
        let messages = self.messages.read().await;
        messages.iter().rev().take(limit).map(PublicMessage::from).collect()
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ring_evicts_oldest_beyond_cap() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("messages.json");
        let store = MessageStore::load(path).await;

        for i in 0..(MAX_MESSAGES + 5) {
            store.push(format!("message {i}"), "127.0.0.1".into()).await.unwrap();
        }

        assert_eq!(store.len().await, MAX_MESSAGES);
        let recent = store.recent(1).await;
        assert_eq!(recent[0].message, format!("message {}", MAX_MESSAGES + 4));
    }

    #[tokio::test]
    async fn public_view_omits_ip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("messages.json");
        let store = MessageStore::load(path).await;
        store.push("hello".into(), "10.0.0.1".into()).await.unwrap();

        let recent = store.recent(10).await;
        let serialized = serde_json::to_string(&recent[0]).unwrap();
        assert!(!serialized.contains("10.0.0.1"));
    }
}
