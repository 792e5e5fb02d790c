use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A listener-submitted message stored in the ring. `ip` is retained for
/// rate limiting but never serialized back out to unauthenticated readers;
/// `GET /messages` exposes only `message`/`timestamp`/`read`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerMessage {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
    #[serde(skip_serializing)]
    pub ip: String,
}

/// Public projection of `ListenerMessage` returned by the read endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PublicMessage {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

impl From<&ListenerMessage> for PublicMessage {
    fn from(m: &ListenerMessage) -> Self {
        Self { message: m.message.clone(), timestamp: m.timestamp, read: m.read }
    }
}
