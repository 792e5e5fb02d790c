use serde::{Deserialize, Serialize};

/// The state published atomically to the now-playing file(s) and served by
/// the HTTP API. `listeners` is overlaid live from the Icecast status cache
/// rather than stored on disk, so readers always see a fresh count even
/// though the rest of the struct is only as fresh as the last publish.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NowPlaying {
    pub track: Option<String>,
    pub artist: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub vibe: Option<String>,
    pub listeners: u64,
    pub show: Option<String>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
}
