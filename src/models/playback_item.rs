use crate::models::{Asset, AssetKind};
use std::time::Duration;

/// A single decision from the Director: which asset to play next, and the
/// sub-window of it (for chopped music) that should actually sound.
#[derive(Debug, Clone)]
pub struct PlaybackItem {
    pub asset: Asset,
    pub kind: AssetKind,
    pub start_offset: Duration,
    /// `None` means "play to the end of the asset" (segments, podcasts,
    /// and music that wasn't chopped).
    pub play_duration: Option<Duration>,
    pub is_speech: bool,
}

impl PlaybackItem {
    pub fn whole(asset: Asset) -> Self {
        let kind = asset.kind;
        let is_speech = asset.is_speech;
        Self { asset, kind, start_offset: Duration::ZERO, play_duration: None, is_speech }
    }
}
