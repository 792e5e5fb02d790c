//! Asset Index & Classifier (§4.A)
//!
//! Lazily enumerates the configured music/segment/podcast directories and
//! assigns each file a mood via the longest-substring-match signature
//! table. Re-scans are triggered on demand, not filesystem-watched: the
//! index is a plain `Vec<Asset>` behind a `RwLock`, rebuilt wholesale by
//! `rescan()`.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{classify_mood, Asset, AssetKind, SegmentType};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const MUSIC_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg", "m4a", "opus", "aac"];
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct AssetIndex {
    config: Config,
    assets: Arc<RwLock<Vec<Asset>>>,
}

impl AssetIndex {
    pub fn new(config: Config) -> Self {
        Self { config, assets: Arc::new(RwLock::new(Vec::new())) }
    }

    /// Rebuild the index from disk. Safe to call repeatedly; each call
    /// fully replaces the previous snapshot rather than diffing it.
    pub async fn rescan(&self) -> Result<usize> {
        let mut found = Vec::new();

        for dir in &self.config.music_dirs {
            scan_music_dir(dir, &mut found);
        }
        scan_segments_dir(&self.config.segments_dir, &mut found);
        scan_podcasts_dir(&self.config.podcasts_dir, &mut found);

        for asset in &mut found {
            if asset.duration_seconds.is_none() {
                asset.duration_seconds = probe_duration(&asset.path).await;
            }
        }

        let count = found.len();
        *self.assets.write().await = found;
        info!("asset index rescanned: {} assets", count);
        Ok(count)
    }

    pub async fn all(&self) -> Vec<Asset> {
        self.assets.read().await.clone()
    }

    pub async fn music(&self) -> Vec<Asset> {
        self.assets.read().await.iter().filter(|a| a.kind == AssetKind::Music).cloned().collect()
    }

    pub async fn segments(&self) -> Vec<Asset> {
        self.assets.read().await.iter().filter(|a| a.kind == AssetKind::Segment).cloned().collect()
    }

    pub async fn podcasts(&self) -> Vec<Asset> {
        self.assets.read().await.iter().filter(|a| a.kind == AssetKind::Podcast).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.assets.read().await.len()
    }

    /// Remove a single-use segment from both disk and the in-memory index
    /// after it has been played once.
    pub async fn consume_single_use(&self, asset: &Asset) -> Result<()> {
        if tokio::fs::metadata(&asset.path).await.is_ok() {
            tokio::fs::remove_file(&asset.path).await.map_err(AppError::Io)?;
        }
        self.assets.write().await.retain(|a| a.path != asset.path);
        Ok(())
    }
}

fn has_music_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| MUSIC_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn scan_music_dir(root: &Path, out: &mut Vec<Asset>) {
    if !root.exists() {
        warn!("music directory does not exist: {:?}", root);
        return;
    }
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() || !has_music_extension(entry.path()) {
            continue;
        }
        let full_path = entry.path().to_string_lossy().to_string();
        out.push(Asset {
            path: entry.into_path(),
            kind: AssetKind::Music,
            mood: Some(classify_mood(&full_path)),
            duration_seconds: None,
            is_speech: false,
            segment_type: None,
            period: None,
        });
    }
    debug!("scanned music dir {:?}", root);
}

fn scan_segments_dir(root: &Path, out: &mut Vec<Asset>) {
    if !root.exists() {
        warn!("segments directory does not exist: {:?}", root);
        return;
    }
    // Segments live in period sub-folders; walk recursively so the folder
    // structure is free-form for the producer.
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() || !has_music_extension(entry.path()) {
            continue;
        }
        let stem = entry.path().file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        let segment_type = Some(SegmentType::from_stem(stem));
        let period = entry
            .path()
            .strip_prefix(root)
            .ok()
            .and_then(|rel| rel.components().next())
            .and_then(|c| c.as_os_str().to_str())
            .filter(|_| entry.depth() > 1)
            .map(|s| s.to_lowercase());
        out.push(Asset {
            path: entry.into_path(),
            kind: AssetKind::Segment,
            mood: None,
            duration_seconds: None,
            is_speech: true,
            segment_type,
            period,
        });
    }
}

fn scan_podcasts_dir(root: &Path, out: &mut Vec<Asset>) {
    if !root.exists() {
        warn!("podcasts directory does not exist: {:?}", root);
        return;
    }
    let entries = match std::fs::read_dir(root) {
        Ok(e) => e,
        Err(e) => {
            warn!("failed to read podcasts directory {:?}: {}", root, e);
            return;
        }
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_file() && has_music_extension(&path) {
            out.push(Asset {
                path,
                kind: AssetKind::Podcast,
                mood: None,
                duration_seconds: None,
                is_speech: true,
                segment_type: None,
                period: None,
            });
        }
    }
}

/// Shell out to `ffprobe` to read a track's duration. Any failure —
/// missing binary, non-zero exit, timeout, or unparsable output —
/// degrades to `None`, which the Director treats as "do not chop".
async fn probe_duration(path: &Path) -> Option<f32> {
    let path = path.to_path_buf();
    let probe = tokio::process::Command::new("ffprobe")
        .args([
            "-v", "error",
            "-show_entries", "format=duration",
            "-of", "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(&path)
        .output();

    match tokio::time::timeout(PROBE_TIMEOUT, probe).await {
        Ok(Ok(output)) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().parse::<f32>().ok()
        }
        Ok(Ok(_)) => {
            debug!("ffprobe exited non-zero for {:?}", path);
            None
        }
        Ok(Err(e)) => {
            warn!("failed to spawn ffprobe for {:?}: {}", path, e);
            None
        }
        Err(_) => {
            warn!("ffprobe timed out for {:?}", path);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn music_extension_matching_is_case_insensitive() {
        assert!(has_music_extension(Path::new("track.MP3")));
        assert!(has_music_extension(Path::new("track.flac")));
        assert!(!has_music_extension(Path::new("readme.txt")));
    }
}
