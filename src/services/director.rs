//! Program Director (§4.D)
//!
//! Owns the sequencing decisions: which track or segment or podcast plays
//! next. Holds its cursor state as plain fields (`last_segment_type`,
//! `consumed_since_segment`, `last_podcast_slot`, forced-override flags)
//! rather than module statics, per the re-architecture direction — mutated
//! only from the streaming thread that calls `next()`.

use crate::models::{Asset, AssetKind, Command, PlaybackItem, ResolvedShow, SegmentType, Vibe};
use crate::services::{AssetIndex, HistoryStore};
use chrono::Timelike;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

/// Minimum margin (seconds) kept clear of a chopped window's start/end so
/// the fade ramps never run past the actual asset boundary.
const CHOP_EDGE_MARGIN_SECS: f32 = 10.0;
const CHOP_MIN_SECS: f32 = 60.0;
const CHOP_MAX_SECS: f32 = 240.0;
/// Tracks whose total length is below this are never chopped.
const CHOP_THRESHOLD_SECS: f32 = 300.0;

const RECENT_PLAY_HOURS: i64 = 24;
const RELAXED_PLAY_HOURS: i64 = 6;

/// Target size of the Director's music queue. Queue construction pulls a
/// candidate pool of at least `2 * QUEUE_SIZE` before shuffling.
const QUEUE_SIZE: usize = 12;
/// Probability a candidate whose vibe repeats the previously queued vibe
/// is rejected while walking the shuffled pool.
const VIBE_REPEAT_REJECT_PROBABILITY: f64 = 0.6;

pub struct Director {
    index: std::sync::Arc<AssetIndex>,
    history: std::sync::Arc<HistoryStore>,
    last_segment_type: Option<SegmentType>,
    consumed_since_segment: u32,
    last_podcast_slot: Option<String>,
    forced_segment: bool,
    forced_podcast: bool,
    forced_skip: bool,
    queue: Vec<Asset>,
    queue_show_name: Option<String>,
    last_queued_vibe: Option<Vibe>,
}

impl Director {
    pub fn new(index: std::sync::Arc<AssetIndex>, history: std::sync::Arc<HistoryStore>) -> Self {
        Self {
            index,
            history,
            last_segment_type: None,
            consumed_since_segment: 0,
            last_podcast_slot: None,
            forced_segment: false,
            forced_podcast: false,
            forced_skip: false,
            queue: Vec::new(),
            queue_show_name: None,
            last_queued_vibe: None,
        }
    }

    pub fn apply_command(&mut self, command: Command) {
        match command {
            Command::Skip => self.forced_skip = true,
            Command::Segment => self.forced_segment = true,
            Command::Podcast => self.forced_podcast = true,
        }
    }

    /// Decide the next playback item given the show currently on-air.
    /// `podcast_hour_due` tells the Director whether the current hour is
    /// one of the configured podcast hours (the Director itself holds no
    /// config; `StreamingEngine` owns that check and passes the result
    /// down so at most one podcast plays per qualifying hour).
    pub async fn next(
        &mut self,
        show: &ResolvedShow,
        now: chrono::NaiveDateTime,
        podcast_hour_due: bool,
    ) -> Option<PlaybackItem> {
        // Forced podcast fires before a forced segment if both are pending.
        if self.forced_podcast {
            self.forced_podcast = false;
            if let Some(item) = self.try_podcast_slot(now, true).await {
                return Some(item);
            }
        }

        if podcast_hour_due && show.show.podcasts_enabled {
            if let Some(item) = self.try_podcast_slot(now, false).await {
                return Some(item);
            }
        }

        let segment_due =
            self.forced_segment || self.consumed_since_segment >= show.show.segment_after_tracks;

        if segment_due {
            self.forced_segment = false;
            if let Some(item) = self.select_segment(now).await {
                self.consumed_since_segment = 0;
                return Some(item);
            }
        }

        let item = self.select_music(show).await?;
        self.consumed_since_segment += 1;
        Some(item)
    }

    async fn try_podcast_slot(&mut self, now: chrono::NaiveDateTime, forced: bool) -> Option<PlaybackItem> {
        let slot = now.format("%Y%m%d%H").to_string();
        if !forced && self.last_podcast_slot.as_deref() == Some(slot.as_str()) {
            return None;
        }
        let item = self.select_podcast(&slot).await;
        if item.is_some() {
            self.last_podcast_slot = Some(slot);
        }
        item
    }

    async fn select_podcast(&self, _slot: &str) -> Option<PlaybackItem> {
        let podcasts = self.index.podcasts().await;
        let mut rng = rand::thread_rng();
        let candidates: Vec<&Asset> = podcasts.iter().collect();
        candidates.choose(&mut rng).map(|a| PlaybackItem::whole((*a).clone()))
    }

    /// Pick the current period's sub-folder, preferring the newest
    /// `listener_dedication_*` file that wasn't the immediately previous
    /// segment type, then falling back to a uniform random pick among
    /// segments whose type differs from the last one played.
    async fn select_segment(&mut self, now: chrono::NaiveDateTime) -> Option<PlaybackItem> {
        let segments = self.index.segments().await;
        if segments.is_empty() {
            return None;
        }

        let period = time_period(now.hour());
        let in_period: Vec<&Asset> = segments.iter().filter(|a| a.period.as_deref() == Some(period)).collect();
        let pool: Vec<&Asset> = if in_period.is_empty() { segments.iter().collect() } else { in_period };

        let chosen = if let Some(dedication) = newest_dedication(&pool, self.last_segment_type) {
            dedication.clone()
        } else {
            let mut candidates: Vec<&Asset> =
                pool.iter().copied().filter(|a| a.segment_type != self.last_segment_type).collect();
            if candidates.is_empty() {
                candidates = pool;
            }
            let mut rng = rand::thread_rng();
            candidates.choose(&mut rng).copied()?.clone()
        };

        self.last_segment_type = chosen.segment_type;
        // Deletion of single-use segments happens only after the Streaming
        // Engine confirms the asset played to completion, never here.
        Some(PlaybackItem::whole(chosen))
    }

    async fn select_music(&mut self, show: &ResolvedShow) -> Option<PlaybackItem> {
        if self.queue.is_empty() || self.queue_show_name.as_deref() != Some(show.show.name.as_str()) {
            self.queue_show_name = Some(show.show.name.clone());
            self.refill_queue(show).await;
        }
        if self.queue.is_empty() {
            return None;
        }
        let chosen = self.queue.remove(0);
        Some(self.maybe_chop(chosen))
    }

    /// §4.D queue construction: score every fresh candidate, sort
    /// descending, take the top half (but at least `2 * QUEUE_SIZE`),
    /// shuffle, then walk the shuffled pool rejecting vibe repeats with
    /// probability `VIBE_REPEAT_REJECT_PROBABILITY` until the queue holds
    /// `QUEUE_SIZE` tracks. If the pool runs dry first, top up by score
    /// order, ignoring the rejection rule.
    async fn refill_queue(&mut self, show: &ResolvedShow) {
        let music = self.index.music().await;
        if music.is_empty() {
            self.queue.clear();
            return;
        }

        let candidate_paths: Vec<String> = music.iter().map(path_key).collect();
        let mut fresh = self.history.filter_recent(candidate_paths.clone(), RECENT_PLAY_HOURS).await;
        if fresh.len() < 2 * QUEUE_SIZE {
            fresh = self.history.filter_recent(candidate_paths, RELAXED_PLAY_HOURS).await;
        }
        if fresh.is_empty() {
            fresh = music.iter().map(path_key).collect();
        }
        let fresh_set: HashSet<String> = fresh.into_iter().collect();

        let mut rng = rand::thread_rng();
        let mut scored: Vec<(Asset, f32)> = music
            .into_iter()
            .filter(|a| fresh_set.contains(&path_key(a)))
            .map(|a| {
                let score = score_candidate(&a, show, &mut rng);
                (a, score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let take_n = (scored.len() / 2).max(2 * QUEUE_SIZE).min(scored.len());
        let mut pool: Vec<Asset> = scored[..take_n].iter().map(|(a, _)| a.clone()).collect();
        pool.shuffle(&mut rng);

        let mut queue: Vec<Asset> = Vec::with_capacity(QUEUE_SIZE);
        let mut last_vibe = self.last_queued_vibe;
        for asset in pool {
            if queue.len() >= QUEUE_SIZE {
                break;
            }
            let vibe = asset.mood.unwrap_or_default().vibe;
            if Some(vibe) == last_vibe && rng.gen_bool(VIBE_REPEAT_REJECT_PROBABILITY) {
                continue;
            }
            last_vibe = Some(vibe);
            queue.push(asset);
        }

        if queue.len() < QUEUE_SIZE {
            for (asset, _) in &scored {
                if queue.len() >= QUEUE_SIZE {
                    break;
                }
                if queue.iter().any(|q| q.path == asset.path) {
                    continue;
                }
                queue.push(asset.clone());
            }
        }

        self.last_queued_vibe = queue.last().and_then(|a| a.mood).map(|m| m.vibe);
        debug!("queue refilled: {} tracks from a pool of {}", queue.len(), take_n);
        self.queue = queue;
    }

    fn maybe_chop(&self, asset: Asset) -> PlaybackItem {
        let Some(duration) = asset.duration_seconds else {
            return PlaybackItem::whole(asset);
        };
        if duration < CHOP_THRESHOLD_SECS {
            return PlaybackItem::whole(asset);
        }

        let mut rng = rand::thread_rng();
        let max_start = duration - CHOP_EDGE_MARGIN_SECS - CHOP_MIN_SECS;
        if max_start <= CHOP_EDGE_MARGIN_SECS {
            return PlaybackItem::whole(asset);
        }
        let start = rng.gen_range(CHOP_EDGE_MARGIN_SECS..=max_start);
        let max_len = (duration - CHOP_EDGE_MARGIN_SECS - start).min(CHOP_MAX_SECS);
        let len = rng.gen_range(CHOP_MIN_SECS..=max_len.max(CHOP_MIN_SECS));

        let is_speech = asset.is_speech;
        let kind = asset.kind;
        PlaybackItem {
            asset,
            kind,
            start_offset: Duration::from_secs_f32(start),
            play_duration: Some(Duration::from_secs_f32(len)),
            is_speech,
        }
    }
}

fn path_key(asset: &Asset) -> String {
    asset.path.to_string_lossy().to_string()
}

/// Four-bucket time-of-day period matching the segment sub-folder naming
/// convention (`late_night`, `morning`, `afternoon`, `evening`).
fn time_period(hour: u32) -> &'static str {
    match hour {
        22..=23 | 0..=4 => "late_night",
        5..=11 => "morning",
        12..=17 => "afternoon",
        _ => "evening",
    }
}

/// The newest `listener_dedication_*` file in `pool`, unless the
/// immediately previous segment was itself a dedication (avoids
/// back-to-back dedications).
fn newest_dedication<'a>(pool: &[&'a Asset], last: Option<SegmentType>) -> Option<&'a Asset> {
    if last == Some(SegmentType::ListenerDedication) {
        return None;
    }
    pool.iter()
        .copied()
        .filter(|a| a.segment_type == Some(SegmentType::ListenerDedication))
        .max_by_key(|a| file_mtime(&a.path))
}

fn file_mtime(path: &std::path::Path) -> std::time::SystemTime {
    std::fs::metadata(path).and_then(|m| m.modified()).unwrap_or(std::time::SystemTime::UNIX_EPOCH)
}

/// Energy fit + warmth fit + vibe-list rank bonus + jitter, scored on the
/// point scale §4.D specifies: up to 40 for an in-range energy match (or a
/// falling-off bonus for near misses), up to 30 for a close warmth match,
/// up to 30 for a vibe-list rank match, plus a small random jitter so ties
/// don't resolve identically every refill.
fn score_candidate(asset: &Asset, show: &ResolvedShow, rng: &mut impl Rng) -> f32 {
    let mood = asset.mood.unwrap_or_default();
    let mut score = 0.0f32;

    if let Some((lo, hi)) = show.show.energy_range {
        if mood.energy >= lo && mood.energy <= hi {
            score += 40.0;
        } else {
            let distance = if mood.energy < lo { lo - mood.energy } else { mood.energy - hi };
            score += (30.0 - distance * 50.0).max(0.0);
        }
    }

    if let Some(target_warmth) = show.show.prefer_warmth {
        score += (30.0 - (mood.warmth - target_warmth).abs() * 40.0).max(0.0);
    }

    if !show.show.vibes.is_empty() {
        if let Some(rank) = show.show.vibes.iter().position(|v| *v == mood.vibe) {
            score += 30.0 - 3.0 * rank as f32;
        }
    }

    score += rng.gen_range(0.0..10.0);
    debug!("candidate {:?} scored {:.3}", asset.path, score);
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Mood, Vibe};

    fn asset_with_mood(energy: f32, warmth: f32, vibe: Vibe) -> Asset {
        Asset {
            path: "/music/a.mp3".into(),
            kind: AssetKind::Music,
            mood: Some(Mood { energy, warmth, vibe }),
            duration_seconds: Some(200.0),
            is_speech: false,
            segment_type: None,
            period: None,
        }
    }

    fn show_with(energy_range: Option<(f32, f32)>) -> ResolvedShow {
        ResolvedShow {
            show: crate::models::Show {
                show_id: "test".into(),
                name: "test".into(),
                description: String::new(),
                energy_range,
                prefer_warmth: None,
                vibes: vec![],
                segment_after_tracks: 4,
                podcasts_enabled: false,
                voices: Default::default(),
            },
            minutes_remaining: 30,
        }
    }

    #[test]
    fn energy_fit_prefers_midpoint_match() {
        let show = show_with(Some((0.6, 0.8)));
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);
        let near = score_candidate(&asset_with_mood(0.7, 0.5, Vibe::Jazz), &show, &mut rng);
        let far = score_candidate(&asset_with_mood(0.1, 0.5, Vibe::Jazz), &show, &mut rng);
        assert!(near > far);
    }

    #[test]
    fn time_period_buckets_cover_full_day() {
        assert_eq!(time_period(0), "late_night");
        assert_eq!(time_period(6), "morning");
        assert_eq!(time_period(13), "afternoon");
        assert_eq!(time_period(19), "evening");
        assert_eq!(time_period(23), "late_night");
    }

    #[test]
    fn dedication_not_picked_back_to_back() {
        let mut dedication = asset_with_mood(0.5, 0.5, Vibe::Soul);
        dedication.kind = AssetKind::Segment;
        dedication.segment_type = Some(SegmentType::ListenerDedication);
        let pool = vec![&dedication];
        assert!(newest_dedication(&pool, Some(SegmentType::ListenerDedication)).is_none());
        assert!(newest_dedication(&pool, Some(SegmentType::StationId)).is_some());
    }
}
