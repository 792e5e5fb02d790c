use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Closed set of moods the classifier can assign. `Unknown` is the default
/// for tracks whose filename/path match nothing in the signature table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vibe {
    Ambient,
    Jazz,
    Downtempo,
    Classical,
    SoulSlow,
    Soul,
    Funk,
    Disco,
    Hiphop,
    HiphopChill,
    Indie,
    Electronic,
    ElectronicChill,
    Dub,
    Bossa,
    World,
    Rock,
    Rnb,
    Unknown,
}

/// Energy/warmth coordinates plus the assigned vibe bucket. Energy and
/// warmth are both normalized to `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mood {
    pub energy: f32,
    pub warmth: f32,
    pub vibe: Vibe,
}

impl Default for Mood {
    fn default() -> Self {
        Self { energy: 0.5, warmth: 0.5, vibe: Vibe::Unknown }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Music,
    Segment,
    Podcast,
    ShowAsset,
}

/// Filename-stem-derived segment category. Variant order is match priority:
/// `ListenerDedication` is checked first so a dedication file is never
/// mistaken for a generic station ID drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    ListenerDedication,
    StationId,
    HourMarker,
    SongIntro,
    Weather,
    News,
    Monologue,
    MusicHistory,
    LateNightThoughts,
    LongTalk,
    Other,
}

impl SegmentType {
    /// Classify a segment by its filename stem, longest/most-specific match first.
    pub fn from_stem(stem: &str) -> Self {
        let s = stem.to_lowercase();
        if s.starts_with("listener_dedication_") || s.starts_with("dedication_") {
            SegmentType::ListenerDedication
        } else if s.contains("station_id") {
            SegmentType::StationId
        } else if s.contains("hour_marker") {
            SegmentType::HourMarker
        } else if s.contains("song_intro") {
            SegmentType::SongIntro
        } else if s.contains("weather") {
            SegmentType::Weather
        } else if s.contains("news") {
            SegmentType::News
        } else if s.contains("monologue") {
            SegmentType::Monologue
        } else if s.contains("music_history") {
            SegmentType::MusicHistory
        } else if s.contains("late_night_thoughts") {
            SegmentType::LateNightThoughts
        } else if s.contains("long_talk") {
            SegmentType::LongTalk
        } else {
            SegmentType::Other
        }
    }

    /// Single-use segments are deleted after they are played once.
    pub fn is_single_use(self) -> bool {
        matches!(self, SegmentType::ListenerDedication)
    }
}

/// An indexed piece of content: a music track, a spoken segment, or a
/// podcast episode. `duration_seconds` is `None` when probing failed or
/// hasn't happened yet, in which case the asset is never chopped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub path: PathBuf,
    pub kind: AssetKind,
    pub mood: Option<Mood>,
    pub duration_seconds: Option<f32>,
    pub is_speech: bool,
    pub segment_type: Option<SegmentType>,
    /// For `Segment` assets, the immediate sub-folder under the segments
    /// root the file was found in (e.g. `"morning"`). `None` for segments
    /// dropped directly in the segments root, or for non-segment assets.
    pub period: Option<String>,
}

impl Asset {
    pub fn file_stem(&self) -> String {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string()
    }
}

/// Longest-substring-match mood signature table. Spec-authored: no
/// original-source table of keyword-to-mood mappings exists to crib from,
/// only the matching mechanism itself (longest match wins) is mandated.
pub const MOOD_SIGNATURES: &[(&str, Mood)] = &[
    ("ambient", Mood { energy: 0.15, warmth: 0.55, vibe: Vibe::Ambient }),
    ("drone", Mood { energy: 0.1, warmth: 0.4, vibe: Vibe::Ambient }),
    ("downtempo", Mood { energy: 0.3, warmth: 0.55, vibe: Vibe::Downtempo }),
    ("trip_hop", Mood { energy: 0.35, warmth: 0.5, vibe: Vibe::Downtempo }),
    ("jazz", Mood { energy: 0.4, warmth: 0.65, vibe: Vibe::Jazz }),
    ("bebop", Mood { energy: 0.55, warmth: 0.55, vibe: Vibe::Jazz }),
    ("classical", Mood { energy: 0.35, warmth: 0.6, vibe: Vibe::Classical }),
    ("orchestral", Mood { energy: 0.4, warmth: 0.6, vibe: Vibe::Classical }),
    ("soul_slow", Mood { energy: 0.3, warmth: 0.8, vibe: Vibe::SoulSlow }),
    ("slow_soul", Mood { energy: 0.3, warmth: 0.8, vibe: Vibe::SoulSlow }),
    ("soul", Mood { energy: 0.5, warmth: 0.75, vibe: Vibe::Soul }),
    ("motown", Mood { energy: 0.55, warmth: 0.7, vibe: Vibe::Soul }),
    ("funk", Mood { energy: 0.7, warmth: 0.6, vibe: Vibe::Funk }),
    ("disco", Mood { energy: 0.8, warmth: 0.55, vibe: Vibe::Disco }),
    ("hiphop_chill", Mood { energy: 0.4, warmth: 0.5, vibe: Vibe::HiphopChill }),
    ("chill_hop", Mood { energy: 0.4, warmth: 0.5, vibe: Vibe::HiphopChill }),
    ("hiphop", Mood { energy: 0.65, warmth: 0.45, vibe: Vibe::Hiphop }),
    ("hip_hop", Mood { energy: 0.65, warmth: 0.45, vibe: Vibe::Hiphop }),
    ("rap", Mood { energy: 0.7, warmth: 0.4, vibe: Vibe::Hiphop }),
    ("indie", Mood { energy: 0.55, warmth: 0.5, vibe: Vibe::Indie }),
    ("electronic_chill", Mood { energy: 0.35, warmth: 0.45, vibe: Vibe::ElectronicChill }),
    ("chillwave", Mood { energy: 0.35, warmth: 0.5, vibe: Vibe::ElectronicChill }),
    ("electronic", Mood { energy: 0.65, warmth: 0.4, vibe: Vibe::Electronic }),
    ("techno", Mood { energy: 0.8, warmth: 0.3, vibe: Vibe::Electronic }),
    ("house", Mood { energy: 0.75, warmth: 0.4, vibe: Vibe::Electronic }),
    ("dub", Mood { energy: 0.45, warmth: 0.55, vibe: Vibe::Dub }),
    ("reggae", Mood { energy: 0.5, warmth: 0.6, vibe: Vibe::Dub }),
    ("bossa", Mood { energy: 0.4, warmth: 0.65, vibe: Vibe::Bossa }),
    ("samba", Mood { energy: 0.55, warmth: 0.6, vibe: Vibe::World }),
    ("world", Mood { energy: 0.45, warmth: 0.6, vibe: Vibe::World }),
    ("afrobeat", Mood { energy: 0.65, warmth: 0.55, vibe: Vibe::World }),
    ("rock", Mood { energy: 0.75, warmth: 0.45, vibe: Vibe::Rock }),
    ("punk", Mood { energy: 0.9, warmth: 0.3, vibe: Vibe::Rock }),
    ("rnb", Mood { energy: 0.5, warmth: 0.65, vibe: Vibe::Rnb }),
    ("r_and_b", Mood { energy: 0.5, warmth: 0.65, vibe: Vibe::Rnb }),
];

/// Classify a filename/path using the longest-substring-match rule: the
/// signature whose key is the longest match found anywhere in the
/// lowercased stem wins; ties are broken by table order.
pub fn classify_mood(stem: &str) -> Mood {
    let s = stem.to_lowercase();
    let mut best: Option<(&str, Mood)> = None;
    for &(key, mood) in MOOD_SIGNATURES {
        if s.contains(key) {
            match best {
                Some((best_key, _)) if best_key.len() >= key.len() => {}
                _ => best = Some((key, mood)),
            }
        }
    }
    best.map(|(_, m)| m).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_match_wins_over_substring() {
        let mood = classify_mood("late_night_electronic_chill_set_01");
        assert_eq!(mood.vibe, Vibe::ElectronicChill);
    }

    #[test]
    fn unknown_default_when_nothing_matches() {
        let mood = classify_mood("track_0001");
        assert_eq!(mood.vibe, Vibe::Unknown);
    }

    #[test]
    fn dedication_is_single_use_and_matched_first() {
        assert!(SegmentType::from_stem("listener_dedication_2026_07_31").is_single_use());
        assert_eq!(
            SegmentType::from_stem("listener_dedication_news_special"),
            SegmentType::ListenerDedication
        );
    }
}
