use crate::models::Vibe;
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A show's on-air content profile: how the Director should pick tracks
/// while it is live, plus the metadata the HTTP API and now-playing state
/// surface to listeners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Show {
    pub show_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub energy_range: Option<(f32, f32)>,
    #[serde(default)]
    pub prefer_warmth: Option<f32>,
    #[serde(default)]
    pub vibes: Vec<Vibe>,
    pub segment_after_tracks: u32,
    #[serde(default)]
    pub podcasts_enabled: bool,
    /// Role name (e.g. `"host"`) to voice/persona id, used by whatever
    /// downstream TTS or imaging pulls a show's speaking voice.
    #[serde(default)]
    pub voices: HashMap<String, String>,
}

impl Show {
    /// Validate the stream profile fields: ranges must be well-formed and
    /// normalized to `0.0..=1.0`, and a show must run at least one track
    /// between segments.
    pub fn validate(&self) -> Result<(), String> {
        if let Some((lo, hi)) = self.energy_range {
            if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) || lo > hi {
                return Err(format!(
                    "show '{}': energy_range must be an ordered pair within 0.0..=1.0",
                    self.show_id
                ));
            }
        }
        if let Some(w) = self.prefer_warmth {
            if !(0.0..=1.0).contains(&w) {
                return Err(format!("show '{}': prefer_warmth must be within 0.0..=1.0", self.show_id));
            }
        }
        if self.segment_after_tracks < 1 {
            return Err(format!("show '{}': segment_after_tracks must be >= 1", self.show_id));
        }
        Ok(())
    }
}

/// A block of minutes on the weekly grid assigned to a show by id. A block
/// with an empty `days` set applies to every day ("base" block); a block
/// with a non-empty `days` set is an override that takes precedence over
/// any base block covering the same minutes on those days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleBlock {
    pub show_id: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
    #[serde(default)]
    pub days: HashSet<Weekday>,
}

impl ScheduleBlock {
    pub fn is_cross_midnight(&self) -> bool {
        self.end <= self.start
    }

    /// True if this block covers the minute-of-day at `now`, honoring the
    /// different semantics of base vs. override blocks and cross-midnight
    /// wraparound: a cross-midnight block belongs to its start day and
    /// continues into the next calendar day.
    pub fn matches(&self, now: chrono::NaiveDateTime) -> bool {
        let minute_of_day = now.time().signed_duration_since(NaiveTime::MIN).num_minutes();
        let start_min = self.start.signed_duration_since(NaiveTime::MIN).num_minutes();
        let end_min = self.end.signed_duration_since(NaiveTime::MIN).num_minutes();

        let in_window = if self.is_cross_midnight() {
            minute_of_day >= start_min || minute_of_day < end_min
        } else {
            minute_of_day >= start_min && minute_of_day < end_min
        };
        if !in_window {
            return false;
        }

        if self.days.is_empty() {
            return true;
        }

        // For a cross-midnight override, minutes past midnight still belong
        // to the block's start day, so we test "yesterday" in that window.
        let effective_day = if self.is_cross_midnight() && minute_of_day < end_min {
            now.date().pred_opt().map(|d| d.weekday()).unwrap_or(now.weekday())
        } else {
            now.weekday()
        };
        self.days.contains(&effective_day)
    }
}

/// A show resolved against the current time, along with the minutes
/// remaining until the block ends (used to schedule the next re-resolve).
#[derive(Debug, Clone)]
pub struct ResolvedShow {
    pub show: Show,
    pub minutes_remaining: i64,
}

/// The full weekly schedule: shows keyed by id, override blocks tried
/// first, then base blocks, plus the set of hours at which a podcast slot
/// is eligible. `validate()` enforces that every block references a known
/// show, that the base blocks cover all 1440 minutes of the day exactly
/// once, and that every podcast hour is in `0..24`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationSchedule {
    pub shows: HashMap<String, Show>,
    pub blocks: Vec<ScheduleBlock>,
    #[serde(default)]
    pub podcast_hours: HashSet<u32>,
}

impl StationSchedule {
    pub fn validate(&self) -> Result<(), String> {
        for show in self.shows.values() {
            show.validate()?;
        }

        for block in &self.blocks {
            if !self.shows.contains_key(&block.show_id) {
                return Err(format!("schedule block references unknown show '{}'", block.show_id));
            }
        }

        for hour in &self.podcast_hours {
            if *hour >= 24 {
                return Err(format!("podcast hour {} is out of range 0..24", hour));
            }
        }

        let mut coverage = [0u8; 1440];
        for block in self.blocks.iter().filter(|b| b.days.is_empty()) {
            let start = block.start.signed_duration_since(NaiveTime::MIN).num_minutes() as usize;
            let end = block.end.signed_duration_since(NaiveTime::MIN).num_minutes() as usize;
            if block.is_cross_midnight() {
                for m in start..1440 {
                    coverage[m] += 1;
                }
                for m in 0..end {
                    coverage[m] += 1;
                }
            } else {
                if start == end {
                    return Err(format!(
                        "base block for show '{}' has zero-length window (start == end)",
                        block.show_id
                    ));
                }
                for m in start..end {
                    coverage[m] += 1;
                }
            }
        }

        if let Some(gap) = coverage.iter().position(|&c| c == 0) {
            return Err(format!("schedule has a coverage gap at minute {}", gap));
        }
        if let Some(overlap) = coverage.iter().position(|&c| c > 1) {
            return Err(format!("schedule has overlapping base blocks at minute {}", overlap));
        }

        Ok(())
    }

    /// Resolve the show on-air at `now`: overrides are checked first (in
    /// declaration order), then base blocks.
    pub fn resolve(&self, now: chrono::NaiveDateTime) -> Result<ResolvedShow, String> {
        for block in self.blocks.iter().filter(|b| !b.days.is_empty()) {
            if block.matches(now) {
                return self.resolved_from(block, now);
            }
        }
        for block in self.blocks.iter().filter(|b| b.days.is_empty()) {
            if block.matches(now) {
                return self.resolved_from(block, now);
            }
        }
        Err(format!("no schedule block covers {}", now))
    }

    fn resolved_from(&self, block: &ScheduleBlock, now: chrono::NaiveDateTime) -> Result<ResolvedShow, String> {
        let show = self
            .shows
            .get(&block.show_id)
            .cloned()
            .ok_or_else(|| format!("schedule block references unknown show '{}'", block.show_id))?;
        Ok(ResolvedShow { show, minutes_remaining: minutes_until_end(block, now) })
    }
}

fn minutes_until_end(block: &ScheduleBlock, now: chrono::NaiveDateTime) -> i64 {
    let minute_of_day = now.time().signed_duration_since(NaiveTime::MIN).num_minutes();
    let end_min = block.end.signed_duration_since(NaiveTime::MIN).num_minutes();
    if block.is_cross_midnight() && minute_of_day >= block.start.signed_duration_since(NaiveTime::MIN).num_minutes() {
        (1440 - minute_of_day) + end_min
    } else {
        end_min - minute_of_day
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn show(id: &str) -> Show {
        Show {
            show_id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            energy_range: None,
            prefer_warmth: None,
            vibes: vec![],
            segment_after_tracks: 4,
            podcasts_enabled: false,
            voices: HashMap::new(),
        }
    }

    fn shows_map(ids: &[&str]) -> HashMap<String, Show> {
        ids.iter().map(|id| (id.to_string(), show(id))).collect()
    }

    #[test]
    fn cross_midnight_block_matches_both_sides() {
        let block = ScheduleBlock {
            show_id: "late_night".into(),
            start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
            days: HashSet::new(),
        };
        let late = NaiveDate::from_ymd_opt(2026, 7, 31).unwrap().and_hms_opt(23, 30, 0).unwrap();
        let early = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap().and_hms_opt(1, 0, 0).unwrap();
        assert!(block.matches(late));
        assert!(block.matches(early));
    }

    #[test]
    fn zero_length_block_is_rejected() {
        let schedule = StationSchedule {
            shows: shows_map(&["all_day"]),
            blocks: vec![ScheduleBlock {
                show_id: "all_day".into(),
                start: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                days: HashSet::new(),
            }],
            podcast_hours: HashSet::new(),
        };
        assert!(schedule.validate().is_err());
    }

    #[test]
    fn gap_is_rejected() {
        let schedule = StationSchedule {
            shows: shows_map(&["morning"]),
            blocks: vec![ScheduleBlock {
                show_id: "morning".into(),
                start: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
                days: HashSet::new(),
            }],
            podcast_hours: HashSet::new(),
        };
        assert!(schedule.validate().is_err());
    }

    #[test]
    fn unknown_show_reference_is_rejected() {
        let schedule = StationSchedule {
            shows: shows_map(&["morning"]),
            blocks: vec![ScheduleBlock {
                show_id: "does_not_exist".into(),
                start: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                days: HashSet::new(),
            }],
            podcast_hours: HashSet::new(),
        };
        assert!(schedule.validate().is_err());
    }

    #[test]
    fn out_of_range_podcast_hour_is_rejected() {
        let mut podcast_hours = HashSet::new();
        podcast_hours.insert(24);
        let schedule = StationSchedule { shows: shows_map(&[]), blocks: vec![], podcast_hours };
        assert!(schedule.validate().is_err());
    }

    #[test]
    fn override_takes_precedence_over_base() {
        let mut days = HashSet::new();
        days.insert(Weekday::Fri);
        let schedule = StationSchedule {
            shows: shows_map(&["friday_special", "evening", "rest"]),
            blocks: vec![
                ScheduleBlock {
                    show_id: "friday_special".into(),
                    start: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
                    end: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
                    days,
                },
                ScheduleBlock {
                    show_id: "evening".into(),
                    start: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                    end: NaiveTime::from_hms_opt(23, 59, 0).unwrap(),
                    days: HashSet::new(),
                },
                ScheduleBlock {
                    show_id: "rest".into(),
                    start: NaiveTime::from_hms_opt(23, 59, 0).unwrap(),
                    end: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                    days: HashSet::new(),
                },
            ],
            podcast_hours: HashSet::new(),
        };
        let friday_night = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap().and_hms_opt(21, 0, 0).unwrap();
        assert_eq!(friday_night.weekday(), Weekday::Fri);
        let resolved = schedule.resolve(friday_night).unwrap();
        assert_eq!(resolved.show.show_id, "friday_special");
    }
}
