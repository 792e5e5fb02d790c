//! Schedule Resolver (§4.C)
//!
//! Loads the weekly YAML schedule from disk, validates it, and resolves
//! the on-air show for a given instant. Grounded directly on
//! `schedule.py`'s parsing/validation/resolution logic. When no schedule
//! file is present, falls back to a synthesized seven-period schedule so
//! `resolve()` never has a second code path for "no config".

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{ResolvedShow, ScheduleBlock, Show, StationSchedule};
use chrono::{NaiveTime, Weekday};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

pub struct ScheduleResolver {
    schedule: StationSchedule,
}

impl ScheduleResolver {
    pub async fn load(config: &Config) -> Result<Self> {
        let schedule = match tokio::fs::read_to_string(&config.schedule_path).await {
            Ok(raw) => {
                let parsed = parse_schedule(&raw)?;
                parsed.validate().map_err(AppError::Schedule)?;
                info!("loaded schedule from {:?}", config.schedule_path);
                parsed
            }
            Err(_) => {
                warn!(
                    "no schedule file at {:?}, using synthetic fallback schedule",
                    config.schedule_path
                );
                synthetic_schedule()
            }
        };
        Ok(Self { schedule })
    }

    pub fn resolve(&self, now: chrono::NaiveDateTime) -> Result<ResolvedShow> {
        self.schedule.resolve(now).map_err(AppError::Schedule)
    }

    /// Is `hour` (0-23) one of the schedule's configured podcast hours?
    /// Sourced from the schedule file's validated `podcasts.hours`, never
    /// from an unvalidated environment variable.
    pub fn podcast_hour_due(&self, hour: u32) -> bool {
        self.schedule.podcast_hours.contains(&hour)
    }
}

#[derive(Debug, Deserialize)]
struct RawSchedule {
    shows: HashMap<String, RawShow>,
    #[serde(default)]
    podcasts: RawPodcasts,
    schedule: RawScheduleSection,
}

#[derive(Debug, Deserialize, Default)]
struct RawPodcasts {
    #[serde(default)]
    hours: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct RawScheduleSection {
    #[serde(default)]
    base: Vec<RawBlock>,
    #[serde(default)]
    overrides: Vec<RawBlock>,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    show: String,
    start: String,
    end: String,
    #[serde(default)]
    days: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawShow {
    name: String,
    #[serde(default)]
    description: String,
    segment_after_tracks: u32,
    #[serde(default)]
    podcasts_enabled: bool,
    #[serde(default)]
    music: RawMusicProfile,
    #[serde(default)]
    voices: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawMusicProfile {
    #[serde(default)]
    energy_range: Option<(f32, f32)>,
    #[serde(default)]
    prefer_warmth: Option<f32>,
    #[serde(default)]
    vibes: Vec<crate::models::Vibe>,
}

fn parse_schedule(raw: &str) -> Result<StationSchedule> {
    let parsed: RawSchedule = serde_yaml::from_str(raw)
        .map_err(|e| AppError::Schedule(format!("invalid schedule YAML: {}", e)))?;

    let mut shows = HashMap::with_capacity(parsed.shows.len());
    for (show_id, raw_show) in parsed.shows {
        shows.insert(
            show_id.clone(),
            Show {
                show_id,
                name: raw_show.name,
                description: raw_show.description,
                energy_range: raw_show.music.energy_range,
                prefer_warmth: raw_show.music.prefer_warmth,
                vibes: raw_show.music.vibes,
                segment_after_tracks: raw_show.segment_after_tracks,
                podcasts_enabled: raw_show.podcasts_enabled,
                voices: raw_show.voices,
            },
        );
    }

    let mut blocks = Vec::with_capacity(parsed.schedule.base.len() + parsed.schedule.overrides.len());
    for block in parsed.schedule.base {
        blocks.push(parse_block(block, true)?);
    }
    for block in parsed.schedule.overrides {
        blocks.push(parse_block(block, false)?);
    }

    let mut podcast_hours = HashSet::with_capacity(parsed.podcasts.hours.len());
    for hour in parsed.podcasts.hours {
        if hour >= 24 {
            return Err(AppError::Schedule(format!("podcast hour {} is out of range 0..24", hour)));
        }
        podcast_hours.insert(hour);
    }

    Ok(StationSchedule { shows, blocks, podcast_hours })
}

fn parse_block(block: RawBlock, is_base: bool) -> Result<ScheduleBlock> {
    let start = parse_hhmm(&block.start)?;
    let end = parse_hhmm(&block.end)?;
    let days = if is_base { HashSet::new() } else { parse_days(&block.days)? };
    Ok(ScheduleBlock { show_id: block.show, start, end, days })
}

fn parse_hhmm(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| AppError::Schedule(format!("invalid HH:MM time: '{}'", raw)))
}

/// Expand day tokens, including the `daily`/`all`/`weekday`/`weekend`
/// aliases and full weekday names, into a concrete `Weekday` set.
fn parse_days(tokens: &[String]) -> Result<HashSet<Weekday>> {
    let mut days = HashSet::new();
    for token in tokens {
        let normalized = token.trim().to_lowercase();
        match normalized.as_str() {
            "daily" | "all" => {
                return Ok(HashSet::new()); // empty set == base (every day)
            }
            "weekday" | "weekdays" => {
                days.extend([Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri]);
            }
            "weekend" | "weekends" => {
                days.extend([Weekday::Sat, Weekday::Sun]);
            }
            other => {
                days.insert(normalize_day_token(other)?);
            }
        }
    }
    Ok(days)
}

fn normalize_day_token(token: &str) -> Result<Weekday> {
    match token {
        "mon" | "monday" => Ok(Weekday::Mon),
        "tue" | "tues" | "tuesday" => Ok(Weekday::Tue),
        "wed" | "wednesday" => Ok(Weekday::Wed),
        "thu" | "thur" | "thursday" => Ok(Weekday::Thu),
        "fri" | "friday" => Ok(Weekday::Fri),
        "sat" | "saturday" => Ok(Weekday::Sat),
        "sun" | "sunday" => Ok(Weekday::Sun),
        other => Err(AppError::Schedule(format!("unrecognized day token: '{}'", other))),
    }
}

/// Synthesized fallback: seven day-agnostic periods covering the full
/// 1440-minute day with no gaps or overlaps. Podcasts are enabled on every
/// synthetic show so the classic default podcast hours still fire with no
/// schedule file present.
fn synthetic_schedule() -> StationSchedule {
    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }
    fn show(id: &str) -> Show {
        Show {
            show_id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            energy_range: None,
            prefer_warmth: None,
            vibes: vec![],
            segment_after_tracks: 4,
            podcasts_enabled: true,
            voices: HashMap::new(),
        }
    }
    let periods: &[(&str, u32, u32, u32, u32)] = &[
        ("late_night", 0, 0, 5, 0),
        ("early_morning", 5, 0, 7, 0),
        ("morning", 7, 0, 11, 0),
        ("early_afternoon", 11, 0, 14, 0),
        ("afternoon", 14, 0, 18, 0),
        ("evening", 18, 0, 22, 0),
        ("night", 22, 0, 24, 0),
    ];
    let shows: HashMap<String, Show> = periods.iter().map(|&(name, ..)| (name.to_string(), show(name))).collect();
    let blocks = periods
        .iter()
        .map(|&(name, sh, sm, eh, em)| ScheduleBlock {
            show_id: name.to_string(),
            start: t(sh, sm),
            end: if eh == 24 { t(0, 0) } else { t(eh, em) },
            days: HashSet::new(),
        })
        .collect();
    let podcast_hours = [0, 3, 6, 9, 12, 15, 18, 21].into_iter().collect();
    StationSchedule { shows, blocks, podcast_hours }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_schedule_covers_full_day() {
        synthetic_schedule().validate().expect("synthetic schedule must validate");
    }

    #[test]
    fn parse_days_expands_weekday_alias() {
        let days = parse_days(&["weekday".to_string()]).unwrap();
        assert!(days.contains(&Weekday::Mon));
        assert!(!days.contains(&Weekday::Sat));
    }

    #[test]
    fn parse_days_daily_is_base() {
        let days = parse_days(&["daily".to_string()]).unwrap();
        assert!(days.is_empty());
    }

    #[test]
    fn parses_nested_schedule_document() {
        let raw = r#"
shows:
  morning_show:
    name: Morning Show
    description: Coffee and jazz
    segment_after_tracks: 4
    podcasts_enabled: true
    music:
      energy_range: [0.4, 0.7]
      prefer_warmth: 0.6
      vibes: [jazz, soul]
    voices:
      host: voice_1
  late_night:
    name: Late Night
    segment_after_tracks: 6
    music: {}
podcasts:
  hours: [0, 6, 12, 18]
schedule:
  base:
    - {start: "06:00", end: "22:00", show: morning_show}
    - {start: "22:00", end: "06:00", show: late_night}
  overrides:
    - {start: "20:00", end: "23:00", show: late_night, days: [fri]}
"#;
        let schedule = parse_schedule(raw).unwrap();
        schedule.validate().unwrap();
        assert_eq!(schedule.shows.len(), 2);
        assert!(schedule.podcast_hours.contains(&6));
        assert!(!schedule.podcast_hours.contains(&7));
    }
}
