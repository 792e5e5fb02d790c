pub mod asset;
pub mod command;
pub mod message;
pub mod now_playing;
pub mod play_record;
pub mod playback_item;
pub mod schedule;

pub use asset::{classify_mood, Asset, AssetKind, Mood, SegmentType, Vibe};
pub use command::Command;
pub use message::{ListenerMessage, PublicMessage};
pub use now_playing::NowPlaying;
pub use play_record::{HistoryStats, MostPlayedEntry, PlayRecord};
pub use playback_item::PlaybackItem;
pub use schedule::{ResolvedShow, ScheduleBlock, Show, StationSchedule};
