pub mod asset_index;
pub mod command_channel;
pub mod director;
pub mod dsp;
pub mod history_store;
pub mod icecast_source;
pub mod message_store;
pub mod schedule_resolver;
pub mod state_publisher;
pub mod streaming_engine;
pub mod supervisor;

pub use asset_index::AssetIndex;
pub use command_channel::CommandChannel;
pub use director::Director;
pub use history_store::HistoryStore;
pub use message_store::MessageStore;
pub use schedule_resolver::ScheduleResolver;
pub use state_publisher::StatePublisher;
pub use streaming_engine::StreamingEngine;
pub use supervisor::Supervisor;
