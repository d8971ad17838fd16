pub mod aggregator;
pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod mapping;
pub mod storage;
pub mod types;
pub mod views;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::aggregator::{Aggregator, HomeFeed};
    pub use crate::api::{Endpoint, Payload};
    pub use crate::client::{Upstream, UpstreamClient};
    pub use crate::config::Config;
    pub use crate::error::{ConfigError, NormalizeError, UpstreamError};
    pub use crate::storage::{MemoryStorage, Storage};
    pub use crate::types::{Anime, AnimeDetail, Chapter, ContentType, ListSource, Resolution, VideoStream};
    pub use crate::views::DedupPolicy;
}

pub use aggregator::{Aggregator, HomeFeed};
pub use config::Config;
