pub mod config;
pub mod error;
pub mod types;

pub use config::{load_config, EngineConfig, ScoringWeights, DEFAULT_FEED_RADIUS_KM, UNBOUNDED_RADIUS_KM};
pub use error::{FeedError, FeedResult, LocationError, StoreError};
pub use types::*;
