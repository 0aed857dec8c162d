//! Feed ranking and geospatial retrieval engine.
//!
//! Candidates come from a `PostStore` by radius, are scored by distance,
//! engagement and recency, and are stable-sorted into a `FeedSession`.
//! The same candidates feed the city map aggregation. Likes and comments
//! go through the `EngagementMutator`, which applies them optimistically
//! and rolls back on failure.
//!
//! Collaborators are injected (`PostStore`, `LocationProvider`); nothing
//! here holds global state.

pub mod cities;
pub mod engagement;
pub mod memory;
pub mod ranker;
pub mod retrieval;
pub mod scoring;
#[cfg(any(test, feature = "test-support"))]
pub mod testutil;
pub mod traits;

pub use cities::{aggregate_by_city, load_city_annotations};
pub use engagement::{EngagementMutator, LikeIntent, LikeOutcome, PostEngagement};
pub use memory::{FixedLocationProvider, MemoryPostStore};
pub use ranker::{rank, FeedRanker, FeedSession, FeedStatus, LoadOutcome, RankedPost};
pub use retrieval::{fetch_candidates, fetch_city_posts};
pub use scoring::{RelevanceScorer, ScoreBreakdown};
pub use traits::{LocationProvider, PostStore};
