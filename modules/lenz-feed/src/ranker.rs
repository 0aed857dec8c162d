//! Feed ranker and session state machine.
//!
//! Idle → Loading → {Ready, Failed}; Ready/Failed → Loading on refresh.
//! At most one load is in flight per ranker. The ranked list is swapped
//! in a single critical section on transition to Ready, so readers never
//! observe a partial update. A failed load keeps the previous list.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use lenz_common::{Coordinate, EngineConfig, FeedError, PlaceLocation, Post};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::retrieval::fetch_candidates;
use crate::scoring::RelevanceScorer;
use crate::traits::{LocationProvider, PostStore};

// ---------------------------------------------------------------------------
// Session types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPost {
    pub post: Post,
    pub score: f64,
}

/// The feed as the UI sees it. Replaced wholesale on every successful load.
#[derive(Debug, Clone)]
pub struct FeedSession {
    pub status: FeedStatus,
    pub ranked: Vec<RankedPost>,
    /// Always < `ranked.len()` when the list is non-empty.
    pub current_index: usize,
    /// Center of the loaded list (not of an in-flight load).
    pub center: Option<Coordinate>,
    /// Reverse-geocoded place, when the load resolved the device location.
    pub place: Option<PlaceLocation>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub last_error: Option<FeedError>,
}

impl FeedSession {
    fn new() -> Self {
        Self {
            status: FeedStatus::Idle,
            ranked: Vec::new(),
            current_index: 0,
            center: None,
            place: None,
            loaded_at: None,
            last_error: None,
        }
    }

    pub fn ordered_post_ids(&self) -> Vec<Uuid> {
        self.ranked.iter().map(|r| r.post.id).collect()
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    pub fn current_post(&self) -> Option<&Post> {
        self.ranked.get(self.current_index).map(|r| &r.post)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The session is Ready with `count` ranked posts.
    Ready { count: usize },
    /// Another load was in flight; this call did nothing.
    AlreadyLoading,
    /// The load was cancelled or superseded before it finished.
    Cancelled,
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Score every candidate and sort descending. `sort_by` is stable, so
/// equal scores keep candidate order; the step-function bands tie often.
pub fn rank(
    candidates: Vec<Post>,
    user_location: &Coordinate,
    scorer: &RelevanceScorer,
    now: DateTime<Utc>,
) -> Vec<RankedPost> {
    let mut ranked: Vec<RankedPost> = candidates
        .into_iter()
        .map(|post| {
            let score = scorer.score(&post, user_location, now);
            RankedPost { post, score }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

// ---------------------------------------------------------------------------
// FeedRanker
// ---------------------------------------------------------------------------

enum CenterSource {
    Fixed(Coordinate),
    Device,
}

struct InFlight {
    generation: u64,
    token: CancellationToken,
    prior_status: FeedStatus,
}

struct RankerState {
    session: FeedSession,
    generation: u64,
    in_flight: Option<InFlight>,
}

struct LoadResult {
    center: Coordinate,
    place: Option<PlaceLocation>,
    ranked: Vec<RankedPost>,
}

/// Owns one feed session. Share it behind an `Arc` between the load task
/// and UI readers.
pub struct FeedRanker {
    store: Arc<dyn PostStore>,
    location: Arc<dyn LocationProvider>,
    scorer: RelevanceScorer,
    radius_km: f64,
    state: Mutex<RankerState>,
    shutdown: CancellationToken,
}

impl FeedRanker {
    pub fn new(store: Arc<dyn PostStore>, location: Arc<dyn LocationProvider>) -> Self {
        Self::with_config(store, location, &EngineConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn PostStore>,
        location: Arc<dyn LocationProvider>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            store,
            location,
            scorer: RelevanceScorer::new(config.weights),
            radius_km: config.feed_radius_km,
            state: Mutex::new(RankerState {
                session: FeedSession::new(),
                generation: 0,
                in_flight: None,
            }),
            shutdown: CancellationToken::new(),
        }
    }

    /// Load and rank the feed around `center`.
    pub async fn load(&self, center: Coordinate) -> Result<LoadOutcome, FeedError> {
        self.run(CenterSource::Fixed(center)).await
    }

    /// Load around the device's current, reverse-geocoded location.
    pub async fn load_current_location(&self) -> Result<LoadOutcome, FeedError> {
        self.run(CenterSource::Device).await
    }

    /// Cancel any in-flight load and start a new one around `center`.
    pub async fn supersede(&self, center: Coordinate) -> Result<LoadOutcome, FeedError> {
        self.cancel();
        self.load(center).await
    }

    /// Abort the in-flight load, if any. The session reverts to its
    /// pre-load status with its list untouched. Returns whether a load was
    /// cancelled.
    pub fn cancel(&self) -> bool {
        let mut state = self.lock();
        match state.in_flight.take() {
            Some(in_flight) => {
                in_flight.token.cancel();
                state.session.status = in_flight.prior_status;
                state.generation += 1;
                debug!(generation = in_flight.generation, "Feed load cancelled");
                true
            }
            None => false,
        }
    }

    /// Move the feed cursor. Out-of-range indices are rejected and the
    /// cursor stays where it was.
    pub fn advance(&self, index: usize) -> Result<(), FeedError> {
        let mut state = self.lock();
        let len = state.session.len();
        if index >= len {
            return Err(FeedError::IndexOutOfRange { index, len });
        }
        state.session.current_index = index;
        Ok(())
    }

    pub fn status(&self) -> FeedStatus {
        self.lock().session.status
    }

    /// Consistent copy of the session.
    pub fn snapshot(&self) -> FeedSession {
        self.lock().session.clone()
    }

    pub fn ordered_post_ids(&self) -> Vec<Uuid> {
        self.lock().session.ordered_post_ids()
    }

    pub fn current_index(&self) -> usize {
        self.lock().session.current_index
    }

    pub fn current_post(&self) -> Option<Post> {
        self.lock().session.current_post().cloned()
    }

    // --- Load machinery ---

    async fn run(&self, source: CenterSource) -> Result<LoadOutcome, FeedError> {
        let Some((generation, token)) = self.begin() else {
            debug!("Feed load already in flight; ignoring");
            return Ok(LoadOutcome::AlreadyLoading);
        };
        let _guard = LoadGuard {
            ranker: self,
            generation,
        };

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(LoadOutcome::Cancelled),
            result = self.compute(source) => result,
        };

        self.finish(generation, result)
    }

    fn begin(&self) -> Option<(u64, CancellationToken)> {
        let mut state = self.lock();
        if state.in_flight.is_some() {
            return None;
        }
        state.generation += 1;
        let generation = state.generation;
        let token = self.shutdown.child_token();
        let prior_status = state.session.status;
        state.in_flight = Some(InFlight {
            generation,
            token: token.clone(),
            prior_status,
        });
        state.session.status = FeedStatus::Loading;
        Some((generation, token))
    }

    async fn compute(&self, source: CenterSource) -> Result<LoadResult, FeedError> {
        let (center, place) = match source {
            CenterSource::Fixed(center) => (center, None),
            CenterSource::Device => {
                let coordinate = self.location.current_coordinate().await?;
                let place = self.location.reverse_geocode(coordinate).await?;
                (place.coordinate, Some(place))
            }
        };

        info!(
            latitude = center.latitude,
            longitude = center.longitude,
            radius_km = self.radius_km,
            "Loading feed"
        );

        let candidates = fetch_candidates(self.store.as_ref(), &center, self.radius_km).await?;
        let ranked = rank(candidates, &center, &self.scorer, Utc::now());
        Ok(LoadResult {
            center,
            place,
            ranked,
        })
    }

    fn finish(
        &self,
        generation: u64,
        result: Result<LoadResult, FeedError>,
    ) -> Result<LoadOutcome, FeedError> {
        let mut state = self.lock();
        if state.generation != generation {
            return Ok(LoadOutcome::Cancelled);
        }
        state.in_flight = None;

        match result {
            Ok(loaded) => {
                let count = loaded.ranked.len();
                let session = &mut state.session;
                session.ranked = loaded.ranked;
                session.current_index = 0;
                session.center = Some(loaded.center);
                session.place = loaded.place;
                session.loaded_at = Some(Utc::now());
                session.last_error = None;
                session.status = FeedStatus::Ready;
                info!(count, "Feed ready");
                Ok(LoadOutcome::Ready { count })
            }
            Err(e) => {
                state.session.status = FeedStatus::Failed;
                state.session.last_error = Some(e.clone());
                warn!(error = %e, kept = state.session.len(), "Feed load failed; keeping previous list");
                Err(e)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, RankerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for FeedRanker {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Restores the pre-load status if a load future is dropped mid-flight.
struct LoadGuard<'a> {
    ranker: &'a FeedRanker,
    generation: u64,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.ranker.lock();
        let owns_flight = state
            .in_flight
            .as_ref()
            .is_some_and(|f| f.generation == self.generation);
        if owns_flight {
            if let Some(in_flight) = state.in_flight.take() {
                state.session.status = in_flight.prior_status;
                state.generation += 1;
            }
        }
    }
}
