//! Candidate retrieval.
//!
//! The store has no geo index, so retrieval is a full scan followed by a
//! haversine radius filter. Store order is preserved; the ranker's stable
//! sort depends on it.

use lenz_common::{distance_km, Coordinate, FeedError, Post};
use tracing::debug;

use crate::traits::PostStore;

/// Posts within `radius_km` of `center` (inclusive), in store order.
pub async fn fetch_candidates(
    store: &dyn PostStore,
    center: &Coordinate,
    radius_km: f64,
) -> Result<Vec<Post>, FeedError> {
    let posts = store.list_posts().await.map_err(FeedError::RetrievalFailed)?;
    let total = posts.len();
    let candidates = within_radius(posts, center, radius_km);

    debug!(
        total,
        kept = candidates.len(),
        radius_km,
        "Candidate retrieval filtered posts"
    );
    Ok(candidates)
}

/// Every post whose city name is exactly `city`, newest first.
pub async fn fetch_city_posts(store: &dyn PostStore, city: &str) -> Result<Vec<Post>, FeedError> {
    let mut posts: Vec<Post> = store
        .list_posts()
        .await
        .map_err(FeedError::RetrievalFailed)?
        .into_iter()
        .filter(|p| p.city() == city)
        .collect();
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(posts)
}

/// Pure radius filter.
pub fn within_radius(posts: Vec<Post>, center: &Coordinate, radius_km: f64) -> Vec<Post> {
    posts
        .into_iter()
        .filter(|p| distance_km(center, p.coordinate()) <= radius_km)
        .collect()
}
