//! In-memory collaborators for tests and local shells. No backend required.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use lenz_common::{
    Comment, Coordinate, LikeEdge, LocationError, PlaceLocation, Post, StoreError,
};
use uuid::Uuid;

use crate::traits::{LocationProvider, PostStore};

// ---------------------------------------------------------------------------
// MemoryPostStore
// ---------------------------------------------------------------------------

struct MemoryPostStoreInner {
    posts: Vec<Post>,
    edges: HashSet<LikeEdge>,
    comments: Vec<Comment>,
    fail_reads: bool,
    fail_writes: bool,
    latency: Option<Duration>,
}

/// Stateful in-memory post store. Thread-safe via interior Mutex.
///
/// Like edge writes keep `likes_count` in step, the way the backend's
/// triggers do, so `list_posts` always reflects the edge set.
pub struct MemoryPostStore {
    inner: Mutex<MemoryPostStoreInner>,
    list_calls: AtomicUsize,
}

impl MemoryPostStore {
    pub fn new(posts: Vec<Post>) -> Self {
        Self {
            inner: Mutex::new(MemoryPostStoreInner {
                posts,
                edges: HashSet::new(),
                comments: Vec::new(),
                fail_reads: false,
                fail_writes: false,
                latency: None,
            }),
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Make `list_posts` return an error for every call.
    pub fn failing_reads(self) -> Self {
        self.set_fail_reads(true);
        self
    }

    /// Make every write return an error.
    pub fn failing_writes(self) -> Self {
        self.set_fail_writes(true);
        self
    }

    /// Suspend every call for `latency` before answering.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = Some(latency);
        self
    }

    /// Pre-populate an existing like edge without touching `likes_count`.
    pub fn with_like_edge(self, post_id: Uuid, user_id: Uuid) -> Self {
        self.lock().edges.insert(LikeEdge::new(post_id, user_id));
        self
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        self.lock().latency = latency;
    }

    pub fn set_posts(&self, posts: Vec<Post>) {
        self.lock().posts = posts;
    }

    // --- Assertion helpers ---

    pub fn has_like_edge(&self, post_id: Uuid, user_id: Uuid) -> bool {
        self.lock().edges.contains(&LikeEdge::new(post_id, user_id))
    }

    pub fn like_edges_for(&self, post_id: Uuid) -> usize {
        self.lock()
            .edges
            .iter()
            .filter(|e| e.post_id == post_id)
            .count()
    }

    pub fn post(&self, post_id: Uuid) -> Option<Post> {
        self.lock().posts.iter().find(|p| p.id == post_id).cloned()
    }

    pub fn comments_for(&self, post_id: Uuid) -> Vec<Comment> {
        self.lock()
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect()
    }

    /// How many times `list_posts` has been called.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryPostStoreInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn simulate_latency(&self) {
        let latency = self.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_writable(inner: &MemoryPostStoreInner) -> Result<(), StoreError> {
        if inner.fail_writes {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        let inner = self.lock();
        if inner.fail_reads {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        Ok(inner.posts.clone())
    }

    async fn insert_like_edge(&self, post_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        self.simulate_latency().await;
        let mut inner = self.lock();
        Self::check_writable(&inner)?;
        if !inner.edges.insert(LikeEdge::new(post_id, user_id)) {
            return Err(StoreError::Constraint(format!(
                "duplicate like edge ({post_id}, {user_id})"
            )));
        }
        if let Some(post) = inner.posts.iter_mut().find(|p| p.id == post_id) {
            post.like_count = post.like_count.saturating_add(1);
        }
        Ok(())
    }

    async fn delete_like_edge(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        self.simulate_latency().await;
        let mut inner = self.lock();
        Self::check_writable(&inner)?;
        // Deleting a missing edge matches zero rows; not an error.
        let removed = inner.edges.remove(&LikeEdge::new(post_id, user_id));
        if removed {
            if let Some(post) = inner.posts.iter_mut().find(|p| p.id == post_id) {
                post.like_count = post.like_count.saturating_sub(1);
            }
        }
        Ok(removed)
    }

    async fn insert_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        text: &str,
    ) -> Result<Comment, StoreError> {
        self.simulate_latency().await;
        let mut inner = self.lock();
        Self::check_writable(&inner)?;
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            text: text.to_string(),
            created_at: Utc::now(),
        };
        inner.comments.push(comment.clone());
        if let Some(post) = inner.posts.iter_mut().find(|p| p.id == post_id) {
            post.comment_count = post.comment_count.saturating_add(1);
        }
        Ok(comment)
    }
}

// ---------------------------------------------------------------------------
// FixedLocationProvider
// ---------------------------------------------------------------------------

/// Location provider pinned to a single place.
pub struct FixedLocationProvider {
    coordinate: Option<Coordinate>,
    place: Option<PlaceLocation>,
}

impl FixedLocationProvider {
    /// Device sits at `place`; reverse geocoding answers with `place`'s names.
    pub fn new(place: PlaceLocation) -> Self {
        Self {
            coordinate: Some(place.coordinate),
            place: Some(place),
        }
    }

    /// No position fix.
    pub fn unavailable() -> Self {
        Self {
            coordinate: None,
            place: None,
        }
    }

    /// Position fix, but no placemark resolves for it.
    pub fn without_placemark(coordinate: Coordinate) -> Self {
        Self {
            coordinate: Some(coordinate),
            place: None,
        }
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    async fn current_coordinate(&self) -> Result<Coordinate, LocationError> {
        self.coordinate.ok_or(LocationError::NotAvailable)
    }

    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<PlaceLocation, LocationError> {
        match &self.place {
            Some(place) => Ok(PlaceLocation {
                coordinate,
                ..place.clone()
            }),
            None => Err(LocationError::GeocodingFailed {
                latitude: coordinate.latitude,
                longitude: coordinate.longitude,
            }),
        }
    }
}
