//! Collaborator seams for the feed engine.

use std::sync::Arc;

use async_trait::async_trait;
use lenz_common::{Comment, Coordinate, LocationError, PlaceLocation, Post, StoreError};
use uuid::Uuid;

/// Hosted post storage. Owns posts, like edges and comments.
///
/// Implemented by the backend client in the shell and by `MemoryPostStore`
/// (tests). Also implemented for `Arc<S>` so a store can be shared for
/// assertions.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Every post the store knows about, in the store's order.
    async fn list_posts(&self) -> Result<Vec<Post>, StoreError>;

    /// Persist a like edge. Duplicate edges are a `StoreError::Constraint`.
    async fn insert_like_edge(&self, post_id: Uuid, user_id: Uuid) -> Result<(), StoreError>;

    /// Remove a like edge. Returns false when no edge matched.
    async fn delete_like_edge(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;

    /// Persist a comment and return the stored row.
    async fn insert_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        text: &str,
    ) -> Result<Comment, StoreError>;
}

/// Device positioning and reverse geocoding.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_coordinate(&self) -> Result<Coordinate, LocationError>;

    /// Fails with `LocationError::GeocodingFailed` when no placemark resolves.
    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<PlaceLocation, LocationError>;
}

// ---------------------------------------------------------------------------
// Arc<_> blankets
// ---------------------------------------------------------------------------

#[async_trait]
impl<S: PostStore + ?Sized> PostStore for Arc<S> {
    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        (**self).list_posts().await
    }

    async fn insert_like_edge(&self, post_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        (**self).insert_like_edge(post_id, user_id).await
    }

    async fn delete_like_edge(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        (**self).delete_like_edge(post_id, user_id).await
    }

    async fn insert_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        text: &str,
    ) -> Result<Comment, StoreError> {
        (**self).insert_comment(post_id, user_id, text).await
    }
}

#[async_trait]
impl<L: LocationProvider + ?Sized> LocationProvider for Arc<L> {
    async fn current_coordinate(&self) -> Result<Coordinate, LocationError> {
        (**self).current_coordinate().await
    }

    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<PlaceLocation, LocationError> {
        (**self).reverse_geocode(coordinate).await
    }
}
