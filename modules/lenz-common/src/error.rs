use thiserror::Error;
use uuid::Uuid;

/// Failures reported by the post store collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Transport failure or the backend errored.
    #[error("post store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the write (e.g. duplicate like edge).
    #[error("post store constraint violated: {0}")]
    Constraint(String),
}

/// Failures reported by the location provider collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    #[error("current location not available")]
    NotAvailable,

    #[error("no placemark for ({latitude}, {longitude})")]
    GeocodingFailed { latitude: f64, longitude: f64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    #[error("Retrieval failed: {0}")]
    RetrievalFailed(#[source] StoreError),

    #[error("Current location not available")]
    LocationUnavailable,

    #[error("Geocoding failed for ({latitude}, {longitude})")]
    GeocodingFailed { latitude: f64, longitude: f64 },

    #[error("User {user_id} already liked post {post_id}")]
    AlreadyLiked { post_id: Uuid, user_id: Uuid },

    #[error("User {user_id} has not liked post {post_id}")]
    NotLiked { post_id: Uuid, user_id: Uuid },

    #[error("A mutation for post {post_id} by user {user_id} is already in flight")]
    MutationInFlight { post_id: Uuid, user_id: Uuid },

    #[error("Store error: {0}")]
    Store(#[source] StoreError),

    #[error("Post {0} is not tracked")]
    UnknownPost(Uuid),

    #[error("Comment text is empty")]
    EmptyComment,

    #[error("Index {index} out of range for feed of {len} posts")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
}

impl From<LocationError> for FeedError {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::NotAvailable => FeedError::LocationUnavailable,
            LocationError::GeocodingFailed {
                latitude,
                longitude,
            } => FeedError::GeocodingFailed {
                latitude,
                longitude,
            },
        }
    }
}

pub type FeedResult<T> = std::result::Result<T, FeedError>;
