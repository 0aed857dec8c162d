//! Post and place fixtures for tests.

use chrono::{Duration, Utc};
use lenz_common::{Coordinate, MediaKind, PlaceLocation, Post};
use uuid::Uuid;

pub fn place(city: &str, latitude: f64, longitude: f64) -> PlaceLocation {
    PlaceLocation {
        city: city.to_string(),
        region: "California".to_string(),
        country: "USA".to_string(),
        coordinate: Coordinate::new_unchecked(latitude, longitude),
    }
}

/// A fresh video post with no engagement.
pub fn post_at(city: &str, latitude: f64, longitude: f64) -> Post {
    post_with(city, latitude, longitude, 0, 0, 0)
}

/// A video post with the given engagement, created `age_hours` ago.
pub fn post_with(
    city: &str,
    latitude: f64,
    longitude: f64,
    likes: u32,
    comments: u32,
    age_hours: i64,
) -> Post {
    let id = Uuid::new_v4();
    Post {
        id,
        owner_id: Uuid::new_v4(),
        media_kind: MediaKind::Video,
        media_refs: vec![format!("https://cdn.example.com/{id}.mp4")],
        thumbnail_ref: None,
        location: place(city, latitude, longitude),
        like_count: likes,
        comment_count: comments,
        created_at: Utc::now() - Duration::hours(age_hours),
    }
}
