use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FeedError;

// --- Geo Types ---

/// A point on the globe, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting components outside [-90,90] / [-180,180].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, FeedError> {
        let valid = (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(FeedError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Build a coordinate the caller has already validated (location provider output).
    pub const fn new_unchecked(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        distance_km(self, other)
    }
}

/// Haversine great-circle distance between two coordinates in kilometers.
pub fn distance_km(a: &Coordinate, b: &Coordinate) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();
    let lat1_r = a.latitude.to_radians();
    let lat2_r = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1.0 for antipodal points.
    let c = 2.0 * h.min(1.0).sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// Reverse-geocoded place. Immutable once attached to a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceLocation {
    pub city: String,
    pub region: String,
    pub country: String,
    #[serde(flatten)]
    pub coordinate: Coordinate,
}

impl PlaceLocation {
    /// Assemble a place from placemark components, filling in the
    /// "Unknown ..." placeholders for anything the geocoder left out.
    pub fn from_parts(
        city: Option<String>,
        region: Option<String>,
        country: Option<String>,
        coordinate: Coordinate,
    ) -> Self {
        Self {
            city: city.unwrap_or_else(|| "Unknown City".to_string()),
            region: region.unwrap_or_else(|| "Unknown Region".to_string()),
            country: country.unwrap_or_else(|| "Unknown Country".to_string()),
            coordinate,
        }
    }
}

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Photo,
}

// --- Posts and engagement ---

/// A shared video or photo, as returned by the post store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    #[serde(rename = "user_id")]
    pub owner_id: Uuid,
    #[serde(rename = "media_type")]
    pub media_kind: MediaKind,
    #[serde(rename = "media_urls", default)]
    pub media_refs: Vec<String>,
    #[serde(rename = "thumbnail_url", default)]
    pub thumbnail_ref: Option<String>,
    pub location: PlaceLocation,
    #[serde(rename = "likes_count")]
    pub like_count: u32,
    #[serde(rename = "comments_count")]
    pub comment_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn coordinate(&self) -> &Coordinate {
        &self.location.coordinate
    }

    pub fn city(&self) -> &str {
        &self.location.city
    }

    /// The media reference the feed should display first, or "" if none.
    pub fn primary_media_ref(&self) -> &str {
        self.media_refs.first().map(String::as_str).unwrap_or("")
    }
}

/// The persisted fact that `user_id` liked `post_id`. At most one per pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LikeEdge {
    #[serde(rename = "video_id")]
    pub post_id: Uuid,
    pub user_id: Uuid,
}

impl LikeEdge {
    pub fn new(post_id: Uuid, user_id: Uuid) -> Self {
        Self { post_id, user_id }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    #[serde(rename = "video_id")]
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Map pin: one per distinct city name. Recomputed on every map load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityAnnotation {
    pub city: String,
    pub representative_coordinate: Coordinate,
    pub post_count: usize,
}

// --- Tests ---

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SF: Coordinate = Coordinate::new_unchecked(37.7749, -122.4194);
    const LA: Coordinate = Coordinate::new_unchecked(34.0522, -118.2437);
    const OAKLAND: Coordinate = Coordinate::new_unchecked(37.8044, -122.2712);

    #[test]
    fn distance_sf_to_oakland() {
        // SF to Oakland is ~13km
        let dist = distance_km(&SF, &OAKLAND);
        assert!(
            (dist - 13.0).abs() < 2.0,
            "SF to Oakland should be ~13km, got {dist}"
        );
    }

    #[test]
    fn distance_sf_to_la() {
        // SF to LA is ~559km
        let dist = distance_km(&SF, &LA);
        assert!(
            (dist - 559.0).abs() < 10.0,
            "SF to LA should be ~559km, got {dist}"
        );
    }

    #[test]
    fn distance_same_point_is_zero() {
        let p = Coordinate::new_unchecked(44.9778, -93.265);
        let dist = distance_km(&p, &p);
        assert!(dist < 0.001, "Same point should be 0km, got {dist}");
    }

    #[test]
    fn distance_is_symmetric() {
        let points = [SF, LA, OAKLAND, Coordinate::new_unchecked(-33.8688, 151.2093)];
        for a in &points {
            for b in &points {
                assert_eq!(distance_km(a, b), distance_km(b, a));
            }
        }
    }

    #[test]
    fn distance_triangle_inequality() {
        let direct = distance_km(&SF, &LA);
        let via_oakland = distance_km(&SF, &OAKLAND) + distance_km(&OAKLAND, &LA);
        assert!(direct <= via_oakland + 1e-9);
    }

    #[test]
    fn antipodal_points_stay_finite() {
        let a = Coordinate::new_unchecked(0.0, 0.0);
        let b = Coordinate::new_unchecked(0.0, 180.0);
        let dist = distance_km(&a, &b);
        assert!(dist.is_finite());
        assert!((dist - 20_015.0).abs() < 5.0, "got {dist}");
    }

    #[test]
    fn coordinate_new_rejects_out_of_range() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
        assert!(matches!(
            Coordinate::new(90.5, 0.0),
            Err(FeedError::InvalidCoordinate { .. })
        ));
        assert!(Coordinate::new(0.0, -180.1).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn place_from_parts_fills_placeholders() {
        let place = PlaceLocation::from_parts(Some("Oakland".into()), None, None, OAKLAND);
        assert_eq!(place.city, "Oakland");
        assert_eq!(place.region, "Unknown Region");
        assert_eq!(place.country, "Unknown Country");
    }

    #[test]
    fn post_decodes_from_store_row() {
        let row = json!({
            "id": "6f1c5c1e-7d1a-4a59-9a55-0f3b3b0f6a10",
            "user_id": "0b5e3e2a-3f0c-4d52-8a2e-5f0d7c8e9b11",
            "media_type": "photo",
            "media_urls": ["https://cdn.example.com/a.jpg", "https://cdn.example.com/b.jpg"],
            "location": {
                "city": "San Francisco",
                "region": "California",
                "country": "USA",
                "latitude": 37.7749,
                "longitude": -122.4194
            },
            "likes_count": 10,
            "comments_count": 5,
            "created_at": "2025-09-30T12:00:00Z"
        });

        let post: Post = serde_json::from_value(row).unwrap();
        assert_eq!(post.media_kind, MediaKind::Photo);
        assert_eq!(post.city(), "San Francisco");
        assert_eq!(post.coordinate(), &SF);
        assert_eq!(post.like_count, 10);
        assert_eq!(post.comment_count, 5);
        assert_eq!(post.primary_media_ref(), "https://cdn.example.com/a.jpg");
        assert!(post.thumbnail_ref.is_none());
    }

    #[test]
    fn post_without_media_has_empty_primary_ref() {
        let row = json!({
            "id": "6f1c5c1e-7d1a-4a59-9a55-0f3b3b0f6a10",
            "user_id": "0b5e3e2a-3f0c-4d52-8a2e-5f0d7c8e9b11",
            "media_type": "video",
            "location": {
                "city": "Oakland",
                "region": "California",
                "country": "USA",
                "latitude": 37.8044,
                "longitude": -122.2712
            },
            "likes_count": 0,
            "comments_count": 0,
            "created_at": "2025-09-30T12:00:00Z"
        });

        let post: Post = serde_json::from_value(row).unwrap();
        assert_eq!(post.primary_media_ref(), "");
    }
}
