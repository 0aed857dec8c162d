//! City aggregation for the map view.

use std::collections::HashMap;

use lenz_common::{CityAnnotation, Coordinate, EngineConfig, FeedError, Post};

use crate::retrieval::fetch_candidates;
use crate::traits::PostStore;

/// Group posts by exact city name. Annotations come out in first-encounter
/// order and take the first post's coordinate as their pin.
///
/// "NYC" and "New York" are different cities here; no normalization.
pub fn aggregate_by_city(posts: &[Post]) -> Vec<CityAnnotation> {
    let mut annotations: Vec<CityAnnotation> = Vec::new();
    let mut by_city: HashMap<&str, usize> = HashMap::new();

    for post in posts {
        match by_city.get(post.city()) {
            Some(&idx) => annotations[idx].post_count += 1,
            None => {
                by_city.insert(post.city(), annotations.len());
                annotations.push(CityAnnotation {
                    city: post.city().to_string(),
                    representative_coordinate: *post.coordinate(),
                    post_count: 1,
                });
            }
        }
    }

    annotations
}

/// Fetch everything within the map radius and aggregate it.
///
/// The map radius is effectively unbounded, so this scans the whole store.
pub async fn load_city_annotations(
    store: &dyn PostStore,
    center: &Coordinate,
    config: &EngineConfig,
) -> Result<Vec<CityAnnotation>, FeedError> {
    let posts = fetch_candidates(store, center, config.map_radius_km).await?;
    let annotations = aggregate_by_city(&posts);
    tracing::debug!(
        posts = posts.len(),
        cities = annotations.len(),
        "City annotations built"
    );
    Ok(annotations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryPostStore;
    use crate::testutil::post_at;

    #[test]
    fn groups_by_exact_city_name() {
        let posts = vec![
            post_at("New York", 40.7128, -74.0060),
            post_at("NYC", 40.7130, -74.0062),
            post_at("New York", 40.7500, -73.9900),
            post_at("new york", 40.7128, -74.0060),
        ];

        let annotations = aggregate_by_city(&posts);

        let cities: Vec<(&str, usize)> = annotations
            .iter()
            .map(|a| (a.city.as_str(), a.post_count))
            .collect();
        assert_eq!(cities, vec![("New York", 2), ("NYC", 1), ("new york", 1)]);
    }

    #[test]
    fn representative_is_first_post_seen() {
        let first = post_at("Oakland", 37.8044, -122.2712);
        let second = post_at("Oakland", 37.8100, -122.2500);

        let annotations = aggregate_by_city(&[first.clone(), second]);

        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].representative_coordinate, *first.coordinate());
    }

    #[test]
    fn counts_sum_to_input_size() {
        let cities = ["A", "B", "A", "C", "B", "A", "D"];
        let posts: Vec<Post> = cities
            .iter()
            .enumerate()
            .map(|(i, c)| post_at(c, i as f64, i as f64))
            .collect();

        let annotations = aggregate_by_city(&posts);

        let total: usize = annotations.iter().map(|a| a.post_count).sum();
        assert_eq!(total, posts.len());
        assert_eq!(annotations.len(), 4);
    }

    #[test]
    fn empty_input_yields_no_annotations() {
        assert!(aggregate_by_city(&[]).is_empty());
    }

    #[tokio::test]
    async fn map_load_covers_the_whole_globe() {
        let store = MemoryPostStore::new(vec![
            post_at("Sydney", -33.8688, 151.2093),
            post_at("San Francisco", 37.7749, -122.4194),
            post_at("Sydney", -33.8700, 151.2100),
        ]);
        let center = Coordinate::new_unchecked(0.0, 0.0);

        let annotations = load_city_annotations(&store, &center, &EngineConfig::default())
            .await
            .unwrap();

        let total: usize = annotations.iter().map(|a| a.post_count).sum();
        assert_eq!(total, 3);
        assert_eq!(annotations[0].city, "Sydney");
        assert_eq!(annotations[0].post_count, 2);
    }
}
