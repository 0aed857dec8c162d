//! Engagement mutator concurrency tests.
//! The store is slowed down so mutations overlap the way double-taps do.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use lenz_common::FeedError;
use lenz_feed::testutil::post_with;
use lenz_feed::{EngagementMutator, LikeIntent, MemoryPostStore};
use uuid::Uuid;

fn slow_store_with_post(likes: u32) -> (Arc<MemoryPostStore>, lenz_common::Post) {
    let post = post_with("San Francisco", 37.7749, -122.4194, likes, 0, 1);
    let store = Arc::new(
        MemoryPostStore::new(vec![post.clone()]).with_latency(Duration::from_millis(50)),
    );
    (store, post)
}

#[tokio::test]
async fn double_tap_toggle_applies_exactly_once() {
    let (store, post) = slow_store_with_post(10);
    let mutator = EngagementMutator::new(store.clone());
    mutator.track(&post);
    let user = Uuid::new_v4();

    let (first, second) = tokio::join!(
        mutator.toggle_like(post.id, user),
        mutator.toggle_like(post.id, user),
    );

    let outcome = first.unwrap();
    assert_eq!(outcome.intent, LikeIntent::Like);
    assert_eq!(outcome.like_count, 11);
    assert_eq!(
        second.unwrap_err(),
        FeedError::MutationInFlight {
            post_id: post.id,
            user_id: user
        }
    );

    assert_eq!(mutator.engagement(post.id).unwrap().like_count, 11);
    assert_eq!(store.like_edges_for(post.id), 1);
    assert_eq!(store.post(post.id).unwrap().like_count, 11);
}

#[tokio::test]
async fn optimistic_count_is_visible_before_store_confirms() {
    let (store, post) = slow_store_with_post(3);
    let mutator = Arc::new(EngagementMutator::new(store.clone()));
    mutator.track(&post);
    let user = Uuid::new_v4();

    let handle = {
        let mutator = mutator.clone();
        let post_id = post.id;
        tokio::spawn(async move { mutator.like(post_id, user).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(mutator.is_in_flight(post.id, user));
    assert_eq!(mutator.engagement(post.id).unwrap().like_count, 4);
    assert!(!store.has_like_edge(post.id, user));

    handle.await.unwrap().unwrap();
    assert!(!mutator.is_in_flight(post.id, user));
    assert!(store.has_like_edge(post.id, user));
}

#[tokio::test]
async fn different_users_like_concurrently() {
    let (store, post) = slow_store_with_post(0);
    let mutator = EngagementMutator::new(store.clone());
    mutator.track(&post);
    let users: Vec<Uuid> = (0..8).map(|_| Uuid::new_v4()).collect();

    let results = join_all(users.iter().map(|u| mutator.like(post.id, *u))).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(mutator.engagement(post.id).unwrap().like_count, 8);
    assert_eq!(store.like_edges_for(post.id), 8);
}

#[tokio::test]
async fn failed_like_only_reverts_its_own_delta() {
    let (store, post) = slow_store_with_post(5);
    let mutator = EngagementMutator::new(store.clone());
    mutator.track(&post);
    let winner = Uuid::new_v4();
    let loser = Uuid::new_v4();
    mutator.like(post.id, winner).await.unwrap();

    store.set_fail_writes(true);
    let err = mutator.like(post.id, loser).await.unwrap_err();

    assert!(matches!(err, FeedError::Store(_)));
    let engagement = mutator.engagement(post.id).unwrap();
    assert_eq!(engagement.like_count, 6);
    assert!(engagement.likers.contains(&winner));
    assert!(!engagement.likers.contains(&loser));
    assert_eq!(store.like_edges_for(post.id), 1);
}

#[tokio::test]
async fn dropped_mutation_rolls_back() {
    let (store, post) = slow_store_with_post(2);
    let mutator = EngagementMutator::new(store.clone());
    mutator.track(&post);
    let user = Uuid::new_v4();

    let timed_out =
        tokio::time::timeout(Duration::from_millis(10), mutator.like(post.id, user)).await;

    assert!(timed_out.is_err());
    assert_eq!(mutator.engagement(post.id).unwrap().like_count, 2);
    assert!(!mutator.is_liked(post.id, user));
    assert!(!mutator.is_in_flight(post.id, user));
}

#[tokio::test]
async fn like_unlike_round_trip_leaves_no_edge() {
    let (store, post) = slow_store_with_post(42);
    let mutator = EngagementMutator::new(store.clone());
    mutator.track(&post);
    let user = Uuid::new_v4();

    mutator.toggle_like(post.id, user).await.unwrap();
    let outcome = mutator.toggle_like(post.id, user).await.unwrap();

    assert_eq!(outcome.intent, LikeIntent::Unlike);
    assert_eq!(outcome.like_count, 42);
    assert_eq!(store.like_edges_for(post.id), 0);
    assert_eq!(store.post(post.id).unwrap().like_count, 42);
}

#[tokio::test]
async fn refresh_during_failed_like_keeps_store_count() {
    let (store, post) = slow_store_with_post(10);
    store.set_fail_writes(true);
    let mutator = Arc::new(EngagementMutator::new(store.clone()));
    mutator.track(&post);
    let user = Uuid::new_v4();

    let handle = {
        let mutator = mutator.clone();
        let post_id = post.id;
        tokio::spawn(async move { mutator.like(post_id, user).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    // A feed reload re-seeds the view while the like is pending.
    mutator.track(&store.post(post.id).unwrap());
    assert_eq!(mutator.engagement(post.id).unwrap().like_count, 11);

    assert!(matches!(handle.await.unwrap(), Err(FeedError::Store(_))));
    assert_eq!(mutator.engagement(post.id).unwrap().like_count, 10);
    assert_eq!(store.like_edges_for(post.id), 0);
}

#[tokio::test]
async fn refresh_during_successful_like_keeps_the_like() {
    let (store, post) = slow_store_with_post(10);
    let mutator = Arc::new(EngagementMutator::new(store.clone()));
    mutator.track(&post);
    let user = Uuid::new_v4();

    let handle = {
        let mutator = mutator.clone();
        let post_id = post.id;
        tokio::spawn(async move { mutator.like(post_id, user).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    mutator.track(&store.post(post.id).unwrap());

    assert_eq!(handle.await.unwrap().unwrap().like_count, 11);

    // Once settled, a reload takes the store's count as is.
    mutator.track(&store.post(post.id).unwrap());
    assert_eq!(mutator.engagement(post.id).unwrap().like_count, 11);
}
