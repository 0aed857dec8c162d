//! Composite relevance scoring.
//!
//! `score = w_d * distance + w_e * engagement + w_r * recency`, with
//! step-function distance and recency bands. Scores are never persisted:
//! recency and engagement drift, so every load rescores.

use chrono::{DateTime, Utc};
use lenz_common::{distance_km, Coordinate, Post, ScoringWeights};
use serde::Serialize;

/// Distance band score. Boundaries are inclusive.
pub fn distance_score(km: f64) -> f64 {
    if km <= 10.0 {
        100.0
    } else if km <= 50.0 {
        80.0
    } else if km <= 100.0 {
        50.0
    } else {
        20.0
    }
}

/// Unbounded engagement score; popular posts can dominate the composite.
pub fn engagement_score(like_count: u32, comment_count: u32) -> f64 {
    f64::from(like_count) * 2.0 + f64::from(comment_count) * 3.0
}

/// Recency band score for a post `hours` old.
pub fn recency_score(hours: f64) -> f64 {
    if hours <= 24.0 {
        100.0
    } else if hours <= 72.0 {
        70.0
    } else if hours <= 168.0 {
        40.0
    } else {
        10.0
    }
}

/// Hours between `created_at` and `now`. Future timestamps count as zero.
pub fn hours_since(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (now - created_at).num_milliseconds().max(0);
    millis as f64 / 3_600_000.0
}

/// Sub-scores and weighted total for one post.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub distance: f64,
    pub engagement: f64,
    pub recency: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RelevanceScorer {
    weights: ScoringWeights,
}

impl RelevanceScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn breakdown(&self, post: &Post, user_location: &Coordinate, now: DateTime<Utc>) -> ScoreBreakdown {
        let distance = distance_score(distance_km(user_location, post.coordinate()));
        let engagement = engagement_score(post.like_count, post.comment_count);
        let recency = recency_score(hours_since(post.created_at, now));
        let total = self.weights.distance * distance
            + self.weights.engagement * engagement
            + self.weights.recency * recency;

        ScoreBreakdown {
            distance,
            engagement,
            recency,
            total,
        }
    }

    pub fn score(&self, post: &Post, user_location: &Coordinate, now: DateTime<Utc>) -> f64 {
        self.breakdown(post, user_location, now).total
    }
}

/// Score with the default weights, as of now.
pub fn score(post: &Post, user_location: &Coordinate) -> f64 {
    RelevanceScorer::default().score(post, user_location, Utc::now())
}
