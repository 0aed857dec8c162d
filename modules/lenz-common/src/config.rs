use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default candidate radius for feed loads.
pub const DEFAULT_FEED_RADIUS_KM: f64 = 50.0;

/// Radius used for map aggregation. Larger than half the Earth's
/// circumference, so every post qualifies whatever the center.
pub const UNBOUNDED_RADIUS_KM: f64 = 20_100.0;

/// Weights of the composite relevance score.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringWeights {
    pub distance: f64,
    pub engagement: f64,
    pub recency: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            distance: 0.4,
            engagement: 0.4,
            recency: 0.2,
        }
    }
}

/// Engine configuration. Every field has a default, so an empty TOML file
/// (or no environment at all) yields the stock feed behaviour.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub feed_radius_km: f64,
    pub map_radius_km: f64,
    pub weights: ScoringWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            feed_radius_km: DEFAULT_FEED_RADIUS_KM,
            map_radius_km: UNBOUNDED_RADIUS_KM,
            weights: ScoringWeights::default(),
        }
    }
}

impl EngineConfig {
    /// Load overrides from the environment (and `.env`, if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        config.log();
        Ok(config)
    }

    /// Build a config from an arbitrary key lookup. Unset keys keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup("LENZ_FEED_RADIUS_KM") {
            config.feed_radius_km = parse_km("LENZ_FEED_RADIUS_KM", &raw)?;
        }
        if let Some(raw) = lookup("LENZ_MAP_RADIUS_KM") {
            config.map_radius_km = parse_km("LENZ_MAP_RADIUS_KM", &raw)?;
        }
        Ok(config)
    }

    fn log(&self) {
        tracing::info!(
            feed_radius_km = self.feed_radius_km,
            map_radius_km = self.map_radius_km,
            distance_weight = self.weights.distance,
            engagement_weight = self.weights.engagement,
            recency_weight = self.weights.recency,
            "Engine config loaded"
        );
    }
}

fn parse_km(key: &str, raw: &str) -> Result<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a number, got {raw:?}"))?;
    anyhow::ensure!(
        value.is_finite() && value >= 0.0,
        "{key} must be a non-negative distance, got {value}"
    );
    Ok(value)
}

/// Load and parse a TOML config file.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: EngineConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    config.log();
    Ok(config)
}
