//! Configuration for bootstrap runs.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Seed used when none is configured, so unseeded runs are still repeatable.
pub const DEFAULT_SEED: u64 = 42;

/// Configuration options for [`BootstrapEngine`](crate::BootstrapEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Bootstrap replications R (default: 2,000).
    pub replications: usize,

    /// Confidence level for intervals (default: 0.95).
    pub confidence_level: f64,

    /// Base seed for the replication seed stream (default: [`DEFAULT_SEED`]).
    pub seed: Option<u64>,

    /// Replications that must succeed for the run to stand.
    ///
    /// `None` means all of them: the first failing replication aborts the
    /// run. A smaller value lets failed replications be excluded, with each
    /// exclusion recorded in the result.
    pub min_valid_replications: Option<usize>,

    /// Fresh resamples to try for a replication whose statistic fails
    /// (default: 0, no redraws).
    pub redraw_attempts: usize,

    /// Hard floor on R for BCa intervals (default: 2).
    pub min_replications: usize,

    /// R below which a warning is logged (default: 1,000).
    pub warn_below: usize,

    /// Optional wall-clock budget for a run.
    #[serde(with = "duration_ms")]
    pub max_duration: Option<Duration>,

    /// Worker threads; `None` uses the shared pool.
    pub threads: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            replications: 2_000,
            confidence_level: 0.95,
            seed: None,
            min_valid_replications: None,
            redraw_attempts: 0,
            min_replications: 2,
            warn_below: 1_000,
            max_duration: None,
            threads: None,
        }
    }
}

impl Config {
    /// The base seed in effect.
    pub fn seed_or_default(&self) -> u64 {
        self.seed.unwrap_or(DEFAULT_SEED)
    }

    /// The minimum number of valid replications in effect.
    pub fn required_valid(&self) -> usize {
        self.min_valid_replications.unwrap_or(self.replications)
    }

    /// Merge overrides from environment variables.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `RB_REPLICATIONS` | `replications` |
    /// | `RB_CONFIDENCE` | `confidence_level` |
    /// | `RB_SEED` | `seed` |
    /// | `RB_MIN_VALID` | `min_valid_replications` |
    /// | `RB_REDRAWS` | `redraw_attempts` |
    /// | `RB_MAX_DURATION_MS` | `max_duration` |
    /// | `RB_THREADS` | `threads` |
    ///
    /// Unparseable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(r) = parse_env("RB_REPLICATIONS") {
            self.replications = r;
        }
        if let Some(c) = parse_env("RB_CONFIDENCE") {
            self.confidence_level = c;
        }
        if let Some(seed) = parse_env("RB_SEED") {
            self.seed = Some(seed);
        }
        if let Some(min) = parse_env("RB_MIN_VALID") {
            self.min_valid_replications = Some(min);
        }
        if let Some(redraws) = parse_env("RB_REDRAWS") {
            self.redraw_attempts = redraws;
        }
        if let Some(ms) = parse_env::<u64>("RB_MAX_DURATION_MS") {
            self.max_duration = Some(Duration::from_millis(ms));
        }
        if let Some(threads) = parse_env("RB_THREADS") {
            self.threads = Some(threads);
        }
        self
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok()?.trim().parse().ok()
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        value.map(|d| d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.replications, 2_000);
        assert!((config.confidence_level - 0.95).abs() < 1e-12);
        assert_eq!(config.required_valid(), 2_000);
        assert_eq!(config.seed_or_default(), DEFAULT_SEED);
    }

    #[test]
    fn test_env_overrides() {
        // Only this test touches RB_* variables.
        env::set_var("RB_REPLICATIONS", "500");
        env::set_var("RB_SEED", "7");
        env::set_var("RB_MAX_DURATION_MS", "250");
        env::set_var("RB_CONFIDENCE", "not a number");
        let config = Config::default().with_env_overrides();
        env::remove_var("RB_REPLICATIONS");
        env::remove_var("RB_SEED");
        env::remove_var("RB_MAX_DURATION_MS");
        env::remove_var("RB_CONFIDENCE");

        assert_eq!(config.replications, 500);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.max_duration, Some(Duration::from_millis(250)));
        assert!((config.confidence_level - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_serializes_duration_as_millis() {
        let config = Config {
            max_duration: Some(Duration::from_millis(1500)),
            ..Config::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"max_duration\":1500"), "{}", json);
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
