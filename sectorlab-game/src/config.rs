//! Session configuration.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_COMPLETION_STEP, DEFAULT_HINT_COST, DEFAULT_INITIAL_CAPITAL,
    DEFAULT_PRICE_HISTORY_LIMIT, DEFAULT_SAMPLE_SIZE, DEFAULT_SESSION_SEED,
    DEFAULT_SIGNIFICANCE, DEFAULT_TICK_INTERVAL_MS, DEFAULT_UPDATE_INTERVAL_MS,
};

/// Errors raised when session configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    #[error("{field} must be positive (got {value:.2})")]
    NonPositive { field: &'static str, value: f64 },
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: u64,
        value: u64,
    },
    #[error("update interval {update_ms}ms is shorter than the tick interval {tick_ms}ms")]
    UpdateFasterThanTick { update_ms: u64, tick_ms: u64 },
    #[error("significance must lie strictly between 0 and 1 (got {0:.3})")]
    Significance(f64),
}

/// Tunable parameters of one game session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default = "SimConfig::default_initial_capital")]
    pub initial_capital: f64,
    /// How often the host timer fires.
    #[serde(default = "SimConfig::default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Minimum wall-clock gap between two time advances.
    #[serde(default = "SimConfig::default_update_interval_ms")]
    pub update_interval_ms: u64,
    /// Steps-within-scenario value that completes a scenario.
    #[serde(default = "SimConfig::default_completion_step")]
    pub completion_step: u32,
    #[serde(default = "SimConfig::default_price_history_limit")]
    pub price_history_limit: usize,
    #[serde(default = "SimConfig::default_sample_size")]
    pub sample_size: usize,
    #[serde(default = "SimConfig::default_significance")]
    pub significance: f64,
    #[serde(default = "SimConfig::default_hint_cost")]
    pub hint_cost: f64,
    #[serde(default = "SimConfig::default_seed")]
    pub seed: u64,
}

impl SimConfig {
    const fn default_initial_capital() -> f64 {
        DEFAULT_INITIAL_CAPITAL
    }

    const fn default_tick_interval_ms() -> u64 {
        DEFAULT_TICK_INTERVAL_MS
    }

    const fn default_update_interval_ms() -> u64 {
        DEFAULT_UPDATE_INTERVAL_MS
    }

    const fn default_completion_step() -> u32 {
        DEFAULT_COMPLETION_STEP
    }

    const fn default_price_history_limit() -> usize {
        DEFAULT_PRICE_HISTORY_LIMIT
    }

    const fn default_sample_size() -> usize {
        DEFAULT_SAMPLE_SIZE
    }

    const fn default_significance() -> f64 {
        DEFAULT_SIGNIFICANCE
    }

    const fn default_hint_cost() -> f64 {
        DEFAULT_HINT_COST
    }

    const fn default_seed() -> u64 {
        DEFAULT_SESSION_SEED
    }

    /// Parse and validate a configuration document; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value is out of range.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check every configuration invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("initial_capital", self.initial_capital),
            ("hint_cost", self.hint_cost),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        let counts = [
            ("tick_interval_ms", 1, self.tick_interval_ms),
            ("update_interval_ms", 1, self.update_interval_ms),
            ("completion_step", 1, u64::from(self.completion_step)),
            (
                "price_history_limit",
                1,
                u64::try_from(self.price_history_limit).unwrap_or(u64::MAX),
            ),
            (
                "sample_size",
                2,
                u64::try_from(self.sample_size).unwrap_or(u64::MAX),
            ),
        ];
        for (field, min, value) in counts {
            if value < min {
                return Err(ConfigError::MinViolation { field, min, value });
            }
        }
        if self.update_interval_ms < self.tick_interval_ms {
            return Err(ConfigError::UpdateFasterThanTick {
                update_ms: self.update_interval_ms,
                tick_ms: self.tick_interval_ms,
            });
        }
        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(ConfigError::Significance(self.significance));
        }
        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            initial_capital: Self::default_initial_capital(),
            tick_interval_ms: Self::default_tick_interval_ms(),
            update_interval_ms: Self::default_update_interval_ms(),
            completion_step: Self::default_completion_step(),
            price_history_limit: Self::default_price_history_limit(),
            sample_size: Self::default_sample_size(),
            significance: Self::default_significance(),
            hint_cost: Self::default_hint_cost(),
            seed: Self::default_seed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = SimConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.tick_interval_ms, 100);
        assert_eq!(cfg.update_interval_ms, 1_000);
        assert_eq!(cfg.completion_step, 9);
    }

    #[test]
    fn from_json_fills_missing_fields() {
        let cfg = SimConfig::from_json(r#"{"initial_capital": 500.0, "seed": 9}"#).unwrap();
        assert!((cfg.initial_capital - 500.0).abs() < f64::EPSILON);
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.sample_size, 30);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert_eq!(
            SimConfig::from_json(r#"{"initial_capital": 0.0}"#),
            Err(ConfigError::NonPositive {
                field: "initial_capital",
                value: 0.0
            })
        );
        assert_eq!(
            SimConfig::from_json(r#"{"sample_size": 1}"#),
            Err(ConfigError::MinViolation {
                field: "sample_size",
                min: 2,
                value: 1
            })
        );
        assert_eq!(
            SimConfig::from_json(r#"{"update_interval_ms": 50}"#),
            Err(ConfigError::UpdateFasterThanTick {
                update_ms: 50,
                tick_ms: 100
            })
        );
        assert_eq!(
            SimConfig::from_json(r#"{"significance": 1.5}"#),
            Err(ConfigError::Significance(1.5))
        );
        assert!(matches!(
            SimConfig::from_json("{"),
            Err(ConfigError::Parse(_))
        ));
    }
}
