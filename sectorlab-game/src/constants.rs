//! Centralized balance and tuning constants for the Sectorlab engine.
//!
//! These values define the deterministic math for the core simulation.
//! Keeping them together ensures that gameplay can only be adjusted via
//! code changes reviewed in version control, rather than through external
//! JSON assets.

// Session defaults ---------------------------------------------------------
pub(crate) const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
pub(crate) const DEFAULT_TICK_INTERVAL_MS: u64 = 100;
pub(crate) const DEFAULT_UPDATE_INTERVAL_MS: u64 = 1_000;
pub(crate) const DEFAULT_COMPLETION_STEP: u32 = 9;
pub(crate) const DEFAULT_PRICE_HISTORY_LIMIT: usize = 30;
pub(crate) const DEFAULT_SAMPLE_SIZE: usize = 30;
pub(crate) const DEFAULT_SIGNIFICANCE: f64 = 0.05;
pub(crate) const DEFAULT_HINT_COST: f64 = 250.0;
pub(crate) const DEFAULT_SESSION_SEED: u64 = 0x5EC7_0A1B;

// Price drift (percent per update) -----------------------------------------
pub(crate) const POSITIVE_MOVE_PCT: (f64, f64) = (2.0, 8.0);
pub(crate) const NEGATIVE_MOVE_PCT: (f64, f64) = (-8.0, -2.0);
pub(crate) const NEUTRAL_MOVE_PCT: (f64, f64) = (-3.0, 3.0);
pub(crate) const MIN_SECTOR_PRICE: f64 = 0.01;

// Sample generation ---------------------------------------------------------
pub(crate) const MEAN_RETURN_BASE: (f64, f64) = (0.0, 1.0);
pub(crate) const MEAN_RETURN_SHIFT: f64 = 0.8;
pub(crate) const VOLATILITY_BASE: (f64, f64) = (2.0, 0.5);
pub(crate) const VOLATILITY_POSITIVE_SHIFT: f64 = -0.4;
pub(crate) const VOLATILITY_NEGATIVE_SHIFT: f64 = 0.6;
pub(crate) const POSITIVE_DAYS_BASE_P: f64 = 0.5;
pub(crate) const POSITIVE_DAYS_SHIFT: f64 = 0.2;
pub(crate) const SENTIMENT_NEUTRAL: [f64; 3] = [0.3, 0.4, 0.3];
pub(crate) const SENTIMENT_POSITIVE: [f64; 3] = [0.15, 0.35, 0.5];
pub(crate) const SENTIMENT_NEGATIVE: [f64; 3] = [0.5, 0.35, 0.15];
/// Weight of the sector-derived term when blending a uniform variate.
pub(crate) const SEED_BLEND_WEIGHT: f64 = 0.3;
pub(crate) const SEED_SECOND_VARIATE_SCALE: f64 = 7.31;

// Statistical tests ---------------------------------------------------------
pub(crate) const LOGISTIC_P_SLOPE: f64 = 0.717;
pub(crate) const INAPPROPRIATE_P_RANGE: (f64, f64) = (0.07, 0.15);
pub(crate) const INAPPROPRIATE_T_RANGE: (f64, f64) = (0.4, 1.6);
pub(crate) const INAPPROPRIATE_CHI_RANGE: (f64, f64) = (0.5, 2.8);
pub(crate) const CACHE_KEY_VALUE_WIDTH: usize = 8;
