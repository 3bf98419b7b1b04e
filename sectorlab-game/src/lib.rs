//! Sectorlab Game Engine
//!
//! Platform-agnostic core of the Sectorlab sector trading simulation, where
//! players test market hypotheses against synthetic sector data.
//! This crate provides all game mechanics without UI or platform-specific dependencies.

pub mod classifier;
pub mod config;
pub(crate) mod constants;
pub mod context;
pub mod data;
pub mod generator;
pub mod metrics;
pub mod numbers;
pub mod rng;
pub mod seed;
pub mod session;
pub mod state;
pub mod stats;
pub mod tracker;
pub mod validator;

// Re-export commonly used types
pub use classifier::{PerformanceClassifier, PerformanceGroup};
pub use config::{ConfigError, SimConfig};
pub use context::SimulationContext;
pub use data::{
    BundledLoader, Catalog, CatalogError, DataLoader, Hypothesis, MarketSituation, SectorProfile,
    TestCriteria,
};
pub use generator::{Distribution, SampleGenerator};
pub use metrics::{MetricId, MetricType, TestKind};
pub use rng::{RngStreams, derive_stream_seed};
pub use session::{
    GameSession, ScenarioReport, Selection, SelectionVerdict, SessionError, TestOutcome,
    TickOutcome,
};
pub use state::{GameAction, GameState, MarketEnv, PortfolioItem, SectorQuote, reduce};
pub use stats::{TestEngine, TestResult};
pub use tracker::{
    ActionDetails, ActionSummary, ActionTracker, ActionType, PlayerAction, ScenarioId, SectorSet,
};
pub use validator::{
    MetricsValidation, TestValidation, validate_metrics, validate_metrics_match_hypothesis,
    validate_test_for_metrics,
};
