//! Owned home for every cache and log the engine keeps between calls.
use rand_chacha::ChaCha20Rng;

use crate::classifier::PerformanceClassifier;
use crate::generator::SampleGenerator;
use crate::rng::RngStreams;
use crate::stats::TestEngine;
use crate::tracker::{ActionTracker, ScenarioId};

/// Sample generator, classifier, test engine, action log and market stream
/// of one session. Dropping the context drops all of its caches.
#[derive(Debug, Clone)]
pub struct SimulationContext {
    pub generator: SampleGenerator,
    pub classifier: PerformanceClassifier,
    pub tests: TestEngine,
    pub tracker: ActionTracker,
    pub market_rng: ChaCha20Rng,
}

impl SimulationContext {
    /// Build a context whose random streams all derive from `seed`.
    #[must_use]
    pub fn new(seed: u64, initial_scenario: ScenarioId) -> Self {
        let streams = RngStreams::from_user_seed(seed);
        Self {
            generator: SampleGenerator::new(streams.sampling),
            classifier: PerformanceClassifier::new(),
            tests: TestEngine::new(streams.inference),
            tracker: ActionTracker::new(initial_scenario),
            market_rng: streams.market,
        }
    }

    /// Clear the sample, test and classification caches.
    pub fn reset_caches(&mut self) {
        self.generator.clear_cache();
        self.tests.clear_cache();
        self.classifier.invalidate_all();
    }

    /// Empty the action log, keeping the current scenario id.
    pub fn clear_actions(&mut self) {
        self.tracker.clear_actions();
    }
}
