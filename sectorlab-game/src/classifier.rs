//! Scenario-scoped sector performance classification.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::data::Catalog;

/// How a sector behaves in a given scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceGroup {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl PerformanceGroup {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

impl fmt::Display for PerformanceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps (sector, scenario index) to a performance group, cached per scenario.
#[derive(Debug, Clone, Default)]
pub struct PerformanceClassifier {
    cache: HashMap<usize, HashMap<String, PerformanceGroup>>,
}

impl PerformanceClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a sector; unknown sectors and scenarios resolve to neutral.
    pub fn classify(
        &mut self,
        catalog: &Catalog,
        sector: &str,
        scenario_index: usize,
    ) -> PerformanceGroup {
        self.cache
            .entry(scenario_index)
            .or_insert_with(|| build_groups(catalog, scenario_index))
            .get(sector)
            .copied()
            .unwrap_or_default()
    }

    /// Whether a scenario's groups are currently cached.
    #[must_use]
    pub fn is_cached(&self, scenario_index: usize) -> bool {
        self.cache.contains_key(&scenario_index)
    }

    /// Drop the cached groups of one scenario.
    pub fn invalidate(&mut self, scenario_index: usize) {
        self.cache.remove(&scenario_index);
    }

    /// Drop every cached scenario.
    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }
}

fn build_groups(catalog: &Catalog, scenario_index: usize) -> HashMap<String, PerformanceGroup> {
    let Some(scenario) = catalog.scenario(scenario_index) else {
        return HashMap::new();
    };
    let mut groups = HashMap::new();
    // Explicit lists win in positive, negative, neutral order.
    for name in catalog.sector_names() {
        let group = if scenario.positive.iter().any(|s| s == name) {
            PerformanceGroup::Positive
        } else if scenario.negative.iter().any(|s| s == name) {
            PerformanceGroup::Negative
        } else {
            PerformanceGroup::Neutral
        };
        groups.insert(name.to_string(), group);
    }
    groups
}
