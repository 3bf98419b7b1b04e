//! Append-only log of player decisions, partitioned by scenario.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::metrics::{MetricType, TestKind};

/// Sector choices; comparisons almost always involve two sectors.
pub type SectorSet = SmallVec<[String; 2]>;

/// Identifier of the scenario an action belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ScenarioId(pub u32);

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of recorded decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    HypothesisSelection,
    SectorSelection,
    MetricSelection,
    TestExecution,
    StockPurchase,
}

/// Type-specific payload of a recorded decision.
///
/// Correctness is judged before insertion and never rewritten afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionDetails {
    HypothesisSelection {
        hypothesis_index: usize,
        statement: String,
        is_correct: bool,
    },
    SectorSelection {
        sectors: SectorSet,
        is_correct: bool,
    },
    MetricSelection {
        metrics: Vec<String>,
        data_type: MetricType,
        is_correct: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_message: Option<String>,
    },
    TestExecution {
        test_kind: TestKind,
        p_value: f64,
        significant: bool,
        is_correct: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_message: Option<String>,
    },
    StockPurchase {
        sector: String,
        quantity: u32,
        price: f64,
    },
}

impl ActionDetails {
    #[must_use]
    pub const fn action_type(&self) -> ActionType {
        match self {
            Self::HypothesisSelection { .. } => ActionType::HypothesisSelection,
            Self::SectorSelection { .. } => ActionType::SectorSelection,
            Self::MetricSelection { .. } => ActionType::MetricSelection,
            Self::TestExecution { .. } => ActionType::TestExecution,
            Self::StockPurchase { .. } => ActionType::StockPurchase,
        }
    }

    /// Correctness flag; purchases carry none.
    #[must_use]
    pub const fn is_correct(&self) -> Option<bool> {
        match self {
            Self::HypothesisSelection { is_correct, .. }
            | Self::SectorSelection { is_correct, .. }
            | Self::MetricSelection { is_correct, .. }
            | Self::TestExecution { is_correct, .. } => Some(*is_correct),
            Self::StockPurchase { .. } => None,
        }
    }

    /// Whether `self` repeats `existing` under the per-type dedup rules.
    fn duplicates(&self, existing: &Self) -> bool {
        match (self, existing) {
            (Self::HypothesisSelection { .. }, Self::HypothesisSelection { .. }) => true,
            (Self::SectorSelection { sectors: a, .. }, Self::SectorSelection { sectors: b, .. }) => {
                same_set(a, b)
            }
            (
                Self::MetricSelection {
                    metrics: a,
                    data_type: type_a,
                    ..
                },
                Self::MetricSelection {
                    metrics: b,
                    data_type: type_b,
                    ..
                },
            ) => type_a == type_b && same_set(a, b),
            (
                Self::TestExecution { test_kind: a, .. },
                Self::TestExecution { test_kind: b, .. },
            ) => a == b,
            _ => false,
        }
    }
}

fn same_set(a: &[String], b: &[String]) -> bool {
    let a: BTreeSet<&str> = a.iter().map(String::as_str).collect();
    let b: BTreeSet<&str> = b.iter().map(String::as_str).collect();
    a == b
}

/// One immutable log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerAction {
    pub timestamp_ms: u64,
    pub scenario_id: ScenarioId,
    pub details: ActionDetails,
}

impl PlayerAction {
    #[must_use]
    pub const fn action_type(&self) -> ActionType {
        self.details.action_type()
    }
}

/// Correct vs. not-correct counts for the current scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionSummary {
    pub correct: usize,
    pub incorrect: usize,
}

/// Append-only decision log with type-specific deduplication.
#[derive(Debug, Clone, Default)]
pub struct ActionTracker {
    current: ScenarioId,
    actions: Vec<PlayerAction>,
}

impl ActionTracker {
    #[must_use]
    pub fn new(initial: ScenarioId) -> Self {
        Self {
            current: initial,
            actions: Vec::new(),
        }
    }

    pub fn set_current_scenario(&mut self, id: ScenarioId) {
        self.current = id;
    }

    #[must_use]
    pub const fn current_scenario(&self) -> ScenarioId {
        self.current
    }

    /// Record an action stamped with the wall-clock time.
    ///
    /// Returns false when the action was dropped as a duplicate.
    pub fn add_action(&mut self, details: ActionDetails) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        self.add_action_at(details, now)
    }

    /// Record an action with an explicit timestamp.
    pub fn add_action_at(&mut self, details: ActionDetails, timestamp_ms: u64) -> bool {
        let current = self.current;
        let duplicate = self
            .actions
            .iter()
            .filter(|a| a.scenario_id == current)
            .any(|a| details.duplicates(&a.details));
        if duplicate {
            log::debug!(
                "dropping duplicate {:?} in scenario {current}",
                details.action_type()
            );
            return false;
        }
        self.actions.push(PlayerAction {
            timestamp_ms,
            scenario_id: current,
            details,
        });
        true
    }

    #[must_use]
    pub fn actions(&self) -> &[PlayerAction] {
        &self.actions
    }

    pub fn current_scenario_actions(&self) -> impl Iterator<Item = &PlayerAction> {
        let current = self.current;
        self.actions.iter().filter(move |a| a.scenario_id == current)
    }

    /// Latest action of a type in the current scenario.
    #[must_use]
    pub fn latest_of(&self, action_type: ActionType) -> Option<&PlayerAction> {
        self.current_scenario_actions()
            .filter(|a| a.action_type() == action_type)
            .last()
    }

    pub fn clear_scenario_actions(&mut self, id: ScenarioId) {
        self.actions.retain(|a| a.scenario_id != id);
    }

    pub fn clear_actions(&mut self) {
        self.actions.clear();
    }

    /// Count `is_correct == true` against everything else in the current scenario.
    #[must_use]
    pub fn action_summary(&self) -> ActionSummary {
        self.current_scenario_actions()
            .fold(ActionSummary::default(), |mut summary, action| {
                if action.details.is_correct() == Some(true) {
                    summary.correct += 1;
                } else {
                    summary.incorrect += 1;
                }
                summary
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn sectors(names: &[&str]) -> ActionDetails {
        ActionDetails::SectorSelection {
            sectors: names.iter().map(|s| (*s).to_string()).collect(),
            is_correct: true,
        }
    }

    fn metric(names: &[&str], data_type: MetricType) -> ActionDetails {
        ActionDetails::MetricSelection {
            metrics: names.iter().map(|s| (*s).to_string()).collect(),
            data_type,
            is_correct: false,
            error_message: None,
        }
    }

    #[test]
    fn sector_selection_dedups_within_scenario_only() {
        let mut tracker = ActionTracker::new(ScenarioId(1));
        assert!(tracker.add_action_at(sectors(&["A", "B"]), 1));
        assert!(!tracker.add_action_at(sectors(&["B", "A"]), 2));
        assert_eq!(tracker.actions().len(), 1);

        tracker.set_current_scenario(ScenarioId(2));
        assert!(tracker.add_action_at(sectors(&["A", "B"]), 3));
        assert_eq!(tracker.actions().len(), 2);
        assert!(tracker.add_action_at(sectors(&["A", "C"]), 4));
    }

    #[test]
    fn hypothesis_selection_is_once_per_scenario() {
        let mut tracker = ActionTracker::new(ScenarioId(1));
        let pick = |index| ActionDetails::HypothesisSelection {
            hypothesis_index: index,
            statement: format!("h{index}"),
            is_correct: index == 0,
        };
        assert!(tracker.add_action_at(pick(0), 1));
        assert!(!tracker.add_action_at(pick(1), 2));
        assert_eq!(tracker.current_scenario_actions().count(), 1);
    }

    #[test]
    fn metric_and_test_dedup_rules() {
        let mut tracker = ActionTracker::new(ScenarioId(3));
        assert!(tracker.add_action_at(metric(&["Mean Return"], MetricType::Numerical), 1));
        assert!(!tracker.add_action_at(metric(&["Mean Return"], MetricType::Numerical), 2));
        assert!(tracker.add_action_at(metric(&["Mean Return"], MetricType::Mixed), 3));

        let test = |kind| ActionDetails::TestExecution {
            test_kind: kind,
            p_value: 0.2,
            significant: false,
            is_correct: false,
            error_message: None,
        };
        assert!(tracker.add_action_at(test(TestKind::TTest), 4));
        assert!(!tracker.add_action_at(test(TestKind::TTest), 5));
        assert!(tracker.add_action_at(test(TestKind::ChiSquare), 6));
    }

    #[test]
    fn purchases_are_never_deduplicated() {
        let mut tracker = ActionTracker::new(ScenarioId(1));
        for step in 0..3 {
            let purchase = ActionDetails::StockPurchase {
                sector: "Energy".to_string(),
                quantity: 5,
                price: 74.3,
            };
            assert!(tracker.add_action_at(purchase, step));
        }
        assert_eq!(tracker.actions().len(), 3);
        assert_eq!(
            tracker.latest_of(ActionType::StockPurchase).map(|a| a.timestamp_ms),
            Some(2)
        );
    }

    #[test]
    fn clearing_and_summary_respect_scenarios() {
        let mut tracker = ActionTracker::new(ScenarioId(1));
        tracker.add_action_at(sectors(&["A", "B"]), 1);
        tracker.add_action_at(metric(&["Volatility"], MetricType::Numerical), 2);
        tracker.set_current_scenario(ScenarioId(2));
        tracker.add_action_at(
            ActionDetails::SectorSelection {
                sectors: smallvec!["X".to_string()],
                is_correct: false,
            },
            3,
        );

        assert_eq!(
            tracker.action_summary(),
            ActionSummary {
                correct: 0,
                incorrect: 1
            }
        );
        tracker.set_current_scenario(ScenarioId(1));
        assert_eq!(
            tracker.action_summary(),
            ActionSummary {
                correct: 1,
                incorrect: 1
            }
        );

        tracker.clear_scenario_actions(ScenarioId(1));
        assert_eq!(tracker.actions().len(), 1);
        assert_eq!(tracker.actions()[0].scenario_id, ScenarioId(2));
        tracker.clear_actions();
        assert!(tracker.actions().is_empty());
    }

    #[test]
    fn add_action_stamps_wall_clock_time() {
        let mut tracker = ActionTracker::new(ScenarioId(9));
        assert!(tracker.add_action(sectors(&["A"])));
        let action = &tracker.actions()[0];
        assert!(action.timestamp_ms > 0);
        assert_eq!(action.scenario_id, ScenarioId(9));
        assert_eq!(action.action_type(), ActionType::SectorSelection);
    }
}
