//! Session driver: owns the state, serializes actions and judges player choices.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use thiserror::Error;

use crate::classifier::PerformanceGroup;
use crate::config::{ConfigError, SimConfig};
use crate::context::SimulationContext;
use crate::data::{Catalog, CatalogError, Hypothesis, MarketSituation};
use crate::metrics::{MetricId, MetricType, TestKind};
use crate::state::{GameAction, GameState, MarketEnv, reduce};
use crate::stats::TestResult;
use crate::tracker::{ActionDetails, ActionSummary, ActionTracker, PlayerAction, SectorSet};
use crate::validator::{validate_metrics, validate_metrics_match_hypothesis, validate_test_for_metrics};

/// Errors raised while assembling a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// What a timer tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    /// Auto-progress is paused.
    Paused,
    /// The completion popup is waiting to be closed.
    AwaitingPopup,
    /// Not enough time has passed since the last update.
    Waiting,
    Advanced { steps_in_scenario: u32 },
    /// Time advanced and the scenario reached its completion step.
    ScenarioComplete,
}

/// The player's working choices for the current scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub hypothesis: Option<usize>,
    pub sectors: SectorSet,
    pub metrics: Vec<String>,
}

/// Verdict on one selection, as judged before it was logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionVerdict {
    /// False when the tracker dropped the action as a duplicate.
    pub recorded: bool,
    pub is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Result of a test execution together with its judgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub result: TestResult,
    pub sectors: SectorSet,
    pub metric: MetricId,
    pub is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub recorded: bool,
}

/// End-of-scenario snapshot for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub scenario_id: u32,
    pub title: String,
    pub summary: ActionSummary,
    pub total_value: f64,
    pub profit_loss: f64,
    pub steps_in_scenario: u32,
    pub complete: bool,
}

/// One running game: catalog, configuration, live state and engine context.
#[derive(Debug, Clone)]
pub struct GameSession {
    catalog: Catalog,
    config: SimConfig,
    state: GameState,
    context: SimulationContext,
    queue: VecDeque<GameAction>,
    selection: Selection,
}

impl GameSession {
    /// Build a session over a catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog or the configuration is invalid.
    pub fn new(catalog: Catalog, config: SimConfig) -> Result<Self, SessionError> {
        catalog.validate()?;
        config.validate()?;
        let state = GameState::initial(&catalog, &config);
        let context = SimulationContext::new(config.seed, state.scenario_id);
        Ok(Self {
            catalog,
            config,
            state,
            context,
            queue: VecDeque::new(),
            selection: Selection::default(),
        })
    }

    /// Session over the bundled catalog with default settings and `seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled catalog fails validation.
    pub fn with_seed(seed: u64) -> Result<Self, SessionError> {
        Self::new(Catalog::load_default()?, SimConfig::default().with_seed(seed))
    }

    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    #[must_use]
    pub const fn tracker(&self) -> &ActionTracker {
        &self.context.tracker
    }

    #[must_use]
    pub const fn context(&self) -> &SimulationContext {
        &self.context
    }

    pub const fn context_mut(&mut self) -> &mut SimulationContext {
        &mut self.context
    }

    #[must_use]
    pub fn current_scenario(&self) -> Option<&MarketSituation> {
        self.catalog.scenario(self.state.scenario_index)
    }

    #[must_use]
    pub fn is_last_scenario(&self) -> bool {
        self.state.scenario_index + 1 >= self.catalog.scenario_count()
    }

    /// Holdings at current prices plus cash.
    #[must_use]
    pub fn portfolio_value(&self) -> f64 {
        self.state.total_value()
    }

    #[must_use]
    pub fn profit_loss(&self) -> f64 {
        self.state.profit_loss()
    }

    pub fn performance_group(&mut self, sector: &str) -> PerformanceGroup {
        self.context
            .classifier
            .classify(&self.catalog, sector, self.state.scenario_index)
    }

    #[must_use]
    pub fn action_summary(&self) -> ActionSummary {
        self.context.tracker.action_summary()
    }

    #[must_use]
    pub fn actions(&self) -> &[PlayerAction] {
        self.context.tracker.actions()
    }

    #[must_use]
    pub fn scenario_report(&self) -> ScenarioReport {
        ScenarioReport {
            scenario_id: self.state.scenario_id.0,
            title: self.state.scenario_title.clone(),
            summary: self.action_summary(),
            total_value: self.portfolio_value(),
            profit_loss: self.profit_loss(),
            steps_in_scenario: self.state.steps_in_current_situation,
            complete: self.state.is_scenario_complete(self.config.completion_step),
        }
    }

    /// Queue an action without processing it.
    pub fn enqueue(&mut self, action: GameAction) {
        self.queue.push_back(action);
    }

    /// Apply queued actions one at a time. Returns how many changed the state.
    pub fn process_queue(&mut self) -> usize {
        let mut accepted = 0;
        while let Some(action) = self.queue.pop_front() {
            if self.apply(&action) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Queue an action and drain the queue. Returns whether this action changed the state.
    pub fn dispatch(&mut self, action: GameAction) -> bool {
        let mut last = false;
        self.queue.push_back(action);
        while let Some(next) = self.queue.pop_front() {
            last = self.apply(&next);
        }
        last
    }

    fn apply(&mut self, action: &GameAction) -> bool {
        let previous_index = self.state.scenario_index;
        let next = {
            let mut env = MarketEnv {
                catalog: &self.catalog,
                config: &self.config,
                classifier: &mut self.context.classifier,
                rng: &mut self.context.market_rng,
            };
            reduce(&self.state, action, &mut env)
        };
        let is_reset = matches!(action, GameAction::ResetGame);
        let changed = next != self.state;
        if !changed && !is_reset {
            log::debug!("rejected {action:?}");
            return false;
        }
        self.state = next;

        if is_reset {
            self.context.clear_actions();
            self.context.tracker.set_current_scenario(self.state.scenario_id);
            self.context.classifier.invalidate(self.state.scenario_index);
            self.selection = Selection::default();
            log::info!("session reset to scenario {}", self.state.scenario_id);
        } else if self.state.scenario_index != previous_index {
            self.context.tracker.set_current_scenario(self.state.scenario_id);
            self.context.classifier.invalidate(self.state.scenario_index);
            self.selection = Selection::default();
            log::info!(
                "advanced to scenario {} ({})",
                self.state.scenario_id,
                self.state.scenario_title
            );
        }
        changed
    }

    /// Timer callback.
    pub fn tick(&mut self, now_ms: u64) -> TickOutcome {
        if self.state.show_completion_popup {
            return TickOutcome::AwaitingPopup;
        }
        if self.state.auto_progress_paused {
            return TickOutcome::Paused;
        }
        if now_ms.saturating_sub(self.state.last_update_ms) < self.config.update_interval_ms {
            return TickOutcome::Waiting;
        }
        self.dispatch(GameAction::AdvanceTime { now_ms });
        if self.state.is_scenario_complete(self.config.completion_step) {
            self.dispatch(GameAction::ShowScenarioCompletionPopup);
            return TickOutcome::ScenarioComplete;
        }
        TickOutcome::Advanced {
            steps_in_scenario: self.state.steps_in_current_situation,
        }
    }

    pub fn toggle_auto_progress(&mut self, now_ms: u64) -> bool {
        self.dispatch(GameAction::ToggleAutoProgress { now_ms })
    }

    /// Unpause auto-progress; refused while the completion popup is open.
    pub fn resume(&mut self, now_ms: u64) -> bool {
        if !self.state.auto_progress_paused || self.state.show_completion_popup {
            return false;
        }
        self.toggle_auto_progress(now_ms)
    }

    pub fn pause(&mut self, now_ms: u64) -> bool {
        if self.state.auto_progress_paused {
            return false;
        }
        self.toggle_auto_progress(now_ms)
    }

    pub fn close_completion_popup(&mut self) -> bool {
        self.dispatch(GameAction::CloseScenarioCompletionPopup)
    }

    pub fn advance_scenario(&mut self) -> bool {
        self.dispatch(GameAction::AdvanceToNextScenario)
    }

    /// Buy a hint at the configured price.
    pub fn pay_for_hint(&mut self) -> bool {
        self.dispatch(GameAction::PayForHint {
            cost: self.config.hint_cost,
        })
    }

    pub fn unlock_tool(&mut self, tool: &str) -> bool {
        self.dispatch(GameAction::UnlockTool {
            tool: tool.to_string(),
        })
    }

    /// Start over. The action log and selections are cleared even when the
    /// state was already at its initial values; returns whether the state changed.
    pub fn reset(&mut self) -> bool {
        self.dispatch(GameAction::ResetGame)
    }

    /// Buy shares; the purchase is logged only when accepted.
    pub fn purchase(&mut self, sector: &str, quantity: u32) -> bool {
        let Some(price) = self.state.price_of(sector) else {
            log::debug!("purchase of unknown sector '{sector}' ignored");
            return false;
        };
        let accepted = self.dispatch(GameAction::PurchaseSector {
            sector: sector.to_string(),
            quantity,
        });
        if accepted {
            self.context.tracker.add_action(ActionDetails::StockPurchase {
                sector: sector.to_string(),
                quantity,
                price,
            });
        }
        accepted
    }

    pub fn sell(&mut self, sector: &str, quantity: u32) -> bool {
        self.dispatch(GameAction::SellSector {
            sector: sector.to_string(),
            quantity,
        })
    }

    /// The hypothesis choices are judged against: the player's pick, or the
    /// scenario's correct one when nothing has been picked yet.
    fn active_hypothesis_index(&self) -> Option<usize> {
        self.selection.hypothesis.or_else(|| {
            self.current_scenario()
                .and_then(MarketSituation::correct_hypothesis_index)
        })
    }

    fn active_hypothesis(&self) -> Option<&Hypothesis> {
        let index = self.active_hypothesis_index()?;
        self.current_scenario()?.hypotheses.get(index)
    }

    pub fn select_hypothesis(&mut self, index: usize) -> SelectionVerdict {
        let Some(hypothesis) = self
            .current_scenario()
            .and_then(|s| s.hypotheses.get(index))
            .cloned()
        else {
            return SelectionVerdict {
                recorded: false,
                is_correct: false,
                message: Some(format!("Unknown hypothesis index {index}.")),
            };
        };
        let recorded = self.context.tracker.add_action(ActionDetails::HypothesisSelection {
            hypothesis_index: index,
            statement: hypothesis.statement,
            is_correct: hypothesis.correct,
        });
        // Later choices are judged against the logged pick only.
        if recorded {
            self.selection.hypothesis = Some(index);
        }
        SelectionVerdict {
            recorded,
            is_correct: hypothesis.correct,
            message: (!hypothesis.correct)
                .then(|| "This hypothesis does not fit the scenario's story.".to_string()),
        }
    }

    pub fn select_sectors<S: AsRef<str>>(&mut self, names: &[S]) -> SelectionVerdict {
        let sectors: SectorSet = names.iter().map(|n| n.as_ref().trim().to_string()).collect();
        let unknown = sectors.iter().find(|s| self.catalog.sector(s).is_none()).cloned();
        let expected: Option<BTreeSet<&str>> = self
            .active_hypothesis()
            .map(|h| h.sectors.iter().map(String::as_str).collect());
        let chosen: BTreeSet<&str> = sectors.iter().map(String::as_str).collect();

        let message = if let Some(name) = unknown {
            Some(format!("'{name}' is not a tradable sector."))
        } else if expected.as_ref() == Some(&chosen) {
            None
        } else {
            Some("These sectors are not the ones the hypothesis compares.".to_string())
        };
        let is_correct = message.is_none();

        self.selection.sectors.clone_from(&sectors);
        let recorded = self
            .context
            .tracker
            .add_action(ActionDetails::SectorSelection { sectors, is_correct });
        SelectionVerdict {
            recorded,
            is_correct,
            message,
        }
    }

    pub fn select_metrics<S: AsRef<str>>(&mut self, labels: &[S]) -> SelectionVerdict {
        let metrics: Vec<String> = labels.iter().map(|l| l.as_ref().trim().to_string()).collect();
        let validation = match self.active_hypothesis_index() {
            Some(hypothesis_index) => validate_metrics_match_hypothesis(
                &self.catalog,
                &metrics,
                self.state.scenario_index,
                hypothesis_index,
            ),
            None => validate_metrics(&metrics),
        };

        self.selection.metrics.clone_from(&metrics);
        let recorded = self.context.tracker.add_action(ActionDetails::MetricSelection {
            metrics,
            data_type: validation.metric_type,
            is_correct: validation.is_valid,
            error_message: validation.error_message.clone(),
        });
        SelectionVerdict {
            recorded,
            is_correct: validation.is_valid,
            message: validation.error_message,
        }
    }

    /// Generate samples for the chosen sectors and run `kind` on them.
    ///
    /// Missing selections fall back to the active hypothesis.
    pub fn execute_test(&mut self, kind: TestKind) -> TestOutcome {
        let hypothesis = self.active_hypothesis().cloned();
        let sectors: SectorSet = if self.selection.sectors.len() == 2 {
            self.selection.sectors.clone()
        } else {
            hypothesis
                .as_ref()
                .map(|h| h.sectors.iter().cloned().collect())
                .unwrap_or_default()
        };
        let labels: Vec<String> = if self.selection.metrics.is_empty() {
            hypothesis.iter().map(|h| h.metric.clone()).collect()
        } else {
            self.selection.metrics.clone()
        };
        let metrics = validate_metrics(&labels);
        let metric = labels
            .first()
            .and_then(|l| MetricId::from_label(l))
            .or_else(|| hypothesis.as_ref().and_then(|h| MetricId::from_label(&h.metric)))
            .unwrap_or(MetricId::MeanReturn);

        let scenario_index = self.state.scenario_index;
        let sample_size = self.config.sample_size;
        let (expected_kind, threshold) = self.current_scenario().map_or(
            (
                TestKind::for_metric_type(metrics.metric_type).unwrap_or(kind),
                self.config.significance,
            ),
            |s| (s.test_criteria.test, s.test_criteria.significance),
        );

        let mut draw = |sector: Option<&String>| {
            let Some(sector) = sector else {
                return Vec::new();
            };
            let group = self
                .context
                .classifier
                .classify(&self.catalog, sector, scenario_index);
            self.context
                .generator
                .sample(metric, group, sample_size, Some(sector.as_str()))
        };
        let sample_a = draw(sectors.first());
        let sample_b = draw(sectors.get(1));
        let result = self.context.tests.run_test(kind, &sample_a, &sample_b, threshold);

        let compatibility = validate_test_for_metrics(kind, metrics.metric_type);
        let error_message = (!metrics.is_valid)
            .then(|| {
                metrics
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "These metrics cannot be compared.".to_string())
            })
            .or(compatibility.error_message)
            .or_else(|| {
                (metrics.metric_type != MetricType::Mixed && kind != expected_kind)
                    .then(|| format!("This scenario calls for a {expected_kind}."))
            })
            .or_else(|| result.explanation.clone());
        let is_correct = error_message.is_none();

        let recorded = self.context.tracker.add_action(ActionDetails::TestExecution {
            test_kind: kind,
            p_value: result.p_value,
            significant: result.significant,
            is_correct,
            error_message: error_message.clone(),
        });
        TestOutcome {
            result,
            sectors,
            metric,
            is_correct,
            error_message,
            recorded,
        }
    }
}
