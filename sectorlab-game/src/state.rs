//! Game state and the pure transition function that drives it.
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::classifier::{PerformanceClassifier, PerformanceGroup};
use crate::config::SimConfig;
use crate::constants::{MIN_SECTOR_PRICE, NEGATIVE_MOVE_PCT, NEUTRAL_MOVE_PCT, POSITIVE_MOVE_PCT};
use crate::data::Catalog;
use crate::numbers::{notional, round2, u32_to_f64};
use crate::tracker::ScenarioId;

/// A holding in one sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioItem {
    pub sector: String,
    pub quantity: u32,
    /// Volume-weighted average purchase price.
    pub average_price: f64,
}

/// Live price of a sector with its bounded rolling history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorQuote {
    pub current_price: f64,
    pub history: VecDeque<f64>,
}

impl SectorQuote {
    fn push_price(&mut self, price: f64, limit: usize) {
        self.current_price = price;
        self.history.push_back(price);
        while self.history.len() > limit {
            self.history.pop_front();
        }
    }
}

/// Snapshot of one game session. Replaced wholesale on every transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub capital: f64,
    pub portfolio: BTreeMap<String, PortfolioItem>,
    pub quotes: BTreeMap<String, SectorQuote>,
    pub scenario_index: usize,
    pub scenario_id: ScenarioId,
    pub scenario_title: String,
    pub scenario_description: String,
    /// Time advances since the session started.
    pub total_steps: u64,
    /// Time advances within the current scenario; saturates at the completion step.
    pub steps_in_current_situation: u32,
    /// Total value at the end of the previous scenario; profit/loss baseline.
    pub previous_capital: f64,
    pub auto_progress_paused: bool,
    pub show_completion_popup: bool,
    pub last_update_ms: u64,
    #[serde(default)]
    pub unlocked_tools: Vec<String>,
    #[serde(default)]
    pub hints_purchased: u32,
}

impl GameState {
    /// Fresh session state at scenario 0.
    #[must_use]
    pub fn initial(catalog: &Catalog, config: &SimConfig) -> Self {
        let quotes = catalog
            .sectors
            .iter()
            .map(|sector| {
                let mut history: VecDeque<f64> = sector.historical_prices.iter().copied().collect();
                if history.back() != Some(&sector.current_price) {
                    history.push_back(sector.current_price);
                }
                while history.len() > config.price_history_limit {
                    history.pop_front();
                }
                (
                    sector.name.clone(),
                    SectorQuote {
                        current_price: sector.current_price,
                        history,
                    },
                )
            })
            .collect();
        let mut state = Self {
            capital: config.initial_capital,
            portfolio: BTreeMap::new(),
            quotes,
            scenario_index: 0,
            scenario_id: ScenarioId::default(),
            scenario_title: String::new(),
            scenario_description: String::new(),
            total_steps: 0,
            steps_in_current_situation: 0,
            previous_capital: config.initial_capital,
            auto_progress_paused: false,
            show_completion_popup: false,
            last_update_ms: 0,
            unlocked_tools: Vec::new(),
            hints_purchased: 0,
        };
        state.load_scenario_metadata(catalog);
        state
    }

    fn load_scenario_metadata(&mut self, catalog: &Catalog) {
        if let Some(scenario) = catalog.scenario(self.scenario_index) {
            self.scenario_id = ScenarioId(scenario.id);
            self.scenario_title.clone_from(&scenario.title);
            self.scenario_description.clone_from(&scenario.description);
        }
    }

    #[must_use]
    pub fn price_of(&self, sector: &str) -> Option<f64> {
        self.quotes.get(sector).map(|q| q.current_price)
    }

    /// Holdings valued at current prices.
    #[must_use]
    pub fn holdings_value(&self) -> f64 {
        self.portfolio
            .values()
            .map(|item| {
                self.price_of(&item.sector)
                    .map_or(0.0, |price| price * u32_to_f64(item.quantity))
            })
            .sum()
    }

    /// Holdings plus cash, rounded to cents.
    #[must_use]
    pub fn total_value(&self) -> f64 {
        round2(self.holdings_value() + self.capital)
    }

    /// Total value relative to the previous scenario's closing value.
    #[must_use]
    pub fn profit_loss(&self) -> f64 {
        round2(self.total_value() - self.previous_capital)
    }

    #[must_use]
    pub fn is_scenario_complete(&self, completion_step: u32) -> bool {
        self.steps_in_current_situation >= completion_step
    }
}

/// Every transition the state machine accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameAction {
    PurchaseSector { sector: String, quantity: u32 },
    SellSector { sector: String, quantity: u32 },
    AdvanceTime { now_ms: u64 },
    ToggleAutoProgress { now_ms: u64 },
    ShowScenarioCompletionPopup,
    CloseScenarioCompletionPopup,
    AdvanceToNextScenario,
    PayForHint { cost: f64 },
    UnlockTool { tool: String },
    ResetGame,
}

/// Collaborators the transition function reads from or draws with.
///
/// Sector identity is a read-only key for the classifier; prices are only
/// ever written into the returned `GameState`.
pub struct MarketEnv<'a> {
    pub catalog: &'a Catalog,
    pub config: &'a SimConfig,
    pub classifier: &'a mut PerformanceClassifier,
    pub rng: &'a mut ChaCha20Rng,
}

/// Apply one action. Rejected actions return a state equal to the input.
#[must_use]
pub fn reduce(state: &GameState, action: &GameAction, env: &mut MarketEnv<'_>) -> GameState {
    match action {
        GameAction::PurchaseSector { sector, quantity } => purchase(state, sector, *quantity),
        GameAction::SellSector { sector, quantity } => sell(state, sector, *quantity),
        GameAction::AdvanceTime { now_ms } => advance_time(state, *now_ms, env),
        GameAction::ToggleAutoProgress { now_ms } => GameState {
            auto_progress_paused: !state.auto_progress_paused,
            last_update_ms: *now_ms,
            ..state.clone()
        },
        GameAction::ShowScenarioCompletionPopup => GameState {
            show_completion_popup: true,
            auto_progress_paused: true,
            ..state.clone()
        },
        GameAction::CloseScenarioCompletionPopup => GameState {
            previous_capital: state.total_value(),
            show_completion_popup: false,
            ..state.clone()
        },
        GameAction::AdvanceToNextScenario => {
            if state.scenario_index + 1 >= env.catalog.scenario_count() {
                return state.clone();
            }
            let mut next = GameState {
                scenario_index: state.scenario_index + 1,
                steps_in_current_situation: 0,
                show_completion_popup: false,
                ..state.clone()
            };
            next.load_scenario_metadata(env.catalog);
            next
        }
        GameAction::PayForHint { cost } => {
            if !cost.is_finite() || *cost < 0.0 || *cost > state.capital {
                return state.clone();
            }
            GameState {
                capital: round2(state.capital - cost),
                hints_purchased: state.hints_purchased.saturating_add(1),
                ..state.clone()
            }
        }
        GameAction::UnlockTool { tool } => {
            let mut next = state.clone();
            if !next.unlocked_tools.iter().any(|t| t == tool) {
                next.unlocked_tools.push(tool.clone());
            }
            next
        }
        GameAction::ResetGame => GameState {
            unlocked_tools: state.unlocked_tools.clone(),
            ..GameState::initial(env.catalog, env.config)
        },
    }
}

fn purchase(state: &GameState, sector: &str, quantity: u32) -> GameState {
    let Some(price) = state.price_of(sector) else {
        return state.clone();
    };
    let cost = notional(price, quantity);
    if quantity == 0 || cost > state.capital {
        return state.clone();
    }
    let mut next = state.clone();
    next.capital = round2(state.capital - cost);
    let item = next
        .portfolio
        .entry(sector.to_string())
        .or_insert_with(|| PortfolioItem {
            sector: sector.to_string(),
            quantity: 0,
            average_price: 0.0,
        });
    let held = u32_to_f64(item.quantity);
    let bought = u32_to_f64(quantity);
    item.average_price = item.average_price.mul_add(held, price * bought) / (held + bought);
    item.quantity = item.quantity.saturating_add(quantity);
    next
}

fn sell(state: &GameState, sector: &str, quantity: u32) -> GameState {
    let (Some(item), Some(price)) = (state.portfolio.get(sector), state.price_of(sector)) else {
        return state.clone();
    };
    if quantity == 0 || quantity > item.quantity {
        return state.clone();
    }
    let mut next = state.clone();
    next.capital = round2(state.capital + notional(price, quantity));
    let remaining = item.quantity - quantity;
    if remaining == 0 {
        next.portfolio.remove(sector);
    } else if let Some(held) = next.portfolio.get_mut(sector) {
        held.quantity = remaining;
    }
    next
}

fn advance_time(state: &GameState, now_ms: u64, env: &mut MarketEnv<'_>) -> GameState {
    let mut next = state.clone();
    next.total_steps = state.total_steps.saturating_add(1);
    next.steps_in_current_situation = state
        .steps_in_current_situation
        .saturating_add(1)
        .min(env.config.completion_step);

    let elapsed = now_ms.saturating_sub(state.last_update_ms);
    if elapsed < env.config.update_interval_ms && state.auto_progress_paused {
        return next;
    }
    for (name, quote) in &mut next.quotes {
        let group = env
            .classifier
            .classify(env.catalog, name, state.scenario_index);
        let (lo, hi) = move_range(group);
        let pct = env.rng.gen_range(lo..=hi);
        let price = round2(quote.current_price * (1.0 + pct / 100.0)).max(MIN_SECTOR_PRICE);
        quote.push_price(price, env.config.price_history_limit);
    }
    next.last_update_ms = now_ms;
    next
}

/// Percentage move bounds for one price update.
#[must_use]
pub const fn move_range(group: PerformanceGroup) -> (f64, f64) {
    match group {
        PerformanceGroup::Positive => POSITIVE_MOVE_PCT,
        PerformanceGroup::Neutral => NEUTRAL_MOVE_PCT,
        PerformanceGroup::Negative => NEGATIVE_MOVE_PCT,
    }
}
