use std::fmt;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sectorlab_game::numbers::floor_f64_to_usize;
use sectorlab_game::{Hypothesis, MarketSituation, MetricId, PerformanceGroup, TestKind};

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    fn pick_hypothesis(&mut self, scenario: &MarketSituation) -> usize;

    fn pick_sectors(&mut self, scenario: &MarketSituation, hypothesis: &Hypothesis) -> Vec<String>;

    fn pick_metrics(&mut self, hypothesis: &Hypothesis) -> Vec<String>;

    fn pick_test(&mut self, hypothesis: &Hypothesis) -> TestKind;

    /// Orders to place at the start of a scenario.
    fn pick_purchases(&mut self, market: &[MarketView], capital: f64) -> Vec<(String, u32)>;
}

/// What a policy sees of one sector when trading.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketView {
    pub sector: String,
    pub group: PerformanceGroup,
    pub price: f64,
}

/// Built-in strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Informed,
    Contrarian,
    Random,
}

impl PolicyKind {
    pub const ALL: [Self; 3] = [Self::Informed, Self::Contrarian, Self::Random];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Informed => "informed",
            Self::Contrarian => "contrarian",
            Self::Random => "random",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Informed => "Picks the scenario's story, the right metric and test, buys winners",
            Self::Contrarian => "Picks a distractor hypothesis and the wrong test, buys losers",
            Self::Random => "Seeded coin flips for every choice",
        }
    }

    /// Whether every judged choice this policy makes should come back correct.
    #[must_use]
    pub const fn expects_correct(self) -> bool {
        matches!(self, Self::Informed)
    }

    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(token.trim()))
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            Self::Informed => Box::new(InformedPolicy),
            Self::Contrarian => Box::new(ContrarianPolicy),
            Self::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whole shares affordable with `budget`.
fn affordable(budget: f64, price: f64) -> u32 {
    if price <= 0.0 {
        return 0;
    }
    u32::try_from(floor_f64_to_usize(budget / price)).unwrap_or(u32::MAX)
}

/// Spend up to a quarter of capital on each sector in `group`.
fn budget_orders(market: &[MarketView], group: PerformanceGroup, capital: f64) -> Vec<(String, u32)> {
    market
        .iter()
        .filter(|view| view.group == group)
        .filter_map(|view| {
            let quantity = affordable(capital * 0.25, view.price);
            (quantity > 0).then(|| (view.sector.clone(), quantity))
        })
        .collect()
}

/// Knows the answers.
pub struct InformedPolicy;

impl PlayerPolicy for InformedPolicy {
    fn name(&self) -> &'static str {
        "Informed"
    }

    fn pick_hypothesis(&mut self, scenario: &MarketSituation) -> usize {
        scenario.correct_hypothesis_index().unwrap_or(0)
    }

    fn pick_sectors(&mut self, _scenario: &MarketSituation, hypothesis: &Hypothesis) -> Vec<String> {
        hypothesis.sectors.clone()
    }

    fn pick_metrics(&mut self, hypothesis: &Hypothesis) -> Vec<String> {
        vec![hypothesis.metric.clone()]
    }

    fn pick_test(&mut self, hypothesis: &Hypothesis) -> TestKind {
        TestKind::for_metric_type(hypothesis.metric_type).unwrap_or(TestKind::TTest)
    }

    fn pick_purchases(&mut self, market: &[MarketView], capital: f64) -> Vec<(String, u32)> {
        budget_orders(market, PerformanceGroup::Positive, capital)
    }
}

/// Picks a distractor and the wrong test on purpose.
pub struct ContrarianPolicy;

impl PlayerPolicy for ContrarianPolicy {
    fn name(&self) -> &'static str {
        "Contrarian"
    }

    fn pick_hypothesis(&mut self, scenario: &MarketSituation) -> usize {
        scenario
            .hypotheses
            .iter()
            .position(|h| !h.correct)
            .unwrap_or(0)
    }

    fn pick_sectors(&mut self, _scenario: &MarketSituation, hypothesis: &Hypothesis) -> Vec<String> {
        hypothesis.sectors.iter().rev().cloned().collect()
    }

    fn pick_metrics(&mut self, hypothesis: &Hypothesis) -> Vec<String> {
        vec![hypothesis.metric.clone()]
    }

    fn pick_test(&mut self, hypothesis: &Hypothesis) -> TestKind {
        match TestKind::for_metric_type(hypothesis.metric_type) {
            Some(TestKind::TTest) => TestKind::ChiSquare,
            _ => TestKind::TTest,
        }
    }

    fn pick_purchases(&mut self, market: &[MarketView], capital: f64) -> Vec<(String, u32)> {
        budget_orders(market, PerformanceGroup::Negative, capital)
    }
}

/// Seeded coin flips for every decision.
pub struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn pick_hypothesis(&mut self, scenario: &MarketSituation) -> usize {
        if scenario.hypotheses.is_empty() {
            return 0;
        }
        self.rng.gen_range(0..scenario.hypotheses.len())
    }

    fn pick_sectors(&mut self, scenario: &MarketSituation, _hypothesis: &Hypothesis) -> Vec<String> {
        let mut pool: Vec<String> = scenario
            .positive
            .iter()
            .chain(&scenario.neutral)
            .chain(&scenario.negative)
            .cloned()
            .collect();
        pool.shuffle(&mut self.rng);
        pool.truncate(2);
        pool
    }

    fn pick_metrics(&mut self, _hypothesis: &Hypothesis) -> Vec<String> {
        MetricId::ALL
            .choose(&mut self.rng)
            .map(|metric| vec![metric.label().to_string()])
            .unwrap_or_default()
    }

    fn pick_test(&mut self, _hypothesis: &Hypothesis) -> TestKind {
        if self.rng.gen_bool(0.5) {
            TestKind::TTest
        } else {
            TestKind::ChiSquare
        }
    }

    fn pick_purchases(&mut self, market: &[MarketView], capital: f64) -> Vec<(String, u32)> {
        let Some(view) = market.choose(&mut self.rng) else {
            return Vec::new();
        };
        let quantity = self.rng.gen_range(1..=10).min(affordable(capital, view.price));
        if quantity == 0 {
            return Vec::new();
        }
        vec![(view.sector.clone(), quantity)]
    }
}
