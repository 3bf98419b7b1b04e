use anyhow::{Context, Result};
use colored::Colorize;
use sectorlab_game::{ActionSummary, GameSession, ScenarioId};
use serde::{Deserialize, Serialize};

use super::driver::Clock;
use super::policy::{MarketView, PolicyKind};

/// Outcome of one scenario within a playthrough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    pub scenario_id: ScenarioId,
    pub title: String,
    pub hypothesis_correct: bool,
    pub test_correct: bool,
    pub p_value: f64,
    pub significant: bool,
    pub summary: ActionSummary,
    pub orders_filled: usize,
    pub ticks: usize,
    pub total_value: f64,
    pub profit_loss: f64,
}

/// Outcome of one full game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaythroughSummary {
    pub seed: u64,
    pub policy: PolicyKind,
    pub scenarios: Vec<ScenarioRecord>,
    pub final_value: f64,
    pub net_profit: f64,
    pub lowest_capital: f64,
    pub failures: Vec<String>,
}

impl PlaythroughSummary {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    #[must_use]
    pub fn correct_actions(&self) -> usize {
        self.scenarios.iter().map(|s| s.summary.correct).sum()
    }
}

/// Play every scenario of a fresh session with one policy.
///
/// # Errors
///
/// Fails if the session cannot be built or the clock stalls.
pub async fn run_playthrough(
    seed: u64,
    kind: PolicyKind,
    mut clock: Clock,
    verbose: bool,
) -> Result<PlaythroughSummary> {
    let mut session = GameSession::with_seed(seed).context("failed to start session")?;
    let mut policy = kind.create_policy(seed);
    let initial_capital = session.config().initial_capital;
    let mut records = Vec::new();
    let mut failures = Vec::new();
    let mut lowest_capital = session.state().capital;

    loop {
        let scenario = session
            .current_scenario()
            .cloned()
            .context("session has no current scenario")?;
        if verbose {
            println!(
                "   {} scenario {} ({})",
                policy.name().bright_white(),
                scenario.id,
                scenario.title
            );
        }

        let index = policy.pick_hypothesis(&scenario);
        let hypothesis_verdict = session.select_hypothesis(index);
        let hypothesis = scenario
            .hypotheses
            .get(index)
            .or_else(|| scenario.correct_hypothesis())
            .context("scenario has no hypotheses")?;
        let sectors = policy.pick_sectors(&scenario, hypothesis);
        session.select_sectors(sectors.as_slice());
        let metrics = policy.pick_metrics(hypothesis);
        session.select_metrics(metrics.as_slice());
        let test = session.execute_test(policy.pick_test(hypothesis));

        let names: Vec<String> = session.catalog().sector_names().map(str::to_string).collect();
        let market: Vec<MarketView> = names
            .into_iter()
            .map(|sector| MarketView {
                group: session.performance_group(&sector),
                price: session.state().price_of(&sector).unwrap_or_default(),
                sector,
            })
            .collect();
        let orders = policy.pick_purchases(&market, session.state().capital);
        let mut orders_filled = 0;
        for (sector, quantity) in &orders {
            if session.purchase(sector, *quantity) {
                orders_filled += 1;
            }
        }
        lowest_capital = lowest_capital.min(session.state().capital);

        let ticks = clock.run_until_complete(&mut session).await?;

        let holdings: Vec<(String, u32)> = session
            .state()
            .portfolio
            .values()
            .map(|item| (item.sector.clone(), item.quantity))
            .collect();
        for (sector, quantity) in holdings {
            if !session.sell(&sector, quantity) {
                failures.push(format!("scenario {}: could not liquidate {sector}", scenario.id));
            }
        }

        let report = session.scenario_report();
        check_scenario(&session, kind, &report.summary, test.is_correct, &mut failures);
        records.push(ScenarioRecord {
            scenario_id: ScenarioId(report.scenario_id),
            title: report.title,
            hypothesis_correct: hypothesis_verdict.is_correct,
            test_correct: test.is_correct,
            p_value: test.result.p_value,
            significant: test.result.significant,
            summary: report.summary,
            orders_filled,
            ticks,
            total_value: report.total_value,
            profit_loss: report.profit_loss,
        });
        lowest_capital = lowest_capital.min(session.state().capital);

        session.close_completion_popup();
        if session.is_last_scenario() {
            break;
        }
        session.advance_scenario();
        session.resume(clock.now_ms());
    }

    let expected_last = session.catalog().scenario_count().saturating_sub(1);
    if session.state().scenario_index != expected_last {
        failures.push(format!(
            "stopped at scenario index {} instead of {expected_last}",
            session.state().scenario_index
        ));
    }
    if lowest_capital < 0.0 {
        failures.push(format!("capital went negative ({lowest_capital:.2})"));
    }

    let final_value = session.portfolio_value();
    Ok(PlaythroughSummary {
        seed,
        policy: kind,
        scenarios: records,
        final_value,
        net_profit: final_value - initial_capital,
        lowest_capital,
        failures,
    })
}

fn check_scenario(
    session: &GameSession,
    kind: PolicyKind,
    summary: &ActionSummary,
    test_correct: bool,
    failures: &mut Vec<String>,
) {
    let scenario = session.state().scenario_id;
    let logged = session.tracker().current_scenario_actions().count();
    if summary.correct + summary.incorrect != logged {
        failures.push(format!(
            "scenario {scenario}: summary counts {} + {} do not match {logged} logged actions",
            summary.correct, summary.incorrect
        ));
    }
    if kind.expects_correct() && (summary.correct < 4 || !test_correct) {
        failures.push(format!(
            "scenario {scenario}: informed play judged incorrect ({} correct)",
            summary.correct
        ));
    }
    if session.state().capital < 0.0 {
        failures.push(format!("scenario {scenario}: negative capital"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn informed_playthrough_passes_and_profits() {
        let summary = run_playthrough(1337, PolicyKind::Informed, Clock::virtual_clock(), false)
            .await
            .unwrap();
        assert!(summary.passed(), "{:?}", summary.failures);
        assert_eq!(summary.scenarios.len(), 4);
        assert_eq!(summary.correct_actions(), 16);
        assert!(summary.net_profit > 0.0);
        assert!(summary.scenarios.iter().all(|s| s.ticks == 90));
    }

    #[tokio::test]
    async fn contrarian_playthrough_is_judged_incorrect_but_completes() {
        let summary = run_playthrough(7, PolicyKind::Contrarian, Clock::virtual_clock(), false)
            .await
            .unwrap();
        assert!(summary.passed(), "{:?}", summary.failures);
        assert!(summary.scenarios.iter().all(|s| !s.test_correct));
        assert!(summary.net_profit < 0.0);
    }

    #[tokio::test]
    async fn random_playthrough_is_reproducible() {
        let first = run_playthrough(99, PolicyKind::Random, Clock::virtual_clock(), false)
            .await
            .unwrap();
        let second = run_playthrough(99, PolicyKind::Random, Clock::virtual_clock(), false)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert!(first.lowest_capital >= 0.0);
    }
}
