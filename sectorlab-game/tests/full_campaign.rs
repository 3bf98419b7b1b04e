use sectorlab_game::{ActionType, GameSession, PerformanceGroup, ScenarioId, TestKind, TickOutcome};

fn play_until_complete(session: &mut GameSession, now: &mut u64) {
    loop {
        *now += session.config().tick_interval_ms;
        match session.tick(*now) {
            TickOutcome::ScenarioComplete => return,
            TickOutcome::Paused | TickOutcome::AwaitingPopup => {
                panic!("campaign stalled at {now}ms")
            }
            TickOutcome::Waiting | TickOutcome::Advanced { .. } => {}
        }
        assert!(session.state().capital >= 0.0);
    }
}

fn answer_correctly(session: &mut GameSession) {
    let scenario = session.current_scenario().unwrap().clone();
    let index = scenario.correct_hypothesis_index().unwrap();
    let hypothesis = &scenario.hypotheses[index];

    assert!(session.select_hypothesis(index).is_correct);
    assert!(session.select_sectors(hypothesis.sectors.as_slice()).is_correct);
    let verdict = session.select_metrics(&[hypothesis.metric.as_str()]);
    assert!(verdict.is_correct, "{}: {verdict:?}", scenario.title);
    let outcome = session.execute_test(scenario.test_criteria.test);
    assert!(outcome.is_correct, "{}: {outcome:?}", scenario.title);
    assert!(!outcome.result.inappropriate);
    assert!(outcome.result.p_value > 0.0 && outcome.result.p_value <= 1.0);
}

fn buy_positive_sectors(session: &mut GameSession) -> Vec<String> {
    let names: Vec<String> = session.catalog().sector_names().map(str::to_string).collect();
    let mut bought = Vec::new();
    for name in names {
        if session.performance_group(&name) == PerformanceGroup::Positive
            && session.purchase(&name, 5)
        {
            bought.push(name);
        }
    }
    bought
}

#[test]
fn informed_player_finishes_every_scenario() {
    let mut session = GameSession::with_seed(0xFACE_B00C).unwrap();
    let scenario_count = session.catalog().scenario_count();
    let mut now = 0;

    for round in 0..scenario_count {
        assert_eq!(session.state().scenario_index, round);
        answer_correctly(&mut session);
        let bought = buy_positive_sectors(&mut session);
        assert!(!bought.is_empty());

        play_until_complete(&mut session, &mut now);
        for name in &bought {
            let held = session.state().portfolio[name].quantity;
            assert!(session.sell(name, held));
        }

        let report = session.scenario_report();
        assert!(report.complete);
        assert_eq!(report.summary.correct, 4);
        assert_eq!(report.summary.incorrect, bought.len());
        assert!(report.profit_loss > 0.0, "{report:?}");

        assert!(session.close_completion_popup());
        assert!((session.profit_loss()).abs() < 1e-9);
        if round + 1 < scenario_count {
            assert!(session.advance_scenario());
            assert_eq!(session.state().steps_in_current_situation, 0);
            assert!(session.resume(now));
        }
    }

    assert!(session.is_last_scenario());
    assert!(!session.advance_scenario());
    assert_eq!(session.tracker().current_scenario(), ScenarioId(4));
    assert!(session.portfolio_value() > session.config().initial_capital);

    let scenarios: std::collections::BTreeSet<ScenarioId> =
        session.actions().iter().map(|a| a.scenario_id).collect();
    assert_eq!(scenarios.len(), scenario_count);
}

#[test]
fn careless_player_keeps_capital_non_negative() {
    let mut session = GameSession::with_seed(17).unwrap();
    let mut now = 0;
    for _ in 0..session.catalog().scenario_count() {
        session.select_hypothesis(1);
        session.select_sectors(&["Energy"]);
        session.select_metrics(&["Volatility", "Market Sentiment"]);
        let outcome = session.execute_test(TestKind::ChiSquare);
        assert!(!outcome.is_correct);
        assert!(!outcome.result.significant);

        while session.purchase("Real Estate", 20) {}
        while session.pay_for_hint() {}
        assert!(session.state().capital >= 0.0);
        assert!(session.state().capital < session.config().hint_cost);

        play_until_complete(&mut session, &mut now);
        let summary = session.action_summary();
        let logged = session.tracker().current_scenario_actions().count();
        assert_eq!(summary.correct + summary.incorrect, logged);
        assert!(session
            .tracker()
            .latest_of(ActionType::TestExecution)
            .is_some());

        session.close_completion_popup();
        if session.advance_scenario() {
            session.resume(now);
        }
    }
    assert!(session.is_last_scenario());
}
