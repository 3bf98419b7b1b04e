use std::collections::BTreeSet;
use std::hash::Hasher;

use sectorlab_game::validator::metric_type_of;
use sectorlab_game::{
    ActionDetails, Catalog, GameSession, GameState, MetricId, ScenarioId, SimConfig, TestKind,
    TickOutcome,
};
use serde_json::Value;
use twox_hash::XxHash64;

fn snapshot_hash(bytes: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(bytes);
    hasher.finish()
}

fn scripted_session(seed: u64) -> GameSession {
    let mut session = GameSession::with_seed(seed).unwrap();
    session.select_hypothesis(0);
    session.select_sectors(&["Technology", "Utilities"]);
    session.select_metrics(&["Mean Return"]);
    session.execute_test(TestKind::TTest);
    session.purchase("Technology", 12);
    let mut now = 0;
    while session.tick(now) != TickOutcome::ScenarioComplete {
        now += 100;
    }
    session
}

fn state_digest(state: &GameState) -> u64 {
    snapshot_hash(serde_json::to_string(state).unwrap().as_bytes())
}

#[test]
fn bundled_catalog_is_consistent() {
    let catalog = Catalog::load_default().unwrap();
    let names: BTreeSet<&str> = catalog.sector_names().collect();
    assert_eq!(names.len(), catalog.sectors.len());

    for scenario in &catalog.scenarios {
        let grouped: BTreeSet<&str> = scenario
            .positive
            .iter()
            .chain(&scenario.neutral)
            .chain(&scenario.negative)
            .map(String::as_str)
            .collect();
        assert_eq!(grouped, names, "scenario {} partition", scenario.id);
        assert_eq!(
            scenario.hypotheses.iter().filter(|h| h.correct).count(),
            1,
            "scenario {} correct hypothesis count",
            scenario.id
        );
        for hypothesis in &scenario.hypotheses {
            assert_eq!(hypothesis.sectors.len(), 2);
            assert!(hypothesis.sectors.iter().all(|s| names.contains(s.as_str())));
            assert!(MetricId::from_label(&hypothesis.metric).is_some());
            assert_eq!(metric_type_of(&hypothesis.metric), hypothesis.metric_type);
        }
        let correct = scenario.correct_hypothesis().unwrap();
        assert_eq!(
            TestKind::for_metric_type(correct.metric_type),
            Some(scenario.test_criteria.test)
        );
    }
}

#[test]
fn same_seed_replays_identically() {
    let first = scripted_session(0x5EED);
    let second = scripted_session(0x5EED);
    assert_eq!(state_digest(first.state()), state_digest(second.state()));

    let other = scripted_session(0x5EED + 1);
    assert_ne!(state_digest(first.state()), state_digest(other.state()));
}

#[test]
fn game_state_serialization_preserves_shape() {
    let session = scripted_session(0xFACE_B00C);
    let json = serde_json::to_string(session.state()).unwrap();
    let restored: GameState = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.scenario_id, ScenarioId(1));
    assert_eq!(restored.portfolio["Technology"].quantity, 12);
    assert_eq!(restored.steps_in_current_situation, 9);
    assert!(restored.show_completion_popup);
    for (name, quote) in &session.state().quotes {
        let copy = &restored.quotes[name];
        assert_eq!(copy.history.len(), quote.history.len());
        assert!((copy.current_price - quote.current_price).abs() < 1e-9);
    }
}

#[test]
fn action_log_serializes_with_type_tags() {
    let session = scripted_session(42);
    let value = serde_json::to_value(session.actions()).unwrap();
    let Value::Array(entries) = value else {
        panic!("action log should serialize as an array");
    };
    let tags: Vec<&str> = entries
        .iter()
        .map(|entry| entry["details"]["type"].as_str().unwrap())
        .collect();
    assert_eq!(
        tags,
        [
            "hypothesis_selection",
            "sector_selection",
            "metric_selection",
            "test_execution",
            "stock_purchase"
        ]
    );
    assert_eq!(entries[0]["scenario_id"], 1);
    assert_eq!(entries[3]["details"]["test_kind"], "t-test");

    let purchase: ActionDetails = serde_json::from_value(entries[4]["details"].clone()).unwrap();
    assert!(matches!(
        purchase,
        ActionDetails::StockPurchase { quantity: 12, .. }
    ));
}

#[test]
fn config_documents_fill_defaults() {
    let config = SimConfig::from_json(r#"{"seed": 9, "sample_size": 40}"#).unwrap();
    assert_eq!(config.seed, 9);
    assert_eq!(config.sample_size, 40);
    assert_eq!(config.completion_step, SimConfig::default().completion_step);
    assert!(SimConfig::from_json(r#"{"update_interval_ms": 10}"#).is_err());
}
