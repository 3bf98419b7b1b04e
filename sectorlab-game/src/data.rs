//! Static sector and scenario definitions.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::metrics::{MetricType, TestKind};

const BUNDLED_SECTORS: &str = include_str!("../assets/sectors.json");
const BUNDLED_SCENARIOS: &str = include_str!("../assets/scenarios.json");

/// Static description of a tradable sector.
///
/// Price here is only the opening quote; live prices belong to `GameState`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub current_price: f64,
    #[serde(default)]
    pub historical_prices: Vec<f64>,
    /// Cosmetic; not used by the engine's math.
    #[serde(default)]
    pub volatility: String,
    /// Cosmetic; not used by the engine's math.
    #[serde(default)]
    pub market_cap: String,
}

/// A statement the player may choose to test in a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub statement: String,
    /// The two sectors the statement compares.
    pub sectors: Vec<String>,
    /// Expected metric label, e.g. "Mean Return".
    pub metric: String,
    pub metric_type: MetricType,
    /// Whether this is the hypothesis the scenario is built around.
    #[serde(default)]
    pub correct: bool,
}

/// Test kind and significance threshold a scenario expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestCriteria {
    pub test: TestKind,
    #[serde(default = "TestCriteria::default_significance")]
    pub significance: f64,
}

impl TestCriteria {
    const fn default_significance() -> f64 {
        crate::constants::DEFAULT_SIGNIFICANCE
    }
}

/// One level of the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSituation {
    pub id: u32,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub positive: Vec<String>,
    #[serde(default)]
    pub neutral: Vec<String>,
    #[serde(default)]
    pub negative: Vec<String>,
    #[serde(default)]
    pub hypotheses: Vec<Hypothesis>,
    pub test_criteria: TestCriteria,
}

impl MarketSituation {
    /// Index of the hypothesis flagged correct, if any.
    #[must_use]
    pub fn correct_hypothesis_index(&self) -> Option<usize> {
        self.hypotheses.iter().position(|h| h.correct)
    }

    /// The hypothesis flagged correct, if any.
    #[must_use]
    pub fn correct_hypothesis(&self) -> Option<&Hypothesis> {
        self.hypotheses.iter().find(|h| h.correct)
    }
}

/// Errors raised when catalog data is malformed or inconsistent.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse {what}: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalog defines no {0}")]
    Empty(&'static str),
    #[error("sector '{0}' is defined more than once")]
    DuplicateSector(String),
    #[error("scenario id {0} is defined more than once")]
    DuplicateScenario(u32),
    #[error("sector '{name}' has a non-positive opening price {price}")]
    InvalidPrice { name: String, price: f64 },
    #[error("scenario {scenario} references unknown sector '{sector}'")]
    UnknownSector { scenario: u32, sector: String },
    #[error("scenario {scenario} lists sector '{sector}' in more than one performance group")]
    OverlappingGroups { scenario: u32, sector: String },
    #[error("scenario {scenario} does not classify sector '{sector}'")]
    UnclassifiedSector { scenario: u32, sector: String },
    #[error("scenario {scenario} must mark exactly one hypothesis correct (found {found})")]
    CorrectHypothesisCount { scenario: u32, found: usize },
    #[error("scenario {scenario} significance {value} must lie strictly between 0 and 1")]
    Significance { scenario: u32, value: f64 },
}

/// Sector and scenario definitions, validated together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub sectors: Vec<SectorProfile>,
    pub scenarios: Vec<MarketSituation>,
}

impl Catalog {
    /// Build and validate a catalog from already-parsed records.
    ///
    /// # Errors
    ///
    /// Returns an error if the records violate any catalog invariant.
    pub fn new(
        sectors: Vec<SectorProfile>,
        scenarios: Vec<MarketSituation>,
    ) -> Result<Self, CatalogError> {
        let catalog = Self { sectors, scenarios };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load sector and scenario data from JSON strings.
    ///
    /// # Errors
    ///
    /// Returns an error if either document cannot be parsed or fails validation.
    pub fn from_json(sectors_json: &str, scenarios_json: &str) -> Result<Self, CatalogError> {
        let sectors = serde_json::from_str(sectors_json).map_err(|source| CatalogError::Parse {
            what: "sectors",
            source,
        })?;
        let scenarios =
            serde_json::from_str(scenarios_json).map_err(|source| CatalogError::Parse {
                what: "scenarios",
                source,
            })?;
        Self::new(sectors, scenarios)
    }

    /// Load the catalog bundled with the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled assets are inconsistent.
    pub fn load_default() -> Result<Self, CatalogError> {
        Self::from_json(BUNDLED_SECTORS, BUNDLED_SCENARIOS)
    }

    /// Check every catalog invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.sectors.is_empty() {
            return Err(CatalogError::Empty("sectors"));
        }
        if self.scenarios.is_empty() {
            return Err(CatalogError::Empty("scenarios"));
        }

        let mut names = HashSet::new();
        for sector in &self.sectors {
            if !names.insert(sector.name.as_str()) {
                return Err(CatalogError::DuplicateSector(sector.name.clone()));
            }
            if !(sector.current_price.is_finite() && sector.current_price > 0.0) {
                return Err(CatalogError::InvalidPrice {
                    name: sector.name.clone(),
                    price: sector.current_price,
                });
            }
        }

        let mut ids = HashSet::new();
        for scenario in &self.scenarios {
            if !ids.insert(scenario.id) {
                return Err(CatalogError::DuplicateScenario(scenario.id));
            }
            validate_partition(scenario, &names)?;
            let found = scenario.hypotheses.iter().filter(|h| h.correct).count();
            if found != 1 {
                return Err(CatalogError::CorrectHypothesisCount {
                    scenario: scenario.id,
                    found,
                });
            }
            let value = scenario.test_criteria.significance;
            if !(value > 0.0 && value < 1.0) {
                return Err(CatalogError::Significance {
                    scenario: scenario.id,
                    value,
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn sector(&self, name: &str) -> Option<&SectorProfile> {
        self.sectors.iter().find(|s| s.name == name)
    }

    #[must_use]
    pub fn scenario(&self, index: usize) -> Option<&MarketSituation> {
        self.scenarios.get(index)
    }

    #[must_use]
    pub fn scenario_count(&self) -> usize {
        self.scenarios.len()
    }

    pub fn sector_names(&self) -> impl Iterator<Item = &str> {
        self.sectors.iter().map(|s| s.name.as_str())
    }
}

fn validate_partition(
    scenario: &MarketSituation,
    names: &HashSet<&str>,
) -> Result<(), CatalogError> {
    let mut seen: HashSet<&str> = HashSet::new();
    let groups = [&scenario.positive, &scenario.neutral, &scenario.negative];
    for sector in groups.into_iter().flatten() {
        if !names.contains(sector.as_str()) {
            return Err(CatalogError::UnknownSector {
                scenario: scenario.id,
                sector: sector.clone(),
            });
        }
        if !seen.insert(sector.as_str()) {
            return Err(CatalogError::OverlappingGroups {
                scenario: scenario.id,
                sector: sector.clone(),
            });
        }
    }
    let mut missing: Vec<&str> = names.difference(&seen).copied().collect();
    missing.sort_unstable();
    if let Some(sector) = missing.first() {
        return Err(CatalogError::UnclassifiedSector {
            scenario: scenario.id,
            sector: (*sector).to_string(),
        });
    }
    Ok(())
}

/// Trait for abstracting where catalog data comes from.
/// Platform-specific implementations may read files or fetch assets.
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the sector and scenario catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded or is inconsistent.
    fn load_catalog(&self) -> Result<Catalog, Self::Error>;
}

/// Loader returning the catalog compiled into the engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledLoader;

impl DataLoader for BundledLoader {
    type Error = CatalogError;

    fn load_catalog(&self) -> Result<Catalog, Self::Error> {
        Catalog::load_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECTORS: &str = r#"[
        {"name": "Alpha", "current_price": 10.0},
        {"name": "Beta", "current_price": 20.0},
        {"name": "Gamma", "current_price": 30.0}
    ]"#;

    fn scenario_json(positive: &str, neutral: &str, negative: &str) -> String {
        format!(
            r#"[{{
                "id": 1,
                "title": "Test",
                "description": "A test scenario",
                "positive": {positive},
                "neutral": {neutral},
                "negative": {negative},
                "hypotheses": [{{
                    "statement": "Alpha beats Gamma",
                    "sectors": ["Alpha", "Gamma"],
                    "metric": "Mean Return",
                    "metric_type": "numerical",
                    "correct": true
                }}],
                "test_criteria": {{"test": "t-test"}}
            }}]"#
        )
    }

    #[test]
    fn bundled_catalog_is_consistent() {
        let catalog = Catalog::load_default().unwrap();
        assert_eq!(catalog.sectors.len(), 8);
        assert_eq!(catalog.scenario_count(), 4);
        assert!(catalog.sector("Technology").is_some());
        for scenario in &catalog.scenarios {
            assert!(scenario.correct_hypothesis().is_some());
        }
    }

    #[test]
    fn parses_minimal_catalog_with_defaults() {
        let catalog =
            Catalog::from_json(SECTORS, &scenario_json(r#"["Alpha"]"#, r#"["Beta"]"#, r#"["Gamma"]"#))
                .unwrap();
        let scenario = catalog.scenario(0).unwrap();
        assert!((scenario.test_criteria.significance - 0.05).abs() < f64::EPSILON);
        assert_eq!(scenario.correct_hypothesis_index(), Some(0));
        assert!(catalog.sector("Alpha").unwrap().historical_prices.is_empty());
    }

    #[test]
    fn rejects_overlapping_and_missing_groups() {
        let overlap = Catalog::from_json(
            SECTORS,
            &scenario_json(r#"["Alpha", "Beta"]"#, r#"["Beta"]"#, r#"["Gamma"]"#),
        );
        assert!(matches!(overlap, Err(CatalogError::OverlappingGroups { .. })));

        let missing =
            Catalog::from_json(SECTORS, &scenario_json(r#"["Alpha"]"#, "[]", r#"["Gamma"]"#));
        assert!(matches!(
            missing,
            Err(CatalogError::UnclassifiedSector { ref sector, .. }) if sector == "Beta"
        ));

        let unknown = Catalog::from_json(
            SECTORS,
            &scenario_json(r#"["Alpha", "Delta"]"#, r#"["Beta"]"#, r#"["Gamma"]"#),
        );
        assert!(matches!(unknown, Err(CatalogError::UnknownSector { .. })));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = Catalog::from_json("not json", "[]").unwrap_err();
        assert!(err.to_string().contains("sectors"));
    }

    #[test]
    fn bundled_loader_matches_default() {
        let catalog = BundledLoader.load_catalog().unwrap();
        assert_eq!(catalog, Catalog::load_default().unwrap());
    }
}
