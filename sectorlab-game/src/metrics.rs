//! Metric identifiers, data types and statistical test kinds.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Data type of a metric, deciding which statistical test is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Numerical,
    Categorical,
    /// Unrecognized metrics or a combination of both types.
    Mixed,
}

impl MetricType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Numerical => "numerical",
            Self::Categorical => "categorical",
            Self::Mixed => "mixed",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistical tests offered to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestKind {
    #[serde(rename = "t-test")]
    TTest,
    #[serde(rename = "chi-square")]
    ChiSquare,
}

impl TestKind {
    pub const ALL: [Self; 2] = [Self::TTest, Self::ChiSquare];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TTest => "t-test",
            Self::ChiSquare => "chi-square",
        }
    }

    /// The test matching a metric type; mixed data has no valid test.
    #[must_use]
    pub const fn for_metric_type(metric_type: MetricType) -> Option<Self> {
        match metric_type {
            MetricType::Numerical => Some(Self::TTest),
            MetricType::Categorical => Some(Self::ChiSquare),
            MetricType::Mixed => None,
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "t test" | "ttest" | "welch t test" => Ok(Self::TTest),
            "chi square" | "chisquare" | "chi squared" => Ok(Self::ChiSquare),
            _ => Err(()),
        }
    }
}

/// Metrics the synthetic data generator knows how to sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    /// Daily percentage return, normal-shaped.
    MeanReturn,
    /// Daily absolute move size, normal-shaped.
    Volatility,
    /// 1 when the day closed up, 0 otherwise.
    PositiveReturnDays,
    /// 0 = bearish, 1 = flat, 2 = bullish.
    MarketSentiment,
}

impl MetricId {
    pub const ALL: [Self; 4] = [
        Self::MeanReturn,
        Self::Volatility,
        Self::PositiveReturnDays,
        Self::MarketSentiment,
    ];

    /// Player-facing label, also the canonical validator spelling.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::MeanReturn => "Mean Return",
            Self::Volatility => "Volatility",
            Self::PositiveReturnDays => "Positive Return Days",
            Self::MarketSentiment => "Market Sentiment",
        }
    }

    #[must_use]
    pub const fn metric_type(self) -> MetricType {
        match self {
            Self::MeanReturn | Self::Volatility => MetricType::Numerical,
            Self::PositiveReturnDays | Self::MarketSentiment => MetricType::Categorical,
        }
    }

    /// Resolve a free-text label, tolerating case, punctuation and common aliases.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match normalize_label(label).as_str() {
            "mean return" | "mean returns" | "average return" | "avg return"
            | "average daily return" | "mean daily return" | "daily return" | "returns" => {
                Some(Self::MeanReturn)
            }
            "volatility" | "price volatility" | "standard deviation" | "std dev" | "stdev" => {
                Some(Self::Volatility)
            }
            "positive return days" | "positive days" | "up days" | "up down days"
            | "winning days" => Some(Self::PositiveReturnDays),
            "market sentiment" | "sentiment" | "investor sentiment" => {
                Some(Self::MarketSentiment)
            }
            _ => None,
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn separator_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"[^a-z0-9]+").ok())
        .as_ref()
}

/// Lowercase a label and collapse every run of punctuation or whitespace to one space.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    let lowered = label.to_lowercase();
    separator_pattern().map_or_else(
        || lowered.split_whitespace().collect::<Vec<_>>().join(" "),
        |re| re.replace_all(&lowered, " ").trim().to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_punctuation() {
        assert_eq!(normalize_label("  Up/Down   Days "), "up down days");
        assert_eq!(normalize_label("MEAN-return"), "mean return");
        assert_eq!(normalize_label("%%"), "");
    }

    #[test]
    fn labels_resolve_with_aliases() {
        for metric in MetricId::ALL {
            assert_eq!(MetricId::from_label(metric.label()), Some(metric));
        }
        assert_eq!(
            MetricId::from_label("average daily return"),
            Some(MetricId::MeanReturn)
        );
        assert_eq!(MetricId::from_label("Sentiment!"), Some(MetricId::MarketSentiment));
        assert_eq!(MetricId::from_label("dividend yield"), None);
    }

    #[test]
    fn test_kind_parses_and_matches_types() {
        assert_eq!("T-Test".parse::<TestKind>(), Ok(TestKind::TTest));
        assert_eq!("chi square".parse::<TestKind>(), Ok(TestKind::ChiSquare));
        assert!("anova".parse::<TestKind>().is_err());
        assert_eq!(
            TestKind::for_metric_type(MetricType::Categorical),
            Some(TestKind::ChiSquare)
        );
        assert_eq!(TestKind::for_metric_type(MetricType::Mixed), None);
    }

    #[test]
    fn serde_uses_hyphenated_test_names() {
        let json = serde_json::to_string(&TestKind::ChiSquare).unwrap();
        assert_eq!(json, "\"chi-square\"");
        let kind: TestKind = serde_json::from_str("\"t-test\"").unwrap();
        assert_eq!(kind, TestKind::TTest);
    }
}
