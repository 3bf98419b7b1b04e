//! Seeded synthetic sample generation.
//!
//! Samples are drawn from a fixed parameter table per metric, shifted by the
//! sector's performance group. When a sector name is supplied its seed biases
//! the uniform variates: the same sector keeps a recognizable center while
//! individual draws still vary.
use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::TAU;

use crate::classifier::PerformanceGroup;
use crate::constants::{
    MEAN_RETURN_BASE, MEAN_RETURN_SHIFT, POSITIVE_DAYS_BASE_P, POSITIVE_DAYS_SHIFT,
    SEED_BLEND_WEIGHT, SENTIMENT_NEGATIVE, SENTIMENT_NEUTRAL, SENTIMENT_POSITIVE,
    VOLATILITY_BASE, VOLATILITY_NEGATIVE_SHIFT, VOLATILITY_POSITIVE_SHIFT,
};
use crate::metrics::MetricId;
use crate::numbers::round2;
use crate::seed::SectorBias;

/// Resolved sampling parameters for one metric and performance group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    Normal { mean: f64, std_dev: f64 },
    Binary { probability: f64 },
    Categorical { probabilities: [f64; 3] },
}

impl Distribution {
    /// Look up the base parameters of a metric and apply the group shift.
    #[must_use]
    pub fn resolve(metric: MetricId, group: PerformanceGroup) -> Self {
        match metric {
            MetricId::MeanReturn => {
                let (mean, std_dev) = MEAN_RETURN_BASE;
                let shift = match group {
                    PerformanceGroup::Positive => MEAN_RETURN_SHIFT,
                    PerformanceGroup::Neutral => 0.0,
                    PerformanceGroup::Negative => -MEAN_RETURN_SHIFT,
                };
                Self::Normal {
                    mean: mean + shift,
                    std_dev,
                }
            }
            MetricId::Volatility => {
                let (mean, std_dev) = VOLATILITY_BASE;
                let shift = match group {
                    PerformanceGroup::Positive => VOLATILITY_POSITIVE_SHIFT,
                    PerformanceGroup::Neutral => 0.0,
                    PerformanceGroup::Negative => VOLATILITY_NEGATIVE_SHIFT,
                };
                Self::Normal {
                    mean: mean + shift,
                    std_dev,
                }
            }
            MetricId::PositiveReturnDays => {
                let shift = match group {
                    PerformanceGroup::Positive => POSITIVE_DAYS_SHIFT,
                    PerformanceGroup::Neutral => 0.0,
                    PerformanceGroup::Negative => -POSITIVE_DAYS_SHIFT,
                };
                Self::Binary {
                    probability: (POSITIVE_DAYS_BASE_P + shift).clamp(0.0, 1.0),
                }
            }
            MetricId::MarketSentiment => Self::Categorical {
                probabilities: match group {
                    PerformanceGroup::Positive => SENTIMENT_POSITIVE,
                    PerformanceGroup::Neutral => SENTIMENT_NEUTRAL,
                    PerformanceGroup::Negative => SENTIMENT_NEGATIVE,
                },
            },
        }
    }

    fn key_bits(self) -> [u64; 3] {
        match self {
            Self::Normal { mean, std_dev } => [mean.to_bits(), std_dev.to_bits(), 0],
            Self::Binary { probability } => [probability.to_bits(), 0, 1],
            Self::Categorical { probabilities } => probabilities.map(f64::to_bits),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SampleKey {
    metric: MetricId,
    sector: Option<String>,
    params: [u64; 3],
    sample_size: usize,
}

/// Generator of synthetic metric samples with a process-lifetime cache.
#[derive(Debug, Clone)]
pub struct SampleGenerator {
    rng: SmallRng,
    cache: HashMap<SampleKey, Vec<f64>>,
}

impl SampleGenerator {
    #[must_use]
    pub fn new(rng: SmallRng) -> Self {
        Self {
            rng,
            cache: HashMap::new(),
        }
    }

    /// Draw `sample_size` values for a metric, or return the cached draw.
    ///
    /// The returned vector is a copy; the cache keeps its own instance.
    pub fn sample(
        &mut self,
        metric: MetricId,
        group: PerformanceGroup,
        sample_size: usize,
        sector: Option<&str>,
    ) -> Vec<f64> {
        let distribution = Distribution::resolve(metric, group);
        let key = SampleKey {
            metric,
            sector: sector.map(str::to_string),
            params: distribution.key_bits(),
            sample_size,
        };
        if let Some(cached) = self.cache.get(&key) {
            log::debug!("sample cache hit for {metric} ({group}, n={sample_size})");
            return cached.clone();
        }
        let bias = sector.map(SectorBias::for_sector);
        let values = self.draw(distribution, sample_size, bias);
        self.cache.insert(key, values.clone());
        values
    }

    /// Number of cached sample arrays.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    fn draw(
        &mut self,
        distribution: Distribution,
        sample_size: usize,
        bias: Option<SectorBias>,
    ) -> Vec<f64> {
        let first_bias = bias.map(|b| b.first);
        let second_bias = bias.map(|b| b.second);
        (0..sample_size)
            .map(|_| match distribution {
                Distribution::Normal { mean, std_dev } => {
                    let u1 = self.uniform(first_bias).max(f64::MIN_POSITIVE);
                    let u2 = self.uniform(second_bias);
                    let z = (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos();
                    round2(z.mul_add(std_dev, mean))
                }
                Distribution::Binary { probability } => {
                    if self.uniform(first_bias) < probability {
                        1.0
                    } else {
                        0.0
                    }
                }
                Distribution::Categorical { probabilities } => {
                    invert_cumulative(self.uniform(first_bias), probabilities)
                }
            })
            .collect()
    }

    fn uniform(&mut self, bias: Option<f64>) -> f64 {
        let random = self.rng.r#gen::<f64>();
        bias.map_or(random, |b| {
            SEED_BLEND_WEIGHT.mul_add(b, (1.0 - SEED_BLEND_WEIGHT) * random)
        })
    }
}

fn invert_cumulative(u: f64, probabilities: [f64; 3]) -> f64 {
    let mut cumulative = 0.0;
    for (bucket, p) in [0.0, 1.0, 2.0].into_iter().zip(probabilities) {
        cumulative += p;
        if u < cumulative {
            return bucket;
        }
    }
    2.0
}
