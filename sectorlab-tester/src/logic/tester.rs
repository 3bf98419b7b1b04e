use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::driver::Clock;
use super::playthrough::{PlaythroughSummary, run_playthrough};
use super::policy::PolicyKind;

/// Aggregate over every iteration of one policy and base seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub policy: PolicyKind,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    pub mean_final_value: f64,
    pub mean_correct_actions: f64,
    pub playthroughs: Vec<PlaythroughSummary>,
}

impl RunResult {
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} (seed {})", self.policy, self.seed)
    }
}

/// Runs playthroughs for a policy across iterations.
pub struct PlaythroughTester {
    verbose: bool,
    realtime: bool,
}

impl PlaythroughTester {
    pub const fn new(verbose: bool, realtime: bool) -> Self {
        Self { verbose, realtime }
    }

    pub async fn run_policy(&self, policy: PolicyKind, seeds: &[u64], iterations: usize) -> Vec<RunResult> {
        let mut results = Vec::new();
        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Playing policy: {} (seed: {seed})",
                    policy.label().bright_white()
                );
            }
            results.push(self.run_single(policy, seed, iterations).await);
        }
        results
    }

    async fn run_single(&self, policy: PolicyKind, seed: u64, iterations: usize) -> RunResult {
        let mut failures = Vec::new();
        let mut durations = Vec::new();
        let mut playthroughs = Vec::new();
        let mut successes = 0;

        for i in 0..iterations {
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
            let clock = if self.realtime {
                Clock::realtime()
            } else {
                Clock::virtual_clock()
            };
            let start = Instant::now();
            match run_playthrough(iteration_seed, policy, clock, self.verbose).await {
                Ok(summary) => {
                    if summary.passed() {
                        successes += 1;
                    } else {
                        failures.extend(summary.failures.iter().map(|failure| {
                            format!("Iteration {} (seed {iteration_seed}): {failure}", i + 1)
                        }));
                    }
                    playthroughs.push(summary);
                }
                Err(err) => {
                    failures.push(format!("Iteration {} (seed {iteration_seed}): {err:#}", i + 1));
                }
            }
            durations.push(start.elapsed());
        }

        let average_duration = if durations.is_empty() {
            Duration::ZERO
        } else {
            durations.iter().sum::<Duration>() / u32::try_from(durations.len()).unwrap_or(1)
        };
        let count = u32::try_from(playthroughs.len()).unwrap_or(u32::MAX).max(1);
        let mean_final_value =
            playthroughs.iter().map(|p| p.final_value).sum::<f64>() / f64::from(count);
        let correct_total: u32 = playthroughs
            .iter()
            .map(|p| u32::try_from(p.correct_actions()).unwrap_or(u32::MAX))
            .sum();
        let mean_correct_actions = f64::from(correct_total) / f64::from(count);

        RunResult {
            policy,
            seed,
            passed: failures.is_empty() && successes == iterations,
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_duration,
            mean_final_value,
            mean_correct_actions,
            playthroughs,
        }
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}
