use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use sectorlab_game::numbers::usize_to_f64;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use super::RunResult;

fn success_rate(results: &[RunResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let passed = results.iter().filter(|r| r.passed).count();
    (usize_to_f64(passed) / usize_to_f64(results.len())) * 100.0
}

pub fn generate_console_report(
    out: &mut dyn Write,
    results: &[RunResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Playthrough Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==============================".cyan())?;

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    writeln!(out, "Total runs: {total}")?;
    writeln!(out, "Passed: {}", passed.to_string().green())?;
    writeln!(out, "Failed: {}", (total - passed).to_string().red())?;
    writeln!(out, "Success rate: {:.1}%", success_rate(results))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(out, "{} {}", status, result.label().bold())?;
        writeln!(
            out,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "   Mean final value: {:.2}", result.mean_final_value)?;
        writeln!(out, "   Mean correct actions: {:.1}", result.mean_correct_actions)?;
        writeln!(out, "   Average time: {:?}", result.average_duration)?;
        if let Some(first) = result.playthroughs.first() {
            for scenario in &first.scenarios {
                let verdict = if scenario.test_correct {
                    "correct test".green()
                } else {
                    "wrong test".yellow()
                };
                writeln!(
                    out,
                    "     • {} {}: p={:.4} {} P/L {:+.2}",
                    scenario.scenario_id, scenario.title, scenario.p_value, verdict, scenario.profit_loss
                )?;
            }
        }
        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    success_rate: f64,
    results: &'a [RunResult],
}

pub fn generate_json_report(out: &mut dyn Write, results: &[RunResult]) -> Result<()> {
    let report = JsonReport {
        generated_at: Utc::now().to_rfc3339(),
        success_rate: success_rate(results),
        results,
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, results: &[RunResult]) -> Result<()> {
    writeln!(out, "# Sectorlab Playthrough Results\n")?;
    writeln!(out, "_Generated {}_\n", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"))?;

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total runs**: {total}")?;
    writeln!(out, "- **Passed**: {passed}")?;
    writeln!(out, "- **Failed**: {}", total - passed)?;
    writeln!(out, "- **Success rate**: {:.1}%\n", success_rate(results))?;

    writeln!(out, "## Detailed Results\n")?;
    for result in results {
        let status = if result.passed { "✅" } else { "❌" };
        writeln!(out, "### {} {}\n", status, result.label())?;
        writeln!(
            out,
            "- **Iterations**: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "- **Mean final value**: {:.2}", result.mean_final_value)?;
        writeln!(out, "- **Average time**: {:?}", result.average_duration)?;
        if let Some(first) = result.playthroughs.first() {
            writeln!(out, "\n| Scenario | Correct | Incorrect | p-value | P/L |")?;
            writeln!(out, "|---|---|---|---|---|")?;
            for scenario in &first.scenarios {
                writeln!(
                    out,
                    "| {} | {} | {} | {:.4} | {:+.2} |",
                    scenario.title,
                    scenario.summary.correct,
                    scenario.summary.incorrect,
                    scenario.p_value,
                    scenario.profit_loss
                )?;
            }
        }
        if !result.failures.is_empty() {
            writeln!(out, "\n- **Failures**:")?;
            for failure in &result.failures {
                writeln!(out, "  - {failure}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}
