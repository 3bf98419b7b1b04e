mod logic;
mod util;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use logic::{PlaythroughTester, PolicyKind, RunResult, resolve_seed_inputs};
use util::split_csv;

#[derive(Debug, Parser)]
#[command(name = "sectorlab-tester", version = "0.1.0")]
#[command(about = "Automated playthrough QA for the Sectorlab trading simulation")]
struct Args {
    /// Seeds to run (comma-separated, decimal or 0x-hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Player policies to run (comma-separated, or "all")
    #[arg(long, default_value = "informed")]
    policies: String,

    /// List all available policies and exit
    #[arg(long)]
    list_policies: bool,

    /// Number of playthroughs per policy and seed
    #[arg(long, default_value_t = 1)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Drive time with a real 100 ms timer instead of the virtual clock
    #[arg(long)]
    realtime: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_policies(&args)? {
        return Ok(());
    }

    announce_banner(&args);

    let start_time = Instant::now();
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let policies = expand_policies(&args.policies)?;
    let tester = PlaythroughTester::new(args.verbose, args.realtime);

    let mut results: Vec<RunResult> = Vec::new();
    for policy in policies {
        log::info!("running policy {policy} over {} seed(s)", seeds.len());
        results.extend(tester.run_policy(policy, &seeds, args.iterations).await);
    }

    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_policies(args: &Args) -> Result<bool> {
    if !args.list_policies {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available policies:")?;
    for kind in PolicyKind::ALL {
        writeln!(
            output_target.writer(),
            "  {:12} - {}",
            kind.label(),
            kind.description()
        )?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner(args: &Args) {
    println!("{}", "📈 Sectorlab Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
    if args.realtime {
        println!("{}", "⏱  Realtime clock: each scenario takes ~9s".yellow());
    }
}

fn expand_policies(policies_arg: &str) -> Result<Vec<PolicyKind>> {
    let mut policies = Vec::new();
    for token in split_csv(policies_arg) {
        if token.eq_ignore_ascii_case("all") {
            for kind in PolicyKind::ALL {
                if !policies.contains(&kind) {
                    policies.push(kind);
                }
            }
            continue;
        }
        let Some(kind) = PolicyKind::parse(&token) else {
            bail!("unknown policy '{token}' (try --list-policies)");
        };
        if !policies.contains(&kind) {
            policies.push(kind);
        }
    }
    if policies.is_empty() {
        bail!("no policies selected");
    }
    Ok(policies)
}

fn write_reports(args: &Args, results: &[RunResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => logic::reports::generate_json_report(&mut output_target, results)?,
        "markdown" => logic::reports::generate_markdown_report(&mut output_target, results)?,
        _ => {
            logic::reports::generate_console_report(
                &mut output_target,
                results,
                start_time.elapsed(),
            )?;
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {:?}", start_time.elapsed())?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_policies_handles_all_and_duplicates() {
        assert_eq!(
            expand_policies("informed, all").unwrap(),
            vec![PolicyKind::Informed, PolicyKind::Contrarian, PolicyKind::Random]
        );
        assert_eq!(
            expand_policies("random,random").unwrap(),
            vec![PolicyKind::Random]
        );
        assert!(expand_policies("greedy").is_err());
        assert!(expand_policies(" , ").is_err());
    }

    #[test]
    fn args_parse_defaults() {
        let args = Args::parse_from(["sectorlab-tester"]);
        assert_eq!(args.seeds, "1337");
        assert_eq!(args.policies, "informed");
        assert_eq!(args.iterations, 1);
        assert_eq!(args.report, "console");
        assert!(!args.realtime);
    }

    #[test]
    fn output_target_writes_to_file() {
        let path = std::env::temp_dir().join(format!(
            "sectorlab-output-{}",
            std::process::id()
        ));
        let mut target = OutputTarget::new(Some(path.clone())).unwrap();
        writeln!(target, "hello").unwrap();
        target.flush_inner().unwrap();
        drop(target);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
        let _ = std::fs::remove_file(path);
    }
}
