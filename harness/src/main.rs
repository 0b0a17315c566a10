//! Lending Assertion Harness
//!
//! Replays recorded transactions through the assertion engine and reports
//! the verdict of every triggered invariant.

mod config;
mod recorded;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lending_assertions::{Orchestrator, Report};
use recorded::{Expectation, RecordedCase};

#[derive(Parser)]
#[command(name = "lending-harness", version, about = "Replay pool transactions through the invariant checks")]
struct Cli {
    /// Tolerances TOML (defaults to $ASSERTIONS_CONFIG or ./assertions.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate recorded cases
    Check {
        /// Case files (JSON)
        #[arg(required = true)]
        cases: Vec<String>,
        /// Compare each verdict with the case's recorded `expect` instead of
        /// requiring every transaction to pass
        #[arg(long)]
        regression: bool,
    },
    /// List the invariant catalogue and the operations that trigger each rule
    Rules,
    /// Write the default tolerances to a TOML file
    InitConfig {
        #[arg(default_value = config::DEFAULT_PATH)]
        path: String,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::InitConfig { path } => config::write_default(&path),
        Command::Rules => {
            let config = config::load(cli.config.as_deref())?;
            let orchestrator = Orchestrator::new(config);
            for def in orchestrator.registry().definitions() {
                let triggers: Vec<&str> = def.triggers.iter().map(|k| k.name()).collect();
                println!("{:<34} [{}]", def.name, triggers.join(", "));
                println!("{:<34} {}", "", def.description);
            }
            Ok(())
        }
        Command::Check { cases, regression } => {
            let config = config::load(cli.config.as_deref())?;
            let orchestrator = Orchestrator::new(config);

            let mut failed = 0usize;
            for path in &cases {
                let case = RecordedCase::load(path)?;
                if !run_case(&orchestrator, &case).accepted(regression) {
                    failed += 1;
                }
            }
            if failed > 0 {
                if regression {
                    anyhow::bail!("{} of {} cases did not match their expected verdict", failed, cases.len());
                }
                anyhow::bail!("{} of {} transactions rejected", failed, cases.len());
            }
            Ok(())
        }
    }
}

/// Verdict of one case next to what the case records as expected
#[derive(Debug)]
struct CaseOutcome {
    verdict: Expectation,
    expected: Option<Expectation>,
}

impl CaseOutcome {
    /// A plain check accepts only passing transactions; a regression run
    /// accepts whatever verdict the case expects (pass when unrecorded)
    fn accepted(&self, regression: bool) -> bool {
        if regression {
            self.verdict == self.expected.unwrap_or(Expectation::Pass)
        } else {
            self.verdict == Expectation::Pass
        }
    }
}

fn run_case(orchestrator: &Orchestrator, case: &RecordedCase) -> CaseOutcome {
    log::info!("case '{}' ({} calls)", case.name, case.transaction.calls.len());

    let ledger = case.ledger();
    let verdict = match orchestrator.evaluate(&case.transaction, &ledger) {
        Ok(report) => {
            print_report(&case.name, &report);
            if report.is_pass() {
                Expectation::Pass
            } else {
                Expectation::Reject
            }
        }
        Err(e) => {
            println!("{}: REJECTED (evaluation failed closed: {})", case.name, e);
            Expectation::Reject
        }
    };

    if let Some(expected) = case.expect {
        if verdict != expected {
            log::warn!("case '{}': expected {:?}, got {:?}", case.name, expected, verdict);
        }
    }
    CaseOutcome {
        verdict,
        expected: case.expect,
    }
}

fn print_report(name: &str, report: &Report) {
    let operations: Vec<&str> = report.operations.iter().map(|k| k.name()).collect();
    println!(
        "{}: {} ({} calls, {} proxy echoes, operations: {})",
        name,
        if report.is_pass() { "PASS" } else { "REJECTED" },
        report.calls,
        report.duplicates,
        operations.join(", ")
    );
    for result in &report.results {
        if result.is_pass() {
            println!("  ok    {}", result.rule);
        } else {
            for message in &result.messages {
                println!("  FAIL  {}: {}", result.rule, message);
            }
        }
    }
}
