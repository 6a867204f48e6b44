use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use netsim_cli::scenario_runner::run_scenario;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs a TOML test scenario against the simulator")]
struct Args {
    /// Scenario file to load and run.
    scenario: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let text = fs::read_to_string(&args.scenario)
        .with_context(|| format!("reading scenario file {}", args.scenario.display()))?;
    let scenario = toml::from_str(&text)
        .with_context(|| format!("parsing scenario file {}", args.scenario.display()))?;

    info!(name = %scenario_name(&scenario), "running scenario");
    let outcome = run_scenario(&scenario)?;

    if outcome.passed {
        println!("PASS: {}", scenario_name(&scenario));
        Ok(())
    } else {
        println!("FAIL: {}", scenario_name(&scenario));
        for failure in &outcome.failures {
            println!("  - {failure}");
        }
        anyhow::bail!("{} assertion(s) failed", outcome.failures.len());
    }
}

fn scenario_name(scenario: &netsim_types::TestScenario) -> &str {
    &scenario.name
}
