//! apibench - HTTP/1.1 load-generation and latency-measurement harness

use anyhow::Result;
use clap::Parser;

use apibench::backend;
use apibench::cli::Cli;
use apibench::Error;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .init();

    let scenario = cli.scenario()?;
    let config = cli.run_config()?;

    match backend::run_scenario(&scenario, &config, cli.force_builtin) {
        Ok(report) => {
            for (name, metric) in report.iter() {
                println!("{name}: {:.3} {}", metric.value, metric.unit);
            }
            Ok(())
        }
        // An unready target skips the scenario without failing the process,
        // so a suite of scenarios can keep going.
        Err(Error::TargetUnavailable(msg)) => {
            tracing::warn!(%msg, "target unavailable, scenario skipped");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
