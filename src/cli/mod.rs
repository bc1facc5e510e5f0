//! CLI argument parsing

use std::time::Duration;

use clap::Parser;

use crate::catalog::{PayloadSpec, ScenarioSpec};
use crate::config::RunConfig;
use crate::error::{Error, Result};

/// Command-line interface for driving one benchmark scenario
#[derive(Parser, Debug)]
#[command(name = "apibench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Scenario name, used in log lines and metric keys
    #[arg(long, default_value = "scenario")]
    pub name: String,

    /// Target host
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Target port
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Request path
    #[arg(long, default_value = "/")]
    pub path: String,

    /// Request body; repeat for a payload mix
    #[arg(long = "body", required = true)]
    pub bodies: Vec<String>,

    /// Selection weight per body, in the same order; omit for uniform
    #[arg(long = "weight")]
    pub weights: Vec<f64>,

    /// Worker threads
    #[arg(short, long, default_value_t = 4)]
    pub threads: usize,

    /// Measurement window in seconds
    #[arg(short, long, default_value_t = 10)]
    pub duration_secs: u64,

    /// Warm-up window in seconds; 0 skips warm-up
    #[arg(short, long, default_value_t = 2)]
    pub warmup_secs: u64,

    /// Per-worker connection pool bound; derived from threads when omitted
    #[arg(long)]
    pub connections: Option<usize>,

    /// Always use the built-in engine, even when wrk is installed
    #[arg(long)]
    pub force_builtin: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Build the scenario described by the arguments
    pub fn scenario(&self) -> Result<ScenarioSpec> {
        if !self.weights.is_empty() && self.weights.len() != self.bodies.len() {
            return Err(Error::config(format!(
                "{} weights given for {} bodies",
                self.weights.len(),
                self.bodies.len()
            )));
        }

        let mut spec = ScenarioSpec::new(&self.name, &self.host, self.port).with_path(&self.path);
        for (idx, body) in self.bodies.iter().enumerate() {
            let mut variant = PayloadSpec::new(format!("body-{}", idx + 1), body);
            if let Some(&w) = self.weights.get(idx) {
                variant = variant.with_weight(w);
            }
            spec = spec.with_variant(variant);
        }
        spec.validate()?;
        Ok(spec)
    }

    /// Build the run configuration described by the arguments
    pub fn run_config(&self) -> Result<RunConfig> {
        let mut config = RunConfig::new(self.threads)
            .with_duration(Duration::from_secs(self.duration_secs))
            .with_warmup(Duration::from_secs(self.warmup_secs));
        if let Some(n) = self.connections {
            config = config.with_connections_per_worker(n);
        }
        config.validate().map_err(|e| Error::config(e.to_string()))?;
        Ok(config)
    }
}
