//! Load-generation backends and backend selection
//!
//! Two backends produce the same metric-report shape: the built-in engine
//! (raw-socket workers in this process) and an external `wrk` process driven
//! through a generated Lua script. `wrk` is preferred when installed because
//! it saturates targets a single-process client cannot, but its results are
//! only trusted after a sanity check; any failure falls back to the built-in
//! engine so a scenario always yields measurements from a working backend.

mod builtin;
mod wrk;

pub use builtin::BuiltinEngine;
pub use wrk::WrkBackend;

use crate::catalog::ScenarioSpec;
use crate::config::RunConfig;
use crate::error::Result;
use crate::probe;
use crate::report::MetricReport;

/// A backend that can drive one scenario and report metrics
pub trait LoadGenerator {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Whether this backend can run on this machine
    fn is_available(&self) -> bool;

    /// Drive the scenario under the given configuration
    fn run(&self, scenario: &ScenarioSpec, config: &RunConfig) -> Result<MetricReport>;
}

/// Run one scenario end to end: probe readiness, pick a backend, measure
///
/// The target must answer the readiness probe before any load is generated;
/// an unready target fails the scenario with `Error::TargetUnavailable`.
/// With `force_builtin` unset, an installed `wrk` runs first and the built-in
/// engine takes over if `wrk` fails or its results do not pass the sanity
/// check. Non-backend errors are never swallowed by the fallback.
pub fn run_scenario(
    scenario: &ScenarioSpec,
    config: &RunConfig,
    force_builtin: bool,
) -> Result<MetricReport> {
    probe::wait_ready(
        &scenario.host,
        scenario.port,
        &scenario.path,
        config.ready_timeout,
    )?;

    if !force_builtin {
        let wrk = WrkBackend::from_path();
        if wrk.is_available() {
            tracing::info!(scenario = %scenario.name, backend = wrk.name(), "running external backend");
            match wrk.run(scenario, config) {
                Ok(report) => return Ok(report),
                Err(e) if e.is_backend_fallback() => {
                    tracing::warn!(
                        scenario = %scenario.name,
                        error = %e,
                        "external backend results discarded, falling back to built-in engine"
                    );
                }
                Err(e) => return Err(e),
            }
        } else {
            tracing::debug!("wrk not installed, using built-in engine");
        }
    }

    let builtin = BuiltinEngine::new();
    tracing::info!(scenario = %scenario.name, backend = builtin.name(), "running built-in engine");
    builtin.run(scenario, config)
}
