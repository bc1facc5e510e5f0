//! Built-in raw-socket load-generation backend

use std::sync::Arc;

use crate::catalog::{RequestCatalog, ScenarioSpec};
use crate::config::RunConfig;
use crate::error::Result;
use crate::pool::TcpConnector;
use crate::report::MetricReport;
use crate::runner::CoordinatorBuilder;

use super::LoadGenerator;

/// The in-process engine: pre-encoded requests over pooled raw sockets
///
/// Always available; it depends on nothing outside this process.
#[derive(Debug, Default)]
pub struct BuiltinEngine;

impl BuiltinEngine {
    /// Create the built-in engine
    pub fn new() -> Self {
        Self
    }
}

impl LoadGenerator for BuiltinEngine {
    fn name(&self) -> &str {
        "builtin"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn run(&self, scenario: &ScenarioSpec, config: &RunConfig) -> Result<MetricReport> {
        let catalog = Arc::new(RequestCatalog::build(scenario)?);
        let connector = Arc::new(TcpConnector::new(
            &scenario.host,
            scenario.port,
            config.connect_timeout,
            config.io_timeout,
        )?);

        let coordinator = CoordinatorBuilder::new()
            .config(config.clone())
            .catalog(Arc::clone(&catalog))
            .connector(connector)
            .build()?;

        let aggregate = coordinator.run()?;
        Ok(MetricReport::from_aggregate(&catalog, &aggregate))
    }
}
