//! Builder pattern for Coordinator construction

use std::sync::Arc;

use crate::catalog::RequestCatalog;
use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::pool::Connector;

use super::executor::Coordinator;

/// Builder for creating a Coordinator with a validated configuration
///
/// # Example
///
/// ```ignore
/// let coordinator = CoordinatorBuilder::new()
///     .config(RunConfig::new(4))
///     .catalog(catalog)
///     .connector(connector)
///     .build()?;
/// ```
pub struct CoordinatorBuilder {
    config: RunConfig,
    catalog: Option<Arc<RequestCatalog>>,
    connector: Option<Arc<dyn Connector>>,
}

impl CoordinatorBuilder {
    /// Create a new coordinator builder with the default configuration
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
            catalog: None,
            connector: None,
        }
    }

    /// Set the full run configuration
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the worker thread count
    pub fn threads(mut self, threads: usize) -> Self {
        self.config.threads = threads;
        self
    }

    /// Set the request catalog
    pub fn catalog(mut self, catalog: Arc<RequestCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Set the connector workers open connections through
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Build the coordinator
    ///
    /// # Errors
    ///
    /// Returns an error if catalog or connector are not set, or if the
    /// configuration fails validation.
    pub fn build(self) -> Result<Coordinator> {
        let catalog = self
            .catalog
            .ok_or_else(|| Error::config("coordinator requires a request catalog"))?;
        let connector = self
            .connector
            .ok_or_else(|| Error::config("coordinator requires a connector"))?;

        self.config
            .validate()
            .map_err(|e| Error::config(e.to_string()))?;

        Ok(Coordinator::new(self.config, catalog, connector))
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
