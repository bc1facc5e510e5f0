//! Error types for apibench

use thiserror::Error;

/// Engine error type
///
/// The worker hot path never produces these: request-level failures are
/// counted into worker statistics and the loop continues. `Error` covers the
/// run-level failures that are allowed to surface — a scenario that cannot
/// start, or an external backend whose results had to be discarded.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration was rejected before the run started
    #[error("configuration error: {0}")]
    Config(String),

    /// Request catalog could not encode a payload
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Run could not produce results, e.g. every worker thread panicked
    #[error("run error: {0}")]
    Run(String),

    /// Target never answered the readiness probe; the scenario is skipped
    #[error("target unavailable: {0}")]
    TargetUnavailable(String),

    /// External backend produced implausible results; discard and retry built-in
    #[error("backend sanity check failed: {0}")]
    BackendSanity(String),

    /// External backend could not be invoked
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// IO error outside the worker loop
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a catalog error
    pub fn catalog(msg: impl Into<String>) -> Self {
        Error::Catalog(msg.into())
    }

    /// Create a run error
    pub fn run(msg: impl Into<String>) -> Self {
        Error::Run(msg.into())
    }

    /// Create a target-unavailable error
    pub fn target_unavailable(msg: impl Into<String>) -> Self {
        Error::TargetUnavailable(msg.into())
    }

    /// Create a backend sanity error
    pub fn backend_sanity(msg: impl Into<String>) -> Self {
        Error::BackendSanity(msg.into())
    }

    /// Create a backend-unavailable error
    pub fn backend_unavailable(msg: impl Into<String>) -> Self {
        Error::BackendUnavailable(msg.into())
    }

    /// Whether the built-in engine should be tried after this failure
    ///
    /// Backend failures are recoverable by falling back; everything else is a
    /// hard failure for the scenario.
    pub fn is_backend_fallback(&self) -> bool {
        matches!(self, Error::BackendSanity(_) | Error::BackendUnavailable(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
