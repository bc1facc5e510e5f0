//! Run configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a load-generation run
///
/// Immutable once a run starts. Socket timeouts are per operation (connect,
/// read, write), not per logical request; they must be non-zero so a worker
/// blocked in a socket call is always released and cooperative shutdown
/// cannot stall indefinitely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of worker threads
    pub threads: usize,

    /// Length of the measurement window
    pub duration: Duration,

    /// Length of the discarded warm-up pass; zero skips warm-up
    pub warmup: Duration,

    /// Upper bound on each worker's private connection pool
    ///
    /// `None` derives a bound from the thread count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connections_per_worker: Option<usize>,

    /// Timeout for establishing a connection
    pub connect_timeout: Duration,

    /// Timeout for a single socket read or write
    pub io_timeout: Duration,

    /// How long to wait for the target to answer the readiness probe
    pub ready_timeout: Duration,

    /// Throughput floor below which external backend results are discarded
    pub sanity_floor: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            duration: Duration::from_secs(10),
            warmup: Duration::from_secs(2),
            connections_per_worker: None,
            connect_timeout: Duration::from_secs(5),
            io_timeout: Duration::from_secs(5),
            ready_timeout: Duration::from_secs(5),
            sanity_floor: 1000.0,
        }
    }
}

impl RunConfig {
    /// Create a new config with the given thread count
    pub fn new(threads: usize) -> Self {
        Self {
            threads,
            ..Default::default()
        }
    }

    /// Set the measurement duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set the warm-up duration
    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    /// Set an explicit per-worker connection pool bound
    pub fn with_connections_per_worker(mut self, n: usize) -> Self {
        self.connections_per_worker = Some(n);
        self
    }

    /// Effective per-worker pool bound
    ///
    /// Defaults to four connections per thread, clamped to [4, 32], so a
    /// single-threaded run still keeps a few connections warm while a wide
    /// run does not exhaust file descriptors.
    pub fn pool_bound(&self) -> usize {
        self.connections_per_worker
            .unwrap_or_else(|| (self.threads * 4).clamp(4, 32))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::InvalidThreads(
                "thread count must be at least 1".into(),
            ));
        }

        if self.duration.is_zero() {
            return Err(ConfigError::InvalidDuration(
                "measurement duration must be non-zero".into(),
            ));
        }

        if let Some(n) = self.connections_per_worker {
            if n == 0 {
                return Err(ConfigError::InvalidPoolBound(
                    "connection pool bound must be at least 1".into(),
                ));
            }
        }

        // Zero socket timeouts would let a worker block forever against a
        // misbehaving target, which in turn stalls the untimed join.
        if self.connect_timeout.is_zero() || self.io_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "socket timeouts must be non-zero".into(),
            ));
        }

        if self.sanity_floor < 0.0 {
            return Err(ConfigError::InvalidSanityFloor(
                "sanity floor must be non-negative".into(),
            ));
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid thread count
    #[error("invalid thread count: {0}")]
    InvalidThreads(String),

    /// Invalid duration
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    /// Invalid pool bound
    #[error("invalid pool bound: {0}")]
    InvalidPoolBound(String),

    /// Invalid socket timeout
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),

    /// Invalid sanity floor
    #[error("invalid sanity floor: {0}")]
    InvalidSanityFloor(String),
}
