//! Coordinator execution logic

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::catalog::RequestCatalog;
use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::pool::Connector;
use crate::stats::{AggregateStats, WorkerStats};
use crate::worker::Worker;

/// Coordinator drives one complete run
///
/// Responsible for spawning workers, timing the measurement window,
/// signalling shutdown, and merging results.
pub struct Coordinator {
    pub(crate) config: RunConfig,
    pub(crate) catalog: Arc<RequestCatalog>,
    pub(crate) connector: Arc<dyn Connector>,
}

impl Coordinator {
    /// Create a new coordinator
    ///
    /// Use `CoordinatorBuilder` for validated construction.
    pub fn new(
        config: RunConfig,
        catalog: Arc<RequestCatalog>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            config,
            catalog,
            connector,
        }
    }

    /// Get the run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run warm-up (discarded) and then the measurement window
    pub fn run(&self) -> Result<AggregateStats> {
        if !self.config.warmup.is_zero() {
            tracing::info!(
                warmup_secs = self.config.warmup.as_secs_f64(),
                "starting warm-up pass"
            );
            let discarded = self.run_phase(self.config.warmup, false)?;
            tracing::info!(
                attempts = discarded.total_attempts(),
                errors = discarded.total_errors(),
                "warm-up complete, results discarded"
            );
        }

        tracing::info!(
            threads = self.config.threads,
            duration_secs = self.config.duration.as_secs_f64(),
            pool_bound = self.config.pool_bound(),
            "starting measurement window"
        );
        let aggregate = self.run_phase(self.config.duration, true)?;
        tracing::info!(
            elapsed_secs = aggregate.elapsed().as_secs_f64(),
            attempts = aggregate.total_attempts(),
            errors = aggregate.total_errors(),
            throughput = aggregate.throughput(),
            "measurement complete"
        );
        Ok(aggregate)
    }

    /// Execute one phase: spawn, wait, stop, join, merge
    ///
    /// The elapsed duration covers spawn through the last join, so the
    /// throughput denominator matches what the workers actually saw. The
    /// join carries no timeout; socket timeouts bound how long any worker
    /// can stay blocked after the flag is raised.
    fn run_phase(&self, window: Duration, recording: bool) -> Result<AggregateStats> {
        let stop = Arc::new(AtomicBool::new(false));
        let start = Instant::now();

        let mut handles = Vec::with_capacity(self.config.threads);
        for worker_id in 0..self.config.threads {
            let worker = Worker::new(
                worker_id,
                Arc::clone(&self.catalog),
                Arc::clone(&self.connector),
                self.config.pool_bound(),
                Arc::clone(&stop),
                recording,
            );
            let handle = thread::Builder::new()
                .name(format!("worker-{worker_id}"))
                .spawn(move || worker.run())?;
            handles.push(handle);
        }

        thread::sleep(window);
        stop.store(true, Ordering::Release);

        let mut merged = WorkerStats::new(self.catalog.len());
        let mut joined = 0usize;
        for (worker_id, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(stats) => {
                    merged.merge(&stats);
                    joined += 1;
                }
                Err(_) => {
                    tracing::error!(worker_id, "worker thread panicked");
                }
            }
        }
        let elapsed = start.elapsed();

        if joined == 0 {
            return Err(Error::run(format!(
                "all {} workers panicked",
                self.config.threads
            )));
        }

        Ok(AggregateStats::new(merged, elapsed, joined))
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.config)
            .field("variants", &self.catalog.len())
            .finish()
    }
}
