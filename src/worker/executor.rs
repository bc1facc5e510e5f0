//! Worker execution loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::catalog::RequestCatalog;
use crate::framer::{self, FrameError, Response};
use crate::pool::{Conn, ConnectionPool, Connector};
use crate::stats::WorkerStats;

/// One load-generating thread's state
///
/// `run` consumes the worker and returns its privately accumulated
/// statistics; it never returns an error, because per-request failures are
/// data, not faults.
pub struct Worker {
    id: usize,
    catalog: Arc<RequestCatalog>,
    pool: ConnectionPool,
    stop: Arc<AtomicBool>,
    recording: bool,
    rng: SmallRng,
}

impl Worker {
    /// Create a worker with its private pool and RNG
    ///
    /// `recording` is false during the warm-up pass: classification still
    /// runs so warm-up exercises the same code path, but latencies are not
    /// retained (the whole warm-up result is discarded anyway).
    pub fn new(
        id: usize,
        catalog: Arc<RequestCatalog>,
        connector: Arc<dyn Connector>,
        pool_bound: usize,
        stop: Arc<AtomicBool>,
        recording: bool,
    ) -> Self {
        Self {
            id,
            catalog,
            pool: ConnectionPool::new(connector, pool_bound),
            stop,
            recording,
            rng: SmallRng::from_entropy(),
        }
    }

    /// Drive the request loop until the stop flag is observed
    ///
    /// The flag is checked once per iteration, so an in-flight attempt always
    /// completes before the worker exits.
    pub fn run(mut self) -> WorkerStats {
        let mut stats = WorkerStats::new(self.catalog.len());
        tracing::debug!(worker_id = self.id, "worker started");

        while !self.stop.load(Ordering::Acquire) {
            let variant = self.catalog.pick(&mut self.rng);
            self.attempt(variant, &mut stats);
        }

        tracing::debug!(
            worker_id = self.id,
            attempts = stats.total_attempts(),
            errors = stats.total_errors(),
            idle_connections = self.pool.idle(),
            "worker finished"
        );
        stats
    }

    /// One attempt: borrow, exchange, classify, return or discard
    fn attempt(&mut self, variant_idx: usize, stats: &mut WorkerStats) {
        let variant = self.catalog.variant(variant_idx);

        let mut conn = match self.pool.take() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::trace!(worker_id = self.id, error = %e, "connect failed");
                stats.record_failure(variant_idx);
                return;
            }
        };

        let start = Instant::now();
        match exchange(conn.as_mut(), variant.request()) {
            Ok(response) => {
                let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
                let accepted = variant.expect().matches(response.status);
                let latency = (accepted && self.recording).then_some(latency_ms);
                stats.record_response(variant_idx, response.status, accepted, latency);
                self.pool.put(conn);
            }
            Err(e) => {
                // Replaced, never repaired: the failed connection drops here
                // and a fresh one opens on a later attempt.
                tracing::trace!(worker_id = self.id, error = %e, "attempt failed, discarding connection");
                stats.record_failure(variant_idx);
            }
        }
    }
}

/// Write the full request, then read until the response is framed
fn exchange(conn: &mut dyn Conn, request: &[u8]) -> Result<Response, FrameError> {
    conn.write_all(request)?;
    framer::read_response(conn)
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("recording", &self.recording)
            .field("pool", &self.pool)
            .finish()
    }
}
