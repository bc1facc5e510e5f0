//! Outcome accounting: per-worker statistics and the merged aggregate
//!
//! Worker statistics are exclusively owned by their worker for the whole
//! measurement window and merged single-threaded after every worker has
//! joined. Nothing here is shared or locked.

use std::collections::BTreeMap;
use std::time::Duration;

/// Per-variant outcome counters
#[derive(Debug, Default, Clone)]
pub struct VariantStats {
    /// Attempts, including ones that failed before a response arrived
    pub attempts: u64,

    /// Attempts that were not classified as successful
    pub errors: u64,

    /// Responses observed per status code
    pub statuses: BTreeMap<u16, u64>,

    /// Latencies of successful attempts, milliseconds
    pub latencies_ms: Vec<f64>,
}

impl VariantStats {
    /// Successful attempts
    pub fn successes(&self) -> u64 {
        self.attempts - self.errors
    }

    /// Fold another variant's counters into this one
    pub fn merge(&mut self, other: &VariantStats) {
        self.attempts += other.attempts;
        self.errors += other.errors;
        for (&status, &count) in &other.statuses {
            *self.statuses.entry(status).or_default() += count;
        }
        self.latencies_ms.extend_from_slice(&other.latencies_ms);
    }
}

/// Statistics accumulated by one worker, indexed by variant
#[derive(Debug, Clone)]
pub struct WorkerStats {
    per_variant: Vec<VariantStats>,
}

impl WorkerStats {
    /// Create empty stats for `variant_count` variants
    pub fn new(variant_count: usize) -> Self {
        Self {
            per_variant: vec![VariantStats::default(); variant_count],
        }
    }

    /// Record a framed response
    ///
    /// Every response counts as one attempt and one status-histogram entry.
    /// A response the variant's predicate accepts contributes its latency
    /// when one is supplied (the worker passes `None` during warm-up); a
    /// rejected response counts as an error.
    pub fn record_response(
        &mut self,
        variant: usize,
        status: u16,
        accepted: bool,
        latency_ms: Option<f64>,
    ) {
        let stats = &mut self.per_variant[variant];
        stats.attempts += 1;
        *stats.statuses.entry(status).or_default() += 1;
        if accepted {
            if let Some(ms) = latency_ms {
                stats.latencies_ms.push(ms);
            }
        } else {
            stats.errors += 1;
        }
    }

    /// Record an attempt that failed before a response could be framed
    pub fn record_failure(&mut self, variant: usize) {
        let stats = &mut self.per_variant[variant];
        stats.attempts += 1;
        stats.errors += 1;
    }

    /// Per-variant counters in catalog order
    pub fn per_variant(&self) -> &[VariantStats] {
        &self.per_variant
    }

    /// Attempts across all variants
    pub fn total_attempts(&self) -> u64 {
        self.per_variant.iter().map(|v| v.attempts).sum()
    }

    /// Errors across all variants
    pub fn total_errors(&self) -> u64 {
        self.per_variant.iter().map(|v| v.errors).sum()
    }

    /// Fold another worker's statistics into this one
    ///
    /// Counters sum; latency lists concatenate. Panics if variant counts
    /// differ, which would mean the workers ran different catalogs.
    pub fn merge(&mut self, other: &WorkerStats) {
        assert_eq!(
            self.per_variant.len(),
            other.per_variant.len(),
            "cannot merge stats from different catalogs"
        );
        for (mine, theirs) in self.per_variant.iter_mut().zip(&other.per_variant) {
            mine.merge(theirs);
        }
    }
}

/// Sum of all worker statistics plus the measured wall-clock window
///
/// The only structure visible outside the engine. `elapsed` is the true
/// measured duration of the phase, not the requested one, and is the
/// denominator for every throughput figure.
#[derive(Debug, Clone)]
pub struct AggregateStats {
    merged: WorkerStats,
    elapsed: Duration,
    workers: usize,
}

impl AggregateStats {
    /// Build the aggregate from already-merged worker stats
    pub fn new(merged: WorkerStats, elapsed: Duration, workers: usize) -> Self {
        Self {
            merged,
            elapsed,
            workers,
        }
    }

    /// Per-variant counters in catalog order
    pub fn per_variant(&self) -> &[VariantStats] {
        self.merged.per_variant()
    }

    /// Measured wall-clock duration of the phase
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of workers that contributed
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Attempts across all variants and workers
    pub fn total_attempts(&self) -> u64 {
        self.merged.total_attempts()
    }

    /// Errors across all variants and workers
    pub fn total_errors(&self) -> u64 {
        self.merged.total_errors()
    }

    /// Fraction of attempts classified successful, in percent
    pub fn success_rate(&self) -> f64 {
        let attempts = self.total_attempts().max(1);
        (attempts - self.total_errors()) as f64 / attempts as f64 * 100.0
    }

    /// Overall attempts per second over the measured window
    pub fn throughput(&self) -> f64 {
        self.total_attempts() as f64 / self.elapsed_secs()
    }

    /// Attempts per second for one variant
    pub fn variant_throughput(&self, variant: usize) -> f64 {
        self.per_variant()[variant].attempts as f64 / self.elapsed_secs()
    }

    fn elapsed_secs(&self) -> f64 {
        // Guard the denominator; a zero-length window cannot happen in a real
        // run but keeps the arithmetic total.
        self.elapsed.as_secs_f64().max(1e-6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accepted_response() {
        let mut stats = WorkerStats::new(2);
        stats.record_response(0, 200, true, Some(1.5));
        stats.record_response(0, 200, true, Some(2.5));

        let v = &stats.per_variant()[0];
        assert_eq!(v.attempts, 2);
        assert_eq!(v.errors, 0);
        assert_eq!(v.statuses.get(&200), Some(&2));
        assert_eq!(v.latencies_ms, vec![1.5, 2.5]);
    }

    #[test]
    fn test_record_rejected_response() {
        let mut stats = WorkerStats::new(1);
        stats.record_response(0, 500, false, None);

        let v = &stats.per_variant()[0];
        assert_eq!(v.attempts, 1);
        assert_eq!(v.errors, 1);
        assert_eq!(v.statuses.get(&500), Some(&1));
        assert!(v.latencies_ms.is_empty());
    }

    #[test]
    fn test_warmup_latency_not_retained() {
        let mut stats = WorkerStats::new(1);
        stats.record_response(0, 200, true, None);

        let v = &stats.per_variant()[0];
        assert_eq!(v.attempts, 1);
        assert!(v.latencies_ms.is_empty());
    }

    #[test]
    fn test_record_failure_counts_attempt_and_error() {
        let mut stats = WorkerStats::new(1);
        stats.record_failure(0);

        let v = &stats.per_variant()[0];
        assert_eq!(v.attempts, 1);
        assert_eq!(v.errors, 1);
        assert!(v.statuses.is_empty());
    }

    #[test]
    fn test_merge_is_exact_sum() {
        let mut a = WorkerStats::new(2);
        a.record_response(0, 200, true, Some(1.0));
        a.record_response(1, 422, true, Some(2.0));
        a.record_failure(0);

        let mut b = WorkerStats::new(2);
        b.record_response(0, 200, true, Some(3.0));
        b.record_response(0, 503, false, None);

        let mut merged = WorkerStats::new(2);
        merged.merge(&a);
        merged.merge(&b);

        assert_eq!(
            merged.total_attempts(),
            a.total_attempts() + b.total_attempts()
        );
        assert_eq!(merged.total_errors(), a.total_errors() + b.total_errors());
        assert_eq!(merged.per_variant()[0].statuses.get(&200), Some(&2));
        assert_eq!(merged.per_variant()[0].statuses.get(&503), Some(&1));
        assert_eq!(merged.per_variant()[0].latencies_ms, vec![1.0, 3.0]);
        assert_eq!(merged.per_variant()[1].latencies_ms, vec![2.0]);
    }

    #[test]
    fn test_aggregate_rates() {
        let mut merged = WorkerStats::new(1);
        for _ in 0..90 {
            merged.record_response(0, 200, true, Some(1.0));
        }
        for _ in 0..10 {
            merged.record_failure(0);
        }

        let agg = AggregateStats::new(merged, Duration::from_secs(10), 4);
        assert_eq!(agg.total_attempts(), 100);
        assert_eq!(agg.total_errors(), 10);
        assert!((agg.success_rate() - 90.0).abs() < f64::EPSILON);
        assert!((agg.throughput() - 10.0).abs() < 1e-9);
        assert_eq!(agg.workers(), 4);
    }

    #[test]
    fn test_aggregate_empty_is_meaningful() {
        let agg = AggregateStats::new(WorkerStats::new(1), Duration::from_secs(1), 1);
        assert_eq!(agg.total_attempts(), 0);
        assert_eq!(agg.throughput(), 0.0);
        assert_eq!(agg.success_rate(), 100.0);
    }
}
