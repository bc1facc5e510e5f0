//! Metric sink: the name → (value, unit) mapping consumed downstream
//!
//! This mapping is the engine's sole output contract. Consumers (markdown
//! rendering, regression comparison) must treat an absent key as "not
//! measured", never as zero; the builder therefore omits percentile keys for
//! variants that produced no successful latencies instead of writing zeros.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::RequestCatalog;
use crate::percentile::nearest_rank;
use crate::stats::AggregateStats;

/// A single measured value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Measured value
    pub value: f64,
    /// Unit label, e.g. "req/s", "ms", "count"
    pub unit: String,
}

/// Ordered mapping from namespaced metric name to measured value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricReport {
    metrics: BTreeMap<String, Metric>,
}

impl MetricReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a metric, replacing any previous value under the same name
    pub fn insert(&mut self, name: impl Into<String>, value: f64, unit: impl Into<String>) {
        self.metrics.insert(
            name.into(),
            Metric {
                value,
                unit: unit.into(),
            },
        );
    }

    /// Look up a metric; `None` means "not measured"
    pub fn get(&self, name: &str) -> Option<&Metric> {
        self.metrics.get(name)
    }

    /// Iterate metrics in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Metric)> {
        self.metrics.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of metrics
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Whether the report carries no metrics
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Build the report for a built-in engine run
    ///
    /// Key shapes: `"{threads} threads throughput|errors|success_rate"`
    /// overall, and `"{threads}t {variant} throughput|errors|status_{code}|
    /// p50|p95|p99"` per variant.
    pub fn from_aggregate(catalog: &RequestCatalog, agg: &AggregateStats) -> Self {
        let mut report = Self::new();
        let threads = agg.workers();

        report.insert(
            format!("{threads} threads throughput"),
            agg.throughput(),
            "req/s",
        );
        report.insert(
            format!("{threads} threads errors"),
            agg.total_errors() as f64,
            "count",
        );
        report.insert(
            format!("{threads} threads success_rate"),
            agg.success_rate(),
            "% success",
        );

        for (idx, variant) in catalog.iter().enumerate() {
            let stats = &agg.per_variant()[idx];
            let prefix = format!("{threads}t {}", variant.name());

            report.insert(
                format!("{prefix} throughput"),
                agg.variant_throughput(idx),
                "req/s",
            );
            report.insert(format!("{prefix} errors"), stats.errors as f64, "count");
            for (&status, &count) in &stats.statuses {
                report.insert(format!("{prefix} status_{status}"), count as f64, "count");
            }

            if !stats.latencies_ms.is_empty() {
                for p in [50.0, 95.0, 99.0] {
                    if let Some(value) = nearest_rank(&stats.latencies_ms, p) {
                        report.insert(format!("{prefix} p{p:.0}"), value, "ms");
                    }
                }
            }
        }

        report
    }
}

impl<'a> IntoIterator for &'a MetricReport {
    type Item = (&'a String, &'a Metric);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Metric>;

    fn into_iter(self) -> Self::IntoIter {
        self.metrics.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Expect, PayloadSpec, ScenarioSpec};
    use crate::stats::WorkerStats;
    use std::time::Duration;

    fn catalog() -> RequestCatalog {
        let spec = ScenarioSpec::new("test", "127.0.0.1", 8080)
            .with_variant(PayloadSpec::new("valid", "{}"))
            .with_variant(
                PayloadSpec::new("invalid", "{}").with_expect(Expect::AnyOf(vec![400, 422])),
            );
        RequestCatalog::build(&spec).unwrap()
    }

    #[test]
    fn test_report_key_shapes() {
        let catalog = catalog();
        let mut merged = WorkerStats::new(2);
        for _ in 0..20 {
            merged.record_response(0, 200, true, Some(1.0));
        }
        for _ in 0..10 {
            merged.record_response(1, 422, true, Some(2.0));
        }
        merged.record_failure(1);

        let agg = AggregateStats::new(merged, Duration::from_secs(2), 4);
        let report = MetricReport::from_aggregate(&catalog, &agg);

        let throughput = report.get("4 threads throughput").unwrap();
        assert!((throughput.value - 15.5).abs() < 1e-9);
        assert_eq!(throughput.unit, "req/s");

        assert_eq!(report.get("4 threads errors").unwrap().value, 1.0);
        assert_eq!(report.get("4t valid status_200").unwrap().value, 20.0);
        assert_eq!(report.get("4t invalid status_422").unwrap().value, 10.0);
        assert_eq!(report.get("4t valid p99").unwrap().value, 1.0);
        assert_eq!(report.get("4t invalid p50").unwrap().unit, "ms");
    }

    #[test]
    fn test_report_omits_percentiles_without_samples() {
        let catalog = catalog();
        let mut merged = WorkerStats::new(2);
        merged.record_failure(0);

        let agg = AggregateStats::new(merged, Duration::from_secs(1), 1);
        let report = MetricReport::from_aggregate(&catalog, &agg);

        // No successful latencies: percentile keys must be absent, not zero.
        assert!(report.get("1t valid p50").is_none());
        assert!(report.get("1t valid p99").is_none());
        assert_eq!(report.get("1t valid errors").unwrap().value, 1.0);
    }

    #[test]
    fn test_report_serialization_roundtrip() {
        let mut report = MetricReport::new();
        report.insert("4t valid p99", 1.87, "ms");

        let json = serde_json::to_string(&report).unwrap();
        let back: MetricReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("4t valid p99").unwrap().value, 1.87);
    }
}
