//! Nearest-rank percentile estimation
//!
//! Deterministic order-statistic percentile: always an actual sample value,
//! never an interpolation. The index rounds down and is clamped into range,
//! which biases slightly high for small sample sets; that bias is accepted
//! and documented rather than smoothed over.

/// Nearest-rank percentile of `values` for `p` in (0, 100]
///
/// Returns `None` for an empty sample set — "no data" is never reported as a
/// fabricated zero.
pub fn nearest_rank(values: &[f64], p: f64) -> Option<f64> {
    debug_assert!(p > 0.0 && p <= 100.0, "percentile out of range: {p}");
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let idx = ((sorted.len() as f64 * p / 100.0) as usize).min(sorted.len() - 1);
    Some(sorted[idx])
}
