//! Structured metrics snapshot, served as JSON and rendered as text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::{ProviderMetric, ToolMetric};

/// Pre-calculated latency percentiles, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PercentilesSnapshot {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl PercentilesSnapshot {
    /// Nearest-rank percentiles. `sorted` must be ascending.
    #[must_use]
    pub fn from_sorted(sorted: &[u64]) -> Self {
        Self {
            p50: nearest_rank(sorted, 50.0),
            p90: nearest_rank(sorted, 90.0),
            p95: nearest_rank(sorted, 95.0),
            p99: nearest_rank(sorted, 99.0),
        }
    }
}

fn nearest_rank(sorted: &[u64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    let idx = rank.clamp(1, sorted.len()) - 1;
    sorted[idx] as f64
}

/// Figures computed from the recent window only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowStats {
    pub window_secs: u64,
    pub requests: u64,
    pub errors: u64,
    pub rate_limit_hits: u64,
    pub requests_per_minute: f64,
    pub error_rate: f64,
    pub avg_latency_ms: f64,
    pub latency: PercentilesSnapshot,
    pub provider_calls: BTreeMap<String, u64>,
}

/// A complete snapshot of collected metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsData {
    /// Timestamp when the snapshot was taken (Unix millis)
    pub timestamp: u64,
    pub uptime_seconds: f64,
    pub total_requests: u64,
    pub total_errors: u64,
    pub total_rate_limit_hits: u64,
    /// Events currently retained in the ring.
    pub retained_events: usize,
    pub recent: WindowStats,
    pub tools: BTreeMap<String, ToolMetric>,
    pub providers: BTreeMap<String, ProviderMetric>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case::empty(&[], 0.0, 0.0)]
    #[case::single(&[7], 7.0, 7.0)]
    #[case::ten(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10], 5.0, 10.0)]
    fn percentiles(#[case] sorted: &[u64], #[case] p50: f64, #[case] p99: f64) {
        let p = PercentilesSnapshot::from_sorted(sorted);
        assert_eq!(p.p50, p50);
        assert_eq!(p.p99, p99);
    }

    #[test]
    fn p90_of_hundred() {
        let sorted: Vec<u64> = (1..=100).collect();
        let p = PercentilesSnapshot::from_sorted(&sorted);
        assert_eq!(p.p90, 90.0);
        assert_eq!(p.p95, 95.0);
    }
}
