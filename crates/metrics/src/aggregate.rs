use serde::{Deserialize, Serialize};

use crate::event::CallRecord;

/// Running totals for one tool or one provider.
///
/// Updated in place per call; nothing is ever recomputed from history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallAggregate {
    pub total: u64,
    pub success: u64,
    pub failure: u64,
    pub min_duration_ms: u64,
    pub avg_duration_ms: f64,
    pub max_duration_ms: u64,
    /// Epoch milliseconds of the latest call.
    pub last_invoked_ms: u64,
    pub rate_limit_hits: u64,
}

pub type ToolMetric = CallAggregate;
pub type ProviderMetric = CallAggregate;

impl CallAggregate {
    pub fn observe(&mut self, record: &CallRecord) {
        let duration = record.duration_ms();
        self.total += 1;
        if record.success {
            self.success += 1;
        } else {
            self.failure += 1;
        }
        if record.rate_limited {
            self.rate_limit_hits += 1;
        }

        if self.total == 1 {
            self.min_duration_ms = duration;
            self.max_duration_ms = duration;
            self.avg_duration_ms = duration as f64;
        } else {
            self.min_duration_ms = self.min_duration_ms.min(duration);
            self.max_duration_ms = self.max_duration_ms.max(duration);
            self.avg_duration_ms += (duration as f64 - self.avg_duration_ms) / self.total as f64;
        }
        self.last_invoked_ms = self.last_invoked_ms.max(record.ended_at_ms);
    }

    #[must_use]
    pub fn error_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.failure as f64 / self.total as f64
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn call(duration: u64, success: bool) -> CallRecord {
        CallRecord {
            id: 0,
            provider: "calendar".into(),
            tool: None,
            operation: "list_events".into(),
            method: "GET".into(),
            endpoint: "/calendars/primary/events".into(),
            started_at_ms: 1_000,
            ended_at_ms: 1_000 + duration,
            status: if success { 200 } else { 500 },
            success,
            rate_limited: false,
            error: None,
        }
    }

    #[test]
    fn incremental_average_matches_mean() {
        let mut agg = CallAggregate::default();
        for d in [10, 20, 60] {
            agg.observe(&call(d, true));
        }
        assert_eq!(agg.total, 3);
        assert!((agg.avg_duration_ms - 30.0).abs() < 1e-9);
        assert_eq!(agg.min_duration_ms, 10);
        assert_eq!(agg.max_duration_ms, 60);
    }

    #[test]
    fn failures_are_split_out() {
        let mut agg = CallAggregate::default();
        agg.observe(&call(5, true));
        agg.observe(&call(5, false));
        assert_eq!((agg.success, agg.failure), (1, 1));
        assert!((agg.error_rate() - 0.5).abs() < 1e-9);
    }
}
