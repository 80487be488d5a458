use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use {
    dashmap::DashMap,
    meetbridge_config::QuotaConfig,
    meetbridge_metrics::{MetricsCollector, MetricsData},
    serde::Serialize,
};

use crate::{quota::QuotaState, rate_limit::RateLimitState};

/// Process-wide observability state, shared by the monitor, the health
/// checker and the HTTP exposure.
pub struct ObservabilityState {
    pub(crate) collector: Arc<MetricsCollector>,
    pub(crate) rate_limits: DashMap<String, RateLimitState>,
    pub(crate) quotas: DashMap<String, QuotaState>,
    pub(crate) quota_config: QuotaConfig,
    seq: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderLimits {
    pub rate_limit: RateLimitState,
    pub limited_now: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<QuotaState>,
}

/// JSON body of `/metrics/json`.
#[derive(Debug, Clone, Serialize)]
pub struct ObservabilitySnapshot {
    #[serde(flatten)]
    pub metrics: MetricsData,
    pub limits: BTreeMap<String, ProviderLimits>,
}

impl ObservabilityState {
    pub fn new(collector: Arc<MetricsCollector>, quota_config: QuotaConfig) -> Self {
        Self {
            collector,
            rate_limits: DashMap::new(),
            quotas: DashMap::new(),
            quota_config,
            seq: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn collector(&self) -> &Arc<MetricsCollector> {
        &self.collector
    }

    pub(crate) fn next_call_id(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[must_use]
    pub fn rate_limit(&self, provider: &str) -> Option<RateLimitState> {
        self.rate_limits.get(provider).map(|s| s.clone())
    }

    #[must_use]
    pub fn quota(&self, provider: &str) -> Option<QuotaState> {
        self.quotas.get(provider).map(|s| s.clone())
    }

    #[must_use]
    pub fn snapshot_at(&self, now_ms: u64) -> ObservabilitySnapshot {
        let mut limits = BTreeMap::new();
        for entry in &self.rate_limits {
            limits.insert(entry.key().clone(), ProviderLimits {
                limited_now: entry.value().is_limited_at(now_ms),
                rate_limit: entry.value().clone(),
                quota: self.quota(entry.key()),
            });
        }
        for entry in &self.quotas {
            limits
                .entry(entry.key().clone())
                .or_insert_with(|| ProviderLimits {
                    rate_limit: RateLimitState::default(),
                    limited_now: false,
                    quota: Some(entry.value().clone()),
                });
        }
        ObservabilitySnapshot {
            metrics: self.collector.snapshot_at(now_ms),
            limits,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        self.snapshot_at(meetbridge_metrics::now_ms())
    }

    /// Clear counters, events and per-provider state. Test use only.
    pub fn reset(&self) {
        self.collector.reset();
        self.rate_limits.clear();
        self.quotas.clear();
        self.seq.store(0, Ordering::Relaxed);
    }
}
