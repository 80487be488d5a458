use std::{
    collections::{BTreeMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};

use {
    tokio::task::JoinHandle,
    tracing::{debug, trace},
};

use crate::{
    aggregate::CallAggregate,
    event::{CallRecord, now_ms},
    exposition,
    snapshot::{MetricsData, PercentilesSnapshot, WindowStats},
};

#[derive(Default)]
struct Inner {
    events: VecDeque<CallRecord>,
    tools: BTreeMap<String, CallAggregate>,
    providers: BTreeMap<String, CallAggregate>,
    total_requests: u64,
    total_errors: u64,
    total_rate_limit_hits: u64,
}

/// Bounded ring of recent calls plus all-time per-tool and per-provider
/// aggregates.
pub struct MetricsCollector {
    inner: Mutex<Inner>,
    window: Duration,
    max_events: usize,
    started: Instant,
}

impl MetricsCollector {
    pub fn new(window: Duration, max_events: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            window,
            max_events: max_events.max(1),
            started: Instant::now(),
        }
    }

    pub fn from_config(config: &meetbridge_config::MetricsConfig) -> Self {
        Self::new(Duration::from_secs(config.window_secs), config.max_events)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Append a finalized call and fold it into the aggregates.
    ///
    /// When the ring is over capacity the oldest fifth is dropped at once.
    pub fn record(&self, record: CallRecord) {
        let mut inner = self.lock();
        inner.total_requests += 1;
        if !record.success {
            inner.total_errors += 1;
        }
        if record.rate_limited {
            inner.total_rate_limit_hits += 1;
        }
        inner
            .tools
            .entry(record.tool_label().to_string())
            .or_default()
            .observe(&record);
        inner
            .providers
            .entry(record.provider.clone())
            .or_default()
            .observe(&record);

        inner.events.push_back(record);
        if inner.events.len() > self.max_events {
            let drop = (self.max_events / 5).max(1);
            inner.events.drain(..drop);
            debug!(dropped = drop, retained = inner.events.len(), "metrics ring over capacity");
        }
    }

    /// Discard events that ended more than two windows ago. Returns how many
    /// were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(now_ms())
    }

    pub fn sweep_at(&self, now_ms: u64) -> usize {
        let horizon = u64::try_from(self.window.as_millis().saturating_mul(2)).unwrap_or(u64::MAX);
        let cutoff = now_ms.saturating_sub(horizon);
        let mut inner = self.lock();
        let before = inner.events.len();
        inner.events.retain(|e| e.ended_at_ms >= cutoff);
        let removed = before - inner.events.len();
        if removed > 0 {
            trace!(removed, "swept stale metric events");
        }
        removed
    }

    /// Run [`sweep`](Self::sweep) every `every` until the collector is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        // The schedule starts now, not when the task is first polled.
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        tokio::spawn(async move {
            loop {
                ticker.tick().await;
                let Some(collector) = weak.upgrade() else {
                    break;
                };
                collector.sweep();
            }
        })
    }

    pub fn total_requests(&self) -> u64 {
        self.lock().total_requests
    }

    pub fn total_errors(&self) -> u64 {
        self.lock().total_errors
    }

    /// The newest `limit` retained events, oldest first.
    pub fn latest(&self, limit: usize) -> Vec<CallRecord> {
        let inner = self.lock();
        let skip = inner.events.len().saturating_sub(limit);
        inner.events.iter().skip(skip).cloned().collect()
    }

    pub fn snapshot(&self) -> MetricsData {
        self.snapshot_at(now_ms())
    }

    pub fn snapshot_at(&self, now_ms: u64) -> MetricsData {
        let window_ms = u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX);
        let cutoff = now_ms.saturating_sub(window_ms);

        let inner = self.lock();
        let mut recent = WindowStats {
            window_secs: self.window.as_secs(),
            ..Default::default()
        };
        let mut durations = Vec::new();
        for e in inner.events.iter().filter(|e| e.ended_at_ms >= cutoff) {
            recent.requests += 1;
            if !e.success {
                recent.errors += 1;
            }
            if e.rate_limited {
                recent.rate_limit_hits += 1;
            }
            *recent.provider_calls.entry(e.provider.clone()).or_default() += 1;
            durations.push(e.duration_ms());
        }

        if recent.requests > 0 {
            let minutes = (window_ms as f64 / 60_000.0).max(1.0 / 60.0);
            recent.requests_per_minute = recent.requests as f64 / minutes;
            recent.error_rate = recent.errors as f64 / recent.requests as f64;
            recent.avg_latency_ms =
                durations.iter().sum::<u64>() as f64 / durations.len() as f64;
            durations.sort_unstable();
            recent.latency = PercentilesSnapshot::from_sorted(&durations);
        }

        MetricsData {
            timestamp: now_ms,
            uptime_seconds: self.started.elapsed().as_secs_f64(),
            total_requests: inner.total_requests,
            total_errors: inner.total_errors,
            total_rate_limit_hits: inner.total_rate_limit_hits,
            retained_events: inner.events.len(),
            recent,
            tools: inner.tools.clone(),
            providers: inner.providers.clone(),
        }
    }

    /// Text exposition of [`snapshot`](Self::snapshot).
    pub fn exposition(&self) -> String {
        exposition::render(&self.snapshot())
    }

    /// Zero every counter and drop all events. Only tests should call this;
    /// the totals are otherwise monotonic for the life of the process.
    pub fn reset(&self) {
        *self.lock() = Inner::default();
    }
}
