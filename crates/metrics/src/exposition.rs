//! Line-oriented text exposition (Prometheus text format 0.0.4).
//!
//! The snapshot is replayed into a private Prometheus recorder and rendered
//! by it, so escaping and number formatting follow the exporter.

use metrics::{counter, describe_counter, describe_gauge, gauge, with_local_recorder};

use crate::{
    definitions::{exposition as names, labels},
    recorder::local_recorder,
    snapshot::MetricsData,
};

/// Content type for the rendered document.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render `data` with one `# HELP` / `# TYPE` block per metric name.
#[must_use]
pub fn render(data: &MetricsData) -> String {
    let (recorder, handle) = local_recorder();
    with_local_recorder(&recorder, || publish(data));
    handle.render()
}

fn publish(data: &MetricsData) {
    total(names::REQUESTS_TOTAL, "Calls observed since start.", data.total_requests);
    total(names::ERRORS_TOTAL, "Failed calls since start.", data.total_errors);
    total(
        names::RATE_LIMIT_HITS_TOTAL,
        "Rate-limited calls since start.",
        data.total_rate_limit_hits,
    );
    level(
        names::REQUESTS_PER_MINUTE,
        "Calls per minute over the recent window.",
        data.recent.requests_per_minute,
    );
    level(
        names::ERROR_RATE,
        "Fraction of failed calls over the recent window.",
        data.recent.error_rate,
    );
    level(
        names::LATENCY_AVG_MS,
        "Mean call latency in milliseconds over the recent window.",
        data.recent.avg_latency_ms,
    );
    level(names::UPTIME_SECONDS, "Seconds since the collector started.", data.uptime_seconds);

    describe_gauge!(
        names::LATENCY_MS,
        "Call latency percentiles in milliseconds over the recent window."
    );
    let p = &data.recent.latency;
    for (q, v) in [("0.5", p.p50), ("0.9", p.p90), ("0.95", p.p95), ("0.99", p.p99)] {
        gauge!(names::LATENCY_MS, labels::QUANTILE => q).set(v);
    }

    describe_counter!(names::TOOL_CALLS_TOTAL, "Calls per tool since start.");
    describe_counter!(names::TOOL_ERRORS_TOTAL, "Failed calls per tool since start.");
    describe_gauge!(names::TOOL_LATENCY_AVG_MS, "Mean latency per tool in milliseconds.");
    for (tool, m) in &data.tools {
        counter!(names::TOOL_CALLS_TOTAL, labels::TOOL => tool.clone()).absolute(m.total);
        counter!(names::TOOL_ERRORS_TOTAL, labels::TOOL => tool.clone()).absolute(m.failure);
        gauge!(names::TOOL_LATENCY_AVG_MS, labels::TOOL => tool.clone()).set(m.avg_duration_ms);
    }

    describe_counter!(names::PROVIDER_CALLS_TOTAL, "Calls per provider since start.");
    describe_counter!(names::PROVIDER_ERRORS_TOTAL, "Failed calls per provider since start.");
    describe_counter!(
        names::PROVIDER_RATE_LIMIT_HITS_TOTAL,
        "Rate-limited calls per provider since start."
    );
    describe_gauge!(
        names::PROVIDER_LATENCY_AVG_MS,
        "Mean latency per provider in milliseconds."
    );
    for (provider, m) in &data.providers {
        counter!(names::PROVIDER_CALLS_TOTAL, labels::PROVIDER => provider.clone())
            .absolute(m.total);
        counter!(names::PROVIDER_ERRORS_TOTAL, labels::PROVIDER => provider.clone())
            .absolute(m.failure);
        counter!(names::PROVIDER_RATE_LIMIT_HITS_TOTAL, labels::PROVIDER => provider.clone())
            .absolute(m.rate_limit_hits);
        gauge!(names::PROVIDER_LATENCY_AVG_MS, labels::PROVIDER => provider.clone())
            .set(m.avg_duration_ms);
    }
}

fn total(name: &'static str, help: &'static str, value: u64) {
    describe_counter!(name, help);
    counter!(name).absolute(value);
}

fn level(name: &'static str, help: &'static str, value: f64) {
    describe_gauge!(name, help);
    gauge!(name).set(value);
}
