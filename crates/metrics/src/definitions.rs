//! Metric name and label definitions.
//!
//! Names under [`exposition`] are the ones rendered by
//! [`MetricsCollector::exposition`](crate::MetricsCollector::exposition).
//! Names under [`gateway`] and [`oauth`] are emitted through the `metrics`
//! facade for whatever recorder the host installs.

/// Names used in the text exposition document
pub mod exposition {
    /// Calls observed since start
    pub const REQUESTS_TOTAL: &str = "meetbridge_requests_total";
    /// Failed calls since start
    pub const ERRORS_TOTAL: &str = "meetbridge_errors_total";
    /// Calls per minute over the recent window
    pub const REQUESTS_PER_MINUTE: &str = "meetbridge_requests_per_minute";
    /// Failed fraction of calls over the recent window
    pub const ERROR_RATE: &str = "meetbridge_error_rate";
    /// Mean call latency over the recent window
    pub const LATENCY_AVG_MS: &str = "meetbridge_latency_avg_ms";
    /// Latency percentiles over the recent window (label `quantile`)
    pub const LATENCY_MS: &str = "meetbridge_latency_ms";
    /// Rate-limited calls since start
    pub const RATE_LIMIT_HITS_TOTAL: &str = "meetbridge_rate_limit_hits_total";
    /// Seconds since the collector was created
    pub const UPTIME_SECONDS: &str = "meetbridge_uptime_seconds";
    /// Per-tool calls (label `tool`)
    pub const TOOL_CALLS_TOTAL: &str = "meetbridge_tool_calls_total";
    /// Per-tool failures (label `tool`)
    pub const TOOL_ERRORS_TOTAL: &str = "meetbridge_tool_errors_total";
    /// Per-tool mean latency (label `tool`)
    pub const TOOL_LATENCY_AVG_MS: &str = "meetbridge_tool_latency_avg_ms";
    /// Per-provider calls (label `provider`)
    pub const PROVIDER_CALLS_TOTAL: &str = "meetbridge_provider_calls_total";
    /// Per-provider failures (label `provider`)
    pub const PROVIDER_ERRORS_TOTAL: &str = "meetbridge_provider_errors_total";
    /// Per-provider rate-limited calls (label `provider`)
    pub const PROVIDER_RATE_LIMIT_HITS_TOTAL: &str = "meetbridge_provider_rate_limit_hits_total";
    /// Per-provider mean latency (label `provider`)
    pub const PROVIDER_LATENCY_AVG_MS: &str = "meetbridge_provider_latency_avg_ms";
}

/// Outbound gateway calls
pub mod gateway {
    pub const CALLS_TOTAL: &str = "meetbridge_gateway_calls_total";
    pub const CALL_ERRORS_TOTAL: &str = "meetbridge_gateway_call_errors_total";
    pub const CALL_DURATION_SECONDS: &str = "meetbridge_gateway_call_duration_seconds";
    pub const RATE_LIMIT_HITS_TOTAL: &str = "meetbridge_gateway_rate_limit_hits_total";
}

/// OAuth flow metrics
pub mod oauth {
    /// Interactive authorization flows started
    pub const FLOW_STARTS_TOTAL: &str = "meetbridge_oauth_flow_starts_total";
    /// Refresh-token grants attempted
    pub const TOKEN_REFRESH_TOTAL: &str = "meetbridge_oauth_token_refresh_total";
    /// Refresh-token grants that failed
    pub const TOKEN_REFRESH_FAILURES_TOTAL: &str = "meetbridge_oauth_token_refresh_failures_total";
    /// Authorization codes exchanged
    pub const CODE_EXCHANGE_TOTAL: &str = "meetbridge_oauth_code_exchange_total";
    /// Authorization code exchanges that failed
    pub const CODE_EXCHANGE_ERRORS_TOTAL: &str = "meetbridge_oauth_code_exchange_errors_total";
}

/// Common label keys used across metrics
pub mod labels {
    pub const PROVIDER: &str = "provider";
    pub const TOOL: &str = "tool";
    pub const OPERATION: &str = "operation";
    pub const METHOD: &str = "method";
    pub const STATUS: &str = "status";
    pub const QUANTILE: &str = "quantile";
}
