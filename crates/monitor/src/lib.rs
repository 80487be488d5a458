//! Call monitoring for the meetbridge gateway.
//!
//! [`CallMonitor`] times every outbound call, derives per-provider
//! [`RateLimitState`] and [`QuotaState`] from status and headers, and feeds a
//! [`CallRecord`](meetbridge_metrics::CallRecord) into the shared collector.
//! [`MonitoredGateway`] applies it to any [`Gateway`](meetbridge_api::Gateway).

mod monitor;
mod monitored;
pub mod quota;
pub mod rate_limit;
mod state;

pub use {
    monitor::{CallInfo, CallMonitor},
    monitored::{MonitoredGateway, ToolScope},
    quota::{QuotaSource, QuotaState},
    rate_limit::RateLimitState,
    state::{ObservabilitySnapshot, ObservabilityState, ProviderLimits},
};
