//! Call metrics for meetbridge.
//!
//! [`MetricsCollector`] keeps a bounded ring of recent [`CallRecord`]s and
//! all-time per-tool / per-provider aggregates. It produces a structured
//! [`MetricsData`] snapshot and a text exposition for scraping.
//!
//! The `metrics` facade macros are re-exported so instrumented crates can
//! also feed the process recorder installed by [`init_metrics`]:
//!
//! ```rust,ignore
//! use meetbridge_metrics::{counter, definitions::gateway};
//!
//! counter!(gateway::CALLS_TOTAL, "provider" => "meet").increment(1);
//! ```

mod aggregate;
mod collector;
pub mod definitions;
mod event;
pub mod exposition;
mod recorder;
mod snapshot;

pub use {
    aggregate::{CallAggregate, ProviderMetric, ToolMetric},
    collector::MetricsCollector,
    event::{CallRecord, now_ms},
    recorder::{MetricsHandle, init_metrics, local_recorder},
    snapshot::{MetricsData, PercentilesSnapshot, WindowStats},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram, with_local_recorder};
