//! Process-wide recorder for the `metrics` facade.

use {
    anyhow::Result,
    meetbridge_config::MetricsConfig,
    metrics_exporter_prometheus::{
        Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
    },
    tracing::info,
};

/// Buckets for outbound call durations, in seconds.
const CALL_DURATION_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Renders whatever the recorder behind it has collected.
#[derive(Clone)]
pub struct MetricsHandle {
    prometheus_handle: PrometheusHandle,
}

impl MetricsHandle {
    /// Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.prometheus_handle.render()
    }
}

/// Install the global recorder so `counter!`/`histogram!` calls in the
/// monitor and OAuth crates are kept. `None` when disabled in config.
///
/// # Errors
///
/// Fails when a global recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> Result<Option<MetricsHandle>> {
    if !config.export_recorder {
        info!("metrics recorder disabled");
        return Ok(None);
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("_duration_seconds".to_string()),
            CALL_DURATION_BUCKETS,
        )?
        .install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(Some(MetricsHandle {
        prometheus_handle: handle,
    }))
}

/// A recorder that is not installed globally. Feed it through
/// [`with_local_recorder`](metrics::with_local_recorder).
#[must_use]
pub fn local_recorder() -> (PrometheusRecorder, MetricsHandle) {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = MetricsHandle {
        prometheus_handle: recorder.handle(),
    };
    (recorder, handle)
}
