//! HTTP monitor: health document and metrics exposition.

use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::State,
        http::{StatusCode, header},
        response::{IntoResponse, Json},
        routing::get,
    },
    meetbridge_config::ServerConfig,
    meetbridge_health::{HealthChecker, HealthState},
    meetbridge_metrics::{MetricsHandle, exposition},
    meetbridge_monitor::ObservabilityState,
    tokio::net::TcpListener,
    tower_http::trace::TraceLayer,
    tracing::info,
};

#[derive(Clone)]
pub struct MonitorState {
    pub health: Arc<HealthChecker>,
    pub observability: Arc<ObservabilityState>,
    /// Process recorder for facade counters, appended to `/metrics`.
    pub recorder: Option<MetricsHandle>,
}

/// Routes: `/health`, `/metrics`, `/metrics/json`.
pub fn build_monitor_app(state: MonitorState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/metrics/json", get(metrics_json_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve_monitor(
    config: &ServerConfig,
    state: MonitorState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "http monitor listening");
    axum::serve(listener, build_monitor_app(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn health_handler(State(state): State<MonitorState>) -> impl IntoResponse {
    let status = state.health.check().await;
    let code = match status.status {
        HealthState::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        HealthState::Healthy | HealthState::Degraded => StatusCode::OK,
    };
    (code, Json(status))
}

async fn metrics_handler(State(state): State<MonitorState>) -> impl IntoResponse {
    let mut body = state.observability.collector().exposition();
    if let Some(recorder) = &state.recorder {
        body.push('\n');
        body.push_str(&recorder.render());
    }
    ([(header::CONTENT_TYPE, exposition::CONTENT_TYPE)], body)
}

async fn metrics_json_handler(State(state): State<MonitorState>) -> impl IntoResponse {
    Json(state.observability.snapshot())
}
