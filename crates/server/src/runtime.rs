//! Wiring: credentials, gateway, monitor, tools, health.

use std::sync::Arc;

use {
    meetbridge_api::{ApiTier, Endpoints, Gateway, Provider, RestGateway},
    meetbridge_config::{CredentialSource, MeetbridgeConfig},
    meetbridge_health::{GatewayProbe, HealthChecker, HealthProbe},
    meetbridge_metrics::{MetricsCollector, MetricsHandle, init_metrics},
    meetbridge_monitor::{CallMonitor, MonitoredGateway, ObservabilityState},
    meetbridge_oauth::{TokenManager, TokenSource},
    meetbridge_tools::{ToolRegistry, build_registry},
    tokio::{io::BufReader, sync::oneshot},
    tracing::{info, warn},
};

use crate::{
    http::{MonitorState, serve_monitor},
    mcp::McpServer,
};

/// Everything a running server holds. Built once per process.
pub struct Runtime {
    pub config: MeetbridgeConfig,
    pub tokens: Arc<TokenManager>,
    pub observability: Arc<ObservabilityState>,
    pub registry: Arc<ToolRegistry>,
    pub health: Arc<HealthChecker>,
    pub recorder: Option<MetricsHandle>,
}

impl Runtime {
    /// Fails when the client credential cannot be read.
    pub fn build(config: MeetbridgeConfig, source: CredentialSource) -> anyhow::Result<Self> {
        let tokens = Arc::new(TokenManager::from_source(source, &config.auth)?);
        let token_source: Arc<dyn TokenSource> = tokens.clone();

        let rest = Arc::new(RestGateway::new(&config.api, Arc::clone(&token_source))?);
        let collector = Arc::new(MetricsCollector::from_config(&config.metrics));
        let recorder = init_metrics(&config.metrics).unwrap_or_else(|e| {
            warn!(error = %e, "metrics recorder not installed");
            None
        });
        let observability = Arc::new(ObservabilityState::new(collector, config.quota.clone()));

        let monitored: Arc<dyn Gateway> = Arc::new(MonitoredGateway::new(
            rest,
            CallMonitor::new(Arc::clone(&observability)),
        ));
        let registry = Arc::new(build_registry(monitored));

        // Probes bypass the monitor so health traffic stays out of call metrics,
        // and never prompt for authorization.
        let probe_gateway = Arc::new(RestGateway::new(&config.api, tokens.non_interactive())?);
        let probes = probes(&config, probe_gateway)?;
        let health = Arc::new(
            HealthChecker::new(token_source, probes, config.health.clone())
                .with_observability(Arc::clone(&observability))
                .with_dependency("oauth", config.auth.token_url.clone()),
        );

        info!(
            tools = ?registry.tool_names(),
            preview = config.api.enable_preview,
            "runtime ready"
        );
        Ok(Self {
            config,
            tokens,
            observability,
            registry,
            health,
            recorder,
        })
    }

    /// Serve the tool protocol on stdin/stdout until stdin closes. The HTTP
    /// monitor and the metrics sweeper run alongside and stop with it.
    pub async fn serve(self) -> anyhow::Result<()> {
        let sweeper = self
            .observability
            .collector()
            .spawn_sweeper(std::time::Duration::from_secs(
                self.config.metrics.sweep_interval_secs,
            ));

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let monitor = if self.config.server.enabled {
            let state = MonitorState {
                health: Arc::clone(&self.health),
                observability: Arc::clone(&self.observability),
                recorder: self.recorder.clone(),
            };
            let server_config = self.config.server.clone();
            Some(tokio::spawn(async move {
                let shutdown = async {
                    let _ = stop_rx.await;
                };
                if let Err(e) = serve_monitor(&server_config, state, shutdown).await {
                    warn!(error = %e, "http monitor stopped");
                }
            }))
        } else {
            None
        };

        let server = Arc::new(McpServer::new(Arc::clone(&self.registry), self.config.debug));
        info!("serving tools on stdio");
        let result = server
            .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await;

        let _ = stop_tx.send(());
        if let Some(handle) = monitor {
            let _ = handle.await;
        }
        sweeper.abort();
        info!("shutdown complete");
        result.map_err(Into::into)
    }
}

fn probes(
    config: &MeetbridgeConfig,
    rest: Arc<RestGateway>,
) -> anyhow::Result<Vec<Arc<dyn HealthProbe>>> {
    let endpoints = Endpoints::from_config(&config.api);
    let gateway: Arc<dyn Gateway> = rest;
    Ok(vec![
        Arc::new(GatewayProbe::new(
            Arc::clone(&gateway),
            Provider::Calendar,
            endpoints.base(Provider::Calendar, ApiTier::Stable)?,
        )),
        Arc::new(GatewayProbe::new(
            gateway,
            Provider::Meet,
            endpoints.base(Provider::Meet, ApiTier::Stable)?,
        )),
    ])
}
