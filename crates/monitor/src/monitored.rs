use std::sync::Arc;

use {
    async_trait::async_trait,
    meetbridge_api::{Error, Gateway, GatewayRequest, GatewayResponse, Result},
};

use crate::monitor::{CallInfo, CallMonitor};

/// A [`Gateway`] that runs every call through a [`CallMonitor`].
///
/// Rate-limit errors leave with `retry_after_ms` filled from the monitor's
/// recommendation when the response itself carried no hint.
pub struct MonitoredGateway<G> {
    inner: G,
    monitor: CallMonitor,
}

impl<G: Gateway> MonitoredGateway<G> {
    pub fn new(inner: G, monitor: CallMonitor) -> Self {
        Self { inner, monitor }
    }

    #[must_use]
    pub fn monitor(&self) -> &CallMonitor {
        &self.monitor
    }
}

#[async_trait]
impl<G: Gateway> Gateway for MonitoredGateway<G> {
    async fn call(&self, request: GatewayRequest) -> Result<GatewayResponse> {
        let info = CallInfo::from(&request);
        let provider = info.provider.clone();
        let result = self.monitor.wrap(info, self.inner.call(request)).await;
        match result {
            Err(e @ Error::RateLimited {
                retry_after_ms: None,
                ..
            }) => {
                let delay = self.monitor.recommended_delay(&provider);
                Err(e.with_retry_after_ms(delay))
            },
            other => other,
        }
    }
}

/// Stamps `"<tool>.<operation>"` on every request so per-tool metrics can be
/// attributed.
pub struct ToolScope {
    inner: Arc<dyn Gateway>,
    tool: String,
}

impl ToolScope {
    pub fn new(inner: Arc<dyn Gateway>, tool: impl Into<String>) -> Self {
        Self {
            inner,
            tool: tool.into(),
        }
    }
}

#[async_trait]
impl Gateway for ToolScope {
    async fn call(&self, mut request: GatewayRequest) -> Result<GatewayResponse> {
        if request.tool.is_none() {
            request.tool = Some(format!("{}.{}", self.tool, request.operation));
        }
        self.inner.call(request).await
    }
}
