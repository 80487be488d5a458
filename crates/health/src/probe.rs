use std::sync::Arc;

use {
    async_trait::async_trait,
    meetbridge_api::{Gateway, GatewayRequest, Provider},
};

/// One cheap request that proves a provider answers.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    fn name(&self) -> &str;

    /// Endpoint reported in the dependency list.
    fn target(&self) -> String;

    async fn probe(&self) -> Result<(), String>;
}

/// Probes a provider through the gateway with a one-item list call.
///
/// Pass an unmonitored gateway so probe traffic stays out of call metrics.
pub struct GatewayProbe {
    gateway: Arc<dyn Gateway>,
    provider: Provider,
    target: String,
}

impl GatewayProbe {
    pub fn new(gateway: Arc<dyn Gateway>, provider: Provider, target: impl Into<String>) -> Self {
        Self {
            gateway,
            provider,
            target: target.into(),
        }
    }

    fn request(&self) -> GatewayRequest {
        match self.provider {
            Provider::Calendar => GatewayRequest::get(
                Provider::Calendar,
                "health_probe",
                "users/me/calendarList",
            )
            .query("maxResults", 1),
            Provider::Meet => {
                GatewayRequest::get(Provider::Meet, "health_probe", "conferenceRecords")
                    .query("pageSize", 1)
            },
        }
    }
}

#[async_trait]
impl HealthProbe for GatewayProbe {
    fn name(&self) -> &str {
        self.provider.as_str()
    }

    fn target(&self) -> String {
        self.target.clone()
    }

    async fn probe(&self) -> Result<(), String> {
        self.gateway
            .call(self.request())
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}
