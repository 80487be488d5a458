use std::collections::BTreeMap;

use serde::Serialize;

/// Ordered so the worst state compares greatest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    #[default]
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }

    /// Worst of `self` and `other`.
    #[must_use]
    pub fn worst(self, other: Self) -> Self {
        self.max(other)
    }
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub state: HealthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub consecutive_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// An external service the process depends on.
#[derive(Debug, Clone, Serialize)]
pub struct Dependency {
    pub name: String,
    pub url: String,
}

/// Document served at `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: HealthState,
    /// Epoch ms of the check.
    pub checked_at: u64,
    pub version: &'static str,
    pub uptime_seconds: f64,
    pub auth: ComponentHealth,
    pub providers: BTreeMap<String, ComponentHealth>,
    pub dependencies: Vec<Dependency>,
    pub total_requests: u64,
    pub total_errors: u64,
}

impl HealthStatus {
    /// Worst of auth and every provider.
    #[must_use]
    pub fn overall(auth: &ComponentHealth, providers: &BTreeMap<String, ComponentHealth>) -> HealthState {
        providers
            .values()
            .fold(auth.state, |acc, c| acc.worst(c.state))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_puts_worst_last() {
        assert!(HealthState::Healthy < HealthState::Degraded);
        assert!(HealthState::Degraded < HealthState::Unhealthy);
        assert_eq!(
            HealthState::Degraded.worst(HealthState::Healthy),
            HealthState::Degraded
        );
        assert_eq!(
            serde_json::to_string(&HealthState::Unhealthy).unwrap(),
            "\"unhealthy\""
        );
    }
}
