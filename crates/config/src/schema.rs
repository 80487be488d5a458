//! Config schema types (auth, api, metrics, quota, health, server).
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetbridgeConfig {
    /// Append error source chains to tool errors.
    pub debug: bool,
    pub auth: AuthConfig,
    pub api: ApiConfig,
    pub metrics: MetricsConfig,
    pub quota: QuotaConfig,
    pub health: HealthConfig,
    pub server: ServerConfig,
}

/// OAuth endpoints and interactive-flow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Fixed port of the one-shot callback listener.
    pub callback_port: u16,
    pub auth_url: String,
    pub token_url: String,
    pub revoke_url: String,
    pub scopes: Vec<String>,
    /// How long the interactive flow waits for the browser callback.
    pub interactive_timeout_secs: u64,
    /// Refresh this many seconds before the access token actually expires.
    pub refresh_margin_secs: u64,
    /// Try to open the authorization URL in a browser.
    pub open_browser: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            callback_port: 3000,
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".into(),
            token_url: "https://oauth2.googleapis.com/token".into(),
            revoke_url: "https://oauth2.googleapis.com/revoke".into(),
            scopes: vec![
                "https://www.googleapis.com/auth/calendar".into(),
                "https://www.googleapis.com/auth/meetings.space.created".into(),
                "https://www.googleapis.com/auth/meetings.space.readonly".into(),
                "https://www.googleapis.com/auth/meetings.space.settings".into(),
            ],
            interactive_timeout_secs: 300,
            refresh_margin_secs: 60,
            open_browser: true,
        }
    }
}

/// Remote API surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub calendar_base_url: String,
    pub calendar_version: String,
    pub meet_base_url: String,
    pub meet_stable_version: String,
    pub meet_preview_version: String,
    /// Allow calls against the preview (v2beta) surface.
    pub enable_preview: bool,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            calendar_base_url: "https://www.googleapis.com/calendar".into(),
            calendar_version: "v3".into(),
            meet_base_url: "https://meet.googleapis.com".into(),
            meet_stable_version: "v2".into(),
            meet_preview_version: "v2beta".into(),
            enable_preview: false,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Length of the "recent" window used for rates and percentiles.
    pub window_secs: u64,
    /// Hard cap on retained call events.
    pub max_events: usize,
    /// Period of the background sweep.
    pub sweep_interval_secs: u64,
    /// Install the process-wide Prometheus recorder for facade counters.
    pub export_recorder: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            window_secs: 300,
            max_events: 1000,
            sweep_interval_secs: 60,
            export_recorder: true,
        }
    }
}

/// Heuristic quota ceilings used when responses carry no quota headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Per-provider daily ceilings, keyed by provider name.
    pub daily_limits: BTreeMap<String, u64>,
    /// Ceiling for providers missing from `daily_limits`.
    pub default_daily_limit: u64,
    /// Below this many remaining units, callers are advised to slow down.
    pub low_remaining_threshold: u64,
    /// Delay advised when remaining quota is low.
    pub low_quota_delay_ms: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        let mut daily_limits = BTreeMap::new();
        daily_limits.insert("calendar".into(), 1_000_000);
        daily_limits.insert("meet".into(), 100_000);
        Self {
            daily_limits,
            default_daily_limit: 10_000,
            low_remaining_threshold: 10,
            low_quota_delay_ms: 1000,
        }
    }
}

impl QuotaConfig {
    #[must_use]
    pub fn daily_limit(&self, provider: &str) -> u64 {
        self.daily_limits
            .get(provider)
            .copied()
            .unwrap_or(self.default_daily_limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Consecutive failures at which a provider becomes degraded.
    pub degraded_after: u32,
    /// Consecutive failures at which a provider becomes unhealthy.
    pub unhealthy_after: u32,
    pub probe_timeout_secs: u64,
    /// Token lifetime below which auth reports degraded.
    pub token_warning_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            degraded_after: 2,
            unhealthy_after: 5,
            probe_timeout_secs: 5,
            token_warning_secs: 300,
        }
    }
}

/// HTTP listener exposing `/health` and `/metrics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "127.0.0.1".into(),
            port: 9464,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_is_disabled_by_default() {
        assert!(!MeetbridgeConfig::default().api.enable_preview);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: MeetbridgeConfig = toml::from_str(
            r#"
            [api]
            enable_preview = true

            [health]
            unhealthy_after = 7
            "#,
        )
        .unwrap();
        assert!(cfg.api.enable_preview);
        assert_eq!(cfg.api.meet_preview_version, "v2beta");
        assert_eq!(cfg.health.unhealthy_after, 7);
        assert_eq!(cfg.health.degraded_after, 2);
        assert_eq!(cfg.auth.callback_port, 3000);
    }

    #[test]
    fn quota_limit_falls_back_to_default() {
        let q = QuotaConfig::default();
        assert_eq!(q.daily_limit("calendar"), 1_000_000);
        assert_eq!(q.daily_limit("unknown"), 10_000);
    }
}
