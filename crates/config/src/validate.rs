//! Semantic validation of a loaded configuration.
//!
//! Parsing already enforces types; this catches values that parse but cannot
//! work (inverted health thresholds, zero-sized windows, non-HTTP URLs).

use crate::schema::MeetbridgeConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "health.unhealthy_after"
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    fn push(&mut self, severity: Severity, path: &str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.to_string(),
            message: message.into(),
        });
    }
}

/// Check a configuration for values that would break the runtime.
#[must_use]
pub fn validate(config: &MeetbridgeConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    let h = &config.health;
    if h.degraded_after == 0 {
        result.push(
            Severity::Error,
            "health.degraded_after",
            "must be at least 1",
        );
    }
    if h.unhealthy_after <= h.degraded_after {
        result.push(
            Severity::Error,
            "health.unhealthy_after",
            format!(
                "must be greater than health.degraded_after ({})",
                h.degraded_after
            ),
        );
    }
    if h.probe_timeout_secs == 0 {
        result.push(Severity::Error, "health.probe_timeout_secs", "must be > 0");
    }

    let m = &config.metrics;
    if m.window_secs == 0 {
        result.push(Severity::Error, "metrics.window_secs", "must be > 0");
    }
    if m.max_events < 10 {
        result.push(
            Severity::Warning,
            "metrics.max_events",
            "very small event ring; percentiles will be noisy",
        );
    }

    for (path, url) in [
        ("api.calendar_base_url", &config.api.calendar_base_url),
        ("api.meet_base_url", &config.api.meet_base_url),
        ("auth.token_url", &config.auth.token_url),
        ("auth.auth_url", &config.auth.auth_url),
    ] {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            result.push(Severity::Error, path, format!("not an HTTP(S) URL: {url}"));
        } else if url.starts_with("http://") && !is_loopback(url) {
            result.push(Severity::Warning, path, "plain HTTP to a non-loopback host");
        }
    }

    if config.auth.scopes.is_empty() {
        result.push(Severity::Error, "auth.scopes", "at least one scope is required");
    }
    if config.auth.interactive_timeout_secs == 0 {
        result.push(
            Severity::Error,
            "auth.interactive_timeout_secs",
            "must be > 0",
        );
    }

    result
}

fn is_loopback(url: &str) -> bool {
    let rest = url.trim_start_matches("http://");
    rest.starts_with("127.0.0.1") || rest.starts_with("localhost") || rest.starts_with("[::1]")
}
