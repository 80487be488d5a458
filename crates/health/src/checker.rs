use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};

use {
    futures::future::join_all,
    meetbridge_config::HealthConfig,
    meetbridge_metrics::now_ms,
    meetbridge_monitor::ObservabilityState,
    meetbridge_oauth::{TokenHealth, TokenSource},
    tracing::{debug, info, warn},
};

use crate::{
    probe::HealthProbe,
    status::{ComponentHealth, Dependency, HealthState, HealthStatus},
};

struct ProbeOutcome {
    name: String,
    result: Result<(), String>,
    latency_ms: u64,
}

/// Derives health for auth and each provider, then the overall verdict.
///
/// Provider state follows a consecutive-failure counter: below
/// `degraded_after` stays healthy, from `degraded_after` degraded, from
/// `unhealthy_after` unhealthy. One success resets the counter.
pub struct HealthChecker {
    tokens: Arc<dyn TokenSource>,
    probes: Vec<Arc<dyn HealthProbe>>,
    config: HealthConfig,
    observability: Option<Arc<ObservabilityState>>,
    dependencies: Vec<Dependency>,
    failures: Mutex<HashMap<String, u32>>,
    last: Mutex<Option<HealthStatus>>,
    started: Instant,
}

impl HealthChecker {
    pub fn new(
        tokens: Arc<dyn TokenSource>,
        probes: Vec<Arc<dyn HealthProbe>>,
        config: HealthConfig,
    ) -> Self {
        let dependencies = probes
            .iter()
            .map(|p| Dependency {
                name: p.name().to_string(),
                url: p.target(),
            })
            .collect();
        Self {
            tokens,
            probes,
            config,
            observability: None,
            dependencies,
            failures: Mutex::new(HashMap::new()),
            last: Mutex::new(None),
            started: Instant::now(),
        }
    }

    /// Include call totals and live rate limits in the verdict.
    #[must_use]
    pub fn with_observability(mut self, state: Arc<ObservabilityState>) -> Self {
        self.observability = Some(state);
        self
    }

    #[must_use]
    pub fn with_dependency(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.dependencies.push(Dependency {
            name: name.into(),
            url: url.into(),
        });
        self
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.probe_timeout_secs)
    }

    fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
        m.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run the auth check and every probe concurrently, each bounded by the
    /// probe timeout. Sub-check failures lower the verdict; they never
    /// make `check` itself fail.
    pub async fn check(&self) -> HealthStatus {
        let timeout = self.timeout();
        let auth = async {
            match tokio::time::timeout(timeout, self.tokens.token_health()).await {
                Ok(health) => health,
                Err(_) => TokenHealth::Unavailable {
                    reason: format!("token check timed out after {}s", timeout.as_secs()),
                },
            }
        };
        let probes = join_all(self.probes.iter().map(|p| async move {
            let started = Instant::now();
            let result = match tokio::time::timeout(timeout, p.probe()).await {
                Ok(result) => result,
                Err(_) => Err(format!("probe timed out after {}s", timeout.as_secs())),
            };
            ProbeOutcome {
                name: p.name().to_string(),
                result,
                latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            }
        }));
        let (token, outcomes) = tokio::join!(auth, probes);

        let auth = self.auth_health(token);
        let mut providers = BTreeMap::new();
        for outcome in outcomes {
            let (name, component) = self.provider_health(outcome);
            providers.insert(name, component);
        }
        self.apply_rate_limits(&mut providers);

        let status = HealthStatus::overall(&auth, &providers);
        let (total_requests, total_errors) = self
            .observability
            .as_ref()
            .map(|o| (o.collector().total_requests(), o.collector().total_errors()))
            .unwrap_or_default();

        let report = HealthStatus {
            status,
            checked_at: now_ms(),
            version: env!("CARGO_PKG_VERSION"),
            uptime_seconds: self.started.elapsed().as_secs_f64(),
            auth,
            providers,
            dependencies: self.dependencies.clone(),
            total_requests,
            total_errors,
        };

        let previous = Self::lock(&self.last)
            .replace(report.clone())
            .map(|r| r.status);
        if previous.is_some_and(|p| p != status) {
            info!(from = ?previous, to = %status, "health state changed");
        } else {
            debug!(status = %status, "health check complete");
        }
        report
    }

    /// The most recent report, without probing.
    #[must_use]
    pub fn last(&self) -> Option<HealthStatus> {
        Self::lock(&self.last).clone()
    }

    fn auth_health(&self, token: TokenHealth) -> ComponentHealth {
        match token {
            TokenHealth::Valid { remaining } => {
                let warning = Duration::from_secs(self.config.token_warning_secs);
                let (state, message) = if remaining < warning {
                    (
                        HealthState::Degraded,
                        Some(format!("token expires in {}s", remaining.as_secs())),
                    )
                } else {
                    (HealthState::Healthy, None)
                };
                ComponentHealth {
                    state,
                    message,
                    consecutive_failures: 0,
                    latency_ms: None,
                }
            },
            TokenHealth::Unavailable { reason } => {
                warn!(reason = %reason, "no usable token");
                ComponentHealth {
                    state: HealthState::Unhealthy,
                    message: Some(reason),
                    consecutive_failures: 0,
                    latency_ms: None,
                }
            },
        }
    }

    fn provider_health(&self, outcome: ProbeOutcome) -> (String, ComponentHealth) {
        let count = {
            let mut failures = Self::lock(&self.failures);
            let counter = failures.entry(outcome.name.clone()).or_insert(0);
            match &outcome.result {
                Ok(()) => *counter = 0,
                Err(e) => {
                    *counter = counter.saturating_add(1);
                    warn!(provider = %outcome.name, failures = *counter, error = %e, "health probe failed");
                },
            }
            *counter
        };
        let component = ComponentHealth {
            state: self.state_for(count),
            message: outcome.result.err(),
            consecutive_failures: count,
            latency_ms: Some(outcome.latency_ms),
        };
        (outcome.name, component)
    }

    fn state_for(&self, consecutive_failures: u32) -> HealthState {
        if consecutive_failures >= self.config.unhealthy_after {
            HealthState::Unhealthy
        } else if consecutive_failures >= self.config.degraded_after {
            HealthState::Degraded
        } else {
            HealthState::Healthy
        }
    }

    /// A provider that is rate limiting us right now is at best degraded.
    fn apply_rate_limits(&self, providers: &mut BTreeMap<String, ComponentHealth>) {
        let Some(obs) = &self.observability else {
            return;
        };
        let now = now_ms();
        for (name, component) in providers.iter_mut() {
            if obs
                .rate_limit(name)
                .is_some_and(|s| s.is_limited_at(now))
            {
                component.state = component.state.worst(HealthState::Degraded);
                component.message.get_or_insert_with(|| "rate limited".into());
            }
        }
    }
}
