//! Timing, classification and recording around every outbound call.

use std::{future::Future, sync::Arc};

use {
    meetbridge_api::{Error, GatewayRequest, GatewayResponse, ResponseMeta, Result},
    meetbridge_common::NO_RESPONSE_STATUS,
    meetbridge_metrics::{CallRecord, now_ms},
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use meetbridge_metrics::{
    counter,
    definitions::{gateway as gateway_metrics, labels},
    histogram,
};

use crate::{
    quota::QuotaState,
    rate_limit::{self, RateLimitState},
    state::ObservabilityState,
};

/// Identity of one call, captured before it starts.
#[derive(Debug, Clone)]
pub struct CallInfo {
    pub provider: String,
    pub operation: String,
    pub tool: Option<String>,
    pub method: String,
    pub endpoint: String,
}

impl From<&GatewayRequest> for CallInfo {
    fn from(req: &GatewayRequest) -> Self {
        Self {
            provider: req.provider.to_string(),
            operation: req.operation.clone(),
            tool: req.tool.clone(),
            method: req.method.to_string(),
            endpoint: req.endpoint(),
        }
    }
}

/// Wraps gateway calls, updating rate-limit and quota state and forwarding a
/// [`CallRecord`] to the collector.
#[derive(Clone)]
pub struct CallMonitor {
    state: Arc<ObservabilityState>,
}

impl CallMonitor {
    pub fn new(state: Arc<ObservabilityState>) -> Self {
        Self { state }
    }

    #[must_use]
    pub fn state(&self) -> &Arc<ObservabilityState> {
        &self.state
    }

    /// Run `call`, then record its outcome. The result is returned unchanged.
    ///
    /// Failures that never left the process (argument validation, disabled
    /// preview tier, token acquisition) are not recorded as calls.
    pub async fn wrap<F>(&self, info: CallInfo, call: F) -> Result<GatewayResponse>
    where
        F: Future<Output = Result<GatewayResponse>>,
    {
        let id = self.state.next_call_id();
        let started_at_ms = now_ms();
        let result = call.await;
        let ended_at_ms = now_ms();

        if let Err(e) = &result
            && !e.reached_network()
        {
            debug!(
                provider = %info.provider,
                operation = %info.operation,
                error = %e,
                "call rejected before sending"
            );
            return result;
        }

        let (status, meta, error) = match &result {
            Ok(resp) => (resp.status, Some(&resp.meta), None),
            Err(e) => (
                e.http_status().unwrap_or(NO_RESPONSE_STATUS),
                e.meta(),
                Some(e),
            ),
        };
        self.finish(info, id, started_at_ms, ended_at_ms, status, meta, error);
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        info: CallInfo,
        id: u64,
        started_at_ms: u64,
        ended_at_ms: u64,
        status: u16,
        meta: Option<&ResponseMeta>,
        error: Option<&Error>,
    ) {
        let rate_limited = rate_limit::signals_limit(status, meta);
        self.observe_limits(&info.provider, status, meta, ended_at_ms);

        let record = CallRecord {
            id,
            provider: info.provider,
            tool: info.tool,
            operation: info.operation,
            method: info.method,
            endpoint: info.endpoint,
            started_at_ms,
            ended_at_ms,
            status,
            success: error.is_none(),
            rate_limited,
            error: error.map(ToString::to_string),
        };

        #[cfg(feature = "metrics")]
        {
            counter!(
                gateway_metrics::CALLS_TOTAL,
                labels::PROVIDER => record.provider.clone(),
                labels::OPERATION => record.operation.clone()
            )
            .increment(1);
            histogram!(
                gateway_metrics::CALL_DURATION_SECONDS,
                labels::PROVIDER => record.provider.clone(),
                labels::OPERATION => record.operation.clone()
            )
            .record(record.duration_ms() as f64 / 1000.0);
            if !record.success {
                counter!(
                    gateway_metrics::CALL_ERRORS_TOTAL,
                    labels::PROVIDER => record.provider.clone(),
                    labels::STATUS => status.to_string()
                )
                .increment(1);
            }
            if rate_limited {
                counter!(
                    gateway_metrics::RATE_LIMIT_HITS_TOTAL,
                    labels::PROVIDER => record.provider.clone()
                )
                .increment(1);
            }
        }

        if rate_limited {
            warn!(
                provider = %record.provider,
                operation = %record.operation,
                status,
                retry_after_secs = ?meta.and_then(|m| m.retry_after_secs),
                "rate limit hit"
            );
        }
        if status >= 500 {
            warn!(
                provider = %record.provider,
                operation = %record.operation,
                status,
                error = ?record.error,
                "server error from provider"
            );
        }
        debug!(
            id = record.id,
            provider = %record.provider,
            operation = %record.operation,
            tool = ?record.tool,
            status,
            duration_ms = record.duration_ms(),
            success = record.success,
            "call finished"
        );

        self.state.collector.record(record);
    }

    fn observe_limits(&self, provider: &str, status: u16, meta: Option<&ResponseMeta>, now: u64) {
        {
            let mut entry = self
                .state
                .rate_limits
                .entry(provider.to_string())
                .or_default();
            let next = rate_limit::classify(&entry, status, meta, now);
            *entry = next;
        }
        let daily = self.state.quota_config.daily_limit(provider);
        self.state
            .quotas
            .entry(provider.to_string())
            .or_insert_with(|| QuotaState::new(daily, now))
            .observe(meta, now);
    }

    /// Current rate-limit state for a provider.
    #[must_use]
    pub fn rate_limit(&self, provider: &str) -> RateLimitState {
        self.state.rate_limit(provider).unwrap_or_default()
    }

    #[must_use]
    pub fn is_limited(&self, provider: &str) -> bool {
        self.rate_limit(provider).is_limited_at(now_ms())
    }

    /// Advised wait before the next call to `provider`, in milliseconds.
    #[must_use]
    pub fn recommended_delay(&self, provider: &str) -> u64 {
        self.recommended_delay_at(provider, now_ms())
    }

    pub fn recommended_delay_at(&self, provider: &str, now_ms: u64) -> u64 {
        let state = self.rate_limit(provider);
        if state.is_limited_at(now_ms)
            && let Some(secs) = state.retry_after_secs
        {
            return secs.saturating_mul(1000);
        }

        let threshold = self.state.quota_config.low_remaining_threshold;
        let low = state.remaining.is_some_and(|r| r < threshold)
            || self
                .state
                .quota(provider)
                .is_some_and(|q| q.remaining < threshold);
        if low {
            self.state.quota_config.low_quota_delay_ms
        } else {
            0
        }
    }
}
