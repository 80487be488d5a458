//! Authenticated HTTP transport shared by the calendar and meeting clients.
//!
//! Every call goes through [`Gateway::call`]. The REST implementation gates
//! preview operations, attaches the bearer token, retries once after a 401
//! with a forced refresh, and turns non-2xx answers into classified errors
//! carrying the provider's own message.

use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    meetbridge_config::ApiConfig,
    meetbridge_oauth::TokenSource,
    reqwest::{StatusCode, header::CONTENT_TYPE},
    secrecy::{ExposeSecret, Secret},
    serde_json::Value,
    tracing::{debug, warn},
};

use crate::{
    endpoints::Endpoints,
    error::{Error, Result},
    meta::ResponseMeta,
    request::{ApiTier, GatewayRequest, GatewayResponse, Provider, ResponseBody},
};

/// Error reasons Google uses for quota exhaustion on a 403.
const RATE_LIMIT_REASONS: &[&str] = &[
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "quotaExceeded",
    "dailyLimitExceeded",
    "RESOURCE_EXHAUSTED",
    "RATE_LIMIT_EXCEEDED",
];

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn call(&self, request: GatewayRequest) -> Result<GatewayResponse>;
}

#[async_trait]
impl<G: Gateway + ?Sized> Gateway for Arc<G> {
    async fn call(&self, request: GatewayRequest) -> Result<GatewayResponse> {
        (**self).call(request).await
    }
}

pub struct RestGateway {
    http: reqwest::Client,
    endpoints: Endpoints,
    tokens: Arc<dyn TokenSource>,
    enable_preview: bool,
}

impl RestGateway {
    pub fn new(config: &ApiConfig, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("meetbridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::external("failed to build http client", e))?;
        Ok(Self::with_client(http, config, tokens))
    }

    pub fn with_client(
        http: reqwest::Client,
        config: &ApiConfig,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            http,
            endpoints: Endpoints::from_config(config),
            tokens,
            enable_preview: config.enable_preview,
        }
    }

    #[must_use]
    pub fn preview_enabled(&self) -> bool {
        self.enable_preview
    }

    async fn send(
        &self,
        url: &str,
        request: &GatewayRequest,
        token: &Secret<String>,
    ) -> Result<reqwest::Response> {
        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .bearer_auth(token.expose_secret());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").json(body);
        }
        builder.send().await.map_err(|source| Error::Transport {
            provider: request.provider.to_string(),
            source,
        })
    }
}

#[async_trait]
impl Gateway for RestGateway {
    async fn call(&self, request: GatewayRequest) -> Result<GatewayResponse> {
        if request.tier == ApiTier::Preview && !self.enable_preview {
            return Err(Error::PreviewDisabled {
                operation: request.operation.clone(),
            });
        }
        let url = self
            .endpoints
            .url(request.provider, request.tier, &request.path)?;

        let token = self.tokens.access_token().await?;
        debug!(
            provider = %request.provider,
            operation = %request.operation,
            method = %request.method,
            url = %url,
            "sending request"
        );
        let mut response = self.send(&url, &request, &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(
                provider = %request.provider,
                operation = %request.operation,
                "access token rejected, refreshing and retrying once"
            );
            let fresh = self.tokens.force_refresh(&token).await?;
            response = self.send(&url, &request, &fresh).await?;
        }

        let status = response.status().as_u16();
        let meta = ResponseMeta::from_headers(status, response.headers());
        let text = response.text().await.map_err(|source| Error::Transport {
            provider: request.provider.to_string(),
            source,
        })?;
        debug!(
            provider = %request.provider,
            operation = %request.operation,
            status,
            bytes = text.len(),
            "response received"
        );

        if !(200..300).contains(&status) {
            return Err(provider_error(request.provider, meta, &text));
        }

        let body = parse_body(&request.operation, &meta, text)?;
        Ok(GatewayResponse { status, meta, body })
    }
}

fn parse_body(operation: &str, meta: &ResponseMeta, text: String) -> Result<ResponseBody> {
    if text.trim().is_empty() {
        return Ok(ResponseBody::Empty);
    }
    if meta.is_json() {
        let value = serde_json::from_str(&text).map_err(|source| Error::Decode {
            operation: operation.to_string(),
            meta: meta.clone(),
            source,
        })?;
        return Ok(ResponseBody::Json(value));
    }
    Ok(ResponseBody::Text(text))
}

/// Message and reason from a Google error envelope:
/// `{"error": {"message": "...", "status": "...", "errors": [{"reason": "..."}]}}`.
fn error_details(body: &str) -> (Option<String>, Option<String>) {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return (None, None);
    };
    let error = &value["error"];
    let message = error["message"]
        .as_str()
        .or_else(|| error.as_str())
        .map(ToString::to_string);
    let reason = error["errors"][0]["reason"]
        .as_str()
        .or_else(|| error["details"][0]["reason"].as_str())
        .or_else(|| error["status"].as_str())
        .map(ToString::to_string);
    (message, reason)
}

fn provider_error(provider: Provider, meta: ResponseMeta, body: &str) -> Error {
    let status = meta.status;
    let (message, reason) = error_details(body);
    let message = message.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("request failed")
                .to_string()
        } else {
            trimmed.chars().take(500).collect()
        }
    });

    let rate_limited = status == 429
        || (status == 403
            && reason
                .as_deref()
                .is_some_and(|r| RATE_LIMIT_REASONS.contains(&r)));

    if rate_limited {
        let retry_after_ms = meta.retry_after_secs.map(|s| s.saturating_mul(1000));
        Error::RateLimited {
            provider: provider.to_string(),
            status,
            message,
            meta,
            retry_after_ms,
        }
    } else {
        Error::Provider {
            provider: provider.to_string(),
            status,
            message,
            meta,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn meta(status: u16) -> ResponseMeta {
        ResponseMeta {
            status,
            ..Default::default()
        }
    }

    #[test]
    fn google_envelope_message_is_kept() {
        let body = r#"{"error":{"code":404,"message":"Requested entity was not found.","status":"NOT_FOUND"}}"#;
        let err = provider_error(Provider::Meet, meta(404), body);
        match err {
            Error::Provider {
                status, message, ..
            } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Requested entity was not found.");
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn quota_reason_on_403_is_rate_limit() {
        let body = r#"{"error":{"code":403,"message":"Rate Limit Exceeded","errors":[{"reason":"rateLimitExceeded"}]}}"#;
        let err = provider_error(Provider::Calendar, meta(403), body);
        assert!(matches!(err, Error::RateLimited { status: 403, .. }));
    }

    #[test]
    fn plain_403_stays_provider_error() {
        let body = r#"{"error":{"code":403,"message":"The caller does not have permission","status":"PERMISSION_DENIED"}}"#;
        let err = provider_error(Provider::Meet, meta(403), body);
        assert!(matches!(err, Error::Provider { status: 403, .. }));
    }

    #[test]
    fn empty_error_body_uses_reason_phrase() {
        let err = provider_error(Provider::Meet, meta(502), "");
        assert!(err.to_string().contains("Bad Gateway"), "{err}");
    }

    #[test]
    fn body_parsing_follows_content_type() {
        let json = ResponseMeta {
            content_type: Some("application/json; charset=UTF-8".into()),
            ..meta(200)
        };
        assert_eq!(
            parse_body("op", &json, r#"{"a":1}"#.into()).unwrap(),
            ResponseBody::Json(serde_json::json!({"a": 1}))
        );
        assert_eq!(
            parse_body("op", &meta(200), "hello".into()).unwrap(),
            ResponseBody::Text("hello".into())
        );
        assert_eq!(
            parse_body("op", &json, "  ".into()).unwrap(),
            ResponseBody::Empty
        );
        let err = parse_body("op", &json, "{not json".into()).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert_eq!(err.http_status(), Some(200));
        assert!(err.reached_network());
    }
}
