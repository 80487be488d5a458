#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use {
    meetbridge_api::{Error, Gateway, GatewayRequest, MeetApi, PageRequest, Provider, RestGateway},
    meetbridge_common::{Classify, NO_RESPONSE_STATUS},
    meetbridge_config::{ApiConfig, QuotaConfig},
    meetbridge_metrics::MetricsCollector,
    meetbridge_monitor::{CallMonitor, MonitoredGateway, ObservabilityState, ToolScope},
    meetbridge_oauth::{StaticTokenSource, TokenSource},
    mockito::{Matcher, Server},
};

struct Harness {
    state: Arc<ObservabilityState>,
    gateway: Arc<MonitoredGateway<RestGateway>>,
}

fn harness(base_url: &str) -> Harness {
    let collector = Arc::new(MetricsCollector::new(Duration::from_secs(300), 1000));
    let state = Arc::new(ObservabilityState::new(collector, QuotaConfig::default()));
    let config = ApiConfig {
        meet_base_url: base_url.to_string(),
        calendar_base_url: format!("{base_url}/calendar"),
        ..Default::default()
    };
    let tokens: Arc<dyn TokenSource> = Arc::new(StaticTokenSource::new("tok"));
    let rest = RestGateway::new(&config, tokens).unwrap();
    let gateway = Arc::new(MonitoredGateway::new(rest, CallMonitor::new(state.clone())));
    Harness { state, gateway }
}

#[tokio::test]
async fn too_many_requests_sets_limit_and_delay() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v2/spaces/abc-defg-hij")
        .with_status(429)
        .with_header("retry-after", "30")
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#)
        .create_async()
        .await;

    let h = harness(&server.url());
    let err = MeetApi::new(h.gateway.clone())
        .get_space("abc-defg-hij")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RateLimited { .. }));
    assert_eq!(err.retry_after_ms(), Some(30_000));

    let monitor = h.gateway.monitor();
    assert!(monitor.is_limited("meet"));
    assert_eq!(monitor.recommended_delay("meet"), 30_000);
    assert!(!monitor.is_limited("calendar"));

    let snapshot = h.state.snapshot();
    assert_eq!(snapshot.metrics.total_requests, 1);
    assert_eq!(snapshot.metrics.total_errors, 1);
    assert_eq!(snapshot.metrics.total_rate_limit_hits, 1);
    assert!(snapshot.limits["meet"].limited_now);
}

#[tokio::test]
async fn limit_persists_through_headerless_success() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v2/spaces/s1")
        .with_status(429)
        .with_header("retry-after", "30")
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/v2/spaces/s2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"name":"spaces/s2"}"#)
        .create_async()
        .await;

    let h = harness(&server.url());
    let meet = MeetApi::new(h.gateway.clone());
    meet.get_space("s1").await.unwrap_err();
    meet.get_space("s2").await.unwrap();

    let monitor = h.gateway.monitor();
    assert!(monitor.is_limited("meet"));
    assert_eq!(monitor.rate_limit("meet").retry_after_secs, Some(30));
    assert_eq!(h.state.collector().total_requests(), 2);
    assert_eq!(h.state.collector().total_errors(), 1);
}

#[tokio::test]
async fn low_remaining_quota_advises_a_short_delay() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v2/conferenceRecords")
        .with_status(200)
        .with_header("x-ratelimit-remaining", "3")
        .with_header("x-ratelimit-limit", "600")
        .with_header("content-type", "application/json")
        .with_body("{}")
        .create_async()
        .await;

    let h = harness(&server.url());
    MeetApi::new(h.gateway.clone())
        .list_conference_records(None, &PageRequest::default())
        .await
        .unwrap();

    let monitor = h.gateway.monitor();
    assert!(!monitor.is_limited("meet"));
    assert_eq!(monitor.recommended_delay("meet"), 1000);
    let quota = h.state.quota("meet").unwrap();
    assert_eq!(quota.remaining, 3);
    assert_eq!(quota.limit, 600);
}

#[tokio::test]
async fn exhausted_window_without_retry_after_falls_back_to_quota_delay() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v2/conferenceRecords")
        .with_status(200)
        .with_header("x-ratelimit-remaining", "0")
        .with_header("content-type", "application/json")
        .with_body("{}")
        .create_async()
        .await;
    server
        .mock("GET", "/calendar/v3/users/me/calendarList")
        .with_status(429)
        .create_async()
        .await;

    let h = harness(&server.url());
    MeetApi::new(h.gateway.clone())
        .list_conference_records(None, &PageRequest::default())
        .await
        .unwrap();

    let monitor = h.gateway.monitor();
    assert!(monitor.is_limited("meet"));
    assert_eq!(monitor.rate_limit("meet").retry_after_secs, None);
    assert_eq!(
        monitor.recommended_delay("meet"),
        QuotaConfig::default().low_quota_delay_ms
    );

    // Limited, no retry-after, quota still ample: no advice.
    let request = GatewayRequest::get(Provider::Calendar, "list_calendars", "users/me/calendarList");
    h.gateway.call(request).await.unwrap_err();
    assert!(monitor.is_limited("calendar"));
    assert_eq!(monitor.recommended_delay("calendar"), 0);
}

#[tokio::test]
async fn transport_failure_records_status_zero() {
    // Nothing listens on this port once the listener is dropped.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let h = harness(&format!("http://127.0.0.1:{port}"));
    let err = h
        .gateway
        .call(GatewayRequest::get(Provider::Meet, "get_space", "spaces/x"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport { .. }));

    let snapshot = h.state.snapshot();
    assert_eq!(snapshot.metrics.total_requests, 1);
    assert_eq!(snapshot.metrics.total_errors, 1);
    let provider = &snapshot.metrics.providers["meet"];
    assert_eq!(provider.failure, 1);
    let records = h.state.collector().latest(10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, NO_RESPONSE_STATUS);
    assert!(!records[0].rate_limited);
}

#[tokio::test]
async fn undecodable_body_keeps_response_status() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v2/spaces/x")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{truncated")
        .create_async()
        .await;

    let h = harness(&server.url());
    let err = h
        .gateway
        .call(GatewayRequest::get(Provider::Meet, "get_space", "spaces/x"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));

    let records = h.state.collector().latest(10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, 200);
    assert!(!records[0].success);
}

#[tokio::test]
async fn local_rejections_are_not_recorded() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let h = harness(&server.url());
    let meet = MeetApi::new(h.gateway.clone());
    let err = meet
        .list_members("abc", &PageRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PreviewDisabled { .. }));
    meet.get_recording("bad name").await.unwrap_err();

    assert_eq!(h.state.collector().total_requests(), 0);
    mock.assert_async().await;
}

#[tokio::test]
async fn tool_scope_attributes_calls() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v2/spaces/abc")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"name":"spaces/abc"}"#)
        .create_async()
        .await;

    let h = harness(&server.url());
    let scoped = Arc::new(ToolScope::new(h.gateway.clone(), "meet"));
    MeetApi::new(scoped).get_space("abc").await.unwrap();

    let snapshot = h.state.snapshot();
    let tool = &snapshot.metrics.tools["meet.get_space"];
    assert_eq!(tool.total, 1);
    assert_eq!(tool.success, 1);
}

#[tokio::test]
async fn reset_clears_everything() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v2/spaces/abc")
        .with_status(429)
        .create_async()
        .await;

    let h = harness(&server.url());
    MeetApi::new(h.gateway.clone())
        .get_space("abc")
        .await
        .unwrap_err();
    assert!(h.gateway.monitor().is_limited("meet"));

    h.state.reset();
    assert!(!h.gateway.monitor().is_limited("meet"));
    assert_eq!(h.state.collector().total_requests(), 0);
}
