#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    meetbridge_api::{Provider, RestGateway},
    meetbridge_config::{ApiConfig, AuthConfig, CredentialSource, HealthConfig},
    meetbridge_health::{GatewayProbe, HealthChecker, HealthProbe, HealthState},
    meetbridge_oauth::{
        CredentialStore, InteractiveAuthorizer, OAuthClient, StaticTokenSource, TokenHealth,
        TokenManager, TokenResponse, TokenSource,
    },
    mockito::{Matcher, Server},
};

/// Answers from a script; once exhausted it keeps succeeding.
struct ScriptedProbe {
    name: &'static str,
    script: Mutex<VecDeque<bool>>,
    delay: Duration,
}

impl ScriptedProbe {
    fn new(name: &'static str, script: &[bool]) -> Arc<Self> {
        Arc::new(Self {
            name,
            script: Mutex::new(script.iter().copied().collect()),
            delay: Duration::ZERO,
        })
    }

    fn push(&self, ok: bool) {
        self.script.lock().unwrap().push_back(ok);
    }
}

#[async_trait]
impl HealthProbe for ScriptedProbe {
    fn name(&self) -> &str {
        self.name
    }

    fn target(&self) -> String {
        format!("https://{}.example.invalid", self.name)
    }

    async fn probe(&self) -> Result<(), String> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let ok = self.script.lock().unwrap().pop_front().unwrap_or(true);
        if ok {
            Ok(())
        } else {
            Err("503 Service Unavailable".into())
        }
    }
}

struct NoToken;

#[async_trait]
impl TokenSource for NoToken {
    async fn access_token(&self) -> meetbridge_oauth::Result<secrecy::Secret<String>> {
        unreachable!("health checks never ask for a token")
    }

    async fn force_refresh(
        &self,
        _rejected: &secrecy::Secret<String>,
    ) -> meetbridge_oauth::Result<secrecy::Secret<String>> {
        unreachable!("health checks never refresh")
    }

    async fn token_health(&self) -> TokenHealth {
        TokenHealth::Unavailable {
            reason: "no stored token".into(),
        }
    }
}

fn tokens() -> Arc<dyn TokenSource> {
    Arc::new(StaticTokenSource::new("tok"))
}

fn checker(probes: Vec<Arc<dyn HealthProbe>>) -> HealthChecker {
    HealthChecker::new(tokens(), probes, HealthConfig::default())
}

#[tokio::test]
async fn single_success_resets_after_three_failures() {
    let meet = ScriptedProbe::new("meet", &[false, false, false, true]);
    let checker = checker(vec![meet.clone()]);

    assert_eq!(checker.check().await.providers["meet"].state, HealthState::Healthy);
    let second = checker.check().await;
    assert_eq!(second.providers["meet"].state, HealthState::Degraded);
    let third = checker.check().await;
    assert_eq!(third.providers["meet"].state, HealthState::Degraded);
    assert_eq!(third.providers["meet"].consecutive_failures, 3);

    let recovered = checker.check().await;
    assert_eq!(recovered.providers["meet"].state, HealthState::Healthy);
    assert_eq!(recovered.providers["meet"].consecutive_failures, 0);
    assert_eq!(recovered.status, HealthState::Healthy);
}

#[tokio::test]
async fn sustained_failures_make_overall_unhealthy() {
    let meet = ScriptedProbe::new("meet", &[false; 6]);
    let calendar = ScriptedProbe::new("calendar", &[]);
    let checker = checker(vec![calendar, meet.clone()]);

    let mut last = None;
    for _ in 0..6 {
        last = Some(checker.check().await);
    }
    let report = last.unwrap();
    assert_eq!(report.providers["meet"].state, HealthState::Unhealthy);
    assert_eq!(report.providers["calendar"].state, HealthState::Healthy);
    assert_eq!(report.status, HealthState::Unhealthy);

    meet.push(true);
    let report = checker.check().await;
    assert_eq!(report.providers["meet"].state, HealthState::Healthy);
    assert_eq!(report.status, HealthState::Healthy);
    assert_eq!(checker.last().unwrap().status, HealthState::Healthy);
}

#[tokio::test(start_paused = true)]
async fn slow_probe_counts_as_failure() {
    let slow = Arc::new(ScriptedProbe {
        name: "meet",
        script: Mutex::new(VecDeque::new()),
        delay: Duration::from_secs(30),
    });
    let checker = checker(vec![slow]);

    let report = checker.check().await;
    let meet = &report.providers["meet"];
    assert_eq!(meet.consecutive_failures, 1);
    assert!(meet.message.as_deref().unwrap().contains("timed out"));
    assert_eq!(meet.state, HealthState::Healthy);
}

#[tokio::test]
async fn short_token_lifetime_degrades_auth() {
    let tokens: Arc<dyn TokenSource> =
        Arc::new(StaticTokenSource::new("tok").with_remaining(Duration::from_secs(120)));
    let checker = HealthChecker::new(tokens, vec![], HealthConfig::default());
    let report = checker.check().await;
    assert_eq!(report.auth.state, HealthState::Degraded);
    assert_eq!(report.status, HealthState::Degraded);
}

#[tokio::test]
async fn missing_token_is_unhealthy() {
    let checker = HealthChecker::new(Arc::new(NoToken), vec![], HealthConfig::default());
    let report = checker.check().await;
    assert_eq!(report.auth.state, HealthState::Unhealthy);
    assert_eq!(report.auth.message.as_deref(), Some("no stored token"));
    assert_eq!(report.status, HealthState::Unhealthy);
}

#[tokio::test]
async fn gateway_probes_use_one_item_list_calls() {
    let mut server = Server::new_async().await;
    let calendar = server
        .mock("GET", "/calendar/v3/users/me/calendarList")
        .match_query(Matcher::UrlEncoded("maxResults".into(), "1".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"items":[]}"#)
        .expect(1)
        .create_async()
        .await;
    let meet = server
        .mock("GET", "/v2/conferenceRecords")
        .match_query(Matcher::UrlEncoded("pageSize".into(), "1".into()))
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let config = ApiConfig {
        calendar_base_url: format!("{}/calendar", server.url()),
        meet_base_url: server.url(),
        ..Default::default()
    };
    let gateway = Arc::new(RestGateway::new(&config, tokens()).unwrap());
    let probes: Vec<Arc<dyn HealthProbe>> = vec![
        Arc::new(GatewayProbe::new(gateway.clone(), Provider::Calendar, &config.calendar_base_url)),
        Arc::new(GatewayProbe::new(gateway, Provider::Meet, &config.meet_base_url)),
    ];
    let checker = checker(probes).with_dependency("oauth", "https://oauth2.googleapis.com/token");

    let report = checker.check().await;
    assert_eq!(report.providers["calendar"].consecutive_failures, 0);
    assert_eq!(report.providers["meet"].consecutive_failures, 1);
    assert_eq!(report.dependencies.len(), 3);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["providers"]["meet"]["consecutive_failures"], 1);

    calendar.assert_async().await;
    meet.assert_async().await;
}

/// Fails the test run if anything tries to prompt.
#[derive(Default)]
struct CountingAuthorizer {
    calls: AtomicU32,
}

#[async_trait]
impl InteractiveAuthorizer for CountingAuthorizer {
    async fn authorize(&self, _oauth: &OAuthClient) -> meetbridge_oauth::Result<TokenResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(meetbridge_oauth::Error::CallbackTimeout { secs: 300 })
    }
}

#[tokio::test]
async fn gateway_probes_without_a_token_never_prompt() {
    let mut server = Server::new_async().await;
    let api = server.mock("GET", Matcher::Any).expect(0).create_async().await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("client.json"),
        r#"{"installed":{"client_id":"cid","client_secret":"cs","redirect_uris":["http://localhost"]}}"#,
    )
    .unwrap();
    let store = CredentialStore::new(CredentialSource::Files {
        credentials_path: dir.path().join("client.json"),
        token_path: dir.path().join("client.token.json"),
    });
    let authorizer = Arc::new(CountingAuthorizer::default());
    let manager = Arc::new(
        TokenManager::new(store, &AuthConfig::default(), authorizer.clone()).unwrap(),
    );

    let config = ApiConfig {
        calendar_base_url: format!("{}/calendar", server.url()),
        meet_base_url: server.url(),
        ..Default::default()
    };
    let gateway = Arc::new(RestGateway::new(&config, manager.non_interactive()).unwrap());
    let probes: Vec<Arc<dyn HealthProbe>> = vec![
        Arc::new(GatewayProbe::new(gateway.clone(), Provider::Calendar, &config.calendar_base_url)),
        Arc::new(GatewayProbe::new(gateway, Provider::Meet, &config.meet_base_url)),
    ];
    let checker = HealthChecker::new(manager.clone(), probes, HealthConfig::default());

    let report = checker.check().await;
    assert_eq!(report.auth.state, HealthState::Unhealthy);
    assert_eq!(report.status, HealthState::Unhealthy);
    assert_eq!(report.providers["meet"].consecutive_failures, 1);
    assert_eq!(report.providers["calendar"].consecutive_failures, 1);
    assert_eq!(authorizer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(manager.interactive_count(), 0);
    api.assert_async().await;
}
