use std::time::Duration;

use {
    meetbridge_config::AuthConfig,
    secrecy::{ExposeSecret, Secret},
    tracing::debug,
    url::Url,
};

#[cfg(feature = "metrics")]
use meetbridge_metrics::{counter, definitions::oauth as oauth_metrics};

use crate::{
    Error, Result,
    pkce::{generate_pkce, generate_state},
    types::{ClientCredentials, PkceChallenge, TokenResponse},
};

/// Talks to the authorization server: builds the consent URL and calls the
/// token and revocation endpoints.
pub struct OAuthClient {
    client: ClientCredentials,
    auth_url: String,
    token_url: String,
    revoke_url: String,
    scopes: Vec<String>,
    http: reqwest::Client,
}

/// Result of starting the authorization code flow.
pub struct AuthorizationRequest {
    pub url: String,
    pub pkce: PkceChallenge,
    pub state: String,
    pub redirect_uri: String,
}

impl OAuthClient {
    pub fn new(client: ClientCredentials, config: &AuthConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            revoke_url: config.revoke_url.clone(),
            scopes: config.scopes.clone(),
            http,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client.client_id
    }

    /// Build the consent URL with PKCE and a fresh `state`.
    ///
    /// `access_type=offline` and `prompt=consent` make the server issue a
    /// refresh token even when the user has consented before.
    pub fn authorization_request(&self, redirect_uri: &str) -> Result<AuthorizationRequest> {
        #[cfg(feature = "metrics")]
        counter!(oauth_metrics::FLOW_STARTS_TOTAL).increment(1);

        let pkce = generate_pkce();
        let state = generate_state();

        let mut url = Url::parse(&self.auth_url)
            .map_err(|source| Error::external(format!("invalid auth_url: {source}"), source))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("code_challenge", &pkce.challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("state", &state);

        Ok(AuthorizationRequest {
            url: url.to_string(),
            pkce,
            state,
            redirect_uri: redirect_uri.to_string(),
        })
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse> {
        #[cfg(feature = "metrics")]
        counter!(oauth_metrics::CODE_EXCHANGE_TOTAL).increment(1);

        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.client.client_id.as_str()),
            ("client_secret", self.client.client_secret.expose_secret().as_str()),
            ("code_verifier", verifier),
        ];
        let result = self.token_request(&form).await;

        #[cfg(feature = "metrics")]
        if result.is_err() {
            counter!(oauth_metrics::CODE_EXCHANGE_ERRORS_TOTAL).increment(1);
        }
        result
    }

    /// Trade a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &Secret<String>) -> Result<TokenResponse> {
        #[cfg(feature = "metrics")]
        counter!(oauth_metrics::TOKEN_REFRESH_TOTAL).increment(1);

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.expose_secret().as_str()),
            ("client_id", self.client.client_id.as_str()),
            ("client_secret", self.client.client_secret.expose_secret().as_str()),
        ];
        let result = self.token_request(&form).await;

        #[cfg(feature = "metrics")]
        if result.is_err() {
            counter!(oauth_metrics::TOKEN_REFRESH_FAILURES_TOTAL).increment(1);
        }
        result
    }

    /// Invalidate a token at the authorization server.
    pub async fn revoke(&self, token: &Secret<String>) -> Result<()> {
        let resp = self
            .http
            .post(&self.revoke_url)
            .form(&[("token", token.expose_secret().as_str())])
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(Error::TokenEndpoint {
            status: status.as_u16(),
            message: endpoint_error_message(&body),
        })
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let resp = self.http.post(&self.token_url).form(form).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            debug!(status = status.as_u16(), "token endpoint rejected request");
            return Err(Error::TokenEndpoint {
                status: status.as_u16(),
                message: endpoint_error_message(&body),
            });
        }
        parse_token_response(&serde_json::from_str(&body)?)
    }
}

fn parse_token_response(resp: &serde_json::Value) -> Result<TokenResponse> {
    let access_token = resp["access_token"]
        .as_str()
        .ok_or_else(|| Error::message("missing access_token in response"))?
        .to_string();

    let text = |key: &str| resp[key].as_str().map(ToString::to_string);

    Ok(TokenResponse {
        access_token: Secret::new(access_token),
        refresh_token: text("refresh_token").map(Secret::new),
        expires_in: resp["expires_in"].as_u64(),
        scope: text("scope"),
        token_type: text("token_type"),
    })
}

/// `{"error": "invalid_grant", "error_description": "..."}` → readable text.
fn endpoint_error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().chars().take(200).collect();
    };
    match (
        value["error"].as_str(),
        value["error_description"].as_str(),
    ) {
        (Some(code), Some(desc)) => format!("{code}: {desc}"),
        (Some(code), None) => code.to_string(),
        (None, Some(desc)) => desc.to_string(),
        (None, None) => body.trim().chars().take(200).collect(),
    }
}
