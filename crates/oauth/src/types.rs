use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// OAuth client identity, read from the credential file or given directly.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
    /// First entry of `redirect_uris`, when the credential file has one.
    pub redirect_uri: Option<String>,
}

impl ClientCredentials {
    /// Whether the registered redirect allows the loopback listener. Desktop
    /// clients register `http://localhost`; clients without any registered
    /// redirect are assumed to allow it.
    #[must_use]
    pub fn allows_loopback_redirect(&self) -> bool {
        let Some(uri) = self.redirect_uri.as_deref() else {
            return true;
        };
        url::Url::parse(uri).is_ok_and(|u| {
            u.scheme() == "http"
                && matches!(u.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"))
        })
    }
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Token file contents.
///
/// Field names match the file written by Google's client libraries so an
/// existing token file can be reused as-is.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct StoredToken {
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub access_token: Option<Secret<String>>,
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_token: Option<Secret<String>>,
    /// Expiry of `access_token`, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl StoredToken {
    /// Whether the access token can still be used at `now_ms`, keeping
    /// `margin` in reserve. A token without a known expiry is not trusted.
    #[must_use]
    pub fn is_usable_at(&self, now_ms: i64, margin: Duration) -> bool {
        let margin_ms = i64::try_from(margin.as_millis()).unwrap_or(i64::MAX);
        match (&self.access_token, self.expiry_date) {
            (Some(_), Some(expiry)) => expiry.saturating_sub(margin_ms) > now_ms,
            _ => false,
        }
    }

    /// Remaining lifetime at `now_ms`, zero once expired.
    #[must_use]
    pub fn remaining_at(&self, now_ms: i64) -> Option<Duration> {
        self.expiry_date
            .map(|expiry| Duration::from_millis(u64::try_from(expiry - now_ms).unwrap_or(0)))
    }

    /// Fold a token-endpoint response into this token.
    ///
    /// The refresh token is kept when the response omits one.
    #[must_use]
    pub fn merged(&self, response: TokenResponse, now_ms: i64) -> Self {
        let expires_in_ms = response
            .expires_in
            .map(|secs| i64::try_from(secs.saturating_mul(1000)).unwrap_or(i64::MAX));
        Self {
            access_token: Some(response.access_token),
            refresh_token: response.refresh_token.or_else(|| self.refresh_token.clone()),
            expiry_date: expires_in_ms.map(|ms| now_ms.saturating_add(ms)),
            scope: response.scope.or_else(|| self.scope.clone()),
            token_type: response.token_type.or_else(|| self.token_type.clone()),
        }
    }
}

impl std::fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredToken")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expiry_date", &self.expiry_date)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Parsed token-endpoint response.
#[derive(Clone)]
pub struct TokenResponse {
    pub access_token: Secret<String>,
    pub refresh_token: Option<Secret<String>>,
    /// Lifetime in seconds.
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

/// PKCE challenge pair.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

/// Non-interactive view of the token, for health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenHealth {
    Valid { remaining: Duration },
    Unavailable { reason: String },
}

/// Current epoch time in milliseconds.
pub(crate) fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

/// Serialize an `Option<Secret<String>>` by exposing its inner value.
/// Use only for fields that must round-trip through the token file.
pub fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn client(redirect: Option<&str>) -> ClientCredentials {
        ClientCredentials {
            client_id: "cid".into(),
            client_secret: Secret::new("s".into()),
            redirect_uri: redirect.map(str::to_string),
        }
    }

    #[test]
    fn loopback_redirects_are_recognized() {
        assert!(client(None).allows_loopback_redirect());
        assert!(client(Some("http://localhost")).allows_loopback_redirect());
        assert!(client(Some("http://127.0.0.1:3000/oauth2callback")).allows_loopback_redirect());
        assert!(!client(Some("https://app.example.com/callback")).allows_loopback_redirect());
        assert!(!client(Some("urn:ietf:wg:oauth:2.0:oob")).allows_loopback_redirect());
    }

    fn token(expiry: Option<i64>) -> StoredToken {
        StoredToken {
            access_token: Some(Secret::new("a".into())),
            refresh_token: Some(Secret::new("r".into())),
            expiry_date: expiry,
            ..Default::default()
        }
    }

    #[test]
    fn usable_respects_margin() {
        let t = token(Some(100_000));
        assert!(t.is_usable_at(0, Duration::from_secs(60)));
        assert!(!t.is_usable_at(50_000, Duration::from_secs(60)));
        assert!(t.is_usable_at(50_000, Duration::ZERO));
        assert!(!t.is_usable_at(100_000, Duration::ZERO));
    }

    #[test]
    fn unknown_expiry_is_not_usable() {
        assert!(!token(None).is_usable_at(0, Duration::ZERO));
    }

    #[test]
    fn merge_keeps_refresh_token_when_omitted() {
        let old = token(Some(0));
        let merged = old.merged(
            TokenResponse {
                access_token: Secret::new("b".into()),
                refresh_token: None,
                expires_in: Some(3600),
                scope: None,
                token_type: Some("Bearer".into()),
            },
            1_000,
        );
        assert_eq!(merged.access_token.unwrap().expose_secret(), "b");
        assert_eq!(merged.refresh_token.unwrap().expose_secret(), "r");
        assert_eq!(merged.expiry_date, Some(3_601_000));
    }

    #[test]
    fn token_file_shape_parses() {
        let t: StoredToken = serde_json::from_str(
            r#"{"access_token":"ya29","refresh_token":"1//x","expiry_date":1700000000000,"scope":"s","token_type":"Bearer"}"#,
        )
        .unwrap();
        assert_eq!(t.expiry_date, Some(1_700_000_000_000));
        let back = serde_json::to_value(&t).unwrap();
        assert_eq!(back["refresh_token"], "1//x");
    }

    #[test]
    fn debug_redacts() {
        let dbg = format!("{:?}", token(Some(1)));
        assert!(!dbg.contains("\"a\""));
        assert!(dbg.contains("[REDACTED]"));
    }
}
