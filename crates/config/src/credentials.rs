//! Resolution of the credential source from environment-style variables.
//!
//! Three schemes are recognised, and exactly one must resolve:
//!
//! 1. `G_OAUTH_CREDENTIALS`: path to the OAuth client file; tokens are kept
//!    next to it as `<stem>.token.json`.
//! 2. `GOOGLE_MEET_CREDENTIALS_PATH` + `GOOGLE_MEET_TOKEN_PATH`.
//! 3. `GOOGLE_CLIENT_ID` + `GOOGLE_CLIENT_SECRET` + `GOOGLE_REFRESH_TOKEN`.

use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, info},
};

use crate::error::{Error, Result};

pub const COMBINED_VAR: &str = "G_OAUTH_CREDENTIALS";
pub const CREDENTIALS_PATH_VAR: &str = "GOOGLE_MEET_CREDENTIALS_PATH";
pub const TOKEN_PATH_VAR: &str = "GOOGLE_MEET_TOKEN_PATH";
pub const CLIENT_ID_VAR: &str = "GOOGLE_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "GOOGLE_CLIENT_SECRET";
pub const REFRESH_TOKEN_VAR: &str = "GOOGLE_REFRESH_TOKEN";

/// Where the OAuth client credential and its tokens come from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Client file plus a token file that is read and written.
    Files {
        credentials_path: PathBuf,
        token_path: PathBuf,
    },
    /// Client id/secret and a refresh token given directly; nothing is persisted.
    Direct {
        client_id: String,
        client_secret: Secret<String>,
        refresh_token: Secret<String>,
    },
}

impl CredentialSource {
    #[must_use]
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Files { .. } => "files",
            Self::Direct { .. } => "direct",
        }
    }

    /// The token file, if this source persists tokens.
    #[must_use]
    pub fn token_path(&self) -> Option<&Path> {
        match self {
            Self::Files { token_path, .. } => Some(token_path),
            Self::Direct { .. } => None,
        }
    }
}

/// Resolve the credential source from the process environment.
pub fn resolve_credential_source() -> Result<CredentialSource> {
    resolve_credential_source_with(|name| std::env::var(name).ok())
}

/// Resolve the credential source using a custom lookup.
pub fn resolve_credential_source_with(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<CredentialSource> {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let combined = get(COMBINED_VAR).map(|path| {
        let credentials_path = PathBuf::from(path);
        let token_path = sibling_token_path(&credentials_path);
        CredentialSource::Files {
            credentials_path,
            token_path,
        }
    });

    let pair = match (get(CREDENTIALS_PATH_VAR), get(TOKEN_PATH_VAR)) {
        (Some(c), Some(t)) => Some(CredentialSource::Files {
            credentials_path: PathBuf::from(c),
            token_path: PathBuf::from(t),
        }),
        (None, None) => None,
        (Some(_), None) => {
            return Err(Error::credentials(format!(
                "{CREDENTIALS_PATH_VAR} is set but {TOKEN_PATH_VAR} is missing"
            )));
        },
        (None, Some(_)) => {
            return Err(Error::credentials(format!(
                "{TOKEN_PATH_VAR} is set but {CREDENTIALS_PATH_VAR} is missing"
            )));
        },
    };

    let direct_parts = [
        get(CLIENT_ID_VAR),
        get(CLIENT_SECRET_VAR),
        get(REFRESH_TOKEN_VAR),
    ];
    let direct = match direct_parts {
        [Some(id), Some(secret), Some(refresh)] => Some(CredentialSource::Direct {
            client_id: id,
            client_secret: Secret::new(secret),
            refresh_token: Secret::new(refresh),
        }),
        [None, None, None] => None,
        _ => {
            return Err(Error::credentials(format!(
                "direct credentials need all of {CLIENT_ID_VAR}, {CLIENT_SECRET_VAR} and {REFRESH_TOKEN_VAR}"
            )));
        },
    };

    let mut resolved: Vec<(&str, CredentialSource)> = [
        (COMBINED_VAR, combined),
        (CREDENTIALS_PATH_VAR, pair),
        (CLIENT_ID_VAR, direct),
    ]
    .into_iter()
    .filter_map(|(name, source)| source.map(|s| (name, s)))
    .collect();

    match resolved.len() {
        0 => Err(Error::credentials(format!(
            "no credential source configured; set {COMBINED_VAR}, or \
             {CREDENTIALS_PATH_VAR} and {TOKEN_PATH_VAR}, or \
             {CLIENT_ID_VAR}/{CLIENT_SECRET_VAR}/{REFRESH_TOKEN_VAR}"
        ))),
        1 => {
            let (var, source) = resolved.remove(0);
            info!(scheme = source.scheme(), via = var, "credential source resolved");
            Ok(source)
        },
        _ => {
            let names: Vec<&str> = resolved.iter().map(|(n, _)| *n).collect();
            debug!(schemes = ?names, "conflicting credential schemes");
            Err(Error::credentials(format!(
                "more than one credential scheme is configured ({}); keep exactly one",
                names.join(", ")
            )))
        },
    }
}

/// `/a/b/client.json` → `/a/b/client.token.json`.
fn sibling_token_path(credentials_path: &Path) -> PathBuf {
    let stem = credentials_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("credentials");
    credentials_path.with_file_name(format!("{stem}.token.json"))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, secrecy::ExposeSecret, std::collections::HashMap};

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn combined_path_derives_token_file() {
        let source =
            resolve_credential_source_with(env(&[(COMBINED_VAR, "/etc/mb/client.json")])).unwrap();
        match source {
            CredentialSource::Files {
                credentials_path,
                token_path,
            } => {
                assert_eq!(credentials_path, PathBuf::from("/etc/mb/client.json"));
                assert_eq!(token_path, PathBuf::from("/etc/mb/client.token.json"));
            },
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn explicit_pair_resolves() {
        let source = resolve_credential_source_with(env(&[
            (CREDENTIALS_PATH_VAR, "/c.json"),
            (TOKEN_PATH_VAR, "/t.json"),
        ]))
        .unwrap();
        assert_eq!(source.token_path(), Some(Path::new("/t.json")));
    }

    #[test]
    fn direct_values_resolve() {
        let source = resolve_credential_source_with(env(&[
            (CLIENT_ID_VAR, "id"),
            (CLIENT_SECRET_VAR, "secret"),
            (REFRESH_TOKEN_VAR, "refresh"),
        ]))
        .unwrap();
        assert!(source.token_path().is_none());
        match source {
            CredentialSource::Direct {
                client_id,
                refresh_token,
                ..
            } => {
                assert_eq!(client_id, "id");
                assert_eq!(refresh_token.expose_secret(), "refresh");
            },
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[rstest]
    #[case::nothing(&[])]
    #[case::half_pair(&[(CREDENTIALS_PATH_VAR, "/c.json")])]
    #[case::other_half(&[(TOKEN_PATH_VAR, "/t.json")])]
    #[case::direct_missing_refresh(&[(CLIENT_ID_VAR, "id"), (CLIENT_SECRET_VAR, "s")])]
    #[case::two_schemes(&[(COMBINED_VAR, "/c.json"), (CLIENT_ID_VAR, "id"), (CLIENT_SECRET_VAR, "s"), (REFRESH_TOKEN_VAR, "r")])]
    fn refuses_ambiguous_or_missing(#[case] pairs: &[(&str, &str)]) {
        let err = resolve_credential_source_with(env(pairs)).unwrap_err();
        assert!(matches!(err, Error::Credentials(_)), "got {err}");
    }

    #[test]
    fn blank_values_count_as_unset() {
        let source = resolve_credential_source_with(env(&[
            (COMBINED_VAR, "/c.json"),
            (CLIENT_ID_VAR, "  "),
        ]))
        .unwrap();
        assert_eq!(source.scheme(), "files");
    }
}
