use std::path::Path;

use {
    meetbridge_config::CredentialSource,
    secrecy::Secret,
    serde::Deserialize,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Context, Error, Result},
    types::{ClientCredentials, StoredToken},
};

#[derive(Deserialize)]
struct CredentialFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
}

#[derive(Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: Secret<String>,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

/// Loads the OAuth client and persists the single token set.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    source: CredentialSource,
}

impl CredentialStore {
    pub fn new(source: CredentialSource) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &CredentialSource {
        &self.source
    }

    /// Read the client identity. Any problem here is a configuration error
    /// and happens before a request is ever made.
    pub fn load_client(&self) -> Result<ClientCredentials> {
        match &self.source {
            CredentialSource::Files {
                credentials_path, ..
            } => parse_credential_file(credentials_path),
            CredentialSource::Direct {
                client_id,
                client_secret,
                ..
            } => Ok(ClientCredentials {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                redirect_uri: None,
            }),
        }
    }

    /// Read the persisted token. A missing or unreadable token file is treated
    /// as "no token"; the caller then refreshes or authorizes.
    pub fn load_token(&self) -> Option<StoredToken> {
        let path = match &self.source {
            CredentialSource::Files { token_path, .. } => token_path,
            CredentialSource::Direct { refresh_token, .. } => {
                return Some(StoredToken {
                    refresh_token: Some(refresh_token.clone()),
                    ..Default::default()
                });
            },
        };
        let shown = path.display().to_string();
        let data = match std::fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %shown, "token file not found");
                return None;
            },
            Err(e) => {
                warn!(path = %shown, error = %e, "token file read failed");
                return None;
            },
        };
        match serde_json::from_str::<StoredToken>(&data) {
            Ok(token) => {
                debug!(path = %shown, "token loaded");
                Some(token)
            },
            Err(e) => {
                warn!(path = %shown, error = %e, "token file parse failed");
                None
            },
        }
    }

    /// Persist the token. Direct credentials have nowhere to write and are
    /// kept in memory only.
    pub fn save_token(&self, token: &StoredToken) -> Result<()> {
        let Some(path) = self.source.token_path() else {
            debug!("direct credentials, token kept in memory");
            return Ok(());
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_string_pretty(token)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &data)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
        }
        std::fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace {}", path.display()))?;

        info!(path = %path.display(), "token saved");
        Ok(())
    }

    /// Remove the persisted token. Only explicit revocation calls this.
    pub fn delete_token(&self) -> Result<()> {
        let Some(path) = self.source.token_path() else {
            return Ok(());
        };
        match std::fs::remove_file(path) {
            Ok(()) => {
                info!(path = %path.display(), "token file deleted");
                Ok(())
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn parse_credential_file(path: &Path) -> Result<ClientCredentials> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| Error::credential_file(path, format!("cannot read: {e}")))?;
    let file: CredentialFile = serde_json::from_str(&data)
        .map_err(|e| Error::credential_file(path, format!("malformed JSON: {e}")))?;
    let section = file.installed.or(file.web).ok_or_else(|| {
        Error::credential_file(path, "expected an \"installed\" or \"web\" client object")
    })?;
    if section.client_id.trim().is_empty() {
        return Err(Error::credential_file(path, "client_id is empty"));
    }
    Ok(ClientCredentials {
        client_id: section.client_id,
        client_secret: section.client_secret,
        redirect_uri: section.redirect_uris.into_iter().next(),
    })
}
