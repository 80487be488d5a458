use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    meetbridge_config::{AuthConfig, CredentialSource},
    secrecy::{ExposeSecret, Secret},
    tokio::sync::Mutex,
    tracing::{debug, info, warn},
};

use crate::{
    Error, Result,
    authorizer::{InteractiveAuthorizer, LocalServerAuthorizer},
    flow::OAuthClient,
    store::CredentialStore,
    types::{StoredToken, TokenHealth, now_ms},
};

#[derive(Default)]
struct Slot {
    loaded: bool,
    token: Option<StoredToken>,
}

/// Hands out bearer tokens to the gateway.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// A token that is valid for at least the refresh margin.
    async fn access_token(&self) -> Result<Secret<String>>;

    /// Called after the server rejected `rejected`. Refreshes unless another
    /// caller already replaced that token.
    async fn force_refresh(&self, rejected: &Secret<String>) -> Result<Secret<String>>;

    /// Token status without ever starting the interactive flow.
    async fn token_health(&self) -> TokenHealth;
}

/// Keeps one token set valid: load, refresh, and fall back to interactive
/// authorization when there is nothing to refresh with.
///
/// The token lives behind an async mutex that is held across the refresh, so
/// concurrent callers wait for one in-flight refresh instead of issuing their
/// own.
pub struct TokenManager {
    store: CredentialStore,
    oauth: OAuthClient,
    authorizer: Arc<dyn InteractiveAuthorizer>,
    refresh_margin: Duration,
    slot: Mutex<Slot>,
    refreshes: AtomicU64,
    interactive_runs: AtomicU64,
}

impl TokenManager {
    /// Reads the client credential immediately so a broken credential file is
    /// reported before any network call.
    pub fn new(
        store: CredentialStore,
        config: &AuthConfig,
        authorizer: Arc<dyn InteractiveAuthorizer>,
    ) -> Result<Self> {
        let client = store.load_client()?;
        if !client.allows_loopback_redirect() {
            warn!(
                redirect_uri = client.redirect_uri.as_deref().unwrap_or_default(),
                "client does not register a loopback redirect; interactive authorization will likely be refused"
            );
        }
        debug!(client_id = %client.client_id, scheme = store.source().scheme(), "token manager ready");
        Ok(Self {
            store,
            oauth: OAuthClient::new(client, config),
            authorizer,
            refresh_margin: Duration::from_secs(config.refresh_margin_secs),
            slot: Mutex::new(Slot::default()),
            refreshes: AtomicU64::new(0),
            interactive_runs: AtomicU64::new(0),
        })
    }

    /// Manager using the browser + loopback listener flow.
    pub fn from_source(source: CredentialSource, config: &AuthConfig) -> Result<Self> {
        Self::new(
            CredentialStore::new(source),
            config,
            Arc::new(LocalServerAuthorizer::from_config(config)),
        )
    }

    /// Successful refresh-token grants since startup.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Interactive flows attempted since startup.
    pub fn interactive_count(&self) -> u64 {
        self.interactive_runs.load(Ordering::Relaxed)
    }

    /// Run the interactive flow now, regardless of the stored token.
    pub async fn authorize(&self) -> Result<()> {
        let mut slot = self.slot.lock().await;
        let current = self.current(&mut slot);
        let fresh = self.run_interactive(current.as_ref()).await?;
        self.commit(&mut slot, fresh)?;
        Ok(())
    }

    /// Revoke at the server and delete the persisted token.
    pub async fn revoke(&self) -> Result<()> {
        let mut slot = self.slot.lock().await;
        let current = self.current(&mut slot);
        let revoked = match current
            .as_ref()
            .and_then(|t| t.refresh_token.clone().or_else(|| t.access_token.clone()))
        {
            Some(token) => self.oauth.revoke(&token).await,
            None => {
                debug!("nothing to revoke at the server");
                Ok(())
            },
        };
        self.store.delete_token()?;
        slot.token = None;
        info!("credential revoked");
        revoked
    }

    /// The held token, reading the store on first use.
    fn current(&self, slot: &mut Slot) -> Option<StoredToken> {
        if !slot.loaded {
            slot.token = self.store.load_token();
            slot.loaded = true;
        }
        slot.token.clone()
    }

    fn usable(&self, token: &StoredToken) -> Option<Secret<String>> {
        if token.is_usable_at(now_ms(), self.refresh_margin) {
            token.access_token.clone()
        } else {
            None
        }
    }

    async fn refresh(&self, current: &StoredToken) -> Result<StoredToken> {
        let refresh_token = current
            .refresh_token
            .as_ref()
            .ok_or_else(|| Error::message("no refresh token"))?;
        let response = self.oauth.refresh(refresh_token).await?;
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        info!("access token refreshed");
        Ok(current.merged(response, now_ms()))
    }

    async fn run_interactive(&self, current: Option<&StoredToken>) -> Result<StoredToken> {
        self.interactive_runs.fetch_add(1, Ordering::Relaxed);
        info!("starting interactive authorization");
        let response = self.authorizer.authorize(&self.oauth).await?;
        let base = current.cloned().unwrap_or_default();
        Ok(base.merged(response, now_ms()))
    }

    /// Persist, then swap the in-memory token in one assignment.
    fn commit(&self, slot: &mut Slot, fresh: StoredToken) -> Result<Secret<String>> {
        let token = fresh
            .access_token
            .clone()
            .ok_or_else(|| Error::message("token response carried no access token"))?;
        self.store.save_token(&fresh)?;
        slot.token = Some(fresh);
        Ok(token)
    }

    /// Refresh, falling back to the interactive flow when `interactive` is
    /// set. Caller holds the lock.
    async fn renew(&self, slot: &mut Slot, interactive: bool) -> Result<Secret<String>> {
        let current = self.current(slot);

        if let Some(current) = current.as_ref().filter(|t| t.refresh_token.is_some()) {
            match self.refresh(current).await {
                Ok(fresh) => return self.commit(slot, fresh),
                Err(e) if interactive => {
                    warn!(error = %e, "token refresh failed, falling back to interactive authorization")
                },
                Err(e) => {
                    return Err(Error::SetupRequired {
                        reason: format!("refresh failed: {e}"),
                    });
                },
            }
        }

        if !interactive {
            return Err(Error::SetupRequired {
                reason: "no usable token and no refresh token".into(),
            });
        }

        match self.run_interactive(current.as_ref()).await {
            Ok(fresh) => self.commit(slot, fresh),
            Err(e) => {
                warn!(error = %e, "interactive authorization failed");
                Err(Error::SetupRequired {
                    reason: e.to_string(),
                })
            },
        }
    }

    async fn valid_token(&self, interactive: bool) -> Result<Secret<String>> {
        let mut slot = self.slot.lock().await;
        if let Some(token) = self.current(&mut slot).as_ref().and_then(|t| self.usable(t)) {
            return Ok(token);
        }
        self.renew(&mut slot, interactive).await
    }

    async fn replace_rejected(
        &self,
        rejected: &Secret<String>,
        interactive: bool,
    ) -> Result<Secret<String>> {
        let mut slot = self.slot.lock().await;
        if let Some(held) = self.current(&mut slot).as_ref().and_then(|t| self.usable(t))
            && held.expose_secret() != rejected.expose_secret()
        {
            debug!("token already replaced by a concurrent refresh");
            return Ok(held);
        }
        self.renew(&mut slot, interactive).await
    }

    /// A view of this manager that loads and refreshes but never starts the
    /// interactive flow. Health probes use it.
    pub fn non_interactive(self: &Arc<Self>) -> Arc<dyn TokenSource> {
        Arc::new(NonInteractive(Arc::clone(self)))
    }
}

#[async_trait]
impl TokenSource for TokenManager {
    async fn access_token(&self) -> Result<Secret<String>> {
        self.valid_token(true).await
    }

    async fn force_refresh(&self, rejected: &Secret<String>) -> Result<Secret<String>> {
        self.replace_rejected(rejected, true).await
    }

    async fn token_health(&self) -> TokenHealth {
        let mut slot = self.slot.lock().await;
        let Some(current) = self.current(&mut slot) else {
            return TokenHealth::Unavailable {
                reason: "no stored token; run `meetbridge auth`".into(),
            };
        };

        let now = now_ms();
        if current.is_usable_at(now, Duration::ZERO) {
            return TokenHealth::Valid {
                remaining: current.remaining_at(now).unwrap_or_default(),
            };
        }
        if current.refresh_token.is_none() {
            return TokenHealth::Unavailable {
                reason: "token expired and no refresh token is stored".into(),
            };
        }
        let refreshed = match self.refresh(&current).await {
            Ok(fresh) => fresh,
            Err(e) => {
                return TokenHealth::Unavailable {
                    reason: format!("refresh failed: {e}"),
                };
            },
        };
        let remaining = refreshed.remaining_at(now_ms()).unwrap_or_default();
        match self.commit(&mut slot, refreshed) {
            Ok(_) => TokenHealth::Valid { remaining },
            Err(e) => TokenHealth::Unavailable {
                reason: e.to_string(),
            },
        }
    }
}

/// Token source that fails with `SetupRequired` where the manager would
/// otherwise prompt.
struct NonInteractive(Arc<TokenManager>);

#[async_trait]
impl TokenSource for NonInteractive {
    async fn access_token(&self) -> Result<Secret<String>> {
        self.0.valid_token(false).await
    }

    async fn force_refresh(&self, rejected: &Secret<String>) -> Result<Secret<String>> {
        self.0.replace_rejected(rejected, false).await
    }

    async fn token_health(&self) -> TokenHealth {
        self.0.token_health().await
    }
}

/// Fixed token, for tests and for wiring without OAuth.
pub struct StaticTokenSource {
    token: Secret<String>,
    remaining: Duration,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Secret::new(token.into()),
            remaining: Duration::from_secs(3600),
        }
    }

    #[must_use]
    pub fn with_remaining(mut self, remaining: Duration) -> Self {
        self.remaining = remaining;
        self
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<Secret<String>> {
        Ok(self.token.clone())
    }

    async fn force_refresh(&self, _rejected: &Secret<String>) -> Result<Secret<String>> {
        Ok(self.token.clone())
    }

    async fn token_health(&self) -> TokenHealth {
        TokenHealth::Valid {
            remaining: self.remaining,
        }
    }
}
