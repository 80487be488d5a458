use std::time::Duration;

use {
    async_trait::async_trait,
    meetbridge_config::AuthConfig,
    tracing::{info, warn},
};

use crate::{
    Error, Result,
    callback_server::{CallbackListener, CallbackOutcome},
    flow::OAuthClient,
    types::TokenResponse,
};

/// Obtains a fresh token set with a human in the loop.
#[async_trait]
pub trait InteractiveAuthorizer: Send + Sync {
    async fn authorize(&self, oauth: &OAuthClient) -> Result<TokenResponse>;
}

/// Consent in the browser, redirect to a loopback listener on a fixed port.
pub struct LocalServerAuthorizer {
    port: u16,
    timeout: Duration,
    open_browser: bool,
}

impl LocalServerAuthorizer {
    pub fn new(port: u16, timeout: Duration, open_browser: bool) -> Self {
        Self {
            port,
            timeout,
            open_browser,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.callback_port,
            Duration::from_secs(config.interactive_timeout_secs),
            config.open_browser,
        )
    }

    fn present(&self, url: &str) {
        // stdout may carry the tool protocol, so the URL goes to stderr.
        eprintln!("Open this URL to authorize meetbridge:\n\n  {url}\n");
        if self.open_browser
            && let Err(e) = open::that(url)
        {
            warn!(error = %e, "could not open a browser, use the printed URL");
        }
    }
}

#[async_trait]
impl InteractiveAuthorizer for LocalServerAuthorizer {
    async fn authorize(&self, oauth: &OAuthClient) -> Result<TokenResponse> {
        let listener = CallbackListener::bind(self.port).await?;
        let request = oauth.authorization_request(&listener.redirect_uri())?;
        info!(port = self.port, timeout_secs = self.timeout.as_secs(), "awaiting authorization callback");
        self.present(&request.url);

        match listener.wait(&request.state, self.timeout).await {
            CallbackOutcome::CodeReceived(code) => {
                let tokens = oauth
                    .exchange(&code, &request.pkce.verifier, &request.redirect_uri)
                    .await?;
                info!("authorization code exchanged");
                Ok(tokens)
            },
            CallbackOutcome::ErrorReceived(reason) => Err(Error::CallbackRejected(reason)),
            CallbackOutcome::TimedOut => Err(Error::CallbackTimeout {
                secs: self.timeout.as_secs(),
            }),
        }
    }
}
