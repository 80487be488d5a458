//! One-shot loopback listener for the authorization redirect.
//!
//! The interactive flow is a small state machine:
//!
//! ```text
//! AwaitingCallback ─┬─> CodeReceived ──> (code exchanged by the caller)
//!                   ├─> ErrorReceived
//!                   └─> TimedOut
//! ```
//!
//! [`CallbackListener`] is the `AwaitingCallback` state. [`CallbackListener::wait`]
//! consumes it and returns the terminal [`CallbackOutcome`]; the socket is owned
//! by that call and closed on every path out of it.

use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use {
    axum::{Router, extract::Query, response::Html, routing::get},
    tokio::{net::TcpListener, sync::oneshot},
    tracing::{debug, info, warn},
};

use crate::{Error, Result};

pub const CALLBACK_PATH: &str = "/oauth2callback";

/// Terminal states of the interactive flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    CodeReceived(String),
    ErrorReceived(String),
    TimedOut,
}

/// A bound, not yet answered callback listener.
pub struct CallbackListener {
    listener: TcpListener,
    addr: SocketAddr,
}

impl CallbackListener {
    /// Bind `127.0.0.1:{port}`. A port held by another flow fails right away
    /// instead of waiting for it to free up.
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(|source| Error::PortInUse { port, source })?;
        let addr = listener.local_addr()?;
        debug!(%addr, "callback listener bound");
        Ok(Self { listener, addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Redirect URI to register in the authorization request.
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}{CALLBACK_PATH}", self.addr.port())
    }

    /// Serve until the first callback or until `timeout` elapses.
    ///
    /// A callback whose `state` differs from `expected_state` is reported as
    /// an error.
    pub async fn wait(self, expected_state: &str, timeout: Duration) -> CallbackOutcome {
        let (tx, rx) = oneshot::channel::<CallbackOutcome>();
        let tx = Arc::new(std::sync::Mutex::new(Some(tx)));
        let expected_state = expected_state.to_string();

        let app = Router::new().route(
            CALLBACK_PATH,
            get(move |Query(params): Query<HashMap<String, String>>| {
                let outcome = classify_callback(&params, &expected_state);
                let tx = tx.lock().unwrap_or_else(|e| e.into_inner()).take();
                async move {
                    let page = match &outcome {
                        CallbackOutcome::CodeReceived(_) => {
                            "<h1>Authorization complete</h1><p>You can close this window.</p>"
                                .to_string()
                        },
                        CallbackOutcome::ErrorReceived(reason) => format!(
                            "<h1>Authorization failed</h1><p>{}</p>",
                            html_escape(reason)
                        ),
                        CallbackOutcome::TimedOut => String::new(),
                    };
                    if let Some(tx) = tx {
                        let _ = tx.send(outcome);
                    }
                    Html(page)
                }
            }),
        );

        let addr = self.addr;
        let server = axum::serve(self.listener, app);

        let outcome = tokio::select! {
            result = rx => {
                result.unwrap_or_else(|_| CallbackOutcome::ErrorReceived("callback channel closed".into()))
            }
            result = server.into_future() => {
                let reason = match result {
                    Ok(()) => "callback server exited unexpectedly".to_string(),
                    Err(e) => format!("callback server failed: {e}"),
                };
                CallbackOutcome::ErrorReceived(reason)
            }
            _ = tokio::time::sleep(timeout) => CallbackOutcome::TimedOut,
        };

        match &outcome {
            CallbackOutcome::CodeReceived(_) => info!(%addr, "authorization code received"),
            CallbackOutcome::ErrorReceived(reason) => {
                warn!(%addr, reason = %reason, "authorization callback reported an error")
            },
            CallbackOutcome::TimedOut => {
                warn!(%addr, timeout_secs = timeout.as_secs(), "authorization callback timed out")
            },
        }
        outcome
    }
}

fn classify_callback(params: &HashMap<String, String>, expected_state: &str) -> CallbackOutcome {
    if let Some(error) = params.get("error") {
        let detail = params
            .get("error_description")
            .map(|d| format!("{error}: {d}"))
            .unwrap_or_else(|| error.clone());
        return CallbackOutcome::ErrorReceived(detail);
    }
    if params.get("state").map(String::as_str) != Some(expected_state) {
        return CallbackOutcome::ErrorReceived("state mismatch".into());
    }
    match params.get("code") {
        Some(code) if !code.is_empty() => CallbackOutcome::CodeReceived(code.clone()),
        _ => CallbackOutcome::ErrorReceived("missing code".into()),
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn fire(addr: SocketAddr, query: &str) -> String {
        let url = format!("http://{addr}{CALLBACK_PATH}?{query}");
        reqwest::get(url).await.unwrap().text().await.unwrap()
    }

    #[tokio::test]
    async fn code_received_and_port_released() {
        let listener = CallbackListener::bind(0).await.unwrap();
        let addr = listener.local_addr();
        let waiter =
            tokio::spawn(async move { listener.wait("s1", Duration::from_secs(10)).await });

        let page = fire(addr, "code=abc&state=s1").await;
        assert!(page.contains("Authorization complete"));
        assert_eq!(
            waiter.await.unwrap(),
            CallbackOutcome::CodeReceived("abc".into())
        );

        // Same port can be bound again once the flow has resolved.
        let again = CallbackListener::bind(addr.port()).await.unwrap();
        drop(again);
    }

    #[tokio::test]
    async fn error_param_and_state_mismatch() {
        let listener = CallbackListener::bind(0).await.unwrap();
        let addr = listener.local_addr();
        let waiter =
            tokio::spawn(async move { listener.wait("s1", Duration::from_secs(10)).await });
        let page = fire(addr, "error=access_denied").await;
        assert!(page.contains("access_denied"));
        assert_eq!(
            waiter.await.unwrap(),
            CallbackOutcome::ErrorReceived("access_denied".into())
        );

        let listener = CallbackListener::bind(addr.port()).await.unwrap();
        let waiter =
            tokio::spawn(async move { listener.wait("s1", Duration::from_secs(10)).await });
        fire(addr, "code=abc&state=forged").await;
        assert_eq!(
            waiter.await.unwrap(),
            CallbackOutcome::ErrorReceived("state mismatch".into())
        );
        CallbackListener::bind(addr.port()).await.unwrap();
    }

    #[tokio::test]
    async fn times_out_and_releases_port() {
        let listener = CallbackListener::bind(0).await.unwrap();
        let port = listener.local_addr().port();
        let outcome = listener.wait("s", Duration::from_millis(50)).await;
        assert_eq!(outcome, CallbackOutcome::TimedOut);
        CallbackListener::bind(port).await.unwrap();
    }

    #[tokio::test]
    async fn second_bind_fails_immediately() {
        let first = CallbackListener::bind(0).await.unwrap();
        let port = first.local_addr().port();
        let err = CallbackListener::bind(port).await.err().unwrap();
        assert!(matches!(err, Error::PortInUse { port: p, .. } if p == port));
    }
}
