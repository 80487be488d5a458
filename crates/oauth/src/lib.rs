//! OAuth2 credential lifecycle: client credential loading, token persistence,
//! refresh, and the interactive loopback authorization flow.

pub mod authorizer;
pub mod callback_server;
pub mod error;
pub mod flow;
pub mod manager;
pub mod pkce;
pub mod store;
pub mod types;

pub use {
    authorizer::{InteractiveAuthorizer, LocalServerAuthorizer},
    callback_server::{CALLBACK_PATH, CallbackListener, CallbackOutcome},
    flow::{AuthorizationRequest, OAuthClient},
    manager::{StaticTokenSource, TokenManager, TokenSource},
    store::CredentialStore,
    types::{ClientCredentials, PkceChallenge, StoredToken, TokenHealth, TokenResponse},
};

pub use error::{Error, Result};
