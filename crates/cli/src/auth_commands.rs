use {
    anyhow::Result,
    meetbridge_config::{MeetbridgeConfig, resolve_credential_source},
    meetbridge_oauth::TokenManager,
};

fn manager(config: &MeetbridgeConfig) -> Result<TokenManager> {
    let source = resolve_credential_source()?;
    if source.token_path().is_none() {
        eprintln!("Credentials come from environment variables; the new token will not be persisted.");
    }
    Ok(TokenManager::from_source(source, &config.auth)?)
}

pub async fn authorize(config: &MeetbridgeConfig) -> Result<()> {
    let manager = manager(config)?;
    eprintln!(
        "Waiting for authorization on http://127.0.0.1:{}/oauth2callback ...",
        config.auth.callback_port
    );
    manager.authorize().await?;
    eprintln!("Authorization complete.");
    Ok(())
}

pub async fn revoke(config: &MeetbridgeConfig) -> Result<()> {
    let manager = manager(config)?;
    manager.revoke().await?;
    eprintln!("Credential revoked.");
    Ok(())
}
