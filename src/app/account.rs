use crate::error::StoreError;
use crate::session::{JudgeConfig, SessionStore, SocialProfile, session_key};
use crate::social::SocialClient;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

/// Log in with an app password, fetch the profile, and store the linked
/// account. Returns the session key and the stored record.
///
/// Logging in again with the same account overwrites its credentials and
/// keeps its oracle settings and judge progress.
pub async fn link_account(
    client: &SocialClient,
    store: &SessionStore,
    salt: &str,
    provider: &str,
    identifier: &str,
    password: &str,
) -> Result<(String, SocialProfile)> {
    let session = client
        .create_session(provider, identifier, password)
        .await
        .context("login failed")?;
    let profile = client
        .get_profile(provider, &session.tokens.access_jwt, &session.did)
        .await
        .context("cannot fetch profile")?;

    let key = session_key(&session.did, salt);
    let social = SocialProfile::new(provider, session, profile);
    store.save_social(&key, &social).await?;
    tracing::info!(session = %key, handle = %social.session.handle, "account linked");
    Ok((key, social))
}

/// Write oracle settings for an existing session. A new watermark also
/// clears the saved feed cursor.
pub async fn configure_session(
    store: &SessionStore,
    key: &str,
    config: &JudgeConfig,
    judge_since: Option<DateTime<Utc>>,
) -> Result<()> {
    if !store.exists(key).await? {
        return Err(StoreError::NotFound(key.to_string()).into());
    }

    store.save_config(key, config).await?;
    if let Some(judge_since) = judge_since {
        let mut state = store.load(key).await?.state;
        state.reset_watermark(judge_since);
        store.save_state(key, &state).await?;
    }
    tracing::info!(session = %key, endpoint = %config.genai.endpoint, "session configured");
    Ok(())
}
