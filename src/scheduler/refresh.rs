use super::{SweepContext, SweepReport};
use crate::session::SocialProfile;
use crate::social::SocialClient;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

pub async fn refresh_sweep(ctx: &SweepContext) -> Result<SweepReport> {
    refresh_sweep_at(ctx, Utc::now()).await
}

/// Refresh every session whose credentials are older than the configured
/// age. The first failure ends the sweep; sessions after it wait for the
/// next run.
pub async fn refresh_sweep_at(ctx: &SweepContext, now: DateTime<Utc>) -> Result<SweepReport> {
    let max_age = ctx.config.social_session_age();
    let mut report = SweepReport::default();

    for key in ctx.store.session_keys().await? {
        let session = ctx.store.load(&key).await?;
        let Some(mut social) = session.social else {
            tracing::debug!(session = %key, "no linked account, skipping refresh");
            report.skipped += 1;
            continue;
        };
        if !social.credentials_stale(now, max_age) {
            report.skipped += 1;
            continue;
        }

        refresh_credentials(&ctx.social, &mut social, now)
            .await
            .with_context(|| format!("refresh session {key}"))?;
        ctx.store.save_social(&key, &social).await?;
        tracing::info!(session = %key, handle = %social.session.handle, "credentials refreshed");
        report.processed += 1;
    }

    Ok(report)
}

/// Trade the refresh credential for a new pair and re-fetch the profile.
pub async fn refresh_credentials(
    client: &SocialClient,
    social: &mut SocialProfile,
    now: DateTime<Utc>,
) -> Result<()> {
    let refreshed = client
        .refresh_session(&social.provider, social.refresh_jwt())
        .await?;
    let profile = client
        .get_profile(
            &social.provider,
            &refreshed.tokens.access_jwt,
            &refreshed.did,
        )
        .await?;
    social.apply_refresh(refreshed, profile, now);
    Ok(())
}
