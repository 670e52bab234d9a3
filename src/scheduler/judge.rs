use super::{SweepContext, SweepReport};
use crate::actions::ActionExecutor;
use crate::feed::{AuthorFeed, Resolution, resolve};
use crate::oracle::JudgmentEngine;
use crate::session::{JudgeState, Session};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

/// What one judge cycle did for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JudgeOutcome {
    /// Missing account link, oracle settings, or watermark.
    NotConfigured,
    /// The feed has no posts.
    EmptyFeed,
    /// Nothing newer than the watermark is left.
    UpToDate,
    /// A post was judged and `actions` verdicts were carried out.
    Judged { uri: String, actions: usize },
}

pub async fn judge_sweep(ctx: &SweepContext) -> Result<SweepReport> {
    judge_sweep_at(ctx, Utc::now()).await
}

/// Run one judge cycle for every due session.
///
/// A failing session is logged and counted; the sweep moves on to the
/// next one. Every attempted session gets `lastJudgeAttempted` stamped
/// whether or not its cycle succeeded.
pub async fn judge_sweep_at(ctx: &SweepContext, now: DateTime<Utc>) -> Result<SweepReport> {
    let frequency = ctx.config.judge_frequency();
    let mut report = SweepReport::default();

    for key in ctx.store.session_keys().await? {
        let session = match ctx.store.load(&key).await {
            Ok(session) => session,
            Err(error) => {
                tracing::warn!(session = %key, "cannot load session: {error:#}");
                report.failed += 1;
                continue;
            }
        };

        if session.state.judge_since.is_none() || !session.state.judge_due(now, frequency) {
            report.skipped += 1;
            continue;
        }

        let mut state = session.state.clone();
        match judge_session(ctx, &session, &mut state).await {
            Ok(JudgeOutcome::NotConfigured) => {
                tracing::debug!(session = %key, "not configured, skipping judge");
                report.skipped += 1;
                continue;
            }
            Ok(outcome) => {
                tracing::info!(session = %key, ?outcome, "judge cycle finished");
                report.processed += 1;
            }
            Err(error) => {
                tracing::warn!(session = %key, "judge cycle failed: {error:#}");
                report.failed += 1;
            }
        }

        state.last_judge_attempted = Some(now);
        if let Err(error) = ctx.store.save_state(&key, &state).await {
            tracing::warn!(session = %key, "cannot save judge state: {error:#}");
        }
    }

    Ok(report)
}

/// Resolve the next post for `session`, judge it, and carry out the
/// verdicts. `state` is only updated once the whole cycle has succeeded.
pub async fn judge_session(
    ctx: &SweepContext,
    session: &Session,
    state: &mut JudgeState,
) -> Result<JudgeOutcome> {
    let (Some(social), Some(config), Some(judge_since)) =
        (&session.social, &session.config, state.judge_since)
    else {
        return Ok(JudgeOutcome::NotConfigured);
    };

    let feed = AuthorFeed::new(&ctx.social, social, ctx.config.feed_page_limit);
    let resolution = resolve(&feed, judge_since, state.cursor.as_deref())
        .await
        .context("resolve next post")?;

    let (post, cursor) = match resolution {
        Resolution::Empty => return Ok(JudgeOutcome::EmptyFeed),
        Resolution::UpToDate => {
            state.cursor = None;
            return Ok(JudgeOutcome::UpToDate);
        }
        Resolution::Target { post, cursor } => (post, cursor),
    };

    let executor = ActionExecutor::new(&ctx.social, social, &session.log);
    let engine = JudgmentEngine::new(ctx.http.clone(), &ctx.config.prompts);
    let actions = engine
        .judge(config, &post, &executor)
        .await
        .with_context(|| format!("judge {}", post.uri))?;

    state.advance_past(post.created_at());
    state.cursor = cursor;
    Ok(JudgeOutcome::Judged {
        uri: post.uri,
        actions,
    })
}
