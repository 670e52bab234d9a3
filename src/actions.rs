use crate::audit::{ActionKind, AuditLog, AuditLogEntry};
use crate::session::SocialProfile;
use crate::social::{RecordUri, SocialClient};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A post the oracle passed judgment on, with its reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgedPost {
    pub uri: String,
    pub cause: String,
}

impl JudgedPost {
    pub fn new(uri: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            cause: cause.into(),
        }
    }
}

/// Carries out verdicts for one session.
///
/// Posts in a batch are handled strictly in order and the first failure
/// stops the batch. Every action that took effect is written to the audit
/// log, which is trimmed after each append.
pub struct ActionExecutor<'a> {
    client: &'a SocialClient,
    social: &'a SocialProfile,
    log: &'a AuditLog,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(client: &'a SocialClient, social: &'a SocialProfile, log: &'a AuditLog) -> Self {
        Self {
            client,
            social,
            log,
        }
    }

    pub async fn execute(&self, kind: ActionKind, posts: &[JudgedPost]) -> Result<()> {
        match kind {
            ActionKind::Delete => self.delete(posts).await,
            ActionKind::Report => self.report(posts).await,
        }
    }

    /// Delete each post through the provider, then log it. A post whose
    /// delete call fails is not logged.
    pub async fn delete(&self, posts: &[JudgedPost]) -> Result<()> {
        for post in posts {
            let record: RecordUri = post.uri.parse()?;
            self.client
                .delete_record(&self.social.provider, self.social.access_jwt(), &record)
                .await
                .with_context(|| format!("delete {}", post.uri))?;
            tracing::info!(uri = %post.uri, cause = %post.cause, "deleted post");
            self.record(ActionKind::Delete, post).await?;
        }
        Ok(())
    }

    /// Log each post as reported. No provider call is made.
    pub async fn report(&self, posts: &[JudgedPost]) -> Result<()> {
        for post in posts {
            tracing::info!(uri = %post.uri, cause = %post.cause, "reported post");
            self.record(ActionKind::Report, post).await?;
        }
        Ok(())
    }

    async fn record(&self, kind: ActionKind, post: &JudgedPost) -> Result<()> {
        self.log
            .append(&AuditLogEntry::new(kind, &post.uri, &post.cause))
            .await?;
        self.log.trim().await?;
        Ok(())
    }
}
