use crate::audit::AuditLog;
use crate::oracle::OracleEndpoint;
use crate::social::{Profile, SocialSession};
use chrono::{DateTime, Duration, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Linked social account: provider, credentials, and cached profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialProfile {
    pub provider: String,
    pub session: SocialSession,
    pub profile: Profile,
    #[serde(alias = "lastSessionUpdated")]
    pub last_credential_refresh: DateTime<Utc>,
}

impl SocialProfile {
    pub fn new(provider: impl Into<String>, session: SocialSession, profile: Profile) -> Self {
        Self {
            provider: provider.into(),
            session,
            profile,
            last_credential_refresh: Utc::now(),
        }
    }

    pub fn did(&self) -> &str {
        &self.session.did
    }

    pub fn access_jwt(&self) -> &str {
        &self.session.tokens.access_jwt
    }

    pub fn refresh_jwt(&self) -> &str {
        &self.session.tokens.refresh_jwt
    }

    pub fn credentials_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.last_credential_refresh
            .checked_add_signed(max_age)
            .is_some_and(|refresh_at| refresh_at <= now)
    }

    /// Fold a `refreshSession` answer and a fresh profile into this record.
    ///
    /// `didDoc`, `active`, and `status` are optional in the refresh answer;
    /// an absent value keeps what was stored before.
    pub fn apply_refresh(&mut self, refreshed: SocialSession, profile: Profile, now: DateTime<Utc>) {
        self.session.tokens = refreshed.tokens;
        self.session.handle = refreshed.handle;
        if refreshed.did_doc.is_some() {
            self.session.did_doc = refreshed.did_doc;
        }
        if refreshed.active.is_some() {
            self.session.active = refreshed.active;
        }
        if refreshed.status.is_some() {
            self.session.status = refreshed.status;
        }
        self.profile = profile;
        self.last_credential_refresh = now;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleSettings {
    #[serde(rename = "chatCompletionsApiEndpoint", alias = "endpoint")]
    pub endpoint: OracleEndpoint,
    pub api_key: String,
    pub model: String,
}

/// Per-session oracle configuration. Written by the `configure` command,
/// read-only to the judge pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeConfig {
    pub genai: OracleSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction_prompt: Option<String>,
}

/// Per-session judge progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeState {
    /// Oldest instant not yet judged. Sessions without one are not judged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_since: Option<DateTime<Utc>>,
    /// Feed cursor to resume from; absent means start from the newest post.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_judge_attempted: Option<DateTime<Utc>>,
}

impl JudgeState {
    pub fn judge_due(&self, now: DateTime<Utc>, frequency: Duration) -> bool {
        match self.last_judge_attempted {
            None => true,
            Some(last) => last
                .checked_add_signed(frequency)
                .is_some_and(|next| next <= now),
        }
    }

    /// Move the watermark just past `judged_at`. Never moves it backward.
    pub fn advance_past(&mut self, judged_at: DateTime<Utc>) {
        let next = judged_at
            .checked_add_signed(TimeDelta::milliseconds(1))
            .unwrap_or(judged_at);
        self.judge_since = Some(match self.judge_since {
            Some(current) => current.max(next),
            None => next,
        });
    }

    /// Set a new watermark from the settings surface. Resets the cursor,
    /// since it was computed against the old watermark.
    pub fn reset_watermark(&mut self, judge_since: DateTime<Utc>) {
        self.judge_since = Some(judge_since);
        self.cursor = None;
    }
}

/// Everything the schedulers need for one linked account.
#[derive(Debug, Clone)]
pub struct Session {
    pub key: String,
    pub dir: PathBuf,
    pub social: Option<SocialProfile>,
    pub config: Option<JudgeConfig>,
    pub state: JudgeState,
    pub log: AuditLog,
}
