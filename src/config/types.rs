use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub(super) const DEFAULT_SOCIAL_SESSION_AGE_SECS: u64 = 60 * 60;
pub(super) const DEFAULT_JUDGE_FREQUENCY_SECS: u64 = 60 * 60;
pub(super) const DEFAULT_HEARTBEATS_MS: [u64; 4] = [5_000, 10_000, 15_000, 20_000];
pub(super) const DEFAULT_AUDIT_MAX_RECORDS: usize = 1024;
pub(super) const DEFAULT_FEED_PAGE_LIMIT: u32 = 50;
pub(super) const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

/// Placeholder in the user prompt template that receives the post JSON.
pub const POST_JSON_PLACEHOLDER: &str = "{json}";

const DEFAULT_INSTRUCTION_PROMPT: &str = "\
You moderate the public posts of the account that owns you. \
You receive one post at a time as JSON. \
Call `delete` when the post leaks personal information, contains harassment, \
or is something the owner would clearly regret publishing. \
Call `report` when the post is borderline and the owner should review it. \
Call nothing when the post is fine. \
Always give a short, concrete `cause`.";

const DEFAULT_USER_PROMPT: &str = "\
Judge the following post.

```json
{json}
```";

/// Process-wide prompt text used when a session does not override it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptDefaults {
    pub instruction: String,
    pub user_template: String,
}

impl Default for PromptDefaults {
    fn default() -> Self {
        Self {
            instruction: DEFAULT_INSTRUCTION_PROMPT.to_string(),
            user_template: DEFAULT_USER_PROMPT.to_string(),
        }
    }
}

impl PromptDefaults {
    /// Pick the session override when it carries text, else the default.
    pub fn instruction_for<'a>(&'a self, session_override: Option<&'a str>) -> &'a str {
        session_override
            .filter(|text| !text.trim().is_empty())
            .unwrap_or(&self.instruction)
    }

    pub fn render_user(&self, post_json: &str) -> String {
        self.user_template.replace(POST_JSON_PLACEHOLDER, post_json)
    }
}

/// Immutable process configuration. Built once at start and shared by
/// reference with every component that needs a value from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to config.toml - resolved at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Salt mixed into the session key hash. Required.
    pub salt: String,

    /// One sub-directory per linked account lives here.
    pub session_dir: PathBuf,

    pub social_session_age_secs: u64,
    pub judge_frequency_secs: u64,

    /// Candidate delays for re-arming a periodic task.
    pub heartbeats_ms: Vec<u64>,

    pub audit_max_records: usize,
    pub feed_page_limit: u32,
    pub http_timeout_secs: u64,

    pub instruction_prompt_file: Option<PathBuf>,
    pub user_prompt_file: Option<PathBuf>,

    pub log_timestamps: bool,

    /// Prompt text read from the files above (or built-ins) at load time.
    #[serde(skip)]
    pub prompts: PromptDefaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            salt: String::new(),
            session_dir: PathBuf::new(),
            social_session_age_secs: DEFAULT_SOCIAL_SESSION_AGE_SECS,
            judge_frequency_secs: DEFAULT_JUDGE_FREQUENCY_SECS,
            heartbeats_ms: DEFAULT_HEARTBEATS_MS.to_vec(),
            audit_max_records: DEFAULT_AUDIT_MAX_RECORDS,
            feed_page_limit: DEFAULT_FEED_PAGE_LIMIT,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            instruction_prompt_file: None,
            user_prompt_file: None,
            log_timestamps: true,
            prompts: PromptDefaults::default(),
        }
    }
}

impl Config {
    pub fn social_session_age(&self) -> chrono::Duration {
        secs_to_delta(self.social_session_age_secs)
    }

    pub fn judge_frequency(&self) -> chrono::Duration {
        secs_to_delta(self.judge_frequency_secs)
    }

    pub fn heartbeats(&self) -> Vec<Duration> {
        self.heartbeats_ms
            .iter()
            .copied()
            .map(Duration::from_millis)
            .collect()
    }
}

fn secs_to_delta(secs: u64) -> chrono::Duration {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}
