use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub const DEFAULT_PROVIDER: &str = "https://bsky.social";

/// `feedwarden` - AI-judged moderation of your own Bluesky posts.
#[derive(Parser, Debug)]
#[command(name = "feedwarden")]
#[command(version)]
#[command(about = "Judges your own posts with an AI oracle and deletes or reports them.", long_about = None)]
pub struct Cli {
    /// Path to config.toml (default: ~/.feedwarden/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the refresh and judge sweeps until interrupted
    Daemon,

    /// Run one sweep now and exit
    Sweep {
        #[arg(long, value_enum)]
        task: SweepTask,
    },

    /// Link an account and store its session
    Login {
        /// Provider base URL
        #[arg(long, default_value = DEFAULT_PROVIDER)]
        provider: String,

        /// Handle or email
        #[arg(long)]
        identifier: String,

        /// App password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Set the oracle for a session, and optionally its watermark
    Configure {
        #[arg(long)]
        session: String,

        /// Chat-completions or moderations endpoint URL
        #[arg(long)]
        endpoint: String,

        #[arg(long)]
        api_key: String,

        #[arg(long)]
        model: String,

        /// Overrides the default instruction prompt
        #[arg(long)]
        instruction_prompt: Option<String>,

        /// Judge posts created at or after this instant (RFC 3339)
        #[arg(long)]
        judge_since: Option<String>,
    },

    /// Show sessions, judge progress, and recent actions
    Status {
        #[arg(long)]
        session: Option<String>,

        /// Number of recent audit entries per session
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SweepTask {
    Judge,
    Refresh,
}
