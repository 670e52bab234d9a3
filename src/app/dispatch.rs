use crate::Config;
use crate::app::account::{configure_session, link_account};
use crate::app::status::render_status;
use crate::cli::{Cli, Commands, SweepTask};
use crate::oracle::OracleEndpoint;
use crate::scheduler::{SweepContext, judge_sweep, refresh_sweep};
use crate::session::{JudgeConfig, OracleSettings};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use dialoguer::Password;
use std::io::IsTerminal;
use std::sync::Arc;
use tracing::info;

pub async fn dispatch(cli: Cli, config: Arc<Config>) -> Result<()> {
    match cli.command {
        Commands::Daemon => {
            info!("Starting feedwarden daemon");
            crate::daemon::run(config).await
        }

        Commands::Sweep { task } => {
            let ctx = SweepContext::new(config);
            let report = match task {
                SweepTask::Judge => judge_sweep(&ctx).await?,
                SweepTask::Refresh => refresh_sweep(&ctx).await?,
            };
            println!("{report}");
            Ok(())
        }

        Commands::Login {
            provider,
            identifier,
            password,
        } => {
            let password = match password {
                Some(password) => password,
                None => read_password(&identifier)?,
            };
            let ctx = SweepContext::new(Arc::clone(&config));
            let (key, social) = link_account(
                &ctx.social,
                &ctx.store,
                &config.salt,
                &provider,
                &identifier,
                &password,
            )
            .await?;
            println!("Linked {} ({})", social.session.handle, social.did());
            println!("Session: {key}");
            Ok(())
        }

        Commands::Configure {
            session,
            endpoint,
            api_key,
            model,
            instruction_prompt,
            judge_since,
        } => {
            let judge_since = judge_since.as_deref().map(parse_instant).transpose()?;
            let judge_config = JudgeConfig {
                genai: OracleSettings {
                    endpoint: OracleEndpoint::new(endpoint),
                    api_key,
                    model,
                },
                instruction_prompt,
            };
            let ctx = SweepContext::new(config);
            configure_session(&ctx.store, &session, &judge_config, judge_since).await?;
            println!(
                "Session {session} now judged by {}",
                judge_config.genai.endpoint
            );
            Ok(())
        }

        Commands::Status { session, limit } => {
            let ctx = SweepContext::new(config);
            print!(
                "{}",
                render_status(&ctx.store, session.as_deref(), limit).await?
            );
            Ok(())
        }
    }
}

fn read_password(identifier: &str) -> Result<String> {
    if !std::io::stdin().is_terminal() {
        bail!("--password is required in non-interactive mode");
    }
    Password::new()
        .with_prompt(format!("App password for {identifier} (input hidden)"))
        .allow_empty_password(false)
        .interact()
        .context("Failed to read password from terminal")
}

fn parse_instant(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .with_context(|| format!("--judge-since {value:?} is not an RFC 3339 timestamp"))
}
