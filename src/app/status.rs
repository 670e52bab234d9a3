use crate::session::{Session, SessionStore};
use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Write;

const MAX_CAUSE_CHARS: usize = 80;

/// Human-readable summary of one session, or of every session.
pub async fn render_status(
    store: &SessionStore,
    only: Option<&str>,
    limit: usize,
) -> Result<String> {
    let keys = match only {
        Some(key) => vec![key.to_string()],
        None => store.session_keys().await?,
    };

    let mut out = String::new();
    writeln!(out, "◆ feedwarden {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(out, "  sessions   {}", store.root().display())?;
    if keys.is_empty() {
        writeln!(out)?;
        writeln!(out, "  no linked accounts")?;
        return Ok(out);
    }

    for key in keys {
        let session = store.load(&key).await?;
        writeln!(out)?;
        render_session(&mut out, &session, limit).await?;
    }
    Ok(out)
}

async fn render_session(out: &mut String, session: &Session, limit: usize) -> Result<()> {
    writeln!(out, "◆ {}", session.key)?;

    match &session.social {
        Some(social) => {
            writeln!(out, "  account    {} ({})", social.session.handle, social.did())?;
            writeln!(out, "  provider   {}", social.provider)?;
            writeln!(
                out,
                "  refreshed  {}",
                timestamp(Some(social.last_credential_refresh))
            )?;
        }
        None => writeln!(out, "  account    (not linked)")?,
    }

    match &session.config {
        Some(config) => {
            writeln!(out, "  oracle     {}", config.genai.endpoint)?;
            writeln!(out, "  model      {}", config.genai.model)?;
        }
        None => writeln!(out, "  oracle     (not configured)")?,
    }

    let state = &session.state;
    writeln!(out, "  since      {}", timestamp(state.judge_since))?;
    writeln!(
        out,
        "  cursor     {}",
        state.cursor.as_deref().unwrap_or("-")
    )?;
    writeln!(
        out,
        "  attempted  {}",
        timestamp(state.last_judge_attempted)
    )?;

    if limit == 0 {
        return Ok(());
    }
    let recent = session.log.recent(limit).await?;
    if recent.is_empty() {
        writeln!(out, "  no actions yet")?;
        return Ok(());
    }
    writeln!(out, "  recent actions:")?;
    for entry in recent {
        writeln!(
            out,
            "    {} {:<6} {}  {}",
            timestamp(Some(entry.created_at)),
            entry.kind,
            entry.uri,
            shorten(&entry.cause)
        )?;
    }
    Ok(())
}

fn timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(
        || "-".to_string(),
        |at| at.to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

fn shorten(cause: &str) -> String {
    let single_line = cause.replace('\n', " ");
    if single_line.chars().count() <= MAX_CAUSE_CHARS {
        return single_line;
    }
    let cut: String = single_line.chars().take(MAX_CAUSE_CHARS).collect();
    format!("{cut}...")
}
