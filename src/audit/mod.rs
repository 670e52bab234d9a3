//! Capped, append-only record of moderation actions for one session.
//!
//! The store is newline-delimited JSON, one [`AuditLogEntry`] per line.
//! Appends go straight to the end of the file; [`AuditLog::trim`] rewrites
//! the file to the newest `max_records` lines and leaves it untouched when
//! it is already within the cap.

use anyhow::{Context, Result};
use async_stream::stream;
use chrono::{DateTime, Utc};
use futures_util::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

pub const DEFAULT_MAX_RECORDS: usize = 1024;

/// What was done to a post.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ActionKind {
    Delete,
    Report,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub uri: String,
    pub cause: String,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(kind: ActionKind, uri: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            kind,
            uri: uri.into(),
            cause: cause.into(),
            created_at: Utc::now(),
        }
    }
}

/// Handle to one session's audit log file.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
    max_records: usize,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>, max_records: usize) -> Self {
        Self {
            path: path.into(),
            max_records: max_records.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    /// Append one entry and flush it to disk before returning.
    pub async fn append(&self, entry: &AuditLogEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create audit log directory {}", parent.display()))?;
        }

        let mut line = serde_json::to_string(entry).context("serialize audit entry")?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("open audit log {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .with_context(|| format!("append to audit log {}", self.path.display()))?;
        file.sync_data()
            .await
            .with_context(|| format!("sync audit log {}", self.path.display()))?;
        Ok(())
    }

    /// Stream every stored entry in insertion order.
    ///
    /// Each call reopens the file, so the stream can be restarted by calling
    /// `read` again. A missing file yields an empty stream.
    pub fn read(&self) -> impl Stream<Item = Result<AuditLogEntry>> + Send + 'static {
        let path = self.path.clone();
        stream! {
            match File::open(&path).await {
                Ok(file) => {
                    let mut lines = BufReader::new(file).lines();
                    loop {
                        match lines.next_line().await {
                            Ok(Some(line)) => {
                                if line.trim().is_empty() {
                                    continue;
                                }
                                yield serde_json::from_str::<AuditLogEntry>(&line).with_context(
                                    || format!("corrupt audit record in {}", path.display()),
                                );
                            }
                            Ok(None) => break,
                            Err(error) => {
                                yield Err(anyhow::Error::new(error)
                                    .context(format!("read audit log {}", path.display())));
                                break;
                            }
                        }
                    }
                }
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(error) => {
                    yield Err(anyhow::Error::new(error)
                        .context(format!("open audit log {}", path.display())));
                }
            }
        }
    }

    /// Collect the last `limit` entries, oldest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<AuditLogEntry>> {
        let entries = self.read().collect::<Vec<_>>().await;
        let skip = entries.len().saturating_sub(limit);
        entries.into_iter().skip(skip).collect()
    }

    /// Keep only the newest `max_records` lines. Returns whether the file was
    /// rewritten.
    pub async fn trim(&self) -> Result<bool> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(error) => {
                return Err(anyhow::Error::new(error)
                    .context(format!("read audit log {}", self.path.display())));
            }
        };

        let lines: Vec<&str> = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .collect();
        if lines.len() <= self.max_records {
            return Ok(false);
        }

        let mut kept = lines[lines.len() - self.max_records..].join("\n");
        kept.push('\n');

        let tmp = self.path.with_extension("jsonl.tmp");
        fs::write(&tmp, kept)
            .await
            .with_context(|| format!("write trimmed audit log {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replace audit log {}", self.path.display()))?;

        tracing::debug!(
            path = %self.path.display(),
            dropped = lines.len() - self.max_records,
            "trimmed audit log"
        );
        Ok(true)
    }
}
