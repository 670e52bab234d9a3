use super::key::is_valid_session_key;
use super::types::{JudgeConfig, JudgeState, Session, SocialProfile};
use crate::audit::AuditLog;
use crate::config::Config;
use crate::error::StoreError;
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

const SOCIAL_FILENAME: &str = "social.json";
const CONFIG_FILENAME: &str = "config.json";
const STATE_FILENAME: &str = "state.json";
const AUDIT_FILENAME: &str = "audit.jsonl";

/// Directory-per-session store. Each session directory holds
/// `social.json`, `config.json`, `state.json`, and `audit.jsonl`.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
    audit_max_records: usize,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>, audit_max_records: usize) -> Self {
        Self {
            root: root.into(),
            audit_max_records,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.session_dir.clone(), config.audit_max_records)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, key: &str) -> Result<PathBuf> {
        if !is_valid_session_key(key) {
            anyhow::bail!("invalid session key {key:?}");
        }
        Ok(self.root.join(key))
    }

    pub fn audit_log(&self, key: &str) -> Result<AuditLog> {
        Ok(AuditLog::new(
            self.session_dir(key)?.join(AUDIT_FILENAME),
            self.audit_max_records,
        ))
    }

    /// Keys of every session directory, sorted. A missing root means no
    /// sessions yet.
    pub async fn session_keys(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => {
                return Err(anyhow::Error::new(StoreError::Io(error))
                    .context(format!("list sessions in {}", self.root.display())));
            }
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("list sessions in {}", self.root.display()))?
        {
            if !entry.file_type().await.is_ok_and(|t| t.is_dir()) {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && is_valid_session_key(name)
            {
                keys.push(name.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        let dir = self.session_dir(key)?;
        Ok(fs::metadata(&dir).await.is_ok_and(|m| m.is_dir()))
    }

    /// Read all four fields of a session.
    pub async fn load(&self, key: &str) -> Result<Session> {
        let dir = self.session_dir(key)?;
        if !fs::metadata(&dir).await.is_ok_and(|m| m.is_dir()) {
            return Err(StoreError::NotFound(key.to_string()).into());
        }

        let social = read_json::<SocialProfile>(&dir.join(SOCIAL_FILENAME)).await?;
        let config = read_json::<JudgeConfig>(&dir.join(CONFIG_FILENAME)).await?;
        let state = read_json::<JudgeState>(&dir.join(STATE_FILENAME))
            .await?
            .unwrap_or_default();

        Ok(Session {
            key: key.to_string(),
            log: AuditLog::new(dir.join(AUDIT_FILENAME), self.audit_max_records),
            dir,
            social,
            config,
            state,
        })
    }

    pub async fn save_social(&self, key: &str, social: &SocialProfile) -> Result<()> {
        write_json(&self.session_dir(key)?.join(SOCIAL_FILENAME), social).await
    }

    pub async fn save_config(&self, key: &str, config: &JudgeConfig) -> Result<()> {
        write_json(&self.session_dir(key)?.join(CONFIG_FILENAME), config).await
    }

    pub async fn save_state(&self, key: &str, state: &JudgeState) -> Result<()> {
        write_json(&self.session_dir(key)?.join(STATE_FILENAME), state).await
    }
}

/// Missing file is `None`; unreadable or unparseable file is an error.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let text = match fs::read_to_string(path).await {
        Ok(text) => text,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(error) => {
            return Err(anyhow::Error::new(StoreError::Io(error))
                .context(format!("read {}", path.display())));
        }
    };
    if text.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&text).map(Some).map_err(|e| {
        anyhow::Error::new(StoreError::Corrupt {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    })
}

/// Pretty-printed JSON, written through a temporary file and renamed into
/// place so a reader never sees a half-written document.
async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create {}", parent.display()))?;
    }

    let data = serde_json::to_vec_pretty(value).context("serialize session record")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data)
        .await
        .with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .await
        .with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
