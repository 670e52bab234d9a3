use super::{Config, POST_JSON_PLACEHOLDER};
use crate::error::ConfigError;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".feedwarden";
const CONFIG_FILE: &str = "config.toml";
const SESSIONS_DIR: &str = "sessions";

fn app_dir() -> Result<PathBuf> {
    let home = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .context("Could not find home directory")?;
    Ok(home.join(APP_DIR))
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

impl Config {
    /// Load the configuration from `path` (or `~/.feedwarden/config.toml`),
    /// apply environment overrides, read prompt files, and validate.
    ///
    /// A missing file is not an error: defaults plus environment overrides
    /// still have to produce a valid configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => expand(path),
            None => app_dir()?.join(CONFIG_FILE),
        };

        let mut config = if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            Self::from_toml_str(&contents)?
        } else {
            Self::default()
        };
        config.config_path.clone_from(&config_path);

        if config.session_dir.as_os_str().is_empty() {
            config.session_dir = config_path
                .parent()
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
                .join(SESSIONS_DIR);
        }

        config.apply_env_overrides();
        config.finish()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::Load(e.to_string()))
            .context("Failed to parse config file")
    }

    /// Resolve paths, read prompt files, and validate. Called once by
    /// [`Config::load`]; exposed so tests can build a config in memory.
    pub fn finish(&mut self) -> Result<()> {
        self.session_dir = expand(&self.session_dir);

        if let Some(file) = &self.instruction_prompt_file {
            let file = expand(file);
            self.prompts.instruction = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read instruction prompt {}", file.display()))?;
        }
        if let Some(file) = &self.user_prompt_file {
            let file = expand(file);
            self.prompts.user_template = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read user prompt {}", file.display()))?;
        }

        self.validate()?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.salt.trim().is_empty() {
            return Err(ConfigError::Validation(
                "salt is empty; set `salt` in config.toml or FEEDWARDEN_SALT".into(),
            ));
        }
        if self.heartbeats_ms.is_empty() || self.heartbeats_ms.contains(&0) {
            return Err(ConfigError::Validation(
                "heartbeats_ms must list at least one non-zero delay".into(),
            ));
        }
        if self.audit_max_records == 0 {
            return Err(ConfigError::Validation(
                "audit_max_records must be greater than zero".into(),
            ));
        }
        if !(1..=100).contains(&self.feed_page_limit) {
            return Err(ConfigError::Validation(format!(
                "feed_page_limit must be within 1..=100, got {}",
                self.feed_page_limit
            )));
        }
        if !self.prompts.user_template.contains(POST_JSON_PLACEHOLDER) {
            return Err(ConfigError::Validation(format!(
                "user prompt template is missing the {POST_JSON_PLACEHOLDER} placeholder"
            )));
        }
        Ok(())
    }
}
