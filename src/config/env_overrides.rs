use super::Config;
use std::path::PathBuf;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(salt) = std::env::var("FEEDWARDEN_SALT").or_else(|_| std::env::var("SALT"))
            && !salt.is_empty()
        {
            self.salt = salt;
        }

        if let Ok(dir) = std::env::var("FEEDWARDEN_SESSION_DIR")
            && !dir.is_empty()
        {
            self.session_dir = PathBuf::from(dir);
        }

        if let Ok(secs) = std::env::var("FEEDWARDEN_SOCIAL_SESSION_AGE_SECS")
            && let Ok(secs) = secs.parse::<u64>()
        {
            self.social_session_age_secs = secs;
        }

        if let Ok(secs) = std::env::var("FEEDWARDEN_JUDGE_FREQUENCY_SECS")
            && let Ok(secs) = secs.parse::<u64>()
        {
            self.judge_frequency_secs = secs;
        }

        if let Ok(file) = std::env::var("FEEDWARDEN_INSTRUCTION_PROMPT_FILE")
            && !file.is_empty()
        {
            self.instruction_prompt_file = Some(PathBuf::from(file));
        }

        if let Ok(file) = std::env::var("FEEDWARDEN_USER_PROMPT_FILE")
            && !file.is_empty()
        {
            self.user_prompt_file = Some(PathBuf::from(file));
        }

        if let Ok(format) = std::env::var("FEEDWARDEN_LOG_FORMAT") {
            let format = format.trim().to_ascii_lowercase();
            self.log_timestamps = !matches!(format.as_str(), "off" | "false" | "plain");
        }
    }
}
