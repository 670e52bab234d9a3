mod env_overrides;
mod loader;
#[cfg(test)]
mod test_env;
mod types;

pub use types::{Config, POST_JSON_PLACEHOLDER, PromptDefaults};
