mod key;
pub mod store;
pub mod types;

pub use key::{is_valid_session_key, session_key};
pub use store::SessionStore;
pub use types::{JudgeConfig, JudgeState, OracleSettings, Session, SocialProfile};
