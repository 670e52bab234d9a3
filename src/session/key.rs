use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

/// Stable session identifier for an account: `base64url(sha256(did ‖ salt))`.
///
/// The same account always maps to the same key for a given salt, so a
/// second login overwrites the first session instead of creating a new one.
pub fn session_key(did: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(did.as_bytes());
    hasher.update(salt.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Session keys are used as directory names; reject anything that is not
/// plain base64url so a key can never escape the session root.
pub fn is_valid_session_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
