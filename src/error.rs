use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `feedwarden`.
///
/// Callers that need to branch on a failure class (an upstream rejection vs.
/// a payload that did not have the expected shape) match on these. Internal
/// code keeps using `anyhow::Result` for context chains; the typed errors
/// stay reachable through `anyhow::Error::downcast_ref`.
#[derive(Debug, Error)]
pub enum WardenError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Upstream (social provider / oracle) ─────────────────────────────
    #[error("upstream: {0}")]
    Upstream(#[from] UpstreamError),

    // ── Response shape ──────────────────────────────────────────────────
    #[error("malformed response: {0}")]
    MalformedResponse(#[from] MalformedResponseError),

    // ── Session store ───────────────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(anyhow::Error),
}

impl WardenError {
    /// Process exit status for a command that failed with this error, in the
    /// `sysexits.h` ranges.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 78,
            Self::Upstream(_) => 69,
            Self::MalformedResponse(_) => 65,
            Self::Store(_) => 74,
            Self::Other(_) => 1,
        }
    }
}

/// Recovers the typed failure class from an `anyhow` chain. Context layers
/// are dropped once a typed error is found, so render the chain first when
/// the full message matters.
impl From<anyhow::Error> for WardenError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<ConfigError>() {
            Ok(e) => return Self::Config(e),
            Err(err) => err,
        };
        let err = match err.downcast::<UpstreamError>() {
            Ok(e) => return Self::Upstream(e),
            Err(err) => err,
        };
        let err = match err.downcast::<MalformedResponseError>() {
            Ok(e) => return Self::MalformedResponse(e),
            Err(err) => err,
        };
        match err.downcast::<StoreError>() {
            Ok(e) => Self::Store(e),
            Err(err) => Self::Other(err),
        }
    }
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Upstream errors ────────────────────────────────────────────────────────

/// A non-2xx answer from the social provider or the oracle.
///
/// `code` and `message` are the provider-supplied `error`/`message` pair and
/// are rendered verbatim as `"{code}: {message}"`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct UpstreamError {
    pub service: String,
    pub status: u16,
    pub code: String,
    pub message: String,
}

// ─── Malformed response errors ──────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum MalformedResponseError {
    #[error("{service} response missing {field}")]
    MissingField {
        service: &'static str,
        field: &'static str,
    },

    #[error("{service} response could not be decoded: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("tool call {tool} carried invalid arguments: {message}")]
    ToolArguments { tool: String, message: String },

    #[error("invalid record uri {uri:?}: {reason}")]
    RecordUri { uri: String, reason: &'static str },
}

// ─── Store errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("{path}: {message}")]
    Corrupt { path: String, message: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
