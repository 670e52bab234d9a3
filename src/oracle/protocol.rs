use serde::{Deserialize, Serialize};
use std::fmt;

const CLASSIFICATION_MARKER: &str = "/moderations";

/// Wire protocol spoken by the configured oracle endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum OracleProtocol {
    /// Chat completion with `delete` / `report` tools.
    ChatCompletion,
    /// Moderation endpoint returning `results[0].flagged`.
    Classification,
}

impl OracleProtocol {
    pub fn for_endpoint(url: &str) -> Self {
        if url.contains(CLASSIFICATION_MARKER) {
            Self::Classification
        } else {
            Self::ChatCompletion
        }
    }
}

/// Oracle endpoint URL with its protocol resolved once, when the judge
/// configuration is deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct OracleEndpoint {
    url: String,
    protocol: OracleProtocol,
}

impl OracleEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let protocol = OracleProtocol::for_endpoint(&url);
        Self { url, protocol }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn protocol(&self) -> OracleProtocol {
        self.protocol
    }
}

impl From<String> for OracleEndpoint {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

impl From<OracleEndpoint> for String {
    fn from(endpoint: OracleEndpoint) -> Self {
        endpoint.url
    }
}

impl fmt::Display for OracleEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.url, self.protocol)
    }
}
