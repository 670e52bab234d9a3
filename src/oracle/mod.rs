//! AI judgment oracle: protocol selection, wire payloads, and the engine
//! that turns an answer into actions.

mod engine;
mod protocol;
mod types;

pub use engine::JudgmentEngine;
pub use protocol::{OracleEndpoint, OracleProtocol};
pub use types::{ClassificationResult, OracleToolCall, ToolCallFunction, Verdict};
