use crate::actions::JudgedPost;
use crate::audit::ActionKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

// ── Chat completion ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub tools: Vec<ToolSpec>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ToolSpec {
    pub r#type: &'static str,
    pub function: ToolDefinition,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// `delete` and `report`, both taking `{uri, cause}`.
pub(crate) fn judgment_tools() -> Vec<ToolSpec> {
    [
        ("delete", "Delete the post from the owner's account."),
        (
            "report",
            "Record the post for the owner to review without deleting it.",
        ),
    ]
    .into_iter()
    .map(|(name, description)| ToolSpec {
        r#type: "function",
        function: ToolDefinition {
            name,
            description,
            parameters: json!({
                "type": "object",
                "properties": {
                    "uri": {
                        "type": "string",
                        "description": "The `uri` of the post being judged."
                    },
                    "cause": {
                        "type": "string",
                        "description": "Short reason for the verdict."
                    }
                },
                "required": ["uri", "cause"],
                "additionalProperties": false
            }),
        },
    })
    .collect()
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<OracleToolCall>>,
}

/// One entry of `choices[0].message.tool_calls`.
#[derive(Debug, Clone, Deserialize)]
pub struct OracleToolCall {
    #[serde(default)]
    pub id: Option<String>,
    pub r#type: String,
    #[serde(default)]
    pub function: Option<ToolCallFunction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    /// JSON-encoded object, as sent by the oracle.
    pub arguments: String,
}

// ── Classification ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct ClassificationRequest<'a> {
    pub model: &'a str,
    pub input: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClassificationResponse {
    #[serde(default)]
    pub results: Vec<ClassificationResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationResult {
    pub flagged: bool,
    #[serde(default)]
    pub categories: Map<String, Value>,
    #[serde(default)]
    pub category_scores: Map<String, Value>,
}

impl ClassificationResult {
    /// `{categories, category_scores}` as a JSON string, used as the cause.
    pub fn breakdown(&self) -> String {
        json!({
            "categories": self.categories,
            "category_scores": self.category_scores,
        })
        .to_string()
    }
}

// ── Outcome ────────────────────────────────────────────────────────────────

/// One action the oracle asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub kind: ActionKind,
    pub post: JudgedPost,
}
