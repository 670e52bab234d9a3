use super::OracleProtocol;
use super::types::{
    ChatMessage, ChatRequest, ChatResponse, ClassificationRequest, ClassificationResponse,
    OracleToolCall, Verdict, judgment_tools,
};
use crate::actions::{ActionExecutor, JudgedPost};
use crate::audit::ActionKind;
use crate::config::PromptDefaults;
use crate::error::MalformedResponseError;
use crate::http::{build_http_client, upstream_error};
use crate::session::{JudgeConfig, OracleSettings};
use crate::social::Post;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::slice;

const SERVICE: &str = "oracle";

/// Sends one post to the session's oracle and turns the answer into
/// verdicts.
pub struct JudgmentEngine<'a> {
    client: Client,
    prompts: &'a PromptDefaults,
}

impl<'a> JudgmentEngine<'a> {
    pub fn new(client: Client, prompts: &'a PromptDefaults) -> Self {
        Self { client, prompts }
    }

    pub fn with_default_client(prompts: &'a PromptDefaults) -> Self {
        Self::new(build_http_client(), prompts)
    }

    /// Judge `post` and carry out every verdict through `executor`, in the
    /// order the oracle returned them. Returns the number of actions taken.
    pub async fn judge(
        &self,
        config: &JudgeConfig,
        post: &Post,
        executor: &ActionExecutor<'_>,
    ) -> Result<usize> {
        let verdicts = self.verdicts(config, post).await?;
        for verdict in &verdicts {
            executor
                .execute(verdict.kind, slice::from_ref(&verdict.post))
                .await?;
        }
        Ok(verdicts.len())
    }

    /// Ask the oracle about `post` without acting on the answer.
    pub async fn verdicts(&self, config: &JudgeConfig, post: &Post) -> Result<Vec<Verdict>> {
        let settings = &config.genai;
        let protocol = settings.endpoint.protocol();
        tracing::debug!(uri = %post.uri, %protocol, "asking oracle");

        match protocol {
            OracleProtocol::ChatCompletion => {
                let instruction = self
                    .prompts
                    .instruction_for(config.instruction_prompt.as_deref());
                self.ask_chat(settings, instruction, post).await
            }
            OracleProtocol::Classification => self.ask_classifier(settings, post).await,
        }
    }

    async fn ask_chat(
        &self,
        settings: &OracleSettings,
        instruction: &str,
        post: &Post,
    ) -> Result<Vec<Verdict>> {
        let post_json = serde_json::to_string_pretty(post).context("serialize post")?;
        let user = self.prompts.render_user(&post_json);
        let request = ChatRequest {
            model: &settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            tools: judgment_tools(),
        };

        let response: ChatResponse = self.post_json(settings, &request).await?;
        let message = response
            .choices
            .into_iter()
            .next()
            .ok_or(MalformedResponseError::MissingField {
                service: SERVICE,
                field: "choices[0]",
            })?
            .message;

        if let Some(content) = message.content.as_deref()
            && !content.is_empty()
        {
            tracing::debug!(uri = %post.uri, content, "oracle replied with text");
        }

        verdicts_from_tool_calls(message.tool_calls.unwrap_or_default(), &post.uri)
    }

    async fn ask_classifier(&self, settings: &OracleSettings, post: &Post) -> Result<Vec<Verdict>> {
        let request = ClassificationRequest {
            model: &settings.model,
            input: post.text(),
        };

        let response: ClassificationResponse = self.post_json(settings, &request).await?;
        let result = response
            .results
            .into_iter()
            .next()
            .ok_or(MalformedResponseError::MissingField {
                service: SERVICE,
                field: "results[0]",
            })?;

        if !result.flagged {
            return Ok(Vec::new());
        }
        Ok(vec![Verdict {
            kind: ActionKind::Delete,
            post: JudgedPost::new(&post.uri, result.breakdown()),
        }])
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        settings: &OracleSettings,
        body: &B,
    ) -> Result<T> {
        let response = self
            .client
            .post(settings.endpoint.url())
            .bearer_auth(&settings.api_key)
            .json(body)
            .send()
            .await
            .context("oracle request failed")?;

        if !response.status().is_success() {
            let err = upstream_error(SERVICE, response).await;
            return Err(anyhow::Error::new(err).context("oracle rejected"));
        }

        let text = response
            .text()
            .await
            .context("oracle response body unreadable")?;
        serde_json::from_str(&text).map_err(|e| {
            anyhow::Error::new(MalformedResponseError::Decode {
                service: SERVICE,
                message: e.to_string(),
            })
        })
    }
}

/// Map function tool calls to verdicts against the post at `judged_uri`.
/// Entries that are not function calls, that name an unknown tool, or that
/// target any other record are skipped. Arguments that do not decode to
/// `{uri, cause}` fail the whole answer before anything runs.
fn verdicts_from_tool_calls(
    calls: Vec<OracleToolCall>,
    judged_uri: &str,
) -> Result<Vec<Verdict>> {
    let mut verdicts = Vec::with_capacity(calls.len());
    for call in calls {
        if call.r#type != "function" {
            continue;
        }
        let Some(function) = call.function else {
            continue;
        };
        let Ok(kind) = function.name.parse::<ActionKind>() else {
            tracing::debug!(tool = %function.name, "ignoring unknown tool call");
            continue;
        };

        let post: JudgedPost = serde_json::from_str(&function.arguments).map_err(|e| {
            MalformedResponseError::ToolArguments {
                tool: function.name.clone(),
                message: e.to_string(),
            }
        })?;
        if post.uri != judged_uri {
            tracing::warn!(
                judged = judged_uri,
                target = %post.uri,
                "ignoring {kind} aimed at another record"
            );
            continue;
        }
        verdicts.push(Verdict { kind, post });
    }
    Ok(verdicts)
}
