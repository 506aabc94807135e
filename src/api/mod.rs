//! Claude Messages API implementation of the generation model seam.
//!
//! Two request shapes are used:
//!
//! - non-streaming requests with tool definitions, for the tool loop
//!   (`next_tool_call`): the model answers with a `tool_use` content block
//!   that becomes the run's next step;
//! - streaming (SSE) requests for file content and revisions: text deltas
//!   are forwarded through an unbounded channel as they arrive.

pub mod prompts;
pub mod tools;

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;

use crate::agent::tools::{RawToolCall, StepOutcome, ToolStep};
use crate::agent::{FileContentRequest, GenerationModel, RevisionRequest, RunContext};

use prompts::{file_content_prompt, revision_prompt, WORKFLOW_SYSTEM_PROMPT};
use tools::generation_tools;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Generation model backed by the Claude Messages API.
#[derive(Clone)]
pub struct ClaudeModel {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
    base_url: String,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: Value,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    id: Option<String>,
    name: Option<String>,
    input: Option<Value>,
}

#[derive(Deserialize)]
struct StreamLine {
    #[serde(rename = "type")]
    event_type: String,
    delta: Option<ContentDelta>,
}

#[derive(Deserialize)]
struct ContentDelta {
    text: Option<String>,
}

impl ClaudeModel {
    /// Creates a client for the production endpoint.
    #[must_use]
    pub fn new(api_key: SecretString, model: &str, max_tokens: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.to_string(),
            max_tokens,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Overrides the API base URL (tests point this at a mock server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    /// Rebuilds the conversation the tool loop has had so far:
    /// one `tool_use` assistant turn and one `tool_result` user turn per
    /// executed step.
    fn transcript_messages(ctx: &RunContext, transcript: &[ToolStep]) -> Vec<ApiMessage> {
        let mut messages = vec![ApiMessage {
            role: "user",
            content: Value::String(format!(
                "Plan and generate the following infrastructure project: {}",
                ctx.title
            )),
        }];
        for step in transcript {
            messages.push(ApiMessage {
                role: "assistant",
                content: json!([{
                    "type": "tool_use",
                    "id": step.id,
                    "name": step.name,
                    "input": step.input,
                }]),
            });
            messages.push(ApiMessage {
                role: "user",
                content: json!([{
                    "type": "tool_result",
                    "tool_use_id": step.id,
                    "content": step.outcome.text(),
                    "is_error": matches!(step.outcome, StepOutcome::Failed(_)),
                }]),
            });
        }
        messages
    }

    async fn stream_text(
        &self,
        system: String,
        prompt: String,
        tx: mpsc::UnboundedSender<String>,
    ) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "stream": true,
                "system": system,
                "messages": [{"role": "user", "content": prompt}],
            }))
            .send()
            .await
            .context("streaming request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("model API returned {status}: {body}");
        }

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();

        use futures::StreamExt;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("error reading stream chunk")?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(pos) = buffer.find('\n') {
                let line = buffer[..pos].trim();
                if let Some(payload) = line.strip_prefix("data: ") {
                    if payload != "[DONE]" {
                        if let Ok(parsed) = serde_json::from_str::<StreamLine>(payload) {
                            if parsed.event_type == "content_block_delta" {
                                if let Some(text) = parsed.delta.and_then(|d| d.text) {
                                    tx.send(text).ok();
                                }
                            }
                        }
                    }
                }
                buffer = buffer[pos + 1..].to_string();
            }
        }

        Ok(())
    }
}

impl GenerationModel for ClaudeModel {
    async fn next_tool_call(
        &self,
        ctx: &RunContext,
        transcript: &[ToolStep],
    ) -> Result<Option<RawToolCall>> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "system": WORKFLOW_SYSTEM_PROMPT,
                "messages": Self::transcript_messages(ctx, transcript),
                "tools": generation_tools(),
                "tool_choice": {"type": "auto"},
            }))
            .send()
            .await
            .context("tool step request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("model API returned {status}: {body}");
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .context("malformed tool step response")?;

        let call = parsed
            .content
            .into_iter()
            .find(|block| block.block_type == "tool_use")
            .and_then(|block| {
                Some(RawToolCall::new(
                    block.id?,
                    block.name?,
                    block.input.unwrap_or_else(|| json!({})),
                ))
            });

        if call.is_none() {
            debug!(stop_reason = ?parsed.stop_reason, "model ended the tool loop");
        }
        Ok(call)
    }

    async fn stream_file_content(
        &self,
        request: FileContentRequest<'_>,
        tx: mpsc::UnboundedSender<String>,
    ) -> Result<()> {
        let system = file_content_prompt(
            request.filename,
            request.file_titles,
            request.project_title,
            request.files,
        );
        let prompt = format!(
            "Generate the complete content for {}.",
            request.filename
        );
        self.stream_text(system, prompt, tx).await
    }

    async fn stream_revision(
        &self,
        request: RevisionRequest<'_>,
        tx: mpsc::UnboundedSender<String>,
    ) -> Result<()> {
        let system = revision_prompt(request.current_content);
        self.stream_text(system, request.description.to_string(), tx)
            .await
    }
}
