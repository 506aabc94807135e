//! Scripted generation model for integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::mpsc;

use verdigris::agent::tools::{RawToolCall, ToolStep};
use verdigris::agent::{FileContentRequest, GenerationModel, RevisionRequest, RunContext};

/// Model that replays a fixed sequence of tool calls and streams canned
/// per-file content.
#[derive(Default)]
pub struct ScriptedModel {
    calls: Mutex<VecDeque<RawToolCall>>,
    contents: HashMap<String, Vec<String>>,
    revision_deltas: Vec<String>,
    fail_stream_for: Option<String>,
    repeat_last_call: bool,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a tool call. Ids are generated from the queue position.
    pub fn call(self, name: &str, input: Value) -> Self {
        let id = format!("toolu_{:02}", self.calls.lock().unwrap().len());
        self.calls
            .lock()
            .unwrap()
            .push_back(RawToolCall::new(id, name, input));
        self
    }

    /// Registers the deltas streamed when `filename` is written.
    pub fn content(mut self, filename: &str, deltas: &[&str]) -> Self {
        self.contents
            .insert(filename.to_string(), deltas.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Registers the deltas streamed by a revision run.
    pub fn revision(mut self, deltas: &[&str]) -> Self {
        self.revision_deltas = deltas.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Makes streaming fail for one file, to exercise run-failure paths.
    pub fn failing_stream(mut self, filename: &str) -> Self {
        self.fail_stream_for = Some(filename.to_string());
        self
    }

    /// Keeps re-issuing the final queued call forever, to exercise the
    /// step ceiling.
    pub fn repeating_last_call(mut self) -> Self {
        self.repeat_last_call = true;
        self
    }
}

impl GenerationModel for ScriptedModel {
    async fn next_tool_call(
        &self,
        _ctx: &RunContext,
        _transcript: &[ToolStep],
    ) -> anyhow::Result<Option<RawToolCall>> {
        let mut calls = self.calls.lock().unwrap();
        if self.repeat_last_call && calls.len() == 1 {
            return Ok(calls.front().cloned());
        }
        Ok(calls.pop_front())
    }

    async fn stream_file_content(
        &self,
        request: FileContentRequest<'_>,
        tx: mpsc::UnboundedSender<String>,
    ) -> anyhow::Result<()> {
        if self.fail_stream_for.as_deref() == Some(request.filename) {
            anyhow::bail!("stream interrupted");
        }
        if let Some(deltas) = self.contents.get(request.filename) {
            for delta in deltas {
                tx.send(delta.clone()).ok();
            }
        }
        Ok(())
    }

    async fn stream_revision(
        &self,
        _request: RevisionRequest<'_>,
        tx: mpsc::UnboundedSender<String>,
    ) -> anyhow::Result<()> {
        for delta in &self.revision_deltas {
            tx.send(delta.clone()).ok();
        }
        Ok(())
    }
}
