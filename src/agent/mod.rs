//! Agent tool executor: the bounded generation loop.
//!
//! A [`GenerationRun`] drives a [`GenerationModel`] through a tool-calling
//! loop with a hard step ceiling, executing each normalized tool against
//! the run's [`ProjectState`] and broadcasting a complete snapshot after
//! every observable change.
//!
//! Tool calls execute strictly sequentially, in call order, against the
//! single-owner file map — two calls can never race on the same path, and
//! the later call wins deterministically.
//!
//! The model is instructed to initialize the project first, author a plan
//! file before other files, and then bulk-author the rest; none of that is
//! enforced here. Whatever order the calls arrive in, every intermediate
//! snapshot is complete and renderable.
//!
//! Failure semantics: a model or transport error ends the run with the
//! last broadcast standing as the final result. Bad tool input is returned
//! to the model as a descriptive string so it can self-correct.

pub mod broadcast;
pub mod project;
pub mod tools;

use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{VerdigrisError, VerdigrisResult};
use crate::types::config::GenerationConfig;
use crate::types::snapshot::Snapshot;

use broadcast::Broadcaster;
use project::ProjectState;
use tools::{ModuleRef, RawToolCall, StepOutcome, ToolRequest, ToolStep};

/// Identity of the document a run is generating.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Generated document id.
    pub id: Uuid,
    /// Document title; also the project description given to the model.
    pub title: String,
    /// Document kind (e.g. "terraform").
    pub kind: String,
}

impl RunContext {
    /// Creates a context with a fresh document id.
    #[must_use]
    pub fn new(title: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            kind: kind.into(),
        }
    }
}

/// Everything a model needs to author one file's content.
#[derive(Debug)]
pub struct FileContentRequest<'a> {
    /// The file being authored.
    pub filename: &'a str,
    /// Project title/description.
    pub project_title: &'a str,
    /// Every announced file title, for cross-file context.
    pub file_titles: &'a [String],
    /// Current content of all files.
    pub files: &'a Snapshot,
}

/// Everything a model needs to revise an existing document.
#[derive(Debug)]
pub struct RevisionRequest<'a> {
    /// The document's current serialized content.
    pub current_content: &'a str,
    /// The user's requirements for the revision.
    pub description: &'a str,
}

/// The model seam for generation runs.
///
/// Implementations stream deltas through the provided sender and drop it
/// when the stream ends; the run drains the channel afterwards.
#[allow(async_fn_in_trait)]
pub trait GenerationModel {
    /// Asks the model for its next tool invocation given the transcript
    /// so far. `None` means the model considers the run complete.
    async fn next_tool_call(
        &self,
        ctx: &RunContext,
        transcript: &[ToolStep],
    ) -> anyhow::Result<Option<RawToolCall>>;

    /// Streams the content of a single file.
    async fn stream_file_content(
        &self,
        request: FileContentRequest<'_>,
        tx: mpsc::UnboundedSender<String>,
    ) -> anyhow::Result<()>;

    /// Streams a revised document as raw JSON text.
    async fn stream_revision(
        &self,
        request: RevisionRequest<'_>,
        tx: mpsc::UnboundedSender<String>,
    ) -> anyhow::Result<()>;
}

/// Read-only module metadata collaborator.
///
/// The registry lives outside this system; deployments without one use
/// [`StaticRegistry`].
pub trait ModuleRegistry: Send + Sync {
    /// Fetches module schema and metadata.
    fn fetch_modules(&self, modules: &[ModuleRef]) -> Result<String, String>;

    /// Fetches documentation for public modules.
    fn fetch_public_module_docs(&self, modules: &[String]) -> Result<String, String>;
}

/// Registry stub that acknowledges every lookup without external calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticRegistry;

impl ModuleRegistry for StaticRegistry {
    fn fetch_modules(&self, modules: &[ModuleRef]) -> Result<String, String> {
        Ok(json!({
            "status": "success",
            "message": format!("Fetched metadata for {} module(s)", modules.len()),
        })
        .to_string())
    }

    fn fetch_public_module_docs(&self, modules: &[String]) -> Result<String, String> {
        Ok(json!({
            "status": "success",
            "message": format!("Fetched documentation for {} module(s)", modules.len()),
        })
        .to_string())
    }
}

/// Result of a completed generation run.
#[derive(Debug)]
pub struct RunOutcome {
    /// The final broadcast content — the document's persisted form.
    pub content: String,
    /// Final project state, ready to hand to the review layer.
    pub state: ProjectState,
    /// Every tool step the run executed.
    pub transcript: Vec<ToolStep>,
}

/// One bounded, tool-driven generation run over a single document.
pub struct GenerationRun<M> {
    model: M,
    config: GenerationConfig,
    registry: Box<dyn ModuleRegistry>,
    state: ProjectState,
    broadcaster: Broadcaster,
    transcript: Vec<ToolStep>,
}

impl<M: GenerationModel> GenerationRun<M> {
    /// Creates a run seeded with the conventional empty root file.
    #[must_use]
    pub fn new(model: M, config: GenerationConfig, broadcaster: Broadcaster) -> Self {
        Self {
            model,
            config,
            registry: Box::new(StaticRegistry),
            state: ProjectState::with_default_file("main.tf"),
            broadcaster,
            transcript: Vec::new(),
        }
    }

    /// Replaces the module registry collaborator.
    #[must_use]
    pub fn with_registry(mut self, registry: Box<dyn ModuleRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Executes the loop to completion and returns the outcome.
    ///
    /// Never returns an error: failures end the run early with whatever
    /// was last broadcast standing as the result.
    pub async fn run(mut self, ctx: &RunContext) -> RunOutcome {
        info!(document = %ctx.id, title = %ctx.title, "generation run started");
        self.broadcaster.start(ctx.id, &ctx.title, &ctx.kind);
        self.broadcast_now();

        for step in 0..self.config.max_steps {
            let call = match self.model.next_tool_call(ctx, &self.transcript).await {
                Ok(Some(call)) => call,
                Ok(None) => {
                    debug!(step, "model signalled completion");
                    break;
                }
                Err(e) => {
                    warn!(step, error = %e, "model request failed; ending run");
                    break;
                }
            };

            debug!(step, tool = %call.name, "executing tool");
            let (outcome, fatal) = match ToolRequest::parse(&call.name, &call.input) {
                Ok(request) => match self.dispatch(ctx, request).await {
                    Ok(outcome) => (outcome, false),
                    Err(e) => {
                        warn!(step, error = %e, "tool execution failed; ending run");
                        (StepOutcome::Failed(e.to_string()), true)
                    }
                },
                Err(message) => (StepOutcome::Failed(message), false),
            };

            self.transcript.push(ToolStep {
                id: call.id,
                name: call.name,
                input: call.input,
                outcome,
            });
            if fatal {
                break;
            }
        }

        let content = self.broadcast_now();
        self.broadcaster.finish();
        info!(
            document = %ctx.id,
            steps = self.transcript.len(),
            files = self.state.len(),
            "generation run finished"
        );
        RunOutcome {
            content,
            state: self.state,
            transcript: self.transcript,
        }
    }

    async fn dispatch(
        &mut self,
        ctx: &RunContext,
        request: ToolRequest,
    ) -> VerdigrisResult<StepOutcome> {
        match request {
            ToolRequest::InitializeProject { files } => {
                debug!(files = ?files, "initialize_project");
                self.state.ensure_files(&files);
                self.broadcast_now();
                Ok(StepOutcome::Completed(format!(
                    "Project initialized with files: {}. Now provide the content for every file using write_project_files.",
                    files.join(", ")
                )))
            }

            ToolRequest::WriteFile { filename } => {
                self.stream_one_file(ctx, &filename, true).await?;
                Ok(StepOutcome::Completed(format!(
                    "Successfully wrote content for {filename}."
                )))
            }

            ToolRequest::WriteProjectFiles { filenames } => {
                for filename in &filenames {
                    debug!(file = %filename, "sequential streaming");
                    self.stream_one_file(ctx, filename, false).await?;
                }
                Ok(StepOutcome::Completed(format!(
                    "Successfully wrote content for: {}",
                    filenames.join(", ")
                )))
            }

            ToolRequest::Edit {
                file_path,
                old_string,
                new_string,
                replace_all,
            } => match self
                .state
                .replaced_content(&file_path, &old_string, &new_string, replace_all)
            {
                Ok(new_content) => {
                    self.replay(&file_path, &new_content).await;
                    Ok(StepOutcome::Completed(format!(
                        "Successfully edited {file_path}. Replaced {}.",
                        if replace_all {
                            "all occurrences"
                        } else {
                            "1 occurrence"
                        }
                    )))
                }
                Err(message) => Ok(StepOutcome::Failed(message)),
            },

            ToolRequest::MultiEdit { file_path, edits } => {
                if !self.state.contains(&file_path) {
                    return Ok(StepOutcome::Failed(format!(
                        "Error: File {file_path} not found."
                    )));
                }
                let total = edits.len();
                let mut applied = 0;
                for edit in &edits {
                    match self.state.replaced_content(
                        &file_path,
                        &edit.old_string,
                        &edit.new_string,
                        edit.replace_all,
                    ) {
                        Ok(new_content) => {
                            self.replay(&file_path, &new_content).await;
                            applied += 1;
                        }
                        Err(_) => {
                            debug!(
                                file = %file_path,
                                needle = %truncate(&edit.old_string, 20),
                                "multiEdit: string not found, skipping edit"
                            );
                        }
                    }
                }
                Ok(StepOutcome::Completed(format!(
                    "Successfully applied {applied} out of {total} edits to {file_path}."
                )))
            }

            ToolRequest::FetchFiles { files } => {
                Ok(StepOutcome::Completed(self.state.fetch(&files).to_string()))
            }

            ToolRequest::FetchModules { modules } => {
                match self.registry.fetch_modules(&modules) {
                    Ok(result) => Ok(StepOutcome::Completed(result)),
                    Err(message) => Ok(StepOutcome::Failed(message)),
                }
            }

            ToolRequest::FetchPublicModuleDocs { modules } => {
                match self.registry.fetch_public_module_docs(&modules) {
                    Ok(result) => Ok(StepOutcome::Completed(result)),
                    Err(message) => Ok(StepOutcome::Failed(message)),
                }
            }
        }
    }

    /// Streams model content into one file.
    ///
    /// `per_token` broadcasts after every delta (single-file writes);
    /// otherwise broadcasts are throttled to the configured chunk size
    /// with a pacing delay, plus a forced broadcast once the file is done.
    async fn stream_one_file(
        &mut self,
        ctx: &RunContext,
        filename: &str,
        per_token: bool,
    ) -> VerdigrisResult<()> {
        self.state.begin_write(filename);
        if !per_token {
            // Show the consumer this file has started before content lands.
            self.broadcast_now();
        }

        let titles = self.state.titles();
        let files = self.state.snapshot();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let request = FileContentRequest {
            filename,
            project_title: &ctx.title,
            file_titles: &titles,
            files: &files,
        };
        self.model
            .stream_file_content(request, tx)
            .await
            .map_err(|e| {
                VerdigrisError::generation(format!("content stream for {filename} failed: {e:#}"))
            })?;

        let mut pending_chars = 0usize;
        while let Some(delta) = rx.recv().await {
            pending_chars += delta.chars().count();
            self.state.append(filename, &delta);
            if per_token {
                self.broadcast_now();
            } else if pending_chars > self.config.stream_chunk_chars {
                self.broadcast_now();
                pending_chars = 0;
                if !self.config.stream_pacing.is_zero() {
                    tokio::time::sleep(self.config.stream_pacing).await;
                }
            }
        }
        self.broadcast_now();
        Ok(())
    }

    /// Replays `content` into the file from empty, character by
    /// character, so the consumer can watch the change land.
    async fn replay(&mut self, title: &str, content: &str) {
        self.state.set_content(title, "");
        self.broadcast_now();
        let total = content.chars().count();
        for (i, ch) in content.chars().enumerate() {
            self.state.push_char(title, ch);
            if i % self.config.replay_chunk_chars == 0 || i + 1 == total {
                self.broadcast_now();
                if !self.config.replay_pacing.is_zero() {
                    tokio::time::sleep(self.config.replay_pacing).await;
                }
            }
        }
    }

    fn broadcast_now(&self) -> String {
        match self.broadcaster.snapshot(&self.state.snapshot()) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "snapshot serialization failed");
                String::new()
            }
        }
    }
}

/// Revises an existing document by streaming the model's raw JSON text.
///
/// Every accumulated prefix is broadcast verbatim — consumers are expected
/// to tolerate incomplete JSON (see `reconciler`). Returns the final draft
/// content, falling back to the current content when the model produced
/// nothing.
pub async fn run_revision<M: GenerationModel>(
    model: &M,
    broadcaster: &Broadcaster,
    ctx: &RunContext,
    description: &str,
    current_content: &str,
) -> String {
    info!(document = %ctx.id, "revision run started");
    broadcaster.start(ctx.id, &ctx.title, &ctx.kind);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let request = RevisionRequest {
        current_content,
        description,
    };
    let stream_result = model.stream_revision(request, tx).await;

    let mut draft = String::new();
    while let Some(delta) = rx.recv().await {
        draft.push_str(&delta);
        broadcaster.raw(draft.clone());
    }
    if let Err(e) = stream_result {
        warn!(error = %e, "revision stream failed; keeping accumulated draft");
    }
    broadcaster.finish();

    if draft.is_empty() {
        current_content.to_string()
    } else {
        draft
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
