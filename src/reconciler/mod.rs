//! Consumer-side reconciliation of streamed document content.
//!
//! While a generation run is live, the consumer holds a content string
//! that is, at any instant, a growing and possibly syntactically invalid
//! prefix of a snapshot document. [`ArtifactView`] derives a stable file
//! list and tab state from that string without ever surfacing a parse
//! error, falling through a fixed ladder:
//!
//! 1. strict parse;
//! 2. parse again with each candidate closing suffix appended (handles a
//!    document truncated mid-field or mid-array);
//! 3. regex extraction of completed `"title"` fields, with best-effort
//!    content recovery per title (titles complete before their content);
//! 4. raw-text mode for legacy non-JSON content.
//!
//! The view owns only UI-facing derived state. It never mutates
//! generation content.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::agent::broadcast::DocumentMessage;
use crate::types::snapshot::{FileEntry, FileStatus, Snapshot};

/// Content shown for a title whose text has not streamed yet and has no
/// previously-known value.
pub const GENERATING_SENTINEL: &str = "Generating...";

/// Implicit title used when the stream carries raw non-JSON text.
const RAW_CONTENT_TITLE: &str = "main.tf";

/// Closing suffixes tried, in order, against a truncated document.
const REPAIR_SUFFIXES: [&str; 6] = ["}", "\"}", "]}", "\"]}", "\"]}]}", "\"} ] }"];

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""title"\s*:\s*"([^"]+)""#).expect("static regex"));

/// Metadata announced before content arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub id: Uuid,
    pub title: String,
    pub kind: String,
}

/// Derived, UI-facing state for one streamed document.
#[derive(Debug, Default)]
pub struct ArtifactView {
    document: Option<DocumentInfo>,
    files: Vec<FileEntry>,
    active_file: Option<String>,
    open_files: Vec<String>,
    seen_titles: HashSet<String>,
    generating: bool,
}

impl ArtifactView {
    /// Creates an empty view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The announced document metadata, if any.
    #[must_use]
    pub fn document(&self) -> Option<&DocumentInfo> {
        self.document.as_ref()
    }

    /// Current derived file list, in discovery order.
    #[must_use]
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// The explicitly active file title, if one is set.
    #[must_use]
    pub fn active_file(&self) -> Option<&str> {
        self.active_file.as_deref()
    }

    /// The entry to display: the active file, falling back to the first.
    #[must_use]
    pub fn active_entry(&self) -> Option<&FileEntry> {
        self.active_file
            .as_deref()
            .and_then(|t| self.files.iter().find(|f| f.title == t))
            .or_else(|| self.files.first())
    }

    /// Open tab titles, in open order.
    #[must_use]
    pub fn open_files(&self) -> &[String] {
        &self.open_files
    }

    /// Returns true while a generation run is live.
    #[must_use]
    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Derived status of a file.
    #[must_use]
    pub fn status_of(&self, title: &str) -> Option<FileStatus> {
        self.files
            .iter()
            .find(|f| f.title == title)
            .map(FileEntry::status)
    }

    /// Drains every queued message and applies each in order. Returns the
    /// number of messages processed.
    ///
    /// There is no backpressure to the producer; this is safe because
    /// every content message is a full snapshot, so processing only the
    /// backlog's tail would still converge to the same state.
    pub fn pump(&mut self, rx: &mut mpsc::UnboundedReceiver<DocumentMessage>) -> usize {
        let mut processed = 0;
        while let Ok(message) = rx.try_recv() {
            self.handle(message);
            processed += 1;
        }
        processed
    }

    /// Applies one message.
    pub fn handle(&mut self, message: DocumentMessage) {
        match message {
            DocumentMessage::Start { id, title, kind } => {
                self.document = Some(DocumentInfo { id, title, kind });
                self.generating = true;
            }
            DocumentMessage::Snapshot(content) => self.apply_update(&content),
            DocumentMessage::Finish => self.generating = false,
        }
    }

    /// Reconciles the view against the latest content string.
    pub fn apply_update(&mut self, content: &str) {
        if content.is_empty() {
            self.files.clear();
            return;
        }

        let trimmed = content.trim();
        if trimmed.starts_with('{') {
            if let Some(snapshot) = parse_with_repair(trimmed) {
                self.adopt(snapshot.files);
                return;
            }
            self.extract_heuristically(trimmed);
        } else if !trimmed.is_empty() {
            // Legacy raw-text content: the whole string is one implicit file.
            self.adopt(vec![FileEntry::new(RAW_CONTENT_TITLE, content)]);
        }
    }

    /// Regex fallback for content that no repair suffix could fix.
    ///
    /// Titles typically complete before their paired content, so every
    /// completed title is recovered even when its content is mid-stream.
    /// When no content match exists, the previously known content for
    /// that title is reused so text never visibly regresses.
    fn extract_heuristically(&mut self, trimmed: &str) {
        let mut titles: Vec<String> = Vec::new();
        for captures in TITLE_RE.captures_iter(trimmed) {
            let title = captures[1].to_string();
            if !titles.contains(&title) {
                titles.push(title);
            }
        }
        if titles.is_empty() {
            debug!("no titles recoverable from partial content; keeping previous state");
            return;
        }

        let files: Vec<FileEntry> = titles
            .into_iter()
            .map(|title| {
                let content = content_pattern(&title)
                    .and_then(|re| re.captures(trimmed).map(|c| unescape_newlines(&c[1])));
                match content {
                    Some(content) => FileEntry::new(title, content),
                    None => {
                        let previous = self
                            .files
                            .iter()
                            .find(|f| f.title == title)
                            .map(|f| f.content.clone());
                        FileEntry::new(
                            title,
                            previous.unwrap_or_else(|| GENERATING_SENTINEL.to_string()),
                        )
                    }
                }
            })
            .collect();
        self.adopt(files);
    }

    /// Installs a derived file list and applies the auto-open policy:
    /// only titles never seen before in this session are appended to
    /// `open_files`, so a tab the user closed never reappears because of
    /// continued streaming.
    fn adopt(&mut self, files: Vec<FileEntry>) {
        let newly_discovered: Vec<String> = files
            .iter()
            .map(|f| f.title.clone())
            .filter(|t| !self.seen_titles.contains(t))
            .collect();
        for file in &files {
            self.seen_titles.insert(file.title.clone());
        }
        self.files = files;

        if self.active_file.is_none() {
            self.active_file = self.files.first().map(|f| f.title.clone());
        }
        for title in newly_discovered {
            if !self.open_files.contains(&title) {
                self.open_files.push(title);
            }
        }
    }

    // ---- explicit user actions ----

    /// Opens a file: adds a tab if needed and makes it active.
    pub fn open_file(&mut self, title: &str) {
        if !self.files.iter().any(|f| f.title == title) {
            return;
        }
        if !self.open_files.iter().any(|t| t == title) {
            self.open_files.push(title.to_string());
        }
        self.active_file = Some(title.to_string());
    }

    /// Makes an already-open file active.
    pub fn set_active(&mut self, title: &str) {
        if self.open_files.iter().any(|t| t == title) {
            self.active_file = Some(title.to_string());
        }
    }

    /// Closes a tab. The active file falls back to the first remaining
    /// open tab. The title stays in the seen set, so streaming cannot
    /// reopen it.
    pub fn close_tab(&mut self, title: &str) {
        self.open_files.retain(|t| t != title);
        if self.active_file.as_deref() == Some(title) {
            self.active_file = self.open_files.first().cloned();
        }
    }

    /// Optimistically removes a file, or a whole folder when `path` names
    /// one. Returns the removed titles so the caller can sync the backend.
    pub fn delete_path(&mut self, path: &str) -> Vec<String> {
        let folder_prefix = format!("{path}/");
        let mut removed = Vec::new();
        self.files.retain(|f| {
            if f.title == path || f.title.starts_with(&folder_prefix) {
                removed.push(f.title.clone());
                false
            } else {
                true
            }
        });
        self.open_files.retain(|t| !removed.contains(t));
        if let Some(active) = self.active_file.as_deref() {
            if removed.iter().any(|r| r == active) {
                self.active_file = None;
            }
        }
        removed
    }
}

fn parse_with_repair(trimmed: &str) -> Option<Snapshot> {
    if let Ok(snapshot) = Snapshot::from_wire(trimmed) {
        return Some(snapshot);
    }
    for suffix in REPAIR_SUFFIXES {
        if let Ok(snapshot) = Snapshot::from_wire(&format!("{trimmed}{suffix}")) {
            return Some(snapshot);
        }
    }
    None
}

fn content_pattern(title: &str) -> Option<Regex> {
    Regex::new(&format!(
        r#""title"\s*:\s*"{}"[^}}]+"content"\s*:\s*"([^"]*)"#,
        regex::escape(title)
    ))
    .ok()
}

/// Unescapes ONLY literal `\n` sequences.
///
/// Other escapes (`\"`, `\\`, `\t`) pass through untouched. This mirrors
/// the long-standing fallback behavior and is pinned by test; changing it
/// would alter what users see mid-stream.
fn unescape_newlines(s: &str) -> String {
    s.replace("\\n", "\n")
}
