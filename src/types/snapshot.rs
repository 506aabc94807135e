//! Snapshot value types shared by the generation, broadcast, and review layers.
//!
//! A [`Snapshot`] is the complete, self-describing representation of every
//! file in a generated project at one point in time. It is never a delta:
//! any single snapshot is sufficient to reconstruct full state, which is what
//! makes the broadcast channel safe to drop or coalesce messages on.
//!
//! File order is discovery/generation order. Sorting for display is a
//! presentation concern and does not belong here.

use serde::{Deserialize, Serialize};

/// Content value marking a file that has been announced but not yet authored.
pub const PLACEHOLDER: &str = "Pending...";

/// Files with non-placeholder content shorter than this are considered
/// still generating.
const GENERATING_THRESHOLD: usize = 10;

/// One file in a generated project.
///
/// `title` is a hierarchical forward-slash path, unique within a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Forward-slash path of the file (e.g. `modules/networking/main.tf`).
    pub title: String,

    /// Current file content. May be the placeholder sentinel, a partial
    /// prefix mid-stream, or the final text.
    #[serde(default)]
    pub content: String,
}

impl FileEntry {
    /// Creates an entry with the given title and content.
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Creates an entry announced but not yet authored.
    #[must_use]
    pub fn placeholder(title: impl Into<String>) -> Self {
        Self::new(title, PLACEHOLDER)
    }

    /// Returns true if the content is the placeholder sentinel.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.content == PLACEHOLDER
    }

    /// Derives the display status from the content.
    ///
    /// Status is never stored; it is a pure function of the content string.
    #[must_use]
    pub fn status(&self) -> FileStatus {
        if self.is_placeholder() {
            FileStatus::Pending
        } else if self.content.len() < GENERATING_THRESHOLD {
            FileStatus::Generating
        } else {
            FileStatus::Ready
        }
    }
}

/// Derived lifecycle state of a file within a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Announced via project initialization, content not started.
    Pending,
    /// Content exists but is too short to be a finished file.
    Generating,
    /// Content looks complete.
    Ready,
}

/// The full, ordered file set of one generated project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Files in discovery/generation order.
    pub files: Vec<FileEntry>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry with the given title, if present.
    #[must_use]
    pub fn get(&self, title: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.title == title)
    }

    /// Returns all titles in snapshot order.
    #[must_use]
    pub fn titles(&self) -> Vec<String> {
        self.files.iter().map(|f| f.title.clone()).collect()
    }

    /// Serializes to the wire format: `{"files":[{"title":...,"content":...}]}`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_wire(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses the wire format.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a complete snapshot document.
    pub fn from_wire(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}
