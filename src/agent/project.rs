//! In-memory project state for one generation run.
//!
//! `ProjectState` is the single source of truth for file content while a
//! run is active. It has exactly one owner (the run) and is only ever
//! mutated between broadcasts, so every snapshot it produces is complete
//! and internally consistent.
//!
//! All methods here are pure state transitions. Broadcast cadence and
//! pacing live in the run loop, not here.

use serde_json::{json, Value};

use crate::types::snapshot::{FileEntry, Snapshot, PLACEHOLDER};

/// Result string for a fetch of a file that does not exist.
pub const FILE_NOT_FOUND: &str = "FILE_NOT_FOUND";

/// Ordered, uniquely-titled file map owned by a generation run.
#[derive(Debug, Clone, Default)]
pub struct ProjectState {
    files: Vec<FileEntry>,
}

impl ProjectState {
    /// Creates an empty project.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a project seeded with one empty file, the shape every
    /// create-flow run starts from.
    #[must_use]
    pub fn with_default_file(title: &str) -> Self {
        Self {
            files: vec![FileEntry::new(title, "")],
        }
    }

    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true when no files exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Returns true if a file with this title exists.
    #[must_use]
    pub fn contains(&self, title: &str) -> bool {
        self.files.iter().any(|f| f.title == title)
    }

    /// Current content of a file.
    #[must_use]
    pub fn content(&self, title: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|f| f.title == title)
            .map(|f| f.content.as_str())
    }

    /// All titles in discovery order.
    #[must_use]
    pub fn titles(&self) -> Vec<String> {
        self.files.iter().map(|f| f.title.clone()).collect()
    }

    /// Union-merges the announced file list.
    ///
    /// Files already present keep their content and position; files not
    /// yet present are appended, in listed order, with the placeholder
    /// sentinel. A pre-seeded file whose content is still empty also
    /// becomes a placeholder, since nothing has been authored into it.
    /// Returns the titles that were newly added.
    pub fn ensure_files(&mut self, titles: &[String]) -> Vec<String> {
        let mut added = Vec::new();
        for title in titles {
            match self.files.iter_mut().find(|f| f.title == *title) {
                Some(entry) => {
                    if entry.content.is_empty() {
                        entry.content = PLACEHOLDER.to_string();
                    }
                }
                None => {
                    self.files.push(FileEntry::placeholder(title.clone()));
                    added.push(title.clone());
                }
            }
        }
        added
    }

    /// Prepares a file to receive streamed content.
    ///
    /// A placeholder converts to empty content; a missing file is created
    /// empty; existing real content is left alone so appends accumulate.
    pub fn begin_write(&mut self, title: &str) {
        match self.files.iter_mut().find(|f| f.title == title) {
            Some(entry) => {
                if entry.is_placeholder() {
                    entry.content.clear();
                }
            }
            None => self.files.push(FileEntry::new(title, "")),
        }
    }

    /// Appends a streamed delta to a file, creating it if necessary.
    pub fn append(&mut self, title: &str, delta: &str) {
        match self.files.iter_mut().find(|f| f.title == title) {
            Some(entry) => entry.content.push_str(delta),
            None => self.files.push(FileEntry::new(title, delta)),
        }
    }

    /// Appends a single replayed character.
    pub fn push_char(&mut self, title: &str, ch: char) {
        if let Some(entry) = self.files.iter_mut().find(|f| f.title == title) {
            entry.content.push(ch);
        }
    }

    /// Overwrites a file's content, creating it if necessary.
    pub fn set_content(&mut self, title: &str, content: &str) {
        match self.files.iter_mut().find(|f| f.title == title) {
            Some(entry) => entry.content = content.to_string(),
            None => self.files.push(FileEntry::new(title, content)),
        }
    }

    /// Computes the content an edit would produce, without applying it.
    ///
    /// The run loop applies the result via replay so the change animates.
    ///
    /// # Errors
    ///
    /// Returns a descriptive message (for the model) if the file is
    /// missing or `old_string` does not occur in the current content.
    pub fn replaced_content(
        &self,
        title: &str,
        old_string: &str,
        new_string: &str,
        replace_all: bool,
    ) -> Result<String, String> {
        let current = self
            .content(title)
            .ok_or_else(|| format!("Error: File {title} not found."))?;
        if !current.contains(old_string) {
            return Err(format!("Error: String not found in {title}."));
        }
        if replace_all {
            Ok(current.replace(old_string, new_string))
        } else {
            Ok(current.replacen(old_string, new_string, 1))
        }
    }

    /// Removes a file, or every file under `path/` when `path` names a
    /// folder. Returns the removed titles.
    pub fn remove_path(&mut self, path: &str) -> Vec<String> {
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
        removed
    }

    /// Read-only fetch of the named files, as the JSON the model receives.
    #[must_use]
    pub fn fetch(&self, titles: &[String]) -> Value {
        let results: Vec<Value> = titles
            .iter()
            .map(|t| {
                json!({
                    "file": t,
                    "content": self.content(t).unwrap_or(FILE_NOT_FOUND),
                })
            })
            .collect();
        Value::Array(results)
    }

    /// Produces the complete current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            files: self.files.clone(),
        }
    }

    /// Returns true if any file still carries the placeholder sentinel.
    #[must_use]
    pub fn has_placeholders(&self) -> bool {
        self.files.iter().any(|f| f.content == PLACEHOLDER)
    }
}
