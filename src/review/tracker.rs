//! Git-like pending-change engine for one workspace.
//!
//! The latest generated file set is held as an uncommitted "pending"
//! overlay against an accepted baseline. Accepting moves content into the
//! baseline and records an immutable commit; rejecting discards the
//! overlay and leaves the baseline untouched.
//!
//! Per-workspace state machine:
//!
//! ```text
//! clean ──set_pending──▶ pending ──accept_all/reject_all──▶ clean
//!                           │
//!                      accept_file (others remain)
//!                           ▼
//!                     partially-pending ──accept/reject rest──▶ clean
//! ```

use std::collections::{BTreeMap, HashMap};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{VerdigrisError, VerdigrisResult};
use crate::review::diff::{diff_file, FileChange};

/// Review state of one workspace, derived from the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceState {
    /// No pending change set exists.
    Clean,
    /// A pending change set exists and nothing from it has been accepted.
    Pending,
    /// Some files from the pending set were accepted; others remain.
    PartiallyPending,
}

/// An immutable point in the workspace's accepted history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    /// Short (7-character) hash.
    pub hash: String,
    /// Full content hash.
    pub full_hash: String,
    /// Commit message.
    pub message: String,
    /// RFC 3339 timestamp.
    pub date: String,
    /// Paths touched by this commit.
    pub files: Vec<String>,
    /// Number of paths touched.
    pub file_count: usize,
}

/// Result of a diff between baseline and pending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffReport {
    /// One record per differing file, in path order.
    pub changes: Vec<FileChange>,
    /// True while a pending change set exists, even if it no longer
    /// differs from the baseline.
    pub has_pending: bool,
}

#[derive(Debug, Clone)]
struct PendingSet {
    files: BTreeMap<String, String>,
}

/// Pending-change tracker for one workspace.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    baseline: BTreeMap<String, String>,
    pending: Option<PendingSet>,
    /// Newest first.
    commits: Vec<Commit>,
    /// Full file tree at each commit, keyed by full hash.
    trees: HashMap<String, BTreeMap<String, String>>,
    partially_accepted: bool,
}

impl ChangeTracker {
    /// Creates a tracker with an empty baseline and no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracker seeded with an accepted baseline, recorded as
    /// the initial commit.
    #[must_use]
    pub fn with_baseline(files: BTreeMap<String, String>) -> Self {
        let mut tracker = Self {
            baseline: files,
            ..Self::default()
        };
        let paths: Vec<String> = tracker.baseline.keys().cloned().collect();
        tracker.record_commit("initial", paths);
        tracker
    }

    /// The accepted file map.
    #[must_use]
    pub fn baseline(&self) -> &BTreeMap<String, String> {
        &self.baseline
    }

    /// Installs the latest generated file set as the pending overlay,
    /// replacing any prior pending set.
    ///
    /// Generation output is an overlay: baseline files the agent did not
    /// touch carry through unchanged, so they never show up in the diff.
    pub fn set_pending(&mut self, files: BTreeMap<String, String>, message: &str) {
        let mut tree = self.baseline.clone();
        tree.extend(files);
        debug!(message, files = tree.len(), "pending change set created");
        self.pending = Some(PendingSet { files: tree });
        self.partially_accepted = false;
    }

    /// Diffs the pending overlay against the baseline.
    #[must_use]
    pub fn diff(&self) -> DiffReport {
        let Some(pending) = &self.pending else {
            return DiffReport::default();
        };

        let mut changes = Vec::new();
        let mut paths: Vec<&String> = self.baseline.keys().chain(pending.files.keys()).collect();
        paths.sort();
        paths.dedup();

        for path in paths {
            let old = self.baseline.get(path).map(String::as_str);
            let new = pending.files.get(path).map(String::as_str);
            if old != new {
                changes.push(diff_file(path, old, new));
            }
        }

        DiffReport {
            changes,
            has_pending: true,
        }
    }

    /// Accepts exactly one file's pending content into the baseline.
    ///
    /// # Errors
    ///
    /// Returns [`VerdigrisError::NothingPending`] without a pending set,
    /// or [`VerdigrisError::PathNotPending`] if the path does not differ
    /// from the baseline.
    pub fn accept_file(&mut self, path: &str) -> VerdigrisResult<()> {
        let pending = self
            .pending
            .as_ref()
            .ok_or(VerdigrisError::NothingPending)?;

        let old = self.baseline.get(path);
        let new = pending.files.get(path);
        if old.map(String::as_str) == new.map(String::as_str) {
            return Err(VerdigrisError::path_not_pending(path));
        }

        match new.cloned() {
            Some(content) => {
                self.baseline.insert(path.to_string(), content);
            }
            None => {
                self.baseline.remove(path);
            }
        }
        self.record_commit(&format!("Accept changes: {path}"), vec![path.to_string()]);
        info!(path, "accepted pending file");

        if self.diff().changes.is_empty() {
            self.pending = None;
            self.partially_accepted = false;
        } else {
            self.partially_accepted = true;
        }
        Ok(())
    }

    /// Accepts every pending file in one operation. Returns the accepted
    /// paths.
    ///
    /// # Errors
    ///
    /// Returns [`VerdigrisError::NothingPending`] without a pending set.
    pub fn accept_all(&mut self) -> VerdigrisResult<Vec<String>> {
        let pending = self
            .pending
            .take()
            .ok_or(VerdigrisError::NothingPending)?;

        let changed: Vec<String> = {
            let mut paths: Vec<&String> =
                self.baseline.keys().chain(pending.files.keys()).collect();
            paths.sort();
            paths.dedup();
            paths
                .into_iter()
                .filter(|p| self.baseline.get(*p) != pending.files.get(*p))
                .cloned()
                .collect()
        };

        self.baseline = pending.files;
        if !changed.is_empty() {
            self.record_commit("Accept all agent changes", changed.clone());
        }
        self.partially_accepted = false;
        info!(files = changed.len(), "accepted all pending changes");
        Ok(changed)
    }

    /// Discards the pending overlay. The baseline is unchanged. Safe to
    /// call with nothing pending.
    pub fn reject_all(&mut self) {
        if self.pending.take().is_some() {
            info!("rejected pending changes");
        }
        self.partially_accepted = false;
    }

    /// Commit history, newest first.
    #[must_use]
    pub fn history(&self) -> &[Commit] {
        &self.commits
    }

    /// Restores the baseline to the file tree at the given commit (short
    /// or full hash) and returns it. History is not mutated.
    ///
    /// # Errors
    ///
    /// Returns [`VerdigrisError::CommitNotFound`] for an unknown hash.
    pub fn checkout(&mut self, hash: &str) -> VerdigrisResult<BTreeMap<String, String>> {
        let commit = self
            .commits
            .iter()
            .find(|c| c.full_hash == hash || c.hash == hash)
            .ok_or_else(|| VerdigrisError::commit_not_found(hash))?;
        let tree = self
            .trees
            .get(&commit.full_hash)
            .cloned()
            .ok_or_else(|| VerdigrisError::commit_not_found(hash))?;
        info!(hash = %commit.hash, files = tree.len(), "checked out commit");
        self.baseline = tree.clone();
        Ok(tree)
    }

    /// Current review state.
    #[must_use]
    pub fn state(&self) -> WorkspaceState {
        match (&self.pending, self.partially_accepted) {
            (None, _) => WorkspaceState::Clean,
            (Some(_), true) => WorkspaceState::PartiallyPending,
            (Some(_), false) => WorkspaceState::Pending,
        }
    }

    /// Records an immutable commit of the current baseline.
    fn record_commit(&mut self, message: &str, files: Vec<String>) {
        let parent = self
            .commits
            .first()
            .map(|c| c.full_hash.clone())
            .unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(parent.as_bytes());
        hasher.update(message.as_bytes());
        hasher.update(self.commits.len().to_le_bytes());
        for (path, content) in &self.baseline {
            hasher.update(path.as_bytes());
            hasher.update([0]);
            hasher.update(content.as_bytes());
            hasher.update([0]);
        }
        let full_hash = hex::encode(hasher.finalize());
        let hash = full_hash[..7].to_string();
        let date = humantime::format_rfc3339_seconds(SystemTime::now()).to_string();

        self.trees.insert(full_hash.clone(), self.baseline.clone());
        self.commits.insert(
            0,
            Commit {
                hash,
                full_hash,
                message: message.to_string(),
                date,
                file_count: files.len(),
                files,
            },
        );
    }
}
