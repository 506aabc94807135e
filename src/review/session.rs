//! Consumer-side review state over a repository collaborator.
//!
//! [`ReviewSession`] mirrors what a review UI needs: the cached diff, a
//! per-path set of in-flight accepts (so concurrent actions on the same
//! file can be disabled), and explicit refresh. Repository calls are
//! independent request/response operations; when one fails the cached
//! state is left exactly as it was, and the caller retries.

use std::collections::{BTreeMap, HashMap, HashSet};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{VerdigrisError, VerdigrisResult};
use crate::review::tracker::{ChangeTracker, Commit, DiffReport};
use crate::review::FileChange;

/// Repository operations consumed by the review session.
///
/// Implemented remotely by `backend::ProjectApi` and in-process by
/// [`LocalRepository`].
#[allow(async_fn_in_trait)]
pub trait RepositoryApi {
    /// Ensures the workspace repository exists. Idempotent.
    async fn init(&self, workspace: &str) -> anyhow::Result<()>;

    /// Installs a pending change set for review.
    async fn create_pending(
        &self,
        workspace: &str,
        files: BTreeMap<String, String>,
        message: &str,
    ) -> anyhow::Result<()>;

    /// Diffs pending against the accepted baseline.
    async fn diff(&self, workspace: &str) -> anyhow::Result<DiffReport>;

    /// Accepts pending changes. `None` accepts everything.
    async fn accept(&self, workspace: &str, files: Option<Vec<String>>) -> anyhow::Result<()>;

    /// Rejects all pending changes.
    async fn reject(&self, workspace: &str) -> anyhow::Result<()>;

    /// Commit history, newest first.
    async fn history(&self, workspace: &str) -> anyhow::Result<Vec<Commit>>;

    /// Restores the file set at a commit and returns it.
    async fn checkout(
        &self,
        workspace: &str,
        hash: &str,
    ) -> anyhow::Result<BTreeMap<String, String>>;
}

/// In-process repository holding one [`ChangeTracker`] per workspace.
#[derive(Debug, Default)]
pub struct LocalRepository {
    workspaces: Mutex<HashMap<String, ChangeTracker>>,
}

impl LocalRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RepositoryApi for LocalRepository {
    async fn init(&self, workspace: &str) -> anyhow::Result<()> {
        self.workspaces
            .lock()
            .await
            .entry(workspace.to_string())
            .or_default();
        Ok(())
    }

    async fn create_pending(
        &self,
        workspace: &str,
        files: BTreeMap<String, String>,
        message: &str,
    ) -> anyhow::Result<()> {
        let mut workspaces = self.workspaces.lock().await;
        workspaces
            .entry(workspace.to_string())
            .or_default()
            .set_pending(files, message);
        Ok(())
    }

    async fn diff(&self, workspace: &str) -> anyhow::Result<DiffReport> {
        let mut workspaces = self.workspaces.lock().await;
        Ok(workspaces.entry(workspace.to_string()).or_default().diff())
    }

    async fn accept(&self, workspace: &str, files: Option<Vec<String>>) -> anyhow::Result<()> {
        let mut workspaces = self.workspaces.lock().await;
        let tracker = workspaces.entry(workspace.to_string()).or_default();
        match files {
            None => {
                tracker.accept_all()?;
            }
            Some(paths) => {
                for path in paths {
                    tracker.accept_file(&path)?;
                }
            }
        }
        Ok(())
    }

    async fn reject(&self, workspace: &str) -> anyhow::Result<()> {
        let mut workspaces = self.workspaces.lock().await;
        workspaces
            .entry(workspace.to_string())
            .or_default()
            .reject_all();
        Ok(())
    }

    async fn history(&self, workspace: &str) -> anyhow::Result<Vec<Commit>> {
        let mut workspaces = self.workspaces.lock().await;
        Ok(workspaces
            .entry(workspace.to_string())
            .or_default()
            .history()
            .to_vec())
    }

    async fn checkout(
        &self,
        workspace: &str,
        hash: &str,
    ) -> anyhow::Result<BTreeMap<String, String>> {
        let mut workspaces = self.workspaces.lock().await;
        Ok(workspaces
            .entry(workspace.to_string())
            .or_default()
            .checkout(hash)?)
    }
}

/// Review state for one workspace, as a UI consumes it.
pub struct ReviewSession<R> {
    api: R,
    workspace: String,
    changes: Vec<FileChange>,
    has_pending: bool,
    accepting: HashSet<String>,
}

impl<R: RepositoryApi> ReviewSession<R> {
    /// Creates a session with an empty cache; call [`refresh`] to load.
    ///
    /// [`refresh`]: ReviewSession::refresh
    #[must_use]
    pub fn new(api: R, workspace: impl Into<String>) -> Self {
        Self {
            api,
            workspace: workspace.into(),
            changes: Vec::new(),
            has_pending: false,
            accepting: HashSet::new(),
        }
    }

    /// Cached pending changes from the last successful refresh.
    #[must_use]
    pub fn changes(&self) -> &[FileChange] {
        &self.changes
    }

    /// Whether a pending change set existed at the last refresh.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.has_pending
    }

    /// Paths with an accept currently in flight.
    #[must_use]
    pub fn accepting_files(&self) -> &HashSet<String> {
        &self.accepting
    }

    /// Whether an accept is in flight for this path.
    #[must_use]
    pub fn is_accepting(&self, path: &str) -> bool {
        self.accepting.contains(path)
    }

    /// Publishes a generated file set for review, then refreshes.
    ///
    /// # Errors
    ///
    /// Returns a sync error when the backend is unreachable; the cached
    /// state is unchanged.
    pub async fn publish(
        &mut self,
        files: BTreeMap<String, String>,
        message: &str,
    ) -> VerdigrisResult<()> {
        self.api
            .create_pending(&self.workspace, files, message)
            .await
            .map_err(sync_err)?;
        self.refresh().await
    }

    /// Re-fetches the diff. On failure the cache is left as it was.
    ///
    /// # Errors
    ///
    /// Returns a sync error when the backend is unreachable.
    pub async fn refresh(&mut self) -> VerdigrisResult<()> {
        let report = self.api.diff(&self.workspace).await.map_err(sync_err)?;
        self.changes = report.changes;
        self.has_pending = report.has_pending;
        Ok(())
    }

    /// Accepts one file, marking it in flight for the duration.
    ///
    /// A second accept for a path already in flight is ignored.
    ///
    /// # Errors
    ///
    /// Returns a sync error when the backend call fails; the operation is
    /// treated as not completed and the cache is unchanged.
    pub async fn accept_file(&mut self, path: &str) -> VerdigrisResult<()> {
        if self.accepting.contains(path) {
            debug!(path, "accept already in flight; ignoring");
            return Ok(());
        }
        self.accepting.insert(path.to_string());
        let result = self
            .api
            .accept(&self.workspace, Some(vec![path.to_string()]))
            .await;
        self.accepting.remove(path);

        match result {
            Ok(()) => self.refresh().await,
            Err(e) => {
                warn!(path, error = %format!("{e:#}"), "accept failed; state unchanged");
                Err(sync_err(e))
            }
        }
    }

    /// Accepts every pending file in one operation.
    ///
    /// # Errors
    ///
    /// Returns a sync error when the backend call fails.
    pub async fn accept_all(&mut self) -> VerdigrisResult<()> {
        self.api
            .accept(&self.workspace, None)
            .await
            .map_err(sync_err)?;
        self.refresh().await
    }

    /// Rejects every pending change.
    ///
    /// # Errors
    ///
    /// Returns a sync error when the backend call fails.
    pub async fn reject_all(&mut self) -> VerdigrisResult<()> {
        self.api.reject(&self.workspace).await.map_err(sync_err)?;
        self.refresh().await
    }

    /// Commit history, newest first.
    ///
    /// # Errors
    ///
    /// Returns a sync error when the backend call fails.
    pub async fn history(&self) -> VerdigrisResult<Vec<Commit>> {
        self.api.history(&self.workspace).await.map_err(sync_err)
    }

    /// Restores the file set at a commit, then refreshes the diff.
    ///
    /// # Errors
    ///
    /// Returns a sync error when the backend call fails.
    pub async fn checkout(&mut self, hash: &str) -> VerdigrisResult<BTreeMap<String, String>> {
        let files = self
            .api
            .checkout(&self.workspace, hash)
            .await
            .map_err(sync_err)?;
        self.refresh().await?;
        Ok(files)
    }
}

fn sync_err(e: anyhow::Error) -> VerdigrisError {
    VerdigrisError::sync(format!("{e:#}"))
}
