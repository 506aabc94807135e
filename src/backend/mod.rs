//! HTTP client for the project backend collaborator.
//!
//! The backend owns durable storage: project files on disk, the
//! per-workspace repository, and the infrastructure plan/apply executor.
//! This client only speaks the wire contract; everything behind it is an
//! opaque boundary.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::review::session::RepositoryApi;
use crate::review::tracker::{Commit, DiffReport};

/// Client for the project backend.
#[derive(Debug, Clone)]
pub struct ProjectApi {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct FilesResponse {
    #[serde(default)]
    files: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    commits: Vec<Commit>,
}

#[derive(Deserialize)]
struct InitResponse {
    head: Option<String>,
}

#[derive(Deserialize)]
struct RunOutput {
    output: Option<String>,
    detail: Option<String>,
}

impl ProjectApi {
    /// Creates a client against the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    // ---- file and folder CRUD ----

    /// Saves a file map into the workspace.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn save_files(
        &self,
        workspace: &str,
        files: &BTreeMap<String, String>,
    ) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/project/{workspace}/files")))
            .json(&json!({ "files": files }))
            .send()
            .await
            .context("save files request failed")?;
        expect_success(response, "save files").await?;
        Ok(())
    }

    /// Deletes files or folders. Returns the paths the backend removed.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn delete_paths(&self, workspace: &str, paths: &[String]) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct DeleteResponse {
            #[serde(default)]
            deleted: Vec<String>,
        }

        let response = self
            .client
            .delete(self.url(&format!("/project/{workspace}/files")))
            .json(&json!({ "paths": paths }))
            .send()
            .await
            .context("delete request failed")?;
        let response = expect_success(response, "delete paths").await?;
        let parsed: DeleteResponse = response.json().await.context("malformed delete response")?;
        Ok(parsed.deleted)
    }

    /// Creates a folder in the workspace.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn create_folder(&self, workspace: &str, path: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/project/{workspace}/folders")))
            .json(&json!({ "path": path }))
            .send()
            .await
            .context("create folder request failed")?;
        expect_success(response, "create folder").await?;
        Ok(())
    }

    /// Lists every file in the workspace with its content.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a malformed response.
    pub async fn list_files(&self, workspace: &str) -> Result<BTreeMap<String, String>> {
        let response = self
            .client
            .get(self.url(&format!("/project/{workspace}/files")))
            .send()
            .await
            .context("list files request failed")?;
        let response = expect_success(response, "list files").await?;
        let parsed: FilesResponse = response.json().await.context("malformed files response")?;
        Ok(parsed.files)
    }

    // ---- infrastructure executor ----

    /// Runs a plan over the given files. Returns the executor output.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure detail on a non-success status.
    pub async fn plan(&self, workspace: &str, files: &BTreeMap<String, String>) -> Result<String> {
        self.run_executor("/tofu/plan", workspace, files).await
    }

    /// Applies the given files. Returns the executor output.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure detail on a non-success status.
    pub async fn apply(&self, workspace: &str, files: &BTreeMap<String, String>) -> Result<String> {
        self.run_executor("/tofu/apply", workspace, files).await
    }

    async fn run_executor(
        &self,
        path: &str,
        workspace: &str,
        files: &BTreeMap<String, String>,
    ) -> Result<String> {
        debug!(path, workspace, files = files.len(), "running executor");
        let response = self
            .client
            .post(self.url(path))
            .json(&json!({ "files": files, "workspace": workspace }))
            .send()
            .await
            .with_context(|| format!("{path} request failed"))?;

        let status = response.status();
        let body: RunOutput = response
            .json()
            .await
            .with_context(|| format!("malformed {path} response"))?;

        if status.is_success() {
            Ok(body.output.unwrap_or_default())
        } else {
            anyhow::bail!(
                "{path} failed: {}",
                body.detail.unwrap_or_else(|| status.to_string())
            )
        }
    }

    /// Initializes the workspace repository. Returns the head commit
    /// hash, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn repo_init(&self, workspace: &str) -> Result<Option<String>> {
        let response = self
            .client
            .post(self.url(&format!("/project/{workspace}/repo/init")))
            .send()
            .await
            .context("repo init request failed")?;
        let response = expect_success(response, "repo init").await?;
        let parsed: InitResponse = response.json().await.context("malformed init response")?;
        Ok(parsed.head)
    }
}

impl RepositoryApi for ProjectApi {
    async fn init(&self, workspace: &str) -> Result<()> {
        self.repo_init(workspace).await?;
        Ok(())
    }

    async fn create_pending(
        &self,
        workspace: &str,
        files: BTreeMap<String, String>,
        message: &str,
    ) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/project/{workspace}/repo/pending")))
            .json(&json!({ "files": files, "message": message }))
            .send()
            .await
            .context("create pending request failed")?;
        expect_success(response, "create pending").await?;
        Ok(())
    }

    async fn diff(&self, workspace: &str) -> Result<DiffReport> {
        let response = self
            .client
            .get(self.url(&format!("/project/{workspace}/repo/diff")))
            .send()
            .await
            .context("diff request failed")?;
        let response = expect_success(response, "diff").await?;
        response.json().await.context("malformed diff response")
    }

    async fn accept(&self, workspace: &str, files: Option<Vec<String>>) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/project/{workspace}/repo/accept")))
            .json(&json!({ "files": files }))
            .send()
            .await
            .context("accept request failed")?;
        expect_success(response, "accept").await?;
        Ok(())
    }

    async fn reject(&self, workspace: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/project/{workspace}/repo/reject")))
            .send()
            .await
            .context("reject request failed")?;
        expect_success(response, "reject").await?;
        Ok(())
    }

    async fn history(&self, workspace: &str) -> Result<Vec<Commit>> {
        let response = self
            .client
            .get(self.url(&format!("/project/{workspace}/repo/history")))
            .send()
            .await
            .context("history request failed")?;
        let response = expect_success(response, "history").await?;
        let parsed: HistoryResponse = response
            .json()
            .await
            .context("malformed history response")?;
        Ok(parsed.commits)
    }

    async fn checkout(&self, workspace: &str, hash: &str) -> Result<BTreeMap<String, String>> {
        let response = self
            .client
            .post(self.url(&format!("/project/{workspace}/repo/checkout")))
            .json(&json!({ "commitHash": hash }))
            .send()
            .await
            .context("checkout request failed")?;
        let response = expect_success(response, "checkout").await?;
        let parsed: FilesResponse = response
            .json()
            .await
            .context("malformed checkout response")?;
        Ok(parsed.files)
    }
}

async fn expect_success(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("{what} failed with {status}: {body}")
    }
}
