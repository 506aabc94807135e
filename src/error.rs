//! Centralized error types for Verdigris.
//!
//! A single error enum covers all failure categories across the crate:
//!
//! - Consistent error handling patterns
//! - Clear categorization (retryable vs terminal)
//! - Easy integration with `anyhow` for context
//!
//! Parse failures on streamed content are deliberately absent: the
//! reconciler never surfaces them, falling back through repair heuristics
//! instead (see `reconciler`).

use std::fmt;

/// Result type alias using `VerdigrisError`.
pub type VerdigrisResult<T> = Result<T, VerdigrisError>;

/// Centralized error type for Verdigris.
#[derive(Debug)]
pub enum VerdigrisError {
    // ============== Generation Errors ==============
    /// The tool loop or the generation model failed. The run ends with the
    /// last broadcast snapshot standing; there is no automatic retry.
    Generation {
        /// Description of the failure.
        message: String,
    },

    /// A tool invocation carried invalid or unresolvable input. Returned
    /// to the model as a descriptive string; never fatal to the run.
    ToolInput {
        /// Description of the input problem.
        message: String,
    },

    // ============== Collaborator Errors ==============
    /// Network failure talking to the model API or the project backend.
    Network {
        /// Description of the network error.
        message: String,
    },

    /// A collaborator returned a response that could not be understood.
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    // ============== Review Errors ==============
    /// The repository backend was unreachable during an accept/reject.
    /// The operation is treated as not completed; review state is
    /// unchanged until the caller retries.
    Sync {
        /// Description of the sync failure.
        message: String,
    },

    /// A review operation referenced a commit that does not exist.
    CommitNotFound {
        /// The hash (short or full) that failed to resolve.
        hash: String,
    },

    /// A review operation referenced a path with no pending change.
    PathNotPending {
        /// The path that has nothing pending.
        path: String,
    },

    /// An accept/reject was requested while no pending change set exists.
    NothingPending,

    // ============== Wrapped Errors ==============
    /// Error from anyhow or other sources.
    Other {
        /// The wrapped error message.
        message: String,
    },
}

impl VerdigrisError {
    /// Creates a generation error.
    #[must_use]
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    /// Creates a tool input error.
    #[must_use]
    pub fn tool_input(message: impl Into<String>) -> Self {
        Self::ToolInput {
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Creates a sync error.
    #[must_use]
    pub fn sync(message: impl Into<String>) -> Self {
        Self::Sync {
            message: message.into(),
        }
    }

    /// Creates a commit-not-found error.
    #[must_use]
    pub fn commit_not_found(hash: impl Into<String>) -> Self {
        Self::CommitNotFound { hash: hash.into() }
    }

    /// Creates a path-not-pending error.
    #[must_use]
    pub fn path_not_pending(path: impl Into<String>) -> Self {
        Self::PathNotPending { path: path.into() }
    }
}

impl VerdigrisError {
    /// Returns `true` if this error is potentially retryable.
    ///
    /// Network and sync failures are transient; everything else is a
    /// terminal outcome for the operation that produced it.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Sync { .. })
    }

    /// Returns the module where this error originated.
    #[must_use]
    pub fn module(&self) -> &'static str {
        match self {
            Self::Generation { .. } | Self::ToolInput { .. } => "agent",
            Self::Network { .. } | Self::InvalidResponse { .. } => "backend",
            Self::Sync { .. }
            | Self::CommitNotFound { .. }
            | Self::PathNotPending { .. }
            | Self::NothingPending => "review",
            Self::Other { .. } => "unknown",
        }
    }
}

impl fmt::Display for VerdigrisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generation { message } => {
                write!(f, "agent: generation failed: {}", message)
            }
            Self::ToolInput { message } => {
                write!(f, "agent: invalid tool input: {}", message)
            }
            Self::Network { message } => {
                write!(f, "backend: network error: {}", message)
            }
            Self::InvalidResponse { message } => {
                write!(f, "backend: invalid response: {}", message)
            }
            Self::Sync { message } => {
                write!(f, "review: sync failed: {}", message)
            }
            Self::CommitNotFound { hash } => {
                write!(f, "review: commit '{}' not found", hash)
            }
            Self::PathNotPending { path } => {
                write!(f, "review: no pending change for '{}'", path)
            }
            Self::NothingPending => {
                write!(f, "review: no pending changes")
            }
            Self::Other { message } => {
                write!(f, "error: {}", message)
            }
        }
    }
}

impl std::error::Error for VerdigrisError {}

impl From<anyhow::Error> for VerdigrisError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            message: format!("{:#}", err),
        }
    }
}
