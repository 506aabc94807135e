//! Verdigris - agent-driven infrastructure project authoring.
//!
//! A generative agent authors a multi-file infrastructure-as-code project
//! through a bounded tool loop, broadcasting a complete snapshot after
//! every observable change; a consumer reconciles the stream into stable
//! view state, and generated content becomes durable only through the
//! pending-change review layer.
//!
//! This is a library/service layer embedded in a larger application;
//! there is no command-line surface.

pub mod agent;
pub mod api;
pub mod backend;
pub mod error;
pub mod reconciler;
pub mod review;
pub mod types;
pub mod util;

// Re-export core types for convenient access
pub use agent::broadcast::{Broadcaster, DocumentMessage};
pub use agent::{GenerationModel, GenerationRun, RunContext, RunOutcome};
pub use error::{VerdigrisError, VerdigrisResult};
pub use reconciler::ArtifactView;
pub use review::{ChangeTracker, ReviewSession, WorkspaceState};
pub use types::{FileEntry, GenerationConfig, Snapshot};
