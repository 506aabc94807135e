//! Pending-change review: diff engine, per-workspace tracker, and the
//! consumer-side session.

pub mod diff;
pub mod session;
pub mod tracker;

pub use diff::{diff_file, FileChange};
pub use session::{LocalRepository, RepositoryApi, ReviewSession};
pub use tracker::{ChangeTracker, Commit, DiffReport, WorkspaceState};
