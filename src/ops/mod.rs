pub mod client_ops;
pub mod portfolio;
pub mod project_ops;
pub mod schedule;
pub mod task_ops;
pub mod tracker;

use crate::io::store::StoreError;

/// Error type for record operations
#[derive(Debug, thiserror::Error)]
pub enum OpsError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("a task needs a project")]
    MissingProject,
    #[error("project {0} is closed and takes no new tasks")]
    ClosedProject(String),
    #[error("unknown project state: {0} (expected Lead, Proposal, Active, Completed or Archived)")]
    UnknownState(String),
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("malformed {kind} record {id}: {source}")]
    Malformed {
        kind: &'static str,
        id: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}
