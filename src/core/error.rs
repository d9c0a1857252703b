//! Error types surfaced by the orchestrator.
//!
//! Conflicts and not-found results are ordinary, recoverable values.
//! Startup errors are fatal: the process must not begin serving.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::Deployment;

/// A requested resource is already held by another deployment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Stack locked: '{name}' is held by deployment {holder}")]
pub struct LockConflict {
    /// First conflicting resource name
    pub name: String,

    /// Deployment currently holding it
    pub holder: Deployment,
}

/// Errors from orchestrator operations after startup
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    LockConflict(#[from] LockConflict),

    #[error("Stack not found: {0}")]
    NotFound(String),

    #[error("Failed to persist warning: {0}")]
    Persistence(#[source] std::io::Error),

    #[error("Stack '{stack}' failed: {source}")]
    Stack {
        stack: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Mutation task aborted before completing")]
    TaskAborted,
}

/// Errors that abort `Orchestrator::init`
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to create data directory {}: {source}", path.display())]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load warning: {0}")]
    WarningLoad(#[source] std::io::Error),

    #[error("Stack '{stack}' failed to initialize: {source}")]
    StackInit {
        stack: String,
        #[source]
        source: anyhow::Error,
    },
}
