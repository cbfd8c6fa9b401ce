//! Error types for the annotation workflow
//!
//! Every failure reaches the caller as a distinct, inspectable kind:
//! - Permission and ownership checks
//! - Missing tasks or principals
//! - Actions invalid in the current status (including lost claim races)
//! - Malformed tool definitions
//! - Persistence and packaging collaborator failures

use crate::types::{TaskId, TaskStatus};
use colabforge_notebook::NotebookError;
use std::path::PathBuf;

/// Main workflow error type
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Role or ownership check failed
    #[error("permission denied for {action}: {reason}")]
    PermissionDenied {
        action: &'static str,
        reason: String,
    },

    /// Task or principal absent
    #[error("not found: {0}")]
    NotFound(String),

    /// Action not valid in the task's current status
    #[error("cannot {action} task {task_id} while {status}")]
    InvalidTransition {
        task_id: TaskId,
        status: TaskStatus,
        action: &'static str,
    },

    /// Tool definition payload not parseable
    #[error("malformed content: {0}")]
    MalformedContent(#[from] NotebookError),

    /// Persistence collaborator failed
    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] StoreError),

    /// Archive construction failed; no task was deleted
    #[error("packaging failure: {0}")]
    PackagingFailure(#[from] PackagingError),
}

impl WorkflowError {
    /// Create permission error
    #[inline]
    pub fn permission_denied(action: &'static str, reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            action,
            reason: reason.into(),
        }
    }

    /// Create not-found error for a task
    #[inline]
    pub fn task_not_found(id: &TaskId) -> Self {
        Self::NotFound(format!("task {id}"))
    }

    #[inline]
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    #[inline]
    #[must_use]
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }

    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Persistence collaborator errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend unreachable or refused the operation
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Write conflicts with existing data
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Archive construction errors
#[derive(Debug, thiserror::Error)]
pub enum PackagingError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Packager refused the input
    #[error("{0}")]
    Rejected(String),
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
