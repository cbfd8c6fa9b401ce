//! Task lifecycle state machine
//!
//! ```text
//! unclaimed --claim--> claimed --submit--> in_review --approve--> approved --export--> (deleted)
//!                         ^                    |
//!                         |                 rework
//!                         |                    v
//!                         +------------ rework (resubmit keeps the claimant)
//! ```
//!
//! Every check runs permission first, then transition validity, so a caller
//! without the right role never learns anything about task state.

use crate::error::WorkflowError;
use crate::types::{Principal, Role, Task, TaskStatus};
use std::fmt;

/// Actions a principal can attempt on a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskAction {
    Claim,
    SaveContent,
    Submit,
    Approve,
    RequestRework,
    ViewContent,
    Export,
}

impl TaskAction {
    /// All task actions
    pub const ALL: [TaskAction; 7] = [
        TaskAction::Claim,
        TaskAction::SaveContent,
        TaskAction::Submit,
        TaskAction::Approve,
        TaskAction::RequestRework,
        TaskAction::ViewContent,
        TaskAction::Export,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskAction::Claim => "claim",
            TaskAction::SaveContent => "save content of",
            TaskAction::Submit => "submit",
            TaskAction::Approve => "approve",
            TaskAction::RequestRework => "request rework on",
            TaskAction::ViewContent => "view",
            TaskAction::Export => "export",
        }
    }
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status reached by applying `action` in `from`, if the action is valid there
#[must_use]
pub fn next_status(from: TaskStatus, action: TaskAction) -> Option<TaskStatus> {
    use TaskAction::*;
    use TaskStatus::*;
    match (from, action) {
        (Unclaimed, Claim) => Some(Claimed),
        (Claimed | InReview | Rework, SaveContent) => Some(from),
        (Claimed | Rework, Submit) => Some(InReview),
        (InReview, Approve) => Some(Approved),
        (InReview, RequestRework) => Some(Rework),
        (_, ViewContent) => Some(from),
        (Approved, Export) => Some(Approved),
        _ => None,
    }
}

/// Actions valid in a status, ignoring who attempts them
#[must_use]
pub fn allowed_actions(from: TaskStatus) -> Vec<TaskAction> {
    TaskAction::ALL
        .into_iter()
        .filter(|action| next_status(from, *action).is_some())
        .collect()
}

/// Role and ownership gate for an action on a task
///
/// # Errors
/// `WorkflowError::PermissionDenied` if `principal` may not attempt `action`.
pub fn authorize(principal: &Principal, task: &Task, action: TaskAction) -> Result<(), WorkflowError> {
    let permitted = match action {
        TaskAction::Claim => principal.role == Role::Trainer,
        TaskAction::SaveContent | TaskAction::Submit => task.is_claimed_by(principal.id),
        TaskAction::Approve | TaskAction::RequestRework | TaskAction::Export => {
            principal.role.is_staff()
        }
        TaskAction::ViewContent => principal.role.is_staff() || task.is_claimed_by(principal.id),
    };

    if permitted {
        Ok(())
    } else {
        let reason = match action {
            TaskAction::Claim => "only trainers can claim tasks",
            TaskAction::SaveContent | TaskAction::Submit => "task is not claimed by this principal",
            TaskAction::ViewContent => "only staff or the claimant can view this task",
            _ => "only owners and reviewers can do this",
        };
        Err(WorkflowError::permission_denied(action.as_str(), reason))
    }
}

/// Full check: permission, then transition validity
///
/// # Errors
/// `PermissionDenied` or `InvalidTransition`.
pub fn check(principal: &Principal, task: &Task, action: TaskAction) -> Result<TaskStatus, WorkflowError> {
    authorize(principal, task, action)?;
    next_status(task.status, action).ok_or_else(|| WorkflowError::InvalidTransition {
        task_id: task.id.clone(),
        status: task.status,
        action: action.as_str(),
    })
}
