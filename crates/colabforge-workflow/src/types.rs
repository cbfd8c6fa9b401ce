//! Core types for the annotation workflow
//!
//! Defines:
//! - Principals and roles
//! - Tasks, their status and their ordered cells
//! - Read models returned by the workflow service

use chrono::{DateTime, Utc};
use colabforge_notebook::{CellInput, CellKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque principal identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrincipalId(pub u64);

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Principal role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Administration
    Owner,
    /// Quality gate
    Reviewer,
    /// Content author
    Trainer,
}

impl Role {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Reviewer => "reviewer",
            Role::Trainer => "trainer",
        }
    }

    /// Owners and reviewers
    #[inline]
    #[must_use]
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Owner | Role::Reviewer)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "reviewer" => Ok(Role::Reviewer),
            "trainer" => Ok(Role::Trainer),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated actor supplied with every call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub role: Role,
}

impl Principal {
    /// Create new principal
    #[inline]
    #[must_use]
    pub fn new(id: u64, role: Role) -> Self {
        Self {
            id: PrincipalId(id),
            role,
        }
    }
}

/// Directory entry for a principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRecord {
    pub id: PrincipalId,
    pub username: String,
    pub role: Role,
}

impl PrincipalRecord {
    /// The principal this record describes
    #[inline]
    #[must_use]
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            role: self.role,
        }
    }
}

/// Unique task identifier (UUID v4 string)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generate new task ID
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Unclaimed,
    Claimed,
    InReview,
    Rework,
    Approved,
}

impl TaskStatus {
    /// All statuses, in lifecycle order
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Unclaimed,
        TaskStatus::Claimed,
        TaskStatus::InReview,
        TaskStatus::Rework,
        TaskStatus::Approved,
    ];

    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Unclaimed => "unclaimed",
            TaskStatus::Claimed => "claimed",
            TaskStatus::InReview => "in_review",
            TaskStatus::Rework => "rework",
            TaskStatus::Approved => "approved",
        }
    }

    /// Whether a task in this status has a claimant
    #[inline]
    #[must_use]
    pub fn holds_claim(&self) -> bool {
        matches!(self, TaskStatus::Claimed | TaskStatus::InReview | TaskStatus::Rework)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit of annotation work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    pub created_by: PrincipalId,
    pub claimed_by: Option<PrincipalId>,
    pub review_comments: Option<String>,
    /// Compiled notebook JSON, derived from `(title, cells)`
    pub document: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Whether `principal` currently holds the claim
    #[inline]
    #[must_use]
    pub fn is_claimed_by(&self, principal: PrincipalId) -> bool {
        self.claimed_by == Some(principal)
    }

    /// Queue listing view
    #[must_use]
    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            status: self.status,
        }
    }
}

/// Stored transcript cell; `order` is dense `0..n` within a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub order: u32,
    pub cell_type: CellKind,
    pub content: String,
}

impl Cell {
    /// Number cells by their position
    #[must_use]
    pub fn from_inputs(inputs: Vec<CellInput>) -> Vec<Cell> {
        inputs
            .into_iter()
            .zip(0u32..)
            .map(|(input, order)| Cell {
                order,
                cell_type: input.cell_type,
                content: input.content,
            })
            .collect()
    }

    /// Editor-facing view of this cell
    #[must_use]
    pub fn to_input(&self) -> CellInput {
        CellInput {
            cell_type: self.cell_type.clone(),
            content: self.content.clone(),
        }
    }
}

/// Queue entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
}

/// Editor view of a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskContent {
    pub task_id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    pub review_comments: Option<String>,
    pub cells: Vec<Cell>,
}

/// Named task queues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueName {
    /// Tasks waiting for a trainer
    Unclaimed,
    /// Tasks waiting for a reviewer
    Review,
    /// Tasks ready for export
    Approved,
    /// The calling trainer's claimed and reworked tasks
    MyTasks,
}

impl FromStr for QueueName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unclaimed" => Ok(QueueName::Unclaimed),
            "review" => Ok(QueueName::Review),
            "approved" => Ok(QueueName::Approved),
            "my_tasks" => Ok(QueueName::MyTasks),
            other => Err(format!("invalid queue name: {other}")),
        }
    }
}

/// Single notebook ready for download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentDownload {
    pub file_name: String,
    pub document: String,
}

/// Batch export result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArchive {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Tasks consumed by this export
    pub exported: Vec<TaskId>,
}

/// Review decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    Rework {
        #[serde(default)]
        comments: String,
    },
}
