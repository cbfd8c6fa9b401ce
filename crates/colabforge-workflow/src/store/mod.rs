//! Persistence boundary
//!
//! The workflow core never talks to a storage engine directly. Each method
//! of [`TaskStore`] is one atomic unit: multi-row effects (cell replacement
//! with the recompiled document, claim resets on principal removal, batch
//! deletes) commit together or not at all.

use crate::error::StoreError;
use crate::types::{Cell, PrincipalId, PrincipalRecord, Role, Task, TaskId, TaskStatus};

mod memory;

pub use memory::InMemoryTaskStore;

/// Conditional status update
///
/// Applied only if the task is still in `from` (and, when `claimant` is
/// set, still claimed by that principal). Moving to a status that does not
/// hold a claim clears `claimed_by`. `review_comments` replaces the stored
/// value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub from: TaskStatus,
    pub to: TaskStatus,
    pub review_comments: Option<String>,
    pub claimant: Option<PrincipalId>,
}

/// Persistence collaborator
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a new task with no cells
    async fn create_task(&self, task: Task) -> Result<(), StoreError>;

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError>;

    /// Cells of a task ordered by `order`
    async fn get_cells(&self, id: &TaskId) -> Result<Vec<Cell>, StoreError>;

    /// Tasks in `status`, oldest first
    async fn list_tasks_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError>;

    /// Tasks claimed by `claimant`, oldest first
    async fn list_tasks_by_claimant(&self, claimant: PrincipalId) -> Result<Vec<Task>, StoreError>;

    /// `unclaimed -> claimed` compare-and-swap; `false` if the task was not unclaimed
    async fn atomic_claim(&self, id: &TaskId, claimant: PrincipalId) -> Result<bool, StoreError>;

    /// Replace all cells and the compiled document in one commit
    ///
    /// Returns `false` (and writes nothing) if `claimant` no longer holds the claim.
    async fn replace_cells(
        &self,
        id: &TaskId,
        claimant: PrincipalId,
        cells: Vec<Cell>,
        document: String,
    ) -> Result<bool, StoreError>;

    /// Apply a [`StatusUpdate`]; `false` if its preconditions no longer hold
    async fn update_status(&self, id: &TaskId, update: StatusUpdate) -> Result<bool, StoreError>;

    /// Delete tasks and their cells in one commit; returns the number deleted
    async fn delete_tasks(&self, ids: Vec<TaskId>) -> Result<usize, StoreError>;

    /// Register a principal, allocating its id
    async fn insert_principal(&self, username: String, role: Role) -> Result<PrincipalRecord, StoreError>;

    async fn get_principal(&self, id: PrincipalId) -> Result<Option<PrincipalRecord>, StoreError>;

    async fn list_principals(&self) -> Result<Vec<PrincipalRecord>, StoreError>;

    /// `false` if the principal does not exist
    async fn update_role(&self, id: PrincipalId, role: Role) -> Result<bool, StoreError>;

    /// Delete a principal and reset every task it claimed to `unclaimed`, in one commit
    ///
    /// Returns the reset task ids, or `None` if the principal does not exist.
    async fn remove_principal(&self, id: PrincipalId) -> Result<Option<Vec<TaskId>>, StoreError>;
}
