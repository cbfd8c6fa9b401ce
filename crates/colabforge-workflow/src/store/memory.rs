//! In-memory task store
//!
//! A single `RwLock` guards all rows, so every trait method is one
//! transaction: readers never observe a half-replaced cell set.

use super::{StatusUpdate, TaskStore};
use crate::error::StoreError;
use crate::types::{Cell, PrincipalId, PrincipalRecord, Role, Task, TaskId, TaskStatus};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug)]
struct TaskRow {
    task: Task,
    cells: Vec<Cell>,
}

#[derive(Debug, Default)]
struct Tables {
    tasks: HashMap<TaskId, TaskRow>,
    principals: BTreeMap<PrincipalId, PrincipalRecord>,
    next_principal_id: u64,
}

impl Tables {
    fn sorted_tasks<F>(&self, filter: F) -> Vec<Task>
    where
        F: Fn(&Task) -> bool,
    {
        let mut tasks: Vec<Task> = self
            .tasks
            .values()
            .map(|row| &row.task)
            .filter(|task| filter(task))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        tasks
    }
}

/// Process-local [`TaskStore`]
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tables: RwLock<Tables>,
}

impl InMemoryTaskStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tasks
    pub async fn task_count(&self) -> usize {
        self.tables.read().await.tasks.len()
    }
}

#[async_trait::async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create_task(&self, task: Task) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.tasks.contains_key(&task.id) {
            return Err(StoreError::Conflict(format!("task {} already exists", task.id)));
        }
        tables.tasks.insert(
            task.id.clone(),
            TaskRow {
                task,
                cells: Vec::new(),
            },
        );
        Ok(())
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.tables.read().await.tasks.get(id).map(|row| row.task.clone()))
    }

    async fn get_cells(&self, id: &TaskId) -> Result<Vec<Cell>, StoreError> {
        let tables = self.tables.read().await;
        let mut cells = tables
            .tasks
            .get(id)
            .map(|row| row.cells.clone())
            .unwrap_or_default();
        cells.sort_by_key(|cell| cell.order);
        Ok(cells)
    }

    async fn list_tasks_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError> {
        Ok(self.tables.read().await.sorted_tasks(|task| task.status == status))
    }

    async fn list_tasks_by_claimant(&self, claimant: PrincipalId) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .sorted_tasks(|task| task.is_claimed_by(claimant)))
    }

    async fn atomic_claim(&self, id: &TaskId, claimant: PrincipalId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.tasks.get_mut(id) {
            Some(row) if row.task.status == TaskStatus::Unclaimed => {
                row.task.status = TaskStatus::Claimed;
                row.task.claimed_by = Some(claimant);
                row.task.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn replace_cells(
        &self,
        id: &TaskId,
        claimant: PrincipalId,
        cells: Vec<Cell>,
        document: String,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.tasks.get_mut(id) {
            Some(row) if row.task.is_claimed_by(claimant) => {
                row.cells = cells;
                row.task.document = document;
                row.task.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_status(&self, id: &TaskId, update: StatusUpdate) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.tasks.get_mut(id) else {
            return Ok(false);
        };
        let task = &mut row.task;

        if task.status != update.from {
            return Ok(false);
        }
        if let Some(claimant) = update.claimant {
            if !task.is_claimed_by(claimant) {
                return Ok(false);
            }
        }

        task.status = update.to;
        task.review_comments = update.review_comments;
        if !update.to.holds_claim() {
            task.claimed_by = None;
        }
        task.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_tasks(&self, ids: Vec<TaskId>) -> Result<usize, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(ids
            .iter()
            .filter(|id| tables.tasks.remove(*id).is_some())
            .count())
    }

    async fn insert_principal(&self, username: String, role: Role) -> Result<PrincipalRecord, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.principals.values().any(|p| p.username == username) {
            return Err(StoreError::Conflict(format!("username {username} is taken")));
        }
        tables.next_principal_id += 1;
        let record = PrincipalRecord {
            id: PrincipalId(tables.next_principal_id),
            username,
            role,
        };
        tables.principals.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_principal(&self, id: PrincipalId) -> Result<Option<PrincipalRecord>, StoreError> {
        Ok(self.tables.read().await.principals.get(&id).cloned())
    }

    async fn list_principals(&self) -> Result<Vec<PrincipalRecord>, StoreError> {
        Ok(self.tables.read().await.principals.values().cloned().collect())
    }

    async fn update_role(&self, id: PrincipalId, role: Role) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.principals.get_mut(&id) {
            Some(record) => {
                record.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_principal(&self, id: PrincipalId) -> Result<Option<Vec<TaskId>>, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.principals.remove(&id).is_none() {
            return Ok(None);
        }

        let now = Utc::now();
        let mut reset: Vec<TaskId> = tables
            .tasks
            .values_mut()
            .filter(|row| row.task.is_claimed_by(id))
            .map(|row| {
                row.task.status = TaskStatus::Unclaimed;
                row.task.claimed_by = None;
                row.task.review_comments = None;
                row.task.updated_at = now;
                row.task.id.clone()
            })
            .collect();
        reset.sort();
        Ok(Some(reset))
    }
}
