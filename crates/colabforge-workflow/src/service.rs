//! Workflow service
//!
//! Orchestrates the state machine and the document compiler against the
//! persistence and packaging collaborators:
//! - create task -> compile placeholder document
//! - save content -> number cells -> recompile -> replace cells and document together
//! - batch export -> compile archive -> delete exported tasks
//!
//! The service holds no per-principal state; every call carries its
//! [`Principal`].

use crate::config::WorkflowConfig;
use crate::error::WorkflowError;
use crate::packaging::{archive_entries, Packager, ZipPackager};
use crate::state_machine::{self, TaskAction};
use crate::store::{InMemoryTaskStore, StatusUpdate, TaskStore};
use crate::types::{
    Cell, DocumentDownload, ExportArchive, Principal, PrincipalId, PrincipalRecord, QueueName,
    ReviewAction, Role, Task, TaskContent, TaskId, TaskStatus, TaskSummary,
};
use chrono::Utc;
use colabforge_notebook::{CellInput, DocumentCompiler};
use std::sync::Arc;

/// Entry point for every workflow operation
pub struct WorkflowService {
    store: Arc<dyn TaskStore>,
    packager: Arc<dyn Packager>,
    compiler: DocumentCompiler,
    config: WorkflowConfig,
}

impl WorkflowService {
    /// Create service with the zip packager described by `config`
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>, config: WorkflowConfig) -> Self {
        let packager = Arc::new(ZipPackager::new(config.compression));
        Self::with_packager(store, packager, config)
    }

    /// Create service with a custom packager
    #[must_use]
    pub fn with_packager(
        store: Arc<dyn TaskStore>,
        packager: Arc<dyn Packager>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            store,
            packager,
            compiler: DocumentCompiler::new(),
            config,
        }
    }

    /// Service backed by a fresh [`InMemoryTaskStore`]
    #[must_use]
    pub fn in_memory(config: WorkflowConfig) -> Self {
        Self::new(Arc::new(InMemoryTaskStore::new()), config)
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Create an unclaimed task with a placeholder document
    ///
    /// # Errors
    /// `PermissionDenied` unless `actor` is an owner or reviewer.
    #[tracing::instrument(skip(self, actor), fields(principal = %actor.id))]
    pub async fn create_task(&self, actor: &Principal, title: Option<String>) -> Result<TaskId, WorkflowError> {
        if !actor.role.is_staff() {
            tracing::warn!(role = %actor.role, "Task creation denied");
            return Err(WorkflowError::permission_denied(
                "create",
                "only owners and reviewers can create tasks",
            ));
        }

        let title = title.unwrap_or_else(|| self.config.generated_title());
        let document = self.compiler.compile_to_string(&title, &[])?;
        let now = Utc::now();
        let task = Task {
            id: TaskId::generate(),
            title,
            status: TaskStatus::Unclaimed,
            created_by: actor.id,
            claimed_by: None,
            review_comments: None,
            document,
            created_at: now,
            updated_at: now,
        };
        let id = task.id.clone();

        self.store.create_task(task).await?;
        tracing::info!(task = %id, "Task created");
        Ok(id)
    }

    /// Claim an unclaimed task for the calling trainer
    ///
    /// Exactly one of several concurrent claims on the same task succeeds;
    /// the others get `InvalidTransition`.
    ///
    /// # Errors
    /// `NotFound`, `PermissionDenied` (non-trainer) or `InvalidTransition`.
    #[tracing::instrument(skip(self, actor), fields(principal = %actor.id))]
    pub async fn claim_task(&self, actor: &Principal, id: &TaskId) -> Result<(), WorkflowError> {
        let task = self.load(id).await?;
        self.guard(actor, &task, TaskAction::Claim)?;

        if !self.store.atomic_claim(id, actor.id).await? {
            let current = self.load(id).await?;
            tracing::warn!(task = %id, status = %current.status, "Lost claim race");
            return Err(WorkflowError::InvalidTransition {
                task_id: id.clone(),
                status: current.status,
                action: TaskAction::Claim.as_str(),
            });
        }

        tracing::info!(task = %id, from = %TaskStatus::Unclaimed, to = %TaskStatus::Claimed, "Task claimed");
        Ok(())
    }

    /// Replace the task's cells and recompile its document
    ///
    /// Cells are numbered `0..n` in input order. Compilation happens before
    /// anything is written, so a malformed tool definition leaves the stored
    /// task untouched.
    ///
    /// # Errors
    /// `NotFound`, `PermissionDenied` (not the claimant), `InvalidTransition`
    /// or `MalformedContent`.
    #[tracing::instrument(skip(self, actor, cells), fields(principal = %actor.id, cells = cells.len()))]
    pub async fn save_content(
        &self,
        actor: &Principal,
        id: &TaskId,
        cells: Vec<CellInput>,
    ) -> Result<(), WorkflowError> {
        let task = self.load(id).await?;
        self.guard(actor, &task, TaskAction::SaveContent)?;

        let document = self.compiler.compile_to_string(&task.title, &cells)?;
        let cells = Cell::from_inputs(cells);

        if !self.store.replace_cells(id, actor.id, cells, document).await? {
            tracing::warn!(task = %id, "Claim lost before content save");
            return Err(WorkflowError::permission_denied(
                TaskAction::SaveContent.as_str(),
                "task is no longer claimed by this principal",
            ));
        }

        tracing::info!(task = %id, "Content saved");
        Ok(())
    }

    /// Send a claimed or reworked task to review
    ///
    /// # Errors
    /// `NotFound`, `PermissionDenied` (not the claimant) or `InvalidTransition`.
    #[tracing::instrument(skip(self, actor), fields(principal = %actor.id))]
    pub async fn submit_task(&self, actor: &Principal, id: &TaskId) -> Result<(), WorkflowError> {
        let task = self.load(id).await?;
        let to = self.guard(actor, &task, TaskAction::Submit)?;

        self.apply(
            &task,
            TaskAction::Submit,
            StatusUpdate {
                from: task.status,
                to,
                review_comments: None,
                claimant: Some(actor.id),
            },
        )
        .await
    }

    /// Approve a task or send it back for rework
    ///
    /// # Errors
    /// `NotFound`, `PermissionDenied` (not staff) or `InvalidTransition`
    /// (not in review).
    #[tracing::instrument(skip(self, actor, action), fields(principal = %actor.id))]
    pub async fn review_task(
        &self,
        actor: &Principal,
        id: &TaskId,
        action: ReviewAction,
    ) -> Result<(), WorkflowError> {
        let task = self.load(id).await?;
        let (task_action, review_comments) = match action {
            ReviewAction::Approve => (TaskAction::Approve, None),
            ReviewAction::Rework { comments } => (TaskAction::RequestRework, Some(comments)),
        };
        let to = self.guard(actor, &task, task_action)?;

        self.apply(
            &task,
            task_action,
            StatusUpdate {
                from: task.status,
                to,
                review_comments,
                claimant: None,
            },
        )
        .await
    }

    /// Shorthand for [`ReviewAction::Approve`]
    ///
    /// # Errors
    /// See [`WorkflowService::review_task`].
    pub async fn approve_task(&self, actor: &Principal, id: &TaskId) -> Result<(), WorkflowError> {
        self.review_task(actor, id, ReviewAction::Approve).await
    }

    /// Shorthand for [`ReviewAction::Rework`]
    ///
    /// # Errors
    /// See [`WorkflowService::review_task`].
    pub async fn request_rework(
        &self,
        actor: &Principal,
        id: &TaskId,
        comments: impl Into<String>,
    ) -> Result<(), WorkflowError> {
        let action = ReviewAction::Rework {
            comments: comments.into(),
        };
        self.review_task(actor, id, action).await
    }

    /// Editor view: task header plus ordered cells
    ///
    /// # Errors
    /// `NotFound` or `PermissionDenied` (neither staff nor claimant).
    pub async fn task_content(&self, actor: &Principal, id: &TaskId) -> Result<TaskContent, WorkflowError> {
        let task = self.load(id).await?;
        self.guard(actor, &task, TaskAction::ViewContent)?;
        let cells = self.store.get_cells(id).await?;

        Ok(TaskContent {
            task_id: task.id,
            title: task.title,
            status: task.status,
            review_comments: task.review_comments,
            cells,
        })
    }

    /// Compiled document of one task, named `<title><extension>`
    ///
    /// # Errors
    /// `NotFound` or `PermissionDenied` (neither staff nor claimant).
    pub async fn download_document(
        &self,
        actor: &Principal,
        id: &TaskId,
    ) -> Result<DocumentDownload, WorkflowError> {
        let task = self.load(id).await?;
        self.guard(actor, &task, TaskAction::ViewContent)?;

        Ok(DocumentDownload {
            file_name: format!("{}{}", task.title, self.config.notebook_extension),
            document: task.document,
        })
    }

    /// List a queue
    ///
    /// # Errors
    /// `PermissionDenied` if a non-trainer asks for `my_tasks`.
    pub async fn queue(&self, actor: &Principal, queue: QueueName) -> Result<Vec<TaskSummary>, WorkflowError> {
        let tasks = match queue {
            QueueName::Unclaimed => self.store.list_tasks_by_status(TaskStatus::Unclaimed).await?,
            QueueName::Review => self.store.list_tasks_by_status(TaskStatus::InReview).await?,
            QueueName::Approved => self.store.list_tasks_by_status(TaskStatus::Approved).await?,
            QueueName::MyTasks => {
                if actor.role != Role::Trainer {
                    return Err(WorkflowError::permission_denied(
                        "list my tasks",
                        "only trainers have a personal queue",
                    ));
                }
                self.store
                    .list_tasks_by_claimant(actor.id)
                    .await?
                    .into_iter()
                    .filter(|task| matches!(task.status, TaskStatus::Claimed | TaskStatus::Rework))
                    .collect()
            }
        };

        Ok(tasks.iter().map(Task::summary).collect())
    }

    /// List a queue by wire name (`unclaimed`, `review`, `approved`, `my_tasks`)
    ///
    /// # Errors
    /// `NotFound` for an unknown queue name, otherwise see [`WorkflowService::queue`].
    pub async fn queue_by_name(&self, actor: &Principal, name: &str) -> Result<Vec<TaskSummary>, WorkflowError> {
        let queue = name.parse::<QueueName>().map_err(WorkflowError::NotFound)?;
        self.queue(actor, queue).await
    }

    /// Package every approved task into one archive, then delete them
    ///
    /// If packaging fails nothing is deleted.
    ///
    /// # Errors
    /// `PermissionDenied` (not staff), `NotFound` (nothing approved),
    /// `PackagingFailure` or `PersistenceFailure`.
    #[tracing::instrument(skip(self, actor), fields(principal = %actor.id))]
    pub async fn export_approved(&self, actor: &Principal) -> Result<ExportArchive, WorkflowError> {
        if !actor.role.is_staff() {
            return Err(WorkflowError::permission_denied(
                TaskAction::Export.as_str(),
                "only owners and reviewers can export",
            ));
        }
        let approved = self.store.list_tasks_by_status(TaskStatus::Approved).await?;
        if approved.is_empty() {
            return Err(WorkflowError::NotFound("no approved tasks to export".to_string()));
        }
        for task in &approved {
            self.guard(actor, task, TaskAction::Export)?;
        }

        let entries = archive_entries(&approved, &self.config.notebook_extension);
        let bytes = self.packager.bundle(&entries).map_err(|e| {
            tracing::error!(error = %e, tasks = approved.len(), "Packaging failed; no task deleted");
            e
        })?;

        let exported: Vec<TaskId> = approved.into_iter().map(|task| task.id).collect();
        let deleted = self.store.delete_tasks(exported.clone()).await?;
        tracing::info!(tasks = deleted, bytes = bytes.len(), "Exported approved tasks");

        Ok(ExportArchive {
            file_name: self.config.archive_file_name.clone(),
            bytes,
            exported,
        })
    }

    /// Register a principal
    ///
    /// # Errors
    /// `PermissionDenied` unless `actor` is the owner.
    pub async fn register_principal(
        &self,
        actor: &Principal,
        username: impl Into<String>,
        role: Role,
    ) -> Result<PrincipalRecord, WorkflowError> {
        require_owner(actor, "register principal")?;
        let record = self.store.insert_principal(username.into(), role).await?;
        tracing::info!(principal = %record.id, role = %record.role, "Principal registered");
        Ok(record)
    }

    /// All registered principals
    ///
    /// # Errors
    /// `PermissionDenied` unless `actor` is the owner.
    pub async fn list_principals(&self, actor: &Principal) -> Result<Vec<PrincipalRecord>, WorkflowError> {
        require_owner(actor, "list principals")?;
        Ok(self.store.list_principals().await?)
    }

    /// Change a principal's role
    ///
    /// # Errors
    /// `PermissionDenied` unless `actor` is the owner; `NotFound` for an
    /// unknown target.
    pub async fn update_role(
        &self,
        actor: &Principal,
        target: PrincipalId,
        role: Role,
    ) -> Result<(), WorkflowError> {
        require_owner(actor, "update role")?;
        if !self.store.update_role(target, role).await? {
            return Err(WorkflowError::NotFound(format!("principal {target}")));
        }
        tracing::info!(principal = %target, role = %role, "Role updated");
        Ok(())
    }

    /// Remove a principal and release every task it had claimed
    ///
    /// Returns the tasks that were reset to `unclaimed`.
    ///
    /// # Errors
    /// `PermissionDenied` unless `actor` is the owner, or if the owner targets
    /// itself; `NotFound` for an unknown target.
    #[tracing::instrument(skip(self, actor), fields(principal = %actor.id))]
    pub async fn remove_principal(
        &self,
        actor: &Principal,
        target: PrincipalId,
    ) -> Result<Vec<TaskId>, WorkflowError> {
        require_owner(actor, "remove principal")?;
        if target == actor.id {
            return Err(WorkflowError::permission_denied(
                "remove principal",
                "cannot remove your own account",
            ));
        }

        let reset = self
            .store
            .remove_principal(target)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("principal {target}")))?;

        tracing::info!(principal = %target, released = reset.len(), "Principal removed");
        Ok(reset)
    }

    async fn load(&self, id: &TaskId) -> Result<Task, WorkflowError> {
        self.store
            .get_task(id)
            .await?
            .ok_or_else(|| WorkflowError::task_not_found(id))
    }

    fn guard(&self, actor: &Principal, task: &Task, action: TaskAction) -> Result<TaskStatus, WorkflowError> {
        state_machine::check(actor, task, action).map_err(|e| {
            tracing::warn!(task = %task.id, actor = %actor.id, action = %action, error = %e, "Action rejected");
            e
        })
    }

    async fn apply(&self, task: &Task, action: TaskAction, update: StatusUpdate) -> Result<(), WorkflowError> {
        let (from, to) = (update.from, update.to);
        if !self.store.update_status(&task.id, update).await? {
            let current = self.load(&task.id).await?;
            tracing::warn!(task = %task.id, status = %current.status, action = %action, "Status changed concurrently");
            return Err(WorkflowError::InvalidTransition {
                task_id: task.id.clone(),
                status: current.status,
                action: action.as_str(),
            });
        }

        tracing::info!(task = %task.id, %from, %to, "Task transitioned");
        Ok(())
    }
}

impl std::fmt::Debug for WorkflowService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn require_owner(actor: &Principal, action: &'static str) -> Result<(), WorkflowError> {
    if actor.role == Role::Owner {
        Ok(())
    } else {
        Err(WorkflowError::permission_denied(action, "only the owner can manage principals"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MockTaskStore;

    fn owner() -> Principal {
        Principal::new(1, Role::Owner)
    }

    fn trainer(id: u64) -> Principal {
        Principal::new(id, Role::Trainer)
    }

    #[tokio::test]
    async fn persistence_failure_propagates() {
        let mut store = MockTaskStore::new();
        store
            .expect_get_task()
            .returning(|_| Err(StoreError::Unavailable("connection reset".to_string())));
        let service = WorkflowService::new(Arc::new(store), WorkflowConfig::new());

        let err = service.claim_task(&trainer(5), &TaskId::from("t")).await.unwrap_err();
        assert!(matches!(err, WorkflowError::PersistenceFailure(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn create_failure_propagates() {
        let mut store = MockTaskStore::new();
        store
            .expect_create_task()
            .times(1)
            .returning(|_| Err(StoreError::Unavailable("disk full".to_string())));
        let service = WorkflowService::new(Arc::new(store), WorkflowConfig::new());

        let err = service.create_task(&owner(), Some("t".to_string())).await.unwrap_err();
        assert!(matches!(err, WorkflowError::PersistenceFailure(_)));
    }

    #[tokio::test]
    async fn trainer_cannot_create() {
        let service = WorkflowService::in_memory(WorkflowConfig::new());
        let err = service.create_task(&trainer(5), None).await.unwrap_err();
        assert!(err.is_permission_denied());
    }

    #[tokio::test]
    async fn untitled_task_gets_generated_title() {
        let service = WorkflowService::in_memory(WorkflowConfig::new());
        let id = service.create_task(&owner(), None).await.unwrap();
        let content = service.task_content(&owner(), &id).await.unwrap();
        assert!(content.title.starts_with("New Task - "));
    }

    #[tokio::test]
    async fn unknown_queue_is_not_found() {
        let service = WorkflowService::in_memory(WorkflowConfig::new());
        let err = service.queue_by_name(&owner(), "everything").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
