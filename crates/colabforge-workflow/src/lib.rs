//! Colabforge Workflow - annotation task lifecycle
//!
//! Coordinates three roles around conversational transcripts:
//! - owners administer principals and tasks
//! - reviewers approve work or send it back for rework
//! - trainers claim tasks and author their cells
//!
//! Every content change recompiles the task's notebook document through
//! [`colabforge_notebook`]. Approved tasks are consumed by a batch export.
//!
//! # Example
//!
//! ```rust,ignore
//! use colabforge_workflow::prelude::*;
//!
//! # async fn example() -> Result<(), WorkflowError> {
//! let service = WorkflowService::in_memory(WorkflowConfig::new());
//! let owner = Principal::new(1, Role::Owner);
//! let trainer = Principal::new(2, Role::Trainer);
//!
//! let id = service.create_task(&owner, Some("Weather bot".into())).await?;
//! service.claim_task(&trainer, &id).await?;
//! service.save_content(&trainer, &id, vec![CellInput::new("user", "Hi")]).await?;
//! service.submit_task(&trainer, &id).await?;
//! service.approve_task(&owner, &id).await?;
//!
//! let archive = service.export_approved(&owner).await?;
//! assert_eq!(archive.exported, vec![id]);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod packaging;
pub mod service;
pub mod state_machine;
pub mod store;
pub mod types;

pub use config::{ArchiveCompression, WorkflowConfig};
pub use error::{ConfigError, PackagingError, StoreError, WorkflowError};
pub use packaging::{Packager, ZipPackager};
pub use service::WorkflowService;
pub use state_machine::TaskAction;
pub use store::{InMemoryTaskStore, StatusUpdate, TaskStore};
pub use types::{
    Cell, DocumentDownload, ExportArchive, Principal, PrincipalId, PrincipalRecord, QueueName,
    ReviewAction, Role, Task, TaskContent, TaskId, TaskStatus, TaskSummary,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the workflow
    pub use crate::{
        Principal, QueueName, ReviewAction, Role, TaskId, TaskStatus, WorkflowConfig,
        WorkflowError, WorkflowService,
    };
    pub use colabforge_notebook::CellInput;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
