//! Testing utilities for the Colabforge workspace
//!
//! Shared principals, transcripts and collaborators for integration tests.

#![allow(missing_docs)]

use colabforge_notebook::CellInput;
use colabforge_workflow::{
    InMemoryTaskStore, Packager, PackagingError, Principal, Role, TaskId, WorkflowConfig,
    WorkflowService, ZipPackager,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn owner() -> Principal {
    Principal::new(1, Role::Owner)
}

pub fn reviewer() -> Principal {
    Principal::new(2, Role::Reviewer)
}

/// Trainers are numbered from 100 so they never collide with staff ids
pub fn trainer(n: u64) -> Principal {
    Principal::new(100 + n, Role::Trainer)
}

/// A short but complete tool-using conversation
pub fn sample_cells() -> Vec<CellInput> {
    vec![
        CellInput::new("system_prompt", "You are a weather assistant."),
        CellInput::new("tool_definition", r#"[{"name":"get_weather","parameters":{"city":"string"}}]"#),
        CellInput::new("user", "Weather in Oslo?"),
        CellInput::new(
            "assistant",
            r#"{"text":"Checking.","tool_calls":[{"name":"get_weather","arguments":{"city":"Oslo"}}]}"#,
        ),
        CellInput::new("tool_output", r#"{"temp_c":4}"#),
        CellInput::new("assistant", r#"{"text":"It is 4°C in Oslo.","tool_calls":[]}"#),
    ]
}

/// Service over a fresh in-memory store; the store handle is returned for inspection
pub fn in_memory_service() -> (WorkflowService, Arc<InMemoryTaskStore>) {
    let store = Arc::new(InMemoryTaskStore::new());
    let service = WorkflowService::new(store.clone(), WorkflowConfig::new());
    (service, store)
}

/// Service over a fresh in-memory store with a custom packager
pub fn service_with_packager(packager: Arc<dyn Packager>) -> (WorkflowService, Arc<InMemoryTaskStore>) {
    let store = Arc::new(InMemoryTaskStore::new());
    let service = WorkflowService::with_packager(store.clone(), packager, WorkflowConfig::new());
    (service, store)
}

/// Create a task and drive it to `approved` with the sample transcript
pub async fn approved_task(service: &WorkflowService, title: &str, author: &Principal) -> TaskId {
    let id = service
        .create_task(&owner(), Some(title.to_string()))
        .await
        .unwrap();
    service.claim_task(author, &id).await.unwrap();
    service.save_content(author, &id, sample_cells()).await.unwrap();
    service.submit_task(author, &id).await.unwrap();
    service.approve_task(&reviewer(), &id).await.unwrap();
    id
}

/// Packager that always fails
#[derive(Debug, Default)]
pub struct FailingPackager;

impl Packager for FailingPackager {
    fn bundle(&self, _entries: &BTreeMap<String, String>) -> Result<Vec<u8>, PackagingError> {
        Err(PackagingError::Rejected("archive backend offline".to_string()))
    }
}

/// Zip packager that counts how many bundles it built
#[derive(Debug, Default)]
pub struct CountingPackager {
    inner: ZipPackager,
    calls: AtomicUsize,
}

impl CountingPackager {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Packager for CountingPackager {
    fn bundle(&self, entries: &BTreeMap<String, String>) -> Result<Vec<u8>, PackagingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.bundle(entries)
    }
}
