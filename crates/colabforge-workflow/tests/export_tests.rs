//! Batch export of approved tasks

use colabforge_notebook::NotebookDocument;
use colabforge_test_utils::{
    approved_task, in_memory_service, owner, reviewer, service_with_packager, trainer,
    CountingPackager, FailingPackager,
};
use colabforge_workflow::{PackagingError, TaskStatus, TaskStore, WorkflowError};
use pretty_assertions::assert_eq;
use std::io::{Cursor, Read};
use std::sync::Arc;

fn read_archive(bytes: Vec<u8>) -> Vec<(String, String)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut contents = String::new();
            file.read_to_string(&mut contents).unwrap();
            (file.name().to_string(), contents)
        })
        .collect()
}

#[tokio::test]
async fn export_bundles_and_deletes_approved_tasks() {
    let (service, store) = in_memory_service();
    let first = approved_task(&service, "Weather: Oslo", &trainer(1)).await;
    let second = approved_task(&service, "Flights", &trainer(2)).await;
    let pending = service.create_task(&owner(), Some("pending".to_string())).await.unwrap();

    let archive = service.export_approved(&reviewer()).await.unwrap();
    assert_eq!(archive.file_name, "approved_tasks.zip");
    let mut exported = archive.exported.clone();
    exported.sort();
    let mut expected = vec![first.clone(), second.clone()];
    expected.sort();
    assert_eq!(exported, expected);

    let mut entries = read_archive(archive.bytes);
    entries.sort();
    let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["Flights.ipynb", "Weather Oslo.ipynb"]);
    for (_, document) in &entries {
        let doc = NotebookDocument::from_json(document).unwrap();
        assert_eq!(doc.nbformat, 4);
    }

    assert!(store.get_task(&first).await.unwrap().is_none());
    assert!(store.get_task(&second).await.unwrap().is_none());
    assert_eq!(store.task_count().await, 1);
    assert_eq!(
        store.get_task(&pending).await.unwrap().unwrap().status,
        TaskStatus::Unclaimed
    );
}

#[tokio::test]
async fn packaging_failure_deletes_nothing() {
    let (service, store) = service_with_packager(Arc::new(FailingPackager));
    let first = approved_task(&service, "One", &trainer(1)).await;
    let second = approved_task(&service, "Two", &trainer(1)).await;

    let err = service.export_approved(&owner()).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::PackagingFailure(PackagingError::Rejected(_))
    ));

    for id in [&first, &second] {
        let task = store.get_task(id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Approved);
    }
}

#[tokio::test]
async fn export_packages_once_per_call() {
    let packager = Arc::new(CountingPackager::default());
    let (service, _store) = service_with_packager(packager.clone());
    approved_task(&service, "Same", &trainer(1)).await;
    approved_task(&service, "Same", &trainer(2)).await;

    let archive = service.export_approved(&owner()).await.unwrap();
    assert_eq!(packager.calls(), 1);

    let mut names: Vec<String> = read_archive(archive.bytes).into_iter().map(|(n, _)| n).collect();
    names.sort();
    assert_eq!(names, vec!["Same.ipynb", "Same_2.ipynb"]);

    // Second export finds nothing left and never reaches the packager
    let err = service.export_approved(&owner()).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(packager.calls(), 1);
}

#[tokio::test]
async fn trainers_cannot_export() {
    let (service, store) = in_memory_service();
    let id = approved_task(&service, "Kept", &trainer(1)).await;

    let err = service.export_approved(&trainer(1)).await.unwrap_err();
    assert!(err.is_permission_denied());
    assert!(store.get_task(&id).await.unwrap().is_some());
}

#[tokio::test]
async fn nothing_approved_is_not_found() {
    let (service, _store) = in_memory_service();
    service.create_task(&owner(), Some("draft".to_string())).await.unwrap();

    let err = service.export_approved(&owner()).await.unwrap_err();
    assert!(err.is_not_found());
}
