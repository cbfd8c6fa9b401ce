//! End-to-end task lifecycle through the workflow service

use colabforge_notebook::{CellInput, NotebookDocument};
use colabforge_test_utils::{in_memory_service, owner, reviewer, sample_cells, trainer};
use colabforge_workflow::{
    PrincipalId, QueueName, Role, TaskId, TaskStatus, TaskStore, WorkflowError,
};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn created_task_has_placeholder_document() {
    let (service, store) = in_memory_service();
    let id = service
        .create_task(&reviewer(), Some("Weather bot".to_string()))
        .await
        .unwrap();

    let task = store.get_task(&id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Unclaimed);
    assert_eq!(task.created_by, reviewer().id);
    assert_eq!(task.claimed_by, None);

    let doc = NotebookDocument::from_json(&task.document).unwrap();
    assert_eq!(doc.cells.len(), 1);
    assert_eq!(doc.cells[0].source, vec!["# Task ID: Weather bot"]);
}

#[tokio::test]
async fn full_lifecycle_with_rework() {
    let (service, store) = in_memory_service();
    let alice = trainer(1);
    let id = service.create_task(&owner(), Some("Trip".to_string())).await.unwrap();

    service.claim_task(&alice, &id).await.unwrap();
    service.save_content(&alice, &id, sample_cells()).await.unwrap();
    service.submit_task(&alice, &id).await.unwrap();

    service.request_rework(&reviewer(), &id, "tool output is stale").await.unwrap();
    let content = service.task_content(&alice, &id).await.unwrap();
    assert_eq!(content.status, TaskStatus::Rework);
    assert_eq!(content.review_comments.as_deref(), Some("tool output is stale"));

    // Claimant keeps ownership through rework
    service.save_content(&alice, &id, vec![CellInput::new("user", "Retry")]).await.unwrap();
    service.submit_task(&alice, &id).await.unwrap();

    let task = store.get_task(&id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::InReview);
    assert_eq!(task.claimed_by, Some(alice.id));
    assert_eq!(task.review_comments, None);

    service.approve_task(&owner(), &id).await.unwrap();
    let task = store.get_task(&id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Approved);
    assert_eq!(task.claimed_by, None);
    assert_eq!(task.review_comments, None);
}

#[tokio::test]
async fn save_numbers_cells_and_recompiles() {
    let (service, store) = in_memory_service();
    let alice = trainer(1);
    let id = service.create_task(&owner(), Some("T".to_string())).await.unwrap();
    service.claim_task(&alice, &id).await.unwrap();

    service.save_content(&alice, &id, sample_cells()).await.unwrap();
    service
        .save_content(&alice, &id, vec![CellInput::new("user", "a"), CellInput::new("user", "b")])
        .await
        .unwrap();

    let cells = store.get_cells(&id).await.unwrap();
    let orders: Vec<u32> = cells.iter().map(|c| c.order).collect();
    assert_eq!(orders, vec![0, 1]);

    let task = store.get_task(&id).await.unwrap().unwrap();
    let expected = colabforge_notebook::compile("T", &[CellInput::new("user", "a"), CellInput::new("user", "b")]).unwrap();
    assert_eq!(task.document, expected);
}

#[tokio::test]
async fn malformed_tool_definition_leaves_task_untouched() {
    let (service, store) = in_memory_service();
    let alice = trainer(1);
    let id = service.create_task(&owner(), Some("T".to_string())).await.unwrap();
    service.claim_task(&alice, &id).await.unwrap();
    service.save_content(&alice, &id, sample_cells()).await.unwrap();
    let before = store.get_task(&id).await.unwrap().unwrap().document;

    let err = service
        .save_content(&alice, &id, vec![CellInput::new("tool_definition", "{broken")])
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::MalformedContent(_)));

    assert_eq!(store.get_task(&id).await.unwrap().unwrap().document, before);
    assert_eq!(store.get_cells(&id).await.unwrap().len(), sample_cells().len());
}

#[tokio::test]
async fn non_claimant_is_denied() {
    let (service, _store) = in_memory_service();
    let id = service.create_task(&owner(), Some("T".to_string())).await.unwrap();
    service.claim_task(&trainer(1), &id).await.unwrap();

    let intruder = trainer(2);
    let err = service.save_content(&intruder, &id, sample_cells()).await.unwrap_err();
    assert!(err.is_permission_denied());
    let err = service.submit_task(&intruder, &id).await.unwrap_err();
    assert!(err.is_permission_denied());
    let err = service.task_content(&intruder, &id).await.unwrap_err();
    assert!(err.is_permission_denied());
    let err = service.download_document(&intruder, &id).await.unwrap_err();
    assert!(err.is_permission_denied());
}

#[tokio::test]
async fn approved_task_is_frozen_for_former_claimant() {
    let (service, _store) = in_memory_service();
    let alice = trainer(1);
    let id = colabforge_test_utils::approved_task(&service, "Done", &alice).await;

    let err = service.save_content(&alice, &id, sample_cells()).await.unwrap_err();
    assert!(err.is_permission_denied());
    let err = service.approve_task(&owner(), &id).await.unwrap_err();
    assert!(err.is_invalid_transition());
}

#[tokio::test]
async fn review_requires_in_review() {
    let (service, _store) = in_memory_service();
    let id = service.create_task(&owner(), Some("T".to_string())).await.unwrap();

    let err = service.approve_task(&reviewer(), &id).await.unwrap_err();
    assert!(err.is_invalid_transition());

    service.claim_task(&trainer(1), &id).await.unwrap();
    let err = service.request_rework(&reviewer(), &id, "").await.unwrap_err();
    assert!(err.is_invalid_transition());

    let err = service.approve_task(&trainer(1), &id).await.unwrap_err();
    assert!(err.is_permission_denied());
}

#[tokio::test]
async fn double_submit_is_invalid() {
    let (service, _store) = in_memory_service();
    let alice = trainer(1);
    let id = service.create_task(&owner(), Some("T".to_string())).await.unwrap();
    service.claim_task(&alice, &id).await.unwrap();
    service.submit_task(&alice, &id).await.unwrap();

    let err = service.submit_task(&alice, &id).await.unwrap_err();
    assert!(err.is_invalid_transition());
}

#[tokio::test]
async fn empty_rework_comment_is_kept() {
    let (service, store) = in_memory_service();
    let alice = trainer(1);
    let id = service.create_task(&owner(), Some("T".to_string())).await.unwrap();
    service.claim_task(&alice, &id).await.unwrap();
    service.submit_task(&alice, &id).await.unwrap();
    service.request_rework(&owner(), &id, "").await.unwrap();

    let task = store.get_task(&id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Rework);
    assert_eq!(task.review_comments.as_deref(), Some(""));
}

#[tokio::test]
async fn missing_task_is_not_found() {
    let (service, _store) = in_memory_service();
    let ghost = TaskId::from("00000000-0000-0000-0000-000000000000");

    assert!(service.claim_task(&trainer(1), &ghost).await.unwrap_err().is_not_found());
    assert!(service.task_content(&owner(), &ghost).await.unwrap_err().is_not_found());
    assert!(service.approve_task(&owner(), &ghost).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn download_uses_title_and_extension() {
    let (service, _store) = in_memory_service();
    let alice = trainer(1);
    let id = service.create_task(&owner(), Some("Oslo weather".to_string())).await.unwrap();
    service.claim_task(&alice, &id).await.unwrap();
    service.save_content(&alice, &id, sample_cells()).await.unwrap();

    let download = service.download_document(&alice, &id).await.unwrap();
    assert_eq!(download.file_name, "Oslo weather.ipynb");
    let doc = NotebookDocument::from_json(&download.document).unwrap();
    assert_eq!(doc.cells.len(), sample_cells().len());
}

#[tokio::test]
async fn queues_reflect_status() {
    let (service, _store) = in_memory_service();
    let alice = trainer(1);
    let open = service.create_task(&owner(), Some("open".to_string())).await.unwrap();
    let mine = service.create_task(&owner(), Some("mine".to_string())).await.unwrap();
    let reviewing = service.create_task(&owner(), Some("reviewing".to_string())).await.unwrap();

    service.claim_task(&alice, &mine).await.unwrap();
    service.claim_task(&alice, &reviewing).await.unwrap();
    service.submit_task(&alice, &reviewing).await.unwrap();

    let unclaimed = service.queue(&alice, QueueName::Unclaimed).await.unwrap();
    assert_eq!(unclaimed.iter().map(|t| &t.id).collect::<Vec<_>>(), vec![&open]);

    let review = service.queue(&reviewer(), QueueName::Review).await.unwrap();
    assert_eq!(review.len(), 1);
    assert_eq!(review[0].id, reviewing);
    assert_eq!(review[0].status, TaskStatus::InReview);

    let my_tasks = service.queue(&alice, QueueName::MyTasks).await.unwrap();
    assert_eq!(my_tasks.len(), 1);
    assert_eq!(my_tasks[0].id, mine);

    let err = service.queue(&reviewer(), QueueName::MyTasks).await.unwrap_err();
    assert!(err.is_permission_denied());
}

#[tokio::test]
async fn removing_claimant_releases_tasks() {
    let (service, store) = in_memory_service();
    let admin = service
        .register_principal(&owner(), "admin", Role::Owner)
        .await
        .unwrap()
        .principal();
    let record = service
        .register_principal(&admin, "alice", Role::Trainer)
        .await
        .unwrap();
    let alice = record.principal();

    let a = service.create_task(&admin, Some("A".to_string())).await.unwrap();
    let b = service.create_task(&admin, Some("B".to_string())).await.unwrap();
    service.claim_task(&alice, &a).await.unwrap();
    service.claim_task(&alice, &b).await.unwrap();
    service.submit_task(&alice, &b).await.unwrap();
    service.request_rework(&admin, &b, "redo").await.unwrap();

    let mut released = service.remove_principal(&admin, alice.id).await.unwrap();
    released.sort();
    let mut expected = vec![a.clone(), b.clone()];
    expected.sort();
    assert_eq!(released, expected);

    for id in [&a, &b] {
        let task = store.get_task(id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Unclaimed);
        assert_eq!(task.claimed_by, None);
        assert_eq!(task.review_comments, None);
    }
    assert!(store.get_principal(alice.id).await.unwrap().is_none());

    // Released tasks are claimable again
    service.claim_task(&trainer(2), &a).await.unwrap();
}

#[tokio::test]
async fn principal_management_is_owner_only() {
    let (service, _store) = in_memory_service();
    let admin = service
        .register_principal(&owner(), "admin", Role::Owner)
        .await
        .unwrap()
        .principal();
    assert_eq!(admin.id, owner().id);

    let err = service.register_principal(&reviewer(), "x", Role::Trainer).await.unwrap_err();
    assert!(err.is_permission_denied());
    let err = service.list_principals(&trainer(1)).await.unwrap_err();
    assert!(err.is_permission_denied());

    let bob = service.register_principal(&admin, "bob", Role::Trainer).await.unwrap();
    service.update_role(&admin, bob.id, Role::Reviewer).await.unwrap();
    let all = service.list_principals(&admin).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].username, "bob");
    assert_eq!(all[1].role, Role::Reviewer);

    let err = service.update_role(&admin, PrincipalId(9999), Role::Owner).await.unwrap_err();
    assert!(err.is_not_found());
    let err = service.remove_principal(&admin, PrincipalId(9999)).await.unwrap_err();
    assert!(err.is_not_found());
    let err = service.remove_principal(&admin, admin.id).await.unwrap_err();
    assert!(err.is_permission_denied());
    let err = service.remove_principal(&reviewer(), bob.id).await.unwrap_err();
    assert!(err.is_permission_denied());
}
