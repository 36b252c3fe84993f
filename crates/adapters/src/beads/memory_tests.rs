// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::beads::{BeadsError, IssueFilter, IssueStore, IssueUpdate, NewIssue};

#[tokio::test]
async fn create_assigns_sequential_ids_and_parses_labels() {
    let store = InMemoryIssueStore::new();
    let first = store
        .create(NewIssue::task("First", 1).labels("phase:inception, stage:user-stories"))
        .await
        .unwrap();
    let second = store.create(NewIssue::task("Second", 2)).await.unwrap();

    assert_eq!(first.id, "gt-1");
    assert_eq!(second.id, "gt-2");
    assert_eq!(first.stage(), Some("user-stories"));
    assert_eq!(first.status, "open");
}

#[tokio::test]
async fn ready_excludes_issues_with_open_blockers() {
    let store = InMemoryIssueStore::new();
    let a = store.create(NewIssue::task("A", 1)).await.unwrap();
    let b = store.create(NewIssue::task("B", 1)).await.unwrap();
    store.add_dependency(&b.id, &a.id, "blocks").await.unwrap();

    let ready: Vec<String> = store.ready().await.unwrap().into_iter().map(|i| i.id).collect();
    assert_eq!(ready, vec![a.id.clone()]);

    let blocked: Vec<String> = store.blocked().await.unwrap().into_iter().map(|i| i.id).collect();
    assert_eq!(blocked, vec![b.id.clone()]);

    // Completing the blocker unblocks the dependent.
    store.update(&a.id, IssueUpdate::status("done")).await.unwrap();
    let ready: Vec<String> = store.ready().await.unwrap().into_iter().map(|i| i.id).collect();
    assert_eq!(ready, vec![b.id]);
}

#[tokio::test]
async fn ready_orders_by_priority_then_id() {
    let store = InMemoryIssueStore::new();
    store.create(NewIssue::task("low", 3)).await.unwrap();
    store.create(NewIssue::task("urgent", 0)).await.unwrap();
    store.create(NewIssue::task("mid", 1)).await.unwrap();

    let titles: Vec<String> = store.ready().await.unwrap().into_iter().map(|i| i.title).collect();
    assert_eq!(titles, vec!["urgent", "mid", "low"]);
}

#[tokio::test]
async fn parent_deps_do_not_block() {
    let store = InMemoryIssueStore::new();
    let epic = store.create(NewIssue::epic("Epic", 1)).await.unwrap();
    let task = store.create(NewIssue::task("Task", 1)).await.unwrap();
    store.add_dependency(&task.id, &epic.id, "parent").await.unwrap();

    let ready: Vec<String> = store.ready().await.unwrap().into_iter().map(|i| i.id).collect();
    assert!(ready.contains(&task.id));
}

#[tokio::test]
async fn append_notes_accumulates() {
    let store = InMemoryIssueStore::new();
    let issue = store.create(NewIssue::task("T", 1)).await.unwrap();
    store.update(&issue.id, IssueUpdate::append("first")).await.unwrap();
    store.update(&issue.id, IssueUpdate::append("second")).await.unwrap();

    let issue = store.show(&issue.id).await.unwrap();
    assert_eq!(issue.notes.as_deref(), Some("first\nsecond"));
}

#[tokio::test]
async fn list_filters_by_label_and_status() {
    let store = InMemoryIssueStore::new();
    store
        .create(NewIssue::task("gate", 0).labels("type:review-gate"))
        .await
        .unwrap();
    let other = store.create(NewIssue::task("work", 1)).await.unwrap();
    store.update(&other.id, IssueUpdate::status("done")).await.unwrap();

    let gates = store
        .list(IssueFilter::default().label("type:review-gate").status("open"))
        .await
        .unwrap();
    assert_eq!(gates.len(), 1);
    assert_eq!(gates[0].title, "gate");
}

#[tokio::test]
async fn update_missing_issue_is_not_found() {
    let store = InMemoryIssueStore::new();
    let err = store.update("gt-404", IssueUpdate::status("done")).await.unwrap_err();
    assert!(matches!(err, BeadsError::NotFound(_)));
}

#[tokio::test]
async fn add_and_remove_label() {
    let store = InMemoryIssueStore::new();
    let issue = store.create(NewIssue::task("T", 1)).await.unwrap();
    store
        .update(&issue.id, IssueUpdate { add_label: Some("unit:core".into()), ..Default::default() })
        .await
        .unwrap();
    assert!(store.show(&issue.id).await.unwrap().has_label("unit:core"));

    store
        .update(
            &issue.id,
            IssueUpdate { remove_label: Some("unit:core".into()), ..Default::default() },
        )
        .await
        .unwrap();
    assert!(!store.show(&issue.id).await.unwrap().has_label("unit:core"));
}

#[tokio::test]
async fn dependency_cycles_detected() {
    let store = InMemoryIssueStore::new();
    let a = store.create(NewIssue::task("A", 1)).await.unwrap();
    let b = store.create(NewIssue::task("B", 1)).await.unwrap();
    let c = store.create(NewIssue::task("C", 1)).await.unwrap();
    store.add_dependency(&a.id, &b.id, "blocks").await.unwrap();
    store.add_dependency(&b.id, &a.id, "blocks").await.unwrap();
    store.add_dependency(&c.id, &a.id, "blocks").await.unwrap();

    let cyclic: Vec<String> =
        store.dependency_cycles().await.unwrap().into_iter().map(|i| i.id).collect();
    assert!(cyclic.contains(&a.id));
    assert!(cyclic.contains(&b.id));
    assert!(!cyclic.contains(&c.id));
}

#[tokio::test]
async fn acyclic_graph_has_no_cycles() {
    let store = InMemoryIssueStore::new();
    let a = store.create(NewIssue::task("A", 1)).await.unwrap();
    let b = store.create(NewIssue::task("B", 1)).await.unwrap();
    store.add_dependency(&b.id, &a.id, "blocks").await.unwrap();
    assert!(store.dependency_cycles().await.unwrap().is_empty());
}

#[tokio::test]
async fn search_matches_title_and_notes() {
    let store = InMemoryIssueStore::new();
    store.create(NewIssue::task("Workspace Detection", 1)).await.unwrap();
    store
        .create(NewIssue::task("Other", 1).notes("artifact: aidlc-docs/x.md"))
        .await
        .unwrap();

    assert_eq!(store.search("workspace").await.unwrap().len(), 1);
    assert_eq!(store.search("aidlc-docs").await.unwrap().len(), 1);
    assert!(store.search("nothing").await.unwrap().is_empty());
}
