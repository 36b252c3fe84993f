// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::beads::{InMemoryIssueStore, IssueStore, IssueUpdate, NewIssue};
use crate::guard::{AuditLog, GuardError};
use std::sync::Arc;

fn guard() -> (IssueGuard, Arc<InMemoryIssueStore>) {
    let store = Arc::new(InMemoryIssueStore::new());
    let guard = IssueGuard::new(
        Arc::new(AuditLog::detached()),
        Arc::clone(&store) as Arc<dyn IssueStore>,
    );
    (guard, store)
}

#[tokio::test]
async fn create_and_update_pass_through() {
    let (g, store) = guard();
    let issue = g.guarded_create(NewIssue::task("Work", 1), "Planner").await.unwrap();
    g.guarded_update(&issue.id, IssueUpdate::status("in_progress"), "Planner").await.unwrap();
    assert_eq!(store.show(&issue.id).await.unwrap().status, "in_progress");
}

#[tokio::test]
async fn empty_title_is_denied() {
    let (g, _) = guard();
    let err = g.guarded_create(NewIssue::task("  ", 1), "Planner").await.unwrap_err();
    assert!(matches!(err, GuardError::Denied(_)));
}

#[tokio::test]
async fn out_of_range_priority_is_denied() {
    let (g, _) = guard();
    let err = g.guarded_create(NewIssue::task("T", 9), "Planner").await.unwrap_err();
    assert!(matches!(err, GuardError::Denied(_)));
}

#[tokio::test]
async fn self_dependency_is_denied() {
    let (g, store) = guard();
    let issue = store.create(NewIssue::task("T", 1)).await.unwrap();
    let err =
        g.guarded_add_dependency(&issue.id, &issue.id, "blocks", "Planner").await.unwrap_err();
    assert!(matches!(err, GuardError::Denied(_)));
}

#[tokio::test]
async fn dependency_passes_validation_and_lands_in_store() {
    let (g, store) = guard();
    let a = store.create(NewIssue::task("A", 1)).await.unwrap();
    let b = store.create(NewIssue::task("B", 1)).await.unwrap();
    g.guarded_add_dependency(&b.id, &a.id, "blocks", "Planner").await.unwrap();
    assert_eq!(store.dependencies().len(), 1);
}

#[tokio::test]
async fn guarded_close_annotates() {
    let (g, store) = guard();
    let issue = store.create(NewIssue::task("T", 1)).await.unwrap();
    g.guarded_close(&issue.id, Some("obsolete"), "ProjectMinder").await.unwrap();
    let issue = store.show(&issue.id).await.unwrap();
    assert_eq!(issue.status, "closed");
    assert!(issue.notes.unwrap().contains("obsolete"));
}
