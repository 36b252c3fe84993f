// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gt_core::{Notification, NotificationKind};

fn notif(project: &str, priority: i32, created_at_ms: u64, title: &str) -> Notification {
    Notification::new(NotificationKind::Info, title, "body", project, priority, created_at_ms)
}

#[test]
fn unread_comes_back_in_strict_priority_order() {
    let queue = NotificationQueue::new();
    queue.add(notif("p", 2, 100, "later"));
    queue.add(notif("p", 0, 300, "critical"));
    queue.add(notif("p", 0, 200, "critical-earlier"));
    queue.add(notif("p", 1, 50, "middle"));

    let titles: Vec<String> =
        queue.get_unread(None, 10).into_iter().map(|n| n.title).collect();
    assert_eq!(titles, vec!["critical-earlier", "critical", "middle", "later"]);
}

#[test]
fn limit_returns_most_urgent_k() {
    let queue = NotificationQueue::new();
    for i in 0..5 {
        queue.add(notif("p", i, 100, &format!("n{i}")));
    }
    let top: Vec<String> = queue.get_unread(None, 2).into_iter().map(|n| n.title).collect();
    assert_eq!(top, vec!["n0", "n1"]);
}

#[test]
fn project_filter() {
    let queue = NotificationQueue::new();
    queue.add(notif("alpha", 1, 1, "a"));
    queue.add(notif("beta", 1, 2, "b"));

    assert_eq!(queue.get_unread(Some("alpha"), 10).len(), 1);
    assert_eq!(queue.count_unread(Some("beta")), 1);
    assert_eq!(queue.count_unread(None), 2);
}

#[test]
fn mark_read_is_idempotent() {
    let queue = NotificationQueue::new();
    let n = queue.create(NotificationKind::ReviewGate, "review", "b", "p", 1, Some("gt-6".into()));
    assert_eq!(queue.count_unread(None), 1);

    queue.mark_read(&n.id);
    assert_eq!(queue.count_unread(None), 0);
    queue.mark_read(&n.id);
    assert_eq!(queue.count_unread(None), 0);

    // Unknown ids are ignored.
    queue.mark_read("notif-ffffffff");
}

#[test]
fn mark_all_read_counts_and_filters() {
    let queue = NotificationQueue::new();
    queue.add(notif("alpha", 1, 1, "a1"));
    queue.add(notif("alpha", 2, 2, "a2"));
    queue.add(notif("beta", 1, 3, "b1"));

    assert_eq!(queue.mark_all_read(Some("alpha")), 2);
    assert_eq!(queue.count_unread(None), 1);
    assert_eq!(queue.mark_all_read(None), 1);
    assert_eq!(queue.mark_all_read(None), 0);
}

#[test]
fn clear_project_drops_only_that_project() {
    let queue = NotificationQueue::new();
    queue.add(notif("alpha", 1, 1, "a"));
    queue.add(notif("beta", 1, 2, "b"));

    queue.clear_project("alpha");
    assert_eq!(queue.count_unread(None), 1);
    assert_eq!(queue.get_unread(None, 10)[0].project_key, "beta");
}

#[test]
fn create_stamps_id_and_source_issue() {
    let queue = NotificationQueue::new();
    let n = queue.create(
        NotificationKind::Escalation,
        "rework exhausted",
        "body",
        "p",
        0,
        Some("gt-42".into()),
    );
    assert!(n.id.starts_with("notif-"));
    assert_eq!(n.source_issue.as_deref(), Some("gt-42"));
    assert_eq!(queue.get_unread(Some("p"), 1)[0].id, n.id);
}
