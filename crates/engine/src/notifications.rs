// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification priority queue.
//!
//! A durable-in-memory ordered multiset of human-facing notifications.
//! Ordering is total: priority ascending, creation time ascending, id as
//! the tiebreak. Add is O(log n); fetching the k most urgent unread
//! entries walks the ordered set.

use gt_core::{Clock, Notification, NotificationKind, SystemClock};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};

#[derive(Default)]
struct QueueInner {
    /// Ordered (priority, created_at, id) keys.
    ordered: BTreeSet<(i32, u64, String)>,
    by_id: HashMap<String, Notification>,
}

/// Priority-ordered notification queue, serialised by an internal mutex.
#[derive(Default)]
pub struct NotificationQueue {
    inner: Mutex<QueueInner>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fully built notification.
    pub fn add(&self, notification: Notification) {
        let mut inner = self.inner.lock();
        inner.ordered.insert(notification.order_key());
        inner.by_id.insert(notification.id.clone(), notification);
    }

    /// Build and add a notification stamped with the current time.
    pub fn create(
        &self,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
        project_key: impl Into<String>,
        priority: i32,
        source_issue: Option<String>,
    ) -> Notification {
        let mut notification = Notification::new(
            kind,
            title,
            body,
            project_key,
            priority,
            SystemClock.epoch_ms(),
        );
        notification.source_issue = source_issue;
        self.add(notification.clone());
        notification
    }

    /// Unread notifications, most urgent first, optionally filtered by
    /// project, at most `limit` entries.
    pub fn get_unread(&self, project_key: Option<&str>, limit: usize) -> Vec<Notification> {
        let inner = self.inner.lock();
        inner
            .ordered
            .iter()
            .filter_map(|(_, _, id)| inner.by_id.get(id))
            .filter(|n| !n.read)
            .filter(|n| project_key.map_or(true, |p| n.project_key == p))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn count_unread(&self, project_key: Option<&str>) -> usize {
        let inner = self.inner.lock();
        inner
            .by_id
            .values()
            .filter(|n| !n.read)
            .filter(|n| project_key.map_or(true, |p| n.project_key == p))
            .count()
    }

    /// Mark one notification read. Idempotent; unknown ids are ignored.
    pub fn mark_read(&self, notification_id: &str) {
        let mut inner = self.inner.lock();
        if let Some(n) = inner.by_id.get_mut(notification_id) {
            n.read = true;
        }
    }

    /// Mark everything (optionally one project's) read. Returns the count
    /// newly marked.
    pub fn mark_all_read(&self, project_key: Option<&str>) -> usize {
        let mut inner = self.inner.lock();
        let mut marked = 0;
        for n in inner.by_id.values_mut() {
            if !n.read && project_key.map_or(true, |p| n.project_key == p) {
                n.read = true;
                marked += 1;
            }
        }
        marked
    }

    /// Drop every notification belonging to a project.
    pub fn clear_project(&self, project_key: &str) {
        let mut inner = self.inner.lock();
        let doomed: Vec<(i32, u64, String)> = inner
            .by_id
            .values()
            .filter(|n| n.project_key == project_key)
            .map(Notification::order_key)
            .collect();
        for key in doomed {
            inner.ordered.remove(&key);
            inner.by_id.remove(&key.2);
        }
    }
}

#[cfg(test)]
#[path = "notifications_tests.rs"]
mod tests;
