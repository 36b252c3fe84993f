// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human-facing notification model.
//!
//! Notifications are totally ordered: priority ascending (lower is more
//! urgent), then creation time ascending, then id as a tiebreak.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// What triggered the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ReviewGate,
    Escalation,
    StatusUpdate,
    Qa,
    Info,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotificationKind::ReviewGate => "review_gate",
            NotificationKind::Escalation => "escalation",
            NotificationKind::StatusUpdate => "status_update",
            NotificationKind::Qa => "qa",
            NotificationKind::Info => "info",
        })
    }
}

/// A notification for a human operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// `notif-{8 hex}`, stable for the process lifetime.
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub project_key: String,
    /// 0 = critical, larger = less urgent.
    pub priority: i32,
    pub created_at_ms: u64,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_issue: Option<String>,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
        project_key: impl Into<String>,
        priority: i32,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id: crate::id::notification_id(),
            kind,
            title: title.into(),
            body: body.into(),
            project_key: project_key.into(),
            priority,
            created_at_ms,
            read: false,
            source_issue: None,
        }
    }

    pub fn with_source_issue(mut self, issue_id: impl Into<String>) -> Self {
        self.source_issue = Some(issue_id.into());
        self
    }

    /// The queue ordering key: priority, then creation time, then id.
    pub fn order_key(&self) -> (i32, u64, String) {
        (self.priority, self.created_at_ms, self.id.clone())
    }
}

impl Ord for Notification {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then(self.created_at_ms.cmp(&other.created_at_ms))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Notification {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;
