// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Issue-store client.
//!
//! The external store owns the dependency graph; the runtime only reads it
//! and mutates it through [`IssueStore`]. The production implementation
//! ([`BeadsCli`]) shells out to the `bd` CLI; tests use
//! [`InMemoryIssueStore`].
//!
//! Label conventions the runtime produces and parses:
//! `phase:<inception|construction>`, `stage:<slug>`,
//! `type:<review-gate|qa|...>`, `unit:<slug>`, `discovered-from:<id>`,
//! `project:<key>`.

mod cli;
#[cfg(any(test, feature = "test-support"))]
mod memory;

pub use cli::BeadsCli;
#[cfg(any(test, feature = "test-support"))]
pub use memory::InMemoryIssueStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BeadsError {
    /// `bd` is not installed or not on PATH.
    #[error("issue store CLI (bd) not found on PATH")]
    CliMissing,
    #[error("bd {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
    #[error("could not parse bd output: {0}")]
    Parse(String),
    #[error("issue not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Subprocess(#[from] crate::subprocess::SubprocessError),
}

impl BeadsError {
    pub fn is_transient(&self) -> bool {
        match self {
            BeadsError::Subprocess(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// One issue as the store reports it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IssueRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "issue_type")]
    pub issue_type: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl IssueRecord {
    /// First `stage:<slug>` label, if any. The slug is the canonical stage name.
    pub fn stage(&self) -> Option<&str> {
        self.labels.iter().find_map(|l| l.strip_prefix("stage:"))
    }

    /// First `phase:<name>` label value, if any.
    pub fn phase(&self) -> Option<&str> {
        self.labels.iter().find_map(|l| l.strip_prefix("phase:"))
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn is_done(&self) -> bool {
        self.status == "done" || self.status == "closed"
    }
}

/// Fields for a new issue.
#[derive(Debug, Clone, Default)]
pub struct NewIssue {
    pub title: String,
    pub issue_type: String,
    pub priority: i32,
    pub description: Option<String>,
    pub labels: Option<String>,
    pub assignee: Option<String>,
    pub notes: Option<String>,
    pub acceptance: Option<String>,
    pub thread: Option<String>,
}

impl NewIssue {
    pub fn task(title: impl Into<String>, priority: i32) -> Self {
        Self {
            title: title.into(),
            issue_type: "task".into(),
            priority,
            ..Default::default()
        }
    }

    pub fn epic(title: impl Into<String>, priority: i32) -> Self {
        Self {
            title: title.into(),
            issue_type: "epic".into(),
            priority,
            ..Default::default()
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Comma-separated label list, e.g. `phase:inception,stage:user-stories`.
    pub fn labels(mut self, labels: impl Into<String>) -> Self {
        self.labels = Some(labels.into());
        self
    }

    pub fn assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn acceptance(mut self, acceptance: impl Into<String>) -> Self {
        self.acceptance = Some(acceptance.into());
        self
    }
}

/// A partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct IssueUpdate {
    pub status: Option<String>,
    pub notes: Option<String>,
    pub append_notes: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<i32>,
    pub add_label: Option<String>,
    pub remove_label: Option<String>,
}

impl IssueUpdate {
    pub fn status(status: impl Into<String>) -> Self {
        Self { status: Some(status.into()), ..Default::default() }
    }

    pub fn append(notes: impl Into<String>) -> Self {
        Self { append_notes: Some(notes.into()), ..Default::default() }
    }

    pub fn and_append(mut self, notes: impl Into<String>) -> Self {
        self.append_notes = Some(notes.into());
        self
    }
}

/// Filters for listing issues. Empty filter lists everything.
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub status: Option<String>,
    pub label: Option<String>,
    pub label_any: Option<String>,
    pub issue_type: Option<String>,
    pub parent: Option<String>,
    pub priority: Option<i32>,
    pub assignee: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<usize>,
}

impl IssueFilter {
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn issue_type(mut self, t: impl Into<String>) -> Self {
        self.issue_type = Some(t.into());
        self
    }
}

/// The external authoritative dependency-graph database.
///
/// Concurrent invocations are safe but non-transactional; per-project
/// serialisation of claim windows is the supervisor's job.
#[async_trait]
pub trait IssueStore: Send + Sync {
    async fn create(&self, new: NewIssue) -> Result<IssueRecord, BeadsError>;
    async fn show(&self, issue_id: &str) -> Result<IssueRecord, BeadsError>;
    async fn update(&self, issue_id: &str, update: IssueUpdate) -> Result<(), BeadsError>;
    async fn close(&self, issue_id: &str, reason: Option<&str>) -> Result<(), BeadsError>;
    async fn reopen(&self, issue_id: &str, reason: Option<&str>) -> Result<(), BeadsError>;
    async fn list(&self, filter: IssueFilter) -> Result<Vec<IssueRecord>, BeadsError>;
    /// Open, unblocked issues, most urgent first.
    async fn ready(&self) -> Result<Vec<IssueRecord>, BeadsError>;
    async fn blocked(&self) -> Result<Vec<IssueRecord>, BeadsError>;
    async fn search(&self, query: &str) -> Result<Vec<IssueRecord>, BeadsError>;
    /// `blocker` blocks `blocked`; `dep_type` defaults to "blocks".
    async fn add_dependency(
        &self,
        blocked: &str,
        blocker: &str,
        dep_type: &str,
    ) -> Result<(), BeadsError>;
    async fn remove_dependency(&self, blocked: &str, blocker: &str) -> Result<(), BeadsError>;
    /// Issues participating in a blocking-dependency cycle.
    async fn dependency_cycles(&self) -> Result<Vec<IssueRecord>, BeadsError>;
    async fn sync(&self) -> Result<(), BeadsError>;
}
