// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Issue-store write guard.
//!
//! Validates store mutations before delegating to the [`IssueStore`]:
//! non-empty titles/ids, sane priorities, no self-dependencies.

use super::{AuditLog, GuardError, Validation};
use crate::beads::{IssueRecord, IssueStore, IssueUpdate, NewIssue};
use std::sync::Arc;

pub struct IssueGuard {
    audit: Arc<AuditLog>,
    store: Arc<dyn IssueStore>,
}

impl IssueGuard {
    pub fn new(audit: Arc<AuditLog>, store: Arc<dyn IssueStore>) -> Self {
        Self { audit, store }
    }

    pub fn validate_new_issue(&self, new: &NewIssue) -> Validation {
        if new.title.trim().is_empty() {
            return Validation::denied("issue title must not be empty");
        }
        if !(0..=4).contains(&new.priority) {
            return Validation::denied(format!("priority {} out of range 0..=4", new.priority));
        }
        Validation::allowed("issue fields acceptable")
    }

    pub fn validate_dependency(&self, blocked: &str, blocker: &str) -> Validation {
        if blocked.is_empty() || blocker.is_empty() {
            return Validation::denied("dependency ids must not be empty");
        }
        if blocked == blocker {
            return Validation::denied(format!("{blocked} cannot depend on itself"));
        }
        Validation::allowed("dependency acceptable")
    }

    pub async fn guarded_create(
        &self,
        new: NewIssue,
        agent: &str,
    ) -> Result<IssueRecord, GuardError> {
        let validation = self.validate_new_issue(&new);
        if !validation.allowed {
            self.audit.record("issue", "create_issue", agent, "denied", &validation.reason).await;
            return Err(GuardError::Denied(validation.reason));
        }
        let issue = self.store.create(new).await?;
        self.audit.record("issue", "create_issue", agent, "allowed", issue.id.clone()).await;
        Ok(issue)
    }

    pub async fn guarded_update(
        &self,
        issue_id: &str,
        update: IssueUpdate,
        agent: &str,
    ) -> Result<(), GuardError> {
        if issue_id.is_empty() {
            let reason = "issue id must not be empty".to_string();
            self.audit.record("issue", "update_issue", agent, "denied", &reason).await;
            return Err(GuardError::Denied(reason));
        }
        self.store.update(issue_id, update).await?;
        self.audit.record("issue", "update_issue", agent, "allowed", issue_id).await;
        Ok(())
    }

    pub async fn guarded_close(
        &self,
        issue_id: &str,
        reason: Option<&str>,
        agent: &str,
    ) -> Result<(), GuardError> {
        self.store.close(issue_id, reason).await?;
        self.audit.record("issue", "close_issue", agent, "allowed", issue_id).await;
        Ok(())
    }

    pub async fn guarded_add_dependency(
        &self,
        blocked: &str,
        blocker: &str,
        dep_type: &str,
        agent: &str,
    ) -> Result<(), GuardError> {
        let validation = self.validate_dependency(blocked, blocker);
        if !validation.allowed {
            self.audit
                .record("issue", "add_dependency", agent, "denied", &validation.reason)
                .await;
            return Err(GuardError::Denied(validation.reason));
        }
        self.store.add_dependency(blocked, blocker, dep_type).await?;
        self.audit
            .record(
                "issue",
                "add_dependency",
                agent,
                "allowed",
                format!("{blocker} blocks {blocked}"),
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
#[path = "issue_tests.rs"]
mod tests;
