// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write guards.
//!
//! The capability layer every audited mutation flows through: file writes,
//! git operations, and issue-store mutations. Each guard validates first,
//! executes second, and records an audit entry either way. Denials are
//! results, not panics; callers turn them into failed completions.

mod file;
mod git;
mod issue;

pub use file::FileGuard;
pub use git::{GitGuard, GitStatus, MergeOutcome};
pub use issue::IssueGuard;

use crate::mail::{MessageBus, OutboundMessage, OPS_CHANNEL};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

const AUDIT_RING_CAPACITY: usize = 1000;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("operation denied: {0}")]
    Denied(String),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("file already exists: {0}")]
    AlreadyExists(String),
    #[error("git failure: {0}")]
    Git(String),
    #[error(transparent)]
    Store(#[from] crate::beads::BeadsError),
    #[error(transparent)]
    Subprocess(#[from] crate::subprocess::SubprocessError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Outcome of a path/operation validation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub allowed: bool,
    pub reason: String,
}

impl Validation {
    pub fn allowed(reason: impl Into<String>) -> Self {
        Self { allowed: true, reason: reason.into() }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self { allowed: false, reason: reason.into() }
    }
}

/// One audit trail entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub timestamp: String,
    pub guard: &'static str,
    pub operation: String,
    pub agent: String,
    pub detail: String,
    /// "allowed", "denied", or "error".
    pub result: &'static str,
}

/// Append-only audit trail shared by the guards.
///
/// Entries land in an in-memory ring buffer and, when a bus is attached,
/// are mirrored to the `#ops` thread best-effort.
pub struct AuditLog {
    buffer: Mutex<VecDeque<AuditEntry>>,
    bus: Option<Arc<dyn MessageBus>>,
    project_key: String,
}

impl AuditLog {
    pub fn new(bus: Option<Arc<dyn MessageBus>>, project_key: impl Into<String>) -> Self {
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(AUDIT_RING_CAPACITY)),
            bus,
            project_key: project_key.into(),
        }
    }

    /// Detached log with no bus mirroring.
    pub fn detached() -> Self {
        Self::new(None, "")
    }

    pub async fn record(
        &self,
        guard: &'static str,
        operation: &str,
        agent: &str,
        result: &'static str,
        detail: impl Into<String>,
    ) {
        let entry = AuditEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            guard,
            operation: operation.to_string(),
            agent: agent.to_string(),
            detail: detail.into(),
            result,
        };
        tracing::info!(
            guard,
            operation,
            agent,
            result,
            detail = %entry.detail,
            "guard operation"
        );
        {
            let mut buffer = self.buffer.lock();
            if buffer.len() == AUDIT_RING_CAPACITY {
                buffer.pop_front();
            }
            buffer.push_back(entry.clone());
        }

        if let Some(bus) = &self.bus {
            if !self.project_key.is_empty() {
                let message = OutboundMessage::new(
                    "Bonobo",
                    OPS_CHANNEL,
                    format!("[AUDIT] {}.{} {}", guard, operation, result),
                    format!("agent: {}\n{}", entry.agent, entry.detail),
                );
                if let Err(e) = bus.send(&self.project_key, message).await {
                    tracing::warn!(error = %e, "audit mirror to #ops failed");
                }
            }
        }
    }

    /// Snapshot of the ring buffer, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.buffer.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
