// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker base contract.
//!
//! Every worker is a [`Worker`]: one `handle_dispatch` entry point that
//! runs the subclass `execute` through the retry helper, converts final
//! failure into a failed completion, and reports the error to the
//! investigator over the bus. Errors never escape a worker.

use crate::deps::{AgentDeps, INVESTIGATOR_IDENTITY};
use crate::error::AgentError;
use crate::retry::{with_retry, RetryPolicy};
use async_trait::async_trait;
use gt_adapters::mail::{error_thread, Importance, OutboundMessage};
use gt_core::{CompletionEnvelope, DispatchEnvelope, WorkerKind};

#[async_trait]
pub trait Worker: Send + Sync {
    fn kind(&self) -> WorkerKind;

    fn deps(&self) -> &AgentDeps;

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }

    /// Stage-specific work. Implementations return their completion or an
    /// error for the base contract to classify.
    async fn execute(&self, dispatch: &DispatchEnvelope)
        -> Result<CompletionEnvelope, AgentError>;

    /// Entry point: execute with retry; on final failure report to the
    /// investigator and return a failed completion.
    async fn handle_dispatch(&self, dispatch: &DispatchEnvelope) -> CompletionEnvelope {
        tracing::info!(
            worker = %self.kind(),
            stage = %dispatch.stage_name,
            issue = %dispatch.issue_id,
            "handling dispatch"
        );

        match with_retry(self.retry_policy(), || self.execute(dispatch)).await {
            Ok(completion) => completion,
            Err(e) => {
                tracing::error!(
                    worker = %self.kind(),
                    stage = %dispatch.stage_name,
                    error = %e,
                    "dispatch failed"
                );
                report_error(self.deps(), self.kind(), dispatch, &e).await;
                CompletionEnvelope::failed(&dispatch.stage_name, &dispatch.issue_id, e.to_string())
            }
        }
    }
}

/// Send a structured error report to the investigator. Best effort; a
/// bus failure here is logged and swallowed.
pub async fn report_error(
    deps: &AgentDeps,
    kind: WorkerKind,
    dispatch: &DispatchEnvelope,
    error: &AgentError,
) {
    let message = OutboundMessage::new(
        kind.as_str(),
        INVESTIGATOR_IDENTITY,
        format!("[ERROR] {}: {}", kind, error.kind_name()),
        format!(
            "**Agent**: {}\n**Stage**: {}\n**Issue**: {}\n**Error**: {}\n",
            kind, dispatch.stage_name, dispatch.issue_id, error
        ),
    )
    .thread(error_thread(&dispatch.issue_id))
    .importance(Importance::High);

    if let Err(mail_err) = deps.bus.send(&dispatch.project_key, message).await {
        tracing::warn!(error = %mail_err, "failed to send error report to investigator");
    }
}

/// Read the union of input artifacts and reference docs under the
/// dispatch's workspace root, concatenated with path headers. Missing
/// files are reported inline, never raised.
pub async fn load_context(dispatch: &DispatchEnvelope) -> String {
    let mut parts = Vec::new();
    for relpath in dispatch.input_artifacts.iter().chain(dispatch.reference_docs.iter()) {
        let path = dispatch.workspace_root.join(relpath);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => parts.push(format!("--- {relpath} ---\n{content}\n")),
            Err(_) => parts.push(format!("--- {relpath} --- (not found)\n")),
        }
    }
    parts.join("\n")
}

#[cfg(test)]
#[path = "base_tests.rs"]
mod tests;
