// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rework specialist (Gibbon).
//!
//! Invoked when a review gate is rejected: reads the artifact, applies
//! the reviewer's feedback through the model, and writes the corrected
//! content back through the file guard. A fixed iteration budget caps the
//! cycle; at the cap the worker escalates to the human supervisor without
//! calling the model.

use crate::base::{load_context, Worker};
use crate::deps::{AgentDeps, HUMAN_SUPERVISOR};
use crate::error::AgentError;
use async_trait::async_trait;
use gt_adapters::guard::{AuditLog, FileGuard};
use gt_adapters::mail::{rework_escalation_thread, Importance, OutboundMessage};
use gt_core::{CompletionEnvelope, DispatchEnvelope, WorkerKind};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

pub const MAX_REWORK_ITERATIONS: u32 = 3;

#[derive(Debug, Default, Deserialize)]
struct ReworkRequest {
    #[serde(default)]
    review_gate_id: String,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    artifact_path: String,
    #[serde(default)]
    retry_count: u32,
}

impl ReworkRequest {
    /// Parse from dispatch instructions. Plain text is treated as the
    /// feedback itself.
    fn parse(dispatch: &DispatchEnvelope) -> ReworkRequest {
        let Some(instructions) = &dispatch.instructions else {
            return ReworkRequest::default();
        };
        match serde_json::from_str(instructions) {
            Ok(request) => request,
            Err(_) => ReworkRequest { feedback: instructions.clone(), ..Default::default() },
        }
    }
}

/// Remove one enclosing markdown code fence pair, if present.
pub(crate) fn strip_code_fences(text: &str) -> String {
    let mut stripped = text.trim();
    if stripped.starts_with("```") {
        stripped = match stripped.find('\n') {
            Some(newline) => &stripped[newline + 1..],
            None => "",
        };
    }
    if let Some(rest) = stripped.strip_suffix("```") {
        stripped = rest.trim_end();
    }
    stripped.to_string()
}

pub struct ReworkWorker {
    deps: AgentDeps,
}

impl ReworkWorker {
    pub fn new(deps: AgentDeps) -> Self {
        Self { deps }
    }

    fn failed(dispatch: &DispatchEnvelope, message: String) -> CompletionEnvelope {
        tracing::error!(issue = %dispatch.issue_id, "{message}");
        CompletionEnvelope::failed(&dispatch.stage_name, &dispatch.issue_id, message)
    }

    async fn escalate(&self, dispatch: &DispatchEnvelope, request: &ReworkRequest) {
        let message = OutboundMessage::new(
            WorkerKind::Gibbon.as_str(),
            HUMAN_SUPERVISOR,
            format!("[ESCALATION] Rework exhausted for {}", dispatch.issue_id),
            format!(
                "**Stage**: {}\n**Issue**: {}\n**Artifact**: {}\n\
                 **Iterations Attempted**: {}\n**Max Allowed**: {}\n\n\
                 **Latest Feedback**:\n{}\n\n\
                 Gibbon was unable to produce an accepted artifact after \
                 {} attempts. Human review is required.",
                dispatch.stage_name,
                dispatch.issue_id,
                request.artifact_path,
                request.retry_count,
                MAX_REWORK_ITERATIONS,
                request.feedback,
                MAX_REWORK_ITERATIONS,
            ),
        )
        .thread(rework_escalation_thread(&dispatch.issue_id))
        .importance(Importance::High);

        if let Err(e) = self.deps.bus.send(&dispatch.project_key, message).await {
            tracing::warn!(error = %e, "failed to send rework escalation");
        }
    }
}

#[async_trait]
impl Worker for ReworkWorker {
    fn kind(&self) -> WorkerKind {
        WorkerKind::Gibbon
    }

    fn deps(&self) -> &AgentDeps {
        &self.deps
    }

    async fn execute(
        &self,
        dispatch: &DispatchEnvelope,
    ) -> Result<CompletionEnvelope, AgentError> {
        let request = ReworkRequest::parse(dispatch);
        let gate_id = if request.review_gate_id.is_empty() {
            dispatch.review_gate_id.clone().unwrap_or_default()
        } else {
            request.review_gate_id.clone()
        };

        if request.artifact_path.is_empty() {
            return Ok(Self::failed(
                dispatch,
                "No artifact_path provided in rework request".to_string(),
            ));
        }
        if request.feedback.is_empty() {
            return Ok(Self::failed(
                dispatch,
                "No feedback provided in rework request".to_string(),
            ));
        }

        tracing::info!(
            iteration = request.retry_count + 1,
            max = MAX_REWORK_ITERATIONS,
            artifact = %request.artifact_path,
            gate = %gate_id,
            "rework requested"
        );

        // Budget check comes before any model call.
        if request.retry_count >= MAX_REWORK_ITERATIONS {
            tracing::warn!(
                issue = %dispatch.issue_id,
                "rework budget exhausted, escalating"
            );
            self.escalate(dispatch, &request).await;
            return Ok(CompletionEnvelope::needs_rework(
                &dispatch.stage_name,
                &dispatch.issue_id,
                format!(
                    "Rework exhausted after {MAX_REWORK_ITERATIONS} iterations. \
                     Escalated to {HUMAN_SUPERVISOR}."
                ),
                format!("Rework budget exhausted ({MAX_REWORK_ITERATIONS} iterations)"),
            ));
        }

        let artifact_full = dispatch.workspace_root.join(&request.artifact_path);
        let original = match tokio::fs::read_to_string(&artifact_full).await {
            Ok(content) => content,
            Err(_) => {
                return Ok(Self::failed(
                    dispatch,
                    format!("Artifact not found: {}", artifact_full.display()),
                ));
            }
        };

        let extra_context = load_context(dispatch).await;
        let mut prompt = format!(
            "You are performing a rework correction on a rejected artifact.\n\n\
             ## Review Gate\n{gate_id}\n\n\
             ## Rejection Feedback\n{}\n\n\
             ## Original Artifact\n```markdown\n{original}\n```\n\n",
            request.feedback,
        );
        if !extra_context.trim().is_empty() {
            prompt.push_str(&format!("## Additional Context\n{extra_context}\n\n"));
        }
        prompt.push_str(&format!(
            "## Rework Iteration\nThis is attempt {} of {MAX_REWORK_ITERATIONS}.\n\n\
             Address every point in the rejection feedback. Preserve the document \
             structure and beads header comments. Output the complete corrected \
             artifact content.",
            request.retry_count + 1,
        ));

        let response = self.deps.model.invoke(&prompt).await?;
        let corrected = strip_code_fences(&response);
        if corrected.trim().is_empty() {
            return Ok(Self::failed(dispatch, "Model returned empty rework content".to_string()));
        }

        let audit = Arc::new(AuditLog::new(
            Some(Arc::clone(&self.deps.bus)),
            dispatch.project_key.clone(),
        ));
        let guard = FileGuard::new(audit, &dispatch.workspace_root);
        match guard
            .write_file(Path::new(&request.artifact_path), &corrected, self.kind().as_str(), true)
            .await
        {
            Ok(written) => {
                tracing::info!(artifact = %written.display(), "corrected artifact written");
            }
            Err(e) => {
                return Ok(Self::failed(
                    dispatch,
                    format!("Failed to write corrected artifact: {e}"),
                ));
            }
        }

        Ok(CompletionEnvelope::completed(
            &dispatch.stage_name,
            &dispatch.issue_id,
            vec![request.artifact_path.clone()],
            format!(
                "Rework iteration {}/{MAX_REWORK_ITERATIONS} complete. \
                 Corrected artifact written to {}.",
                request.retry_count + 1,
                request.artifact_path,
            ),
        ))
    }
}

#[cfg(test)]
#[path = "rework_tests.rs"]
mod tests;
