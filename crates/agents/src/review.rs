// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Review gate machine.
//!
//! A review gate is an issue labelled `type:review-gate`. Approve moves
//! it to done and nudges the supervisor to advance; reject appends the
//! feedback and spawns the rework worker with a caller-supplied retry
//! count. The machine increments the retry count each reject cycle by
//! counting prior rejections on the gate; the rework worker never
//! manufactures counts.

use crate::deps::{AgentDeps, HUMAN_SUPERVISOR};
use gt_adapters::beads::{BeadsError, IssueUpdate};
use gt_adapters::mail::{review_thread, OutboundMessage};
use gt_core::{DispatchEnvelope, NotificationKind, WorkerKind};
use gt_engine::{AgentEngine, NotificationQueue};
use regex::Regex;
use serde_json::json;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

static ARTIFACT_NOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"artifact:\s*([^\n]+)").expect("constant regex pattern is valid")
});

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("rejection requires feedback")]
    FeedbackRequired,
    #[error(transparent)]
    Store(#[from] BeadsError),
    #[error("could not write edited artifact: {0}")]
    Write(#[from] std::io::Error),
}

/// Human approval checkpoints over the issue store.
pub struct ReviewMachine {
    deps: AgentDeps,
    project_key: String,
    workspace_root: PathBuf,
    engine: Option<AgentEngine>,
    notifications: Option<Arc<NotificationQueue>>,
}

impl ReviewMachine {
    pub fn new(
        deps: AgentDeps,
        project_key: impl Into<String>,
        workspace_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            deps,
            project_key: project_key.into(),
            workspace_root: workspace_root.into(),
            engine: None,
            notifications: None,
        }
    }

    pub fn with_engine(mut self, engine: AgentEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_notifications(mut self, notifications: Arc<NotificationQueue>) -> Self {
        self.notifications = Some(notifications);
        self
    }

    /// Approve a gate: mark done, apply any operator edit to the
    /// referenced artifact, and tell the supervisor to advance.
    pub async fn approve(
        &self,
        gate_id: &str,
        feedback: Option<&str>,
        edited_content: Option<&str>,
    ) -> Result<String, ReviewError> {
        let notes = match feedback {
            Some(feedback) if !feedback.is_empty() => format!("APPROVED. Feedback: {feedback}"),
            _ => "APPROVED.".to_string(),
        };
        self.deps.store.update(gate_id, IssueUpdate::status("done").and_append(notes)).await?;

        if let Some(content) = edited_content {
            match self.artifact_path(gate_id).await {
                Some(relpath) => {
                    let full = self.workspace_root.join(&relpath);
                    if let Some(parent) = full.parent() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                    tokio::fs::write(&full, content).await?;
                    tracing::info!(gate = gate_id, artifact = %relpath, "operator edit applied");
                }
                None => {
                    tracing::warn!(gate = gate_id, "edited content supplied but no artifact path")
                }
            }
        }

        let message = OutboundMessage::new(
            HUMAN_SUPERVISOR,
            WorkerKind::ProjectMinder.as_str(),
            format!("Review approved: {gate_id}"),
            format!(
                "Review gate {gate_id} has been approved.\nFeedback: {}",
                feedback.unwrap_or("None")
            ),
        )
        .thread(review_thread(gate_id));
        if let Err(e) = self.deps.bus.send(&self.project_key, message).await {
            tracing::warn!(error = %e, "failed to send approval notification");
        }

        tracing::info!(gate = gate_id, "review approved");
        Ok(format!("Review gate {gate_id} approved. Next stage will be dispatched."))
    }

    /// Reject a gate with mandatory feedback and spawn the rework worker.
    pub async fn reject(&self, gate_id: &str, feedback: &str) -> Result<String, ReviewError> {
        if feedback.trim().is_empty() {
            return Err(ReviewError::FeedbackRequired);
        }

        // The retry count is the number of earlier rejections on this
        // gate; this call's rejection is the (count+1)-th cycle at 0-based
        // index count.
        let gate = self.deps.store.show(gate_id).await?;
        let retry_count =
            gate.notes.as_deref().map_or(0, |n| n.matches("REJECTED:").count()) as u32;

        self.deps
            .store
            .update(gate_id, IssueUpdate::append(format!("REJECTED: {feedback}")))
            .await?;

        let artifact_path = self.artifact_path(gate_id).await;
        if artifact_path.is_none() {
            tracing::warn!(gate = gate_id, "no artifact path on rejected gate");
        }

        if let Some(notifications) = &self.notifications {
            notifications.create(
                NotificationKind::ReviewGate,
                format!("Rework dispatched for {gate_id}"),
                feedback.to_string(),
                self.project_key.clone(),
                1,
                Some(gate_id.to_string()),
            );
        }

        self.spawn_rework(gate_id, feedback, artifact_path.as_deref(), retry_count).await;

        tracing::info!(gate = gate_id, retry_count, "review rejected, rework dispatched");
        Ok(format!("Review gate {gate_id} rejected. Rework worker dispatched."))
    }

    /// Artifact path referenced in the gate's notes.
    async fn artifact_path(&self, gate_id: &str) -> Option<String> {
        let gate = self.deps.store.show(gate_id).await.ok()?;
        let notes = gate.notes?;
        ARTIFACT_NOTE
            .captures(&notes)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
    }

    async fn spawn_rework(
        &self,
        gate_id: &str,
        feedback: &str,
        artifact_path: Option<&str>,
        retry_count: u32,
    ) {
        let Some(engine) = &self.engine else {
            tracing::warn!(gate = gate_id, "no engine reference, rework not spawned");
            return;
        };

        let instructions = json!({
            "review_gate_id": gate_id,
            "feedback": feedback,
            "artifact_path": artifact_path.unwrap_or_default(),
            "retry_count": retry_count,
        });
        let dispatch = DispatchEnvelope::builder(
            "rework",
            gate_id,
            self.project_key.clone(),
            self.workspace_root.clone(),
        )
        .assigned_worker(WorkerKind::Gibbon)
        .review_gate_id(gate_id)
        .instructions(instructions.to_string())
        .build();

        let context = match serde_json::to_value(&dispatch) {
            Ok(value) => json!({ "dispatch": value }),
            Err(e) => {
                tracing::error!(error = %e, "rework dispatch serialisation failed");
                return;
            }
        };
        match engine.spawn(
            WorkerKind::Gibbon,
            context,
            &self.project_key,
            Some(gate_id.to_string()),
        ) {
            Ok(instance) => tracing::info!(agent_id = %instance.agent_id, "rework worker spawned"),
            Err(e) => tracing::warn!(error = %e, "could not spawn rework worker"),
        }
    }
}

#[cfg(test)]
#[path = "review_tests.rs"]
mod tests;
