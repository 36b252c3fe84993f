// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch and completion envelopes.
//!
//! The two immutable values exchanged between the supervisor and a worker.
//! Both are plain structural data (no references, no cycles) so they can
//! cross process boundaries as JSON.

use crate::stage::WorkerKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Pipeline phase a stage belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Inception,
    Construction,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Inception => "inception",
            Phase::Construction => "construction",
        }
    }

    /// Parse a phase label value (`inception` / `construction`).
    /// Anything unrecognised defaults to inception.
    pub fn parse(s: &str) -> Phase {
        match s {
            "construction" => Phase::Construction,
            _ => Phase::Inception,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable job description sent from the supervisor to a worker.
///
/// Created by the supervisor (or the review machine for rework jobs),
/// consumed once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchEnvelope {
    pub stage_name: String,
    pub stage_type: String,
    pub issue_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_gate_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_name: Option<String>,
    pub phase: Phase,
    /// Ordered relative paths loaded as context before the worker runs.
    #[serde(default)]
    pub input_artifacts: Vec<String>,
    #[serde(default)]
    pub reference_docs: Vec<String>,
    pub project_key: String,
    pub workspace_root: PathBuf,
    /// Worker resolved from the stage map (with a Troop fallback).
    pub assigned_worker: WorkerKind,
    /// Free-form payload; cross-cutting workers carry structured JSON here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl DispatchEnvelope {
    /// Start building a dispatch for a stage.
    pub fn builder(
        stage_name: impl Into<String>,
        issue_id: impl Into<String>,
        project_key: impl Into<String>,
        workspace_root: impl Into<PathBuf>,
    ) -> DispatchBuilder {
        let stage_name = stage_name.into();
        DispatchBuilder {
            stage_type: stage_name.clone(),
            stage_name,
            issue_id: issue_id.into(),
            review_gate_id: None,
            unit_name: None,
            phase: Phase::Inception,
            input_artifacts: Vec::new(),
            reference_docs: Vec::new(),
            project_key: project_key.into(),
            workspace_root: workspace_root.into(),
            assigned_worker: None,
            instructions: None,
        }
    }
}

/// Builder for [`DispatchEnvelope`] with stage-map defaults.
pub struct DispatchBuilder {
    stage_name: String,
    stage_type: String,
    issue_id: String,
    review_gate_id: Option<String>,
    unit_name: Option<String>,
    phase: Phase,
    input_artifacts: Vec<String>,
    reference_docs: Vec<String>,
    project_key: String,
    workspace_root: PathBuf,
    assigned_worker: Option<WorkerKind>,
    instructions: Option<String>,
}

impl DispatchBuilder {
    /// Override the stage type (defaults to the stage name).
    pub fn stage_type(mut self, stage_type: impl Into<String>) -> Self {
        self.stage_type = stage_type.into();
        self
    }

    pub fn review_gate_id(mut self, id: impl Into<String>) -> Self {
        self.review_gate_id = Some(id.into());
        self
    }

    pub fn unit_name(mut self, name: impl Into<String>) -> Self {
        self.unit_name = Some(name.into());
        self
    }

    pub fn phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    pub fn input_artifacts(mut self, paths: Vec<String>) -> Self {
        self.input_artifacts = paths;
        self
    }

    pub fn reference_docs(mut self, paths: Vec<String>) -> Self {
        self.reference_docs = paths;
        self
    }

    /// Override the worker assignment (defaults to the stage map).
    pub fn assigned_worker(mut self, worker: WorkerKind) -> Self {
        self.assigned_worker = Some(worker);
        self
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn build(self) -> DispatchEnvelope {
        let assigned_worker = self
            .assigned_worker
            .unwrap_or_else(|| WorkerKind::for_stage(&self.stage_type));
        DispatchEnvelope {
            stage_name: self.stage_name,
            stage_type: self.stage_type,
            issue_id: self.issue_id,
            review_gate_id: self.review_gate_id,
            unit_name: self.unit_name,
            phase: self.phase,
            input_artifacts: self.input_artifacts,
            reference_docs: self.reference_docs,
            project_key: self.project_key,
            workspace_root: self.workspace_root,
            assigned_worker,
            instructions: self.instructions,
        }
    }
}

/// Outcome status carried by a completion envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Completed,
    Failed,
    NeedsRework,
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompletionStatus::Completed => "completed",
            CompletionStatus::Failed => "failed",
            CompletionStatus::NeedsRework => "needs_rework",
        })
    }
}

/// Immutable outcome sent from a worker back to the supervisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEnvelope {
    pub stage_name: String,
    pub issue_id: String,
    pub status: CompletionStatus,
    #[serde(default)]
    pub output_artifacts: Vec<String>,
    pub summary: String,
    /// Work discovered while executing the stage; each entry is a semantic map.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discovered_issues: Vec<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rework_reason: Option<String>,
}

impl CompletionEnvelope {
    pub fn completed(
        stage_name: impl Into<String>,
        issue_id: impl Into<String>,
        output_artifacts: Vec<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            stage_name: stage_name.into(),
            issue_id: issue_id.into(),
            status: CompletionStatus::Completed,
            output_artifacts,
            summary: summary.into(),
            discovered_issues: Vec::new(),
            error_detail: None,
            rework_reason: None,
        }
    }

    pub fn failed(
        stage_name: impl Into<String>,
        issue_id: impl Into<String>,
        error_detail: impl Into<String>,
    ) -> Self {
        let error_detail = error_detail.into();
        Self {
            stage_name: stage_name.into(),
            issue_id: issue_id.into(),
            status: CompletionStatus::Failed,
            output_artifacts: Vec::new(),
            summary: error_detail.clone(),
            discovered_issues: Vec::new(),
            error_detail: Some(error_detail),
            rework_reason: None,
        }
    }

    pub fn needs_rework(
        stage_name: impl Into<String>,
        issue_id: impl Into<String>,
        summary: impl Into<String>,
        rework_reason: impl Into<String>,
    ) -> Self {
        Self {
            stage_name: stage_name.into(),
            issue_id: issue_id.into(),
            status: CompletionStatus::NeedsRework,
            output_artifacts: Vec::new(),
            summary: summary.into(),
            discovered_issues: Vec::new(),
            error_detail: None,
            rework_reason: Some(rework_reason.into()),
        }
    }

    pub fn with_discovered(
        mut self,
        discovered: Vec<serde_json::Map<String, serde_json::Value>>,
    ) -> Self {
        self.discovered_issues = discovered;
        self
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
