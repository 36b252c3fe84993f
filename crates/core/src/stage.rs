// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage names and the stage-to-worker map.
//!
//! The map is total: every supported stage resolves to its specialist, and
//! anything outside the supported set falls back to [`WorkerKind::Troop`]
//! so an unknown stage never aborts a dispatch.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every stage the pipeline knows how to dispatch.
pub const SUPPORTED_STAGES: [&str; 13] = [
    "workspace-detection",
    "reverse-engineering",
    "requirements-analysis",
    "user-stories",
    "workflow-planning",
    "application-design",
    "units-generation",
    "functional-design",
    "nfr-requirements",
    "nfr-design",
    "infrastructure-design",
    "code-generation",
    "build-and-test",
];

/// Worker roles in the troop.
///
/// The eight stage specialists plus the supervisor, the cross-cutting
/// workers, and the generic fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkerKind {
    /// Workspace discovery and reverse engineering
    Scout,
    /// Requirements analysis and functional design
    Sage,
    /// User stories
    Bard,
    /// Workflow planning and unit decomposition
    Planner,
    /// Application and infrastructure design
    Architect,
    /// Non-functional requirements and design
    Steward,
    /// Code generation
    Forge,
    /// Build and test
    Crucible,
    /// Per-project workflow graph driver
    ProjectMinder,
    /// Error investigator
    CuriousGeorge,
    /// Rework specialist
    Gibbon,
    /// Security scanner
    Snake,
    /// Deterministic state monitor
    Groomer,
    /// Write-guard gateway
    Bonobo,
    /// General-purpose fallback worker
    Troop,
}

impl WorkerKind {
    /// Resolve the worker for a stage name. Total with a Troop fallback.
    pub fn for_stage(stage: &str) -> WorkerKind {
        match stage {
            "workspace-detection" | "reverse-engineering" => WorkerKind::Scout,
            "requirements-analysis" | "functional-design" => WorkerKind::Sage,
            "user-stories" => WorkerKind::Bard,
            "workflow-planning" | "units-generation" => WorkerKind::Planner,
            "application-design" | "infrastructure-design" => WorkerKind::Architect,
            "nfr-requirements" | "nfr-design" => WorkerKind::Steward,
            "code-generation" => WorkerKind::Forge,
            "build-and-test" => WorkerKind::Crucible,
            _ => WorkerKind::Troop,
        }
    }

    /// The stages this worker is the specialist for (empty for
    /// cross-cutting workers).
    pub fn handled_stages(&self) -> &'static [&'static str] {
        match self {
            WorkerKind::Scout => &["workspace-detection", "reverse-engineering"],
            WorkerKind::Sage => &["requirements-analysis", "functional-design"],
            WorkerKind::Bard => &["user-stories"],
            WorkerKind::Planner => &["workflow-planning", "units-generation"],
            WorkerKind::Architect => &["application-design", "infrastructure-design"],
            WorkerKind::Steward => &["nfr-requirements", "nfr-design"],
            WorkerKind::Forge => &["code-generation"],
            WorkerKind::Crucible => &["build-and-test"],
            _ => &[],
        }
    }

    /// The eight stage specialists.
    pub fn stage_workers() -> [WorkerKind; 8] {
        [
            WorkerKind::Scout,
            WorkerKind::Sage,
            WorkerKind::Bard,
            WorkerKind::Planner,
            WorkerKind::Architect,
            WorkerKind::Steward,
            WorkerKind::Forge,
            WorkerKind::Crucible,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerKind::Scout => "Scout",
            WorkerKind::Sage => "Sage",
            WorkerKind::Bard => "Bard",
            WorkerKind::Planner => "Planner",
            WorkerKind::Architect => "Architect",
            WorkerKind::Steward => "Steward",
            WorkerKind::Forge => "Forge",
            WorkerKind::Crucible => "Crucible",
            WorkerKind::ProjectMinder => "ProjectMinder",
            WorkerKind::CuriousGeorge => "CuriousGeorge",
            WorkerKind::Gibbon => "Gibbon",
            WorkerKind::Snake => "Snake",
            WorkerKind::Groomer => "Groomer",
            WorkerKind::Bonobo => "Bonobo",
            WorkerKind::Troop => "Troop",
        }
    }

    /// Parse a worker name as produced by [`WorkerKind::as_str`].
    pub fn parse(name: &str) -> Option<WorkerKind> {
        let all = [
            WorkerKind::Scout,
            WorkerKind::Sage,
            WorkerKind::Bard,
            WorkerKind::Planner,
            WorkerKind::Architect,
            WorkerKind::Steward,
            WorkerKind::Forge,
            WorkerKind::Crucible,
            WorkerKind::ProjectMinder,
            WorkerKind::CuriousGeorge,
            WorkerKind::Gibbon,
            WorkerKind::Snake,
            WorkerKind::Groomer,
            WorkerKind::Bonobo,
            WorkerKind::Troop,
        ];
        all.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "stage_tests.rs"]
mod tests;
