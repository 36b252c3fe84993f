// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project state record persisted by the registry.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Paused,
    Completed,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Paused => "paused",
            ProjectStatus::Completed => "completed",
        })
    }
}

/// One project tracked by the runtime. Survives restart via the registry
/// file at `<workspace>/.gorilla-troop/projects.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectState {
    pub project_key: String,
    pub name: String,
    pub workspace_path: String,
    pub status: ProjectStatus,
    /// Supervisor agent currently minding this project, if spawned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minder_agent_id: Option<String>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<String>,
}

impl ProjectState {
    pub fn new(
        project_key: impl Into<String>,
        name: impl Into<String>,
        workspace_path: impl Into<String>,
    ) -> Self {
        Self {
            project_key: project_key.into(),
            name: name.into(),
            workspace_path: workspace_path.into(),
            status: ProjectStatus::Active,
            minder_agent_id: None,
            created_at: chrono::Utc::now().to_rfc3339(),
            paused_at: None,
        }
    }
}

/// Validate a project key: non-empty, alphanumeric plus `-` and `_`.
pub fn valid_project_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
