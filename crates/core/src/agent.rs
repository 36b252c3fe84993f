// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent instance model.
//!
//! An instance is a live handle to one worker invocation. Its lifetime
//! begins at spawn and ends when the invocation returns or is cancelled;
//! every spawned instance reaches exactly one terminal status.

use crate::stage::WorkerKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an agent instance.
///
/// Transitions: Starting → Running → {Stopped, Error}, with Stopping as
/// the transient cancel-requested state. Stopped and Error are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Starting,
    Running,
    Stopping,
    Stopped,
    Error,
}

impl AgentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentStatus::Stopped | AgentStatus::Error)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AgentStatus::Starting => "starting",
            AgentStatus::Running => "running",
            AgentStatus::Stopping => "stopping",
            AgentStatus::Stopped => "stopped",
            AgentStatus::Error => "error",
        })
    }
}

/// A live handle to one worker invocation, owned by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInstance {
    /// `{worker}-{8 hex}`, unique per process lifetime.
    pub agent_id: String,
    pub worker: WorkerKind,
    pub status: AgentStatus,
    pub created_at_ms: u64,
    pub project_key: String,
    /// Tracking issue this invocation is working, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
}

impl AgentInstance {
    pub fn new(
        worker: WorkerKind,
        project_key: impl Into<String>,
        current_task: Option<String>,
        created_at_ms: u64,
    ) -> Self {
        Self {
            agent_id: crate::id::agent_id(worker),
            worker,
            status: AgentStatus::Starting,
            created_at_ms,
            project_key: project_key.into(),
            current_task,
        }
    }

    /// An instance is active iff it is starting or running.
    pub fn is_active(&self) -> bool {
        matches!(self.status, AgentStatus::Starting | AgentStatus::Running)
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
