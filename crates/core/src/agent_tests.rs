// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::stage::WorkerKind;

#[test]
fn new_instance_starts_in_starting() {
    let inst = AgentInstance::new(WorkerKind::Scout, "sci-calc", Some("gt-5".into()), 1_000);
    assert_eq!(inst.status, AgentStatus::Starting);
    assert_eq!(inst.worker, WorkerKind::Scout);
    assert_eq!(inst.project_key, "sci-calc");
    assert_eq!(inst.current_task.as_deref(), Some("gt-5"));
    assert!(inst.agent_id.starts_with("scout-"));
}

#[yare::parameterized(
    starting = { AgentStatus::Starting, true },
    running  = { AgentStatus::Running, true },
    stopping = { AgentStatus::Stopping, false },
    stopped  = { AgentStatus::Stopped, false },
    error    = { AgentStatus::Error, false },
)]
fn is_active(status: AgentStatus, expected: bool) {
    let mut inst = AgentInstance::new(WorkerKind::Troop, "p", None, 0);
    inst.status = status;
    assert_eq!(inst.is_active(), expected);
}

#[test]
fn terminal_statuses() {
    assert!(AgentStatus::Stopped.is_terminal());
    assert!(AgentStatus::Error.is_terminal());
    assert!(!AgentStatus::Running.is_terminal());
    assert!(!AgentStatus::Stopping.is_terminal());
}

#[test]
fn status_serde_uses_snake_case() {
    assert_eq!(serde_json::to_string(&AgentStatus::Starting).unwrap(), "\"starting\"");
    let back: AgentStatus = serde_json::from_str("\"error\"").unwrap();
    assert_eq!(back, AgentStatus::Error);
}
