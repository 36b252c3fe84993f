// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gt_core::WorkerKind;

#[test]
fn every_worker_has_a_tool_set() {
    for kind in [
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
    ] {
        assert!(!allowed_tools(kind).is_empty(), "{kind} has no tools");
    }
}

#[yare::parameterized(
    scout_reads        = { WorkerKind::Scout, "read_file", true },
    scout_cannot_write = { WorkerKind::Scout, "write_code_file", false },
    forge_writes_code  = { WorkerKind::Forge, "write_code_file", true },
    forge_cannot_issue = { WorkerKind::Forge, "issue_create", false },
    bonobo_writes      = { WorkerKind::Bonobo, "write_file", true },
    sage_cannot_commit = { WorkerKind::Sage, "git_commit", false },
    crucible_runs_tests = { WorkerKind::Crucible, "run_tests", true },
)]
fn permission_checks(kind: WorkerKind, tool: &str, expected: bool) {
    assert_eq!(can_use_tool(kind, tool), expected);
}

#[test]
fn unknown_tool_is_denied_everywhere() {
    assert!(!can_use_tool(WorkerKind::Bonobo, "rm_dash_rf"));
}
