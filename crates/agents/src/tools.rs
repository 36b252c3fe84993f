// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool-permission table.
//!
//! The static authorisation boundary: which tool names each worker role
//! may invoke. Consulted by any tool-invoking helper before it acts. The
//! permissions themselves are data; changing them is a policy decision,
//! not a code change elsewhere.

use gt_core::WorkerKind;

/// Tools a worker role is authorized to use.
pub fn allowed_tools(kind: WorkerKind) -> &'static [&'static str] {
    match kind {
        WorkerKind::Scout => &[
            "read_file",
            "list_directory",
            "search_code",
            "scribe_create_artifact",
            "scribe_validate",
            "scribe_list_artifacts",
        ],
        WorkerKind::Sage => &[
            "read_artifact",
            "scribe_create_artifact",
            "scribe_update_artifact",
            "search_issue_history",
            "scribe_list_artifacts",
        ],
        WorkerKind::Bard => &["read_artifact", "scribe_create_artifact", "search_prior_artifacts"],
        WorkerKind::Planner => &[
            "read_artifact",
            "scribe_create_artifact",
            "issue_list",
            "issue_create",
            "issue_add_dependency",
        ],
        WorkerKind::Architect => {
            &["read_artifact", "scribe_create_artifact", "read_file", "list_directory"]
        }
        WorkerKind::Steward => {
            &["read_artifact", "scribe_create_artifact", "search_prior_artifacts"]
        }
        WorkerKind::Forge => {
            &["read_artifact", "read_file", "write_code_file", "git_commit", "run_linter"]
        }
        WorkerKind::Crucible => &[
            "read_artifact",
            "read_file",
            "write_test_file",
            "run_tests",
            "run_linter",
            "git_commit",
        ],
        WorkerKind::ProjectMinder => &[
            "dispatch_stage",
            "check_ready",
            "check_blocked",
            "create_review_gate",
            "recommend_skip",
            "update_stage_status",
            "file_reservation",
        ],
        WorkerKind::CuriousGeorge => {
            &["read_file", "read_issue", "read_bus_thread", "attempt_fix", "escalate"]
        }
        WorkerKind::Gibbon => &[
            "read_artifact",
            "read_review_feedback",
            "scribe_create_artifact",
            "scribe_update_artifact",
            "write_code_file",
            "run_tests",
        ],
        WorkerKind::Snake => {
            &["scan_artifact", "scan_code", "scan_dependencies", "generate_security_report"]
        }
        WorkerKind::Groomer => {
            &["check_inbox", "compile_status_report", "detect_stale", "notify_supervisor"]
        }
        WorkerKind::Bonobo => &[
            "write_file",
            "delete_file",
            "git_commit",
            "git_create_branch",
            "git_checkout",
            "git_merge",
            "issue_create",
            "issue_update",
            "issue_close",
        ],
        WorkerKind::Troop => &[
            "read_file",
            "read_artifact",
            "write_file",
            "scribe_create_artifact",
            "scribe_update_artifact",
            "issue_list",
        ],
    }
}

/// Check a single tool against the table.
pub fn can_use_tool(kind: WorkerKind, tool: &str) -> bool {
    allowed_tools(kind).contains(&tool)
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
