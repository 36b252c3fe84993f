// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-guard gateway (Bonobo).
//!
//! Other workers invoke Bonobo as a tool: a structured operation request
//! arrives in the dispatch instructions, the gateway routes it to the
//! matching guard, and the guard's verdict comes back as the completion.
//! Denials are failed completions carrying the guard's reason.

use crate::base::Worker;
use crate::deps::AgentDeps;
use crate::error::AgentError;
use async_trait::async_trait;
use gt_adapters::beads::{IssueUpdate, NewIssue};
use gt_adapters::guard::{AuditLog, FileGuard, GitGuard, GuardError, IssueGuard};
use gt_core::{CompletionEnvelope, DispatchEnvelope, WorkerKind};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Operations the gateway understands, by guard family.
const FILE_OPERATIONS: [&str; 3] = ["write_file", "delete_file", "validate_path"];
const GIT_OPERATIONS: [&str; 6] =
    ["create_branch", "checkout_branch", "commit", "merge", "get_status", "get_diff"];
const ISSUE_OPERATIONS: [&str; 4] =
    ["create_issue", "update_issue", "close_issue", "add_dependency"];

fn str_of(request: &Value, key: &str) -> String {
    request.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

pub struct GuardGateway {
    deps: AgentDeps,
}

impl GuardGateway {
    pub fn new(deps: AgentDeps) -> Self {
        Self { deps }
    }

    fn audit(&self, dispatch: &DispatchEnvelope) -> Arc<AuditLog> {
        Arc::new(AuditLog::new(Some(Arc::clone(&self.deps.bus)), dispatch.project_key.clone()))
    }

    async fn handle_file_op(
        &self,
        operation: &str,
        request: &Value,
        agent: &str,
        dispatch: &DispatchEnvelope,
    ) -> Result<(String, Vec<String>), GuardError> {
        let guard = FileGuard::new(self.audit(dispatch), &dispatch.workspace_root);
        let path = PathBuf::from(str_of(request, "path"));
        match operation {
            "write_file" => {
                let content = str_of(request, "content");
                let overwrite =
                    request.get("overwrite").and_then(Value::as_bool).unwrap_or(false);
                let written = guard.write_file(&path, &content, agent, overwrite).await?;
                Ok((
                    format!("File written: {}", written.display()),
                    vec![written.display().to_string()],
                ))
            }
            "delete_file" => {
                guard.delete_file(&path, agent).await?;
                Ok((format!("File deleted: {}", path.display()), vec![]))
            }
            "validate_path" => {
                let op_type = request.get("op_type").and_then(Value::as_str).unwrap_or("write");
                let result = guard.validate_path(&path, op_type);
                Ok((
                    format!(
                        "Path validation: {} -- {}",
                        if result.allowed { "allowed" } else { "denied" },
                        result.reason,
                    ),
                    vec![],
                ))
            }
            _ => Err(GuardError::Denied(format!("unknown file operation: {operation}"))),
        }
    }

    async fn handle_git_op(
        &self,
        operation: &str,
        request: &Value,
        agent: &str,
        dispatch: &DispatchEnvelope,
    ) -> Result<(String, Vec<String>), GuardError> {
        let guard = GitGuard::new(self.audit(dispatch), &dispatch.workspace_root);
        match operation {
            "create_branch" => {
                let name = str_of(request, "branch_name");
                let base = request.get("base").and_then(Value::as_str).unwrap_or("main");
                let created = guard.create_branch(&name, agent, base).await?;
                Ok((format!("Branch created: {created}"), vec![]))
            }
            "checkout_branch" => {
                let name = str_of(request, "branch_name");
                guard.checkout_branch(&name, agent).await?;
                Ok((format!("Switched to branch: {name}"), vec![]))
            }
            "commit" => {
                let message = str_of(request, "message");
                let issue_id = str_of(request, "issue_id");
                let files: Vec<PathBuf> = request
                    .get("files")
                    .and_then(Value::as_array)
                    .map(|files| {
                        files
                            .iter()
                            .filter_map(Value::as_str)
                            .map(PathBuf::from)
                            .collect()
                    })
                    .unwrap_or_default();
                let hash = guard.commit(&message, &files, agent, &issue_id).await?;
                Ok((format!("Committed: {}", &hash[..12.min(hash.len())]), vec![]))
            }
            "merge" => {
                let source = str_of(request, "source");
                let target = str_of(request, "target");
                let outcome = guard.merge(&source, &target, agent).await?;
                if outcome.success {
                    Ok((
                        format!("Merge successful: {}", outcome.commit_hash.unwrap_or_default()),
                        vec![],
                    ))
                } else {
                    Ok((
                        format!("Merge failed with conflicts: {:?}", outcome.conflicts),
                        vec![],
                    ))
                }
            }
            "get_status" => {
                let status = guard.status().await?;
                Ok((
                    format!(
                        "Branch: {}, clean: {}, staged: {}, modified: {}, untracked: {}",
                        status.branch,
                        status.clean,
                        status.staged.len(),
                        status.modified.len(),
                        status.untracked.len(),
                    ),
                    vec![],
                ))
            }
            "get_diff" => {
                let path = request.get("path").and_then(Value::as_str).map(Path::new);
                let diff = guard.diff(path).await?;
                Ok((format!("Diff output ({} chars)", diff.len()), vec![]))
            }
            _ => Err(GuardError::Denied(format!("unknown git operation: {operation}"))),
        }
    }

    async fn handle_issue_op(
        &self,
        operation: &str,
        request: &Value,
        agent: &str,
        dispatch: &DispatchEnvelope,
    ) -> Result<(String, Vec<String>), GuardError> {
        let guard = IssueGuard::new(self.audit(dispatch), Arc::clone(&self.deps.store));
        match operation {
            "create_issue" => {
                let mut new = NewIssue::task(
                    str_of(request, "title"),
                    request.get("priority").and_then(Value::as_i64).unwrap_or(2) as i32,
                );
                if let Some(issue_type) = request.get("issue_type").and_then(Value::as_str) {
                    new.issue_type = issue_type.to_string();
                }
                for (key, setter) in [
                    ("description", &mut new.description as &mut Option<String>),
                    ("labels", &mut new.labels),
                    ("assignee", &mut new.assignee),
                    ("notes", &mut new.notes),
                    ("acceptance", &mut new.acceptance),
                ] {
                    if let Some(value) = request.get(key).and_then(Value::as_str) {
                        *setter = Some(value.to_string());
                    }
                }
                let issue = guard.guarded_create(new, agent).await?;
                Ok((
                    format!("Issue created: {} -- {}", issue.id, issue.title),
                    vec![issue.id],
                ))
            }
            "update_issue" => {
                let issue_id = str_of(request, "issue_id");
                let update = IssueUpdate {
                    status: request.get("status").and_then(Value::as_str).map(str::to_string),
                    notes: request.get("notes").and_then(Value::as_str).map(str::to_string),
                    append_notes: request
                        .get("append_notes")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    assignee: request.get("assignee").and_then(Value::as_str).map(str::to_string),
                    priority: request.get("priority").and_then(Value::as_i64).map(|p| p as i32),
                    add_label: request.get("add_label").and_then(Value::as_str).map(str::to_string),
                    remove_label: request
                        .get("remove_label")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                };
                guard.guarded_update(&issue_id, update, agent).await?;
                Ok((format!("Issue updated: {issue_id}"), vec![]))
            }
            "close_issue" => {
                let issue_id = str_of(request, "issue_id");
                let reason = request.get("reason").and_then(Value::as_str);
                guard.guarded_close(&issue_id, reason, agent).await?;
                Ok((format!("Issue closed: {issue_id}"), vec![]))
            }
            "add_dependency" => {
                let blocked = str_of(request, "blocked_id");
                let blocker = str_of(request, "blocker_id");
                let dep_type =
                    request.get("dep_type").and_then(Value::as_str).unwrap_or("blocks");
                guard.guarded_add_dependency(&blocked, &blocker, dep_type, agent).await?;
                Ok((format!("Dependency added: {blocker} blocks {blocked}"), vec![]))
            }
            _ => Err(GuardError::Denied(format!("unknown issue operation: {operation}"))),
        }
    }
}

#[async_trait]
impl Worker for GuardGateway {
    fn kind(&self) -> WorkerKind {
        WorkerKind::Bonobo
    }

    fn deps(&self) -> &AgentDeps {
        &self.deps
    }

    async fn execute(
        &self,
        dispatch: &DispatchEnvelope,
    ) -> Result<CompletionEnvelope, AgentError> {
        let request: Value = match dispatch
            .instructions
            .as_deref()
            .and_then(|i| serde_json::from_str(i).ok())
        {
            Some(Value::Object(map)) => Value::Object(map),
            _ => {
                return Ok(CompletionEnvelope::failed(
                    &dispatch.stage_name,
                    &dispatch.issue_id,
                    "Missing or invalid JSON operation request in dispatch instructions",
                ));
            }
        };

        let operation = str_of(&request, "operation");
        let agent = {
            let requester = str_of(&request, "agent");
            if requester.is_empty() { "Unknown".to_string() } else { requester }
        };
        tracing::info!(operation = %operation, requester = %agent, "guard request");

        let outcome = if FILE_OPERATIONS.contains(&operation.as_str()) {
            self.handle_file_op(&operation, &request, &agent, dispatch).await
        } else if GIT_OPERATIONS.contains(&operation.as_str()) {
            self.handle_git_op(&operation, &request, &agent, dispatch).await
        } else if ISSUE_OPERATIONS.contains(&operation.as_str()) {
            self.handle_issue_op(&operation, &request, &agent, dispatch).await
        } else {
            return Ok(CompletionEnvelope::failed(
                &dispatch.stage_name,
                &dispatch.issue_id,
                format!("Unknown operation '{operation}'"),
            ));
        };

        match outcome {
            Ok((summary, output_artifacts)) => {
                tracing::info!(operation = %operation, "guard operation succeeded");
                Ok(CompletionEnvelope::completed(
                    &dispatch.stage_name,
                    &dispatch.issue_id,
                    output_artifacts,
                    summary,
                ))
            }
            Err(e) => {
                tracing::warn!(operation = %operation, error = %e, "guard operation refused");
                Ok(CompletionEnvelope::failed(
                    &dispatch.stage_name,
                    &dispatch.issue_id,
                    e.to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
