// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `bd` CLI wrapper. Pure subprocess calls, JSON output parsing.

use super::{BeadsError, IssueFilter, IssueRecord, IssueStore, IssueUpdate, NewIssue};
use crate::subprocess::{run_with_timeout, SubprocessError, BD_COMMAND_TIMEOUT};
use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use tokio::process::Command;

/// `Created issue: gt-17` in `bd create` text output.
static CREATED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Created issue:\s*(\S+)").expect("constant regex pattern is valid")
});

/// Fallback: any `<prefix>-<n>` token.
static ISSUE_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z]\w*-\d+)").expect("constant regex pattern is valid")
});

/// Production issue store backed by the `bd` CLI.
///
/// Each instance is pinned to one workspace directory so `bd` discovers the
/// correct per-project `.beads/` database; multiple workspaces coexist by
/// holding one client each.
pub struct BeadsCli {
    workspace: Option<PathBuf>,
}

impl BeadsCli {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self { workspace: Some(workspace.into()) }
    }

    /// Resolve the database from the process working directory.
    pub fn ambient() -> Self {
        Self { workspace: None }
    }

    async fn run(&self, args: &[&str], json: bool) -> Result<String, BeadsError> {
        let mut cmd = Command::new("bd");
        cmd.args(args);
        if json {
            cmd.arg("--json");
        }
        if let Some(dir) = &self.workspace {
            cmd.current_dir(dir);
        }

        let output = run_with_timeout(cmd, BD_COMMAND_TIMEOUT, "bd").await.map_err(|e| match e {
            SubprocessError::Spawn { .. } => BeadsError::CliMissing,
            other => BeadsError::Subprocess(other),
        })?;

        if !output.status.success() {
            return Err(BeadsError::CommandFailed {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run_issues(&self, args: &[&str]) -> Result<Vec<IssueRecord>, BeadsError> {
        let stdout = self.run(args, true).await?;
        parse_issue_list(&stdout)
    }
}

/// Extract the new issue id from `bd create` text output.
pub(super) fn parse_created_id(output: &str) -> Result<String, BeadsError> {
    if let Some(caps) = CREATED_PATTERN.captures(output) {
        if let Some(m) = caps.get(1) {
            return Ok(m.as_str().to_string());
        }
    }
    if let Some(caps) = ISSUE_ID_PATTERN.captures(output) {
        if let Some(m) = caps.get(1) {
            return Ok(m.as_str().to_string());
        }
    }
    Err(BeadsError::Parse(format!(
        "no issue id in create output: {}",
        &output[..output.len().min(300)]
    )))
}

fn parse_issue_list(stdout: &str) -> Result<Vec<IssueRecord>, BeadsError> {
    if stdout.is_empty() {
        return Ok(Vec::new());
    }
    let value: serde_json::Value =
        serde_json::from_str(stdout).map_err(|e| BeadsError::Parse(e.to_string()))?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        // Some bd commands wrap the list: {"issues": [...]}
        serde_json::Value::Object(mut map) => match map.remove("issues").or_else(|| map.remove("items")) {
            Some(serde_json::Value::Array(items)) => items,
            _ => vec![serde_json::Value::Object(map)],
        },
        other => return Err(BeadsError::Parse(format!("unexpected bd output: {other}"))),
    };
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(|e| BeadsError::Parse(e.to_string())))
        .collect()
}

fn parse_single_issue(stdout: &str, issue_id: &str) -> Result<IssueRecord, BeadsError> {
    let mut issues = parse_issue_list(stdout)?;
    if issues.is_empty() {
        return Err(BeadsError::NotFound(issue_id.to_string()));
    }
    Ok(issues.remove(0))
}

#[async_trait]
impl IssueStore for BeadsCli {
    async fn create(&self, new: NewIssue) -> Result<IssueRecord, BeadsError> {
        let priority = new.priority.to_string();
        let mut args: Vec<&str> =
            vec!["create", new.title.as_str(), "-t", new.issue_type.as_str(), "-p", priority.as_str()];
        if let Some(v) = &new.description {
            args.extend(["--description", v.as_str()]);
        }
        if let Some(v) = &new.labels {
            args.extend(["--labels", v.as_str()]);
        }
        if let Some(v) = &new.assignee {
            args.extend(["--assignee", v.as_str()]);
        }
        if let Some(v) = &new.notes {
            args.extend(["--notes", v.as_str()]);
        }
        if let Some(v) = &new.acceptance {
            args.extend(["--acceptance", v.as_str()]);
        }
        if let Some(v) = &new.thread {
            args.extend(["--thread", v.as_str()]);
        }

        // bd create prints a text confirmation, not JSON; parse the id out
        // and fetch the full record.
        let output = self.run(&args, false).await?;
        let id = parse_created_id(&output)?;
        self.show(&id).await
    }

    async fn show(&self, issue_id: &str) -> Result<IssueRecord, BeadsError> {
        let stdout = self.run(&["show", issue_id], true).await?;
        parse_single_issue(&stdout, issue_id)
    }

    async fn update(&self, issue_id: &str, update: IssueUpdate) -> Result<(), BeadsError> {
        let mut args: Vec<String> = vec!["update".into(), issue_id.into()];
        if let Some(v) = update.status {
            args.extend(["--status".into(), v]);
        }
        if let Some(v) = update.notes {
            args.extend(["--notes".into(), v]);
        }
        if let Some(v) = update.append_notes {
            args.extend(["--append-notes".into(), v]);
        }
        if let Some(v) = update.assignee {
            args.extend(["--assignee".into(), v]);
        }
        if let Some(v) = update.priority {
            args.extend(["--priority".into(), v.to_string()]);
        }
        if let Some(v) = update.add_label {
            args.extend(["--add-label".into(), v]);
        }
        if let Some(v) = update.remove_label {
            args.extend(["--remove-label".into(), v]);
        }
        let borrowed: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&borrowed, false).await?;
        Ok(())
    }

    async fn close(&self, issue_id: &str, reason: Option<&str>) -> Result<(), BeadsError> {
        let mut args = vec!["close", issue_id];
        if let Some(reason) = reason {
            args.extend(["--reason", reason]);
        }
        self.run(&args, false).await?;
        Ok(())
    }

    async fn reopen(&self, issue_id: &str, reason: Option<&str>) -> Result<(), BeadsError> {
        let mut args = vec!["reopen", issue_id];
        if let Some(reason) = reason {
            args.extend(["--reason", reason]);
        }
        self.run(&args, false).await?;
        Ok(())
    }

    async fn list(&self, filter: IssueFilter) -> Result<Vec<IssueRecord>, BeadsError> {
        let mut args: Vec<String> = vec!["list".into()];
        if let Some(v) = filter.status {
            args.extend(["--status".into(), v]);
        }
        if let Some(v) = filter.label {
            args.extend(["--label".into(), v]);
        }
        if let Some(v) = filter.label_any {
            args.extend(["--label-any".into(), v]);
        }
        if let Some(v) = filter.issue_type {
            args.extend(["--type".into(), v]);
        }
        if let Some(v) = filter.parent {
            args.extend(["--parent".into(), v]);
        }
        if let Some(v) = filter.priority {
            args.extend(["--priority".into(), v.to_string()]);
        }
        if let Some(v) = filter.assignee {
            args.extend(["--assignee".into(), v]);
        }
        if let Some(v) = filter.sort {
            args.extend(["--sort".into(), v]);
        }
        if let Some(v) = filter.limit {
            args.extend(["--limit".into(), v.to_string()]);
        }
        let borrowed: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run_issues(&borrowed).await
    }

    async fn ready(&self) -> Result<Vec<IssueRecord>, BeadsError> {
        self.run_issues(&["ready"]).await
    }

    async fn blocked(&self) -> Result<Vec<IssueRecord>, BeadsError> {
        self.run_issues(&["blocked"]).await
    }

    async fn search(&self, query: &str) -> Result<Vec<IssueRecord>, BeadsError> {
        self.run_issues(&["search", query]).await
    }

    async fn add_dependency(
        &self,
        blocked: &str,
        blocker: &str,
        dep_type: &str,
    ) -> Result<(), BeadsError> {
        let mut args = vec!["dep", "add", blocked, blocker];
        if dep_type != "blocks" {
            args.extend(["--type", dep_type]);
        }
        self.run(&args, false).await?;
        Ok(())
    }

    async fn remove_dependency(&self, blocked: &str, blocker: &str) -> Result<(), BeadsError> {
        self.run(&["dep", "remove", blocked, blocker], false).await?;
        Ok(())
    }

    async fn dependency_cycles(&self) -> Result<Vec<IssueRecord>, BeadsError> {
        self.run_issues(&["dep", "cycles"]).await
    }

    async fn sync(&self) -> Result<(), BeadsError> {
        self.run(&["sync"], false).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
