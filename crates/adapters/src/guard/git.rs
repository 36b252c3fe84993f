// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git write guard.
//!
//! Commit messages must reference their tracking issue
//! (`[<issue-id>] <summary>`); protected branches refuse commits and
//! merges into them go through validation.

use super::{AuditLog, GuardError, Validation};
use crate::subprocess::{run_with_timeout, GIT_COMMAND_TIMEOUT};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tokio::process::Command;

pub const PROTECTED_BRANCHES: [&str; 3] = ["main", "master", "develop"];

static COMMIT_MESSAGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[[\w.-]+\]\s.+").expect("constant regex pattern is valid")
});
static BRANCH_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9/\-_.]*$").expect("constant regex pattern is valid")
});

/// Current repository status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GitStatus {
    pub branch: String,
    pub clean: bool,
    pub staged: Vec<String>,
    pub modified: Vec<String>,
    pub untracked: Vec<String>,
}

/// Result of a guarded merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub success: bool,
    pub commit_hash: Option<String>,
    pub conflicts: Vec<String>,
}

/// Validates and executes git operations in the workspace.
pub struct GitGuard {
    audit: Arc<AuditLog>,
    root: PathBuf,
}

impl GitGuard {
    pub fn new(audit: Arc<AuditLog>, workspace_root: impl Into<PathBuf>) -> Self {
        Self { audit, root: workspace_root.into() }
    }

    pub fn validate_commit_message(&self, message: &str, issue_id: &str) -> Validation {
        if !COMMIT_MESSAGE_PATTERN.is_match(message) {
            return Validation::denied(
                "commit message must match '[<issue-id>] <summary>'".to_string(),
            );
        }
        if !issue_id.is_empty() && !message.starts_with(&format!("[{issue_id}]")) {
            return Validation::denied(format!("commit message must reference {issue_id}"));
        }
        Validation::allowed("message references its issue")
    }

    pub fn validate_branch_name(&self, name: &str) -> Validation {
        if PROTECTED_BRANCHES.contains(&name) {
            return Validation::denied(format!("{name} is a protected branch"));
        }
        if !BRANCH_NAME_PATTERN.is_match(name) {
            return Validation::denied(format!("invalid branch name: {name}"));
        }
        Validation::allowed("branch name acceptable")
    }

    async fn run_git(&self, args: &[&str]) -> Result<std::process::Output, GuardError> {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.root);
        Ok(run_with_timeout(cmd, GIT_COMMAND_TIMEOUT, "git").await?)
    }

    async fn run_git_ok(&self, args: &[&str]) -> Result<String, GuardError> {
        let output = self.run_git(args).await?;
        if !output.status.success() {
            return Err(GuardError::Git(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub async fn current_branch(&self) -> Result<String, GuardError> {
        self.run_git_ok(&["rev-parse", "--abbrev-ref", "HEAD"]).await
    }

    pub async fn create_branch(
        &self,
        name: &str,
        agent: &str,
        base: &str,
    ) -> Result<String, GuardError> {
        let validation = self.validate_branch_name(name);
        if !validation.allowed {
            self.audit.record("git", "create_branch", agent, "denied", &validation.reason).await;
            return Err(GuardError::Denied(validation.reason));
        }
        self.run_git_ok(&["branch", name, base]).await?;
        self.audit
            .record("git", "create_branch", agent, "allowed", format!("{name} from {base}"))
            .await;
        Ok(name.to_string())
    }

    pub async fn checkout_branch(&self, name: &str, agent: &str) -> Result<(), GuardError> {
        self.run_git_ok(&["checkout", name]).await?;
        self.audit.record("git", "checkout_branch", agent, "allowed", name).await;
        Ok(())
    }

    /// Stage `files` and commit with a validated message.
    ///
    /// Returns the new commit hash.
    pub async fn commit(
        &self,
        message: &str,
        files: &[PathBuf],
        agent: &str,
        issue_id: &str,
    ) -> Result<String, GuardError> {
        let validation = self.validate_commit_message(message, issue_id);
        if !validation.allowed {
            self.audit.record("git", "commit", agent, "denied", &validation.reason).await;
            return Err(GuardError::Denied(validation.reason));
        }

        let branch = self.current_branch().await?;
        if PROTECTED_BRANCHES.contains(&branch.as_str()) {
            let reason = format!("commits to protected branch {branch} are forbidden");
            self.audit.record("git", "commit", agent, "denied", &reason).await;
            return Err(GuardError::Denied(reason));
        }

        let mut add_args = vec!["add", "--"];
        let file_strs: Vec<String> = files.iter().map(|f| f.display().to_string()).collect();
        add_args.extend(file_strs.iter().map(String::as_str));
        self.run_git_ok(&add_args).await?;

        self.run_git_ok(&["commit", "-m", message]).await?;
        let hash = self.run_git_ok(&["rev-parse", "HEAD"]).await?;
        self.audit
            .record("git", "commit", agent, "allowed", format!("{} on {branch}", &hash[..12.min(hash.len())]))
            .await;
        Ok(hash)
    }

    pub async fn merge(
        &self,
        source: &str,
        target: &str,
        agent: &str,
    ) -> Result<MergeOutcome, GuardError> {
        self.run_git_ok(&["checkout", target]).await?;
        let output = self.run_git(&["merge", "--no-ff", source]).await?;
        if output.status.success() {
            let hash = self.run_git_ok(&["rev-parse", "HEAD"]).await?;
            self.audit
                .record("git", "merge", agent, "allowed", format!("{source} -> {target}"))
                .await;
            return Ok(MergeOutcome { success: true, commit_hash: Some(hash), conflicts: vec![] });
        }

        // Collect conflicted paths, then abort to leave the tree clean.
        let conflicts = self
            .run_git_ok(&["diff", "--name-only", "--diff-filter=U"])
            .await
            .map(|out| out.lines().map(str::to_string).collect())
            .unwrap_or_default();
        let _ = self.run_git(&["merge", "--abort"]).await;
        self.audit
            .record("git", "merge", agent, "error", format!("{source} -> {target}: conflicts"))
            .await;
        Ok(MergeOutcome { success: false, commit_hash: None, conflicts })
    }

    pub async fn status(&self) -> Result<GitStatus, GuardError> {
        let stdout = self.run_git_ok(&["status", "--porcelain", "-b"]).await?;
        Ok(parse_status(&stdout))
    }

    pub async fn diff(&self, path: Option<&Path>) -> Result<String, GuardError> {
        let mut args = vec!["diff"];
        let path_str;
        if let Some(path) = path {
            path_str = path.display().to_string();
            args.extend(["--", path_str.as_str()]);
        }
        self.run_git_ok(&args).await
    }
}

fn parse_status(stdout: &str) -> GitStatus {
    let mut status = GitStatus { branch: "unknown".into(), ..Default::default() };
    for line in stdout.lines() {
        if let Some(rest) = line.strip_prefix("## ") {
            status.branch = rest.split("...").next().unwrap_or(rest).trim().to_string();
        } else if let Some(rest) = line.strip_prefix("??") {
            status.untracked.push(rest.trim().to_string());
        } else if line.len() > 2 {
            let staged_flag = &line[..1];
            let worktree_flag = &line[1..2];
            let path = line[2..].trim().to_string();
            if "MADRC".contains(staged_flag) {
                status.staged.push(path.clone());
            }
            if "MD".contains(worktree_flag) {
                status.modified.push(path);
            }
        }
    }
    status.clean =
        status.staged.is_empty() && status.modified.is_empty() && status.untracked.is_empty();
    status
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
