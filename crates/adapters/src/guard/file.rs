// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File write guard.

use super::{AuditLog, GuardError, Validation};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 1 MB cap on guarded writes.
const MAX_WRITE_SIZE: usize = 1_048_576;

/// Top-level directory -> allowed extensions.
const DIRECTORY_RULES: [(&str, &[&str]); 5] = [
    ("aidlc-docs", &["md"]),
    ("templates", &["md"]),
    ("src", &["rs", "toml"]),
    ("tests", &["rs"]),
    ("docs", &["md", "mmd", "png", "svg"]),
];

/// Off-limits for any direct write.
const FORBIDDEN_DIRECTORIES: [&str; 2] = [".git", ".beads"];

/// Never deletable.
const PROTECTED_FILES: [&str; 3] = ["AGENTS.md", "README.md", ".gitignore"];

/// Validates and executes filesystem writes. Every agent file write flows
/// through here.
pub struct FileGuard {
    audit: Arc<AuditLog>,
    root: PathBuf,
}

impl FileGuard {
    pub fn new(audit: Arc<AuditLog>, workspace_root: impl Into<PathBuf>) -> Self {
        Self { audit, root: workspace_root.into() }
    }

    /// Check whether `path` may be targeted by `operation` ("write" or
    /// "delete"). Never touches the filesystem.
    pub fn validate_path(&self, path: &Path, operation: &str) -> Validation {
        let relative = match self.relativize(path) {
            Ok(rel) => rel,
            Err(reason) => return Validation::denied(reason),
        };

        let mut parts = relative.components().map(|c| c.as_os_str().to_string_lossy());
        let Some(top) = parts.next() else {
            return Validation::denied("empty path");
        };

        if FORBIDDEN_DIRECTORIES.contains(&top.as_ref()) {
            return Validation::denied(format!("direct writes to {top}/ are forbidden"));
        }
        for part in relative.components() {
            let part = part.as_os_str().to_string_lossy();
            if part.starts_with('.') && part != ".gitkeep" && part != ".gitignore" {
                return Validation::denied(format!("hidden path component: {part}"));
            }
        }

        if operation == "delete" {
            if let Some(name) = relative.file_name().map(|n| n.to_string_lossy()) {
                if PROTECTED_FILES.contains(&name.as_ref()) {
                    return Validation::denied(format!("{name} is protected from deletion"));
                }
            }
        }

        if let Some((_, extensions)) =
            DIRECTORY_RULES.iter().find(|(dir, _)| *dir == top.as_ref())
        {
            let ext = relative.extension().map(|e| e.to_string_lossy().to_string());
            match ext {
                Some(ext) if extensions.contains(&ext.as_str()) => {}
                other => {
                    return Validation::denied(format!(
                        "extension {:?} not allowed under {top}/",
                        other.unwrap_or_default()
                    ));
                }
            }
        }

        Validation::allowed("path within workspace rules")
    }

    /// Write a file on behalf of `agent`. Refuses overwrites unless asked.
    ///
    /// Returns the workspace-relative path written.
    pub async fn write_file(
        &self,
        path: &Path,
        content: &str,
        agent: &str,
        overwrite: bool,
    ) -> Result<PathBuf, GuardError> {
        let validation = self.validate_path(path, "write");
        if !validation.allowed {
            self.audit.record("file", "write_file", agent, "denied", &validation.reason).await;
            return Err(GuardError::Denied(validation.reason));
        }
        if content.len() > MAX_WRITE_SIZE {
            let reason = format!("content exceeds {MAX_WRITE_SIZE} bytes");
            self.audit.record("file", "write_file", agent, "denied", &reason).await;
            return Err(GuardError::Denied(reason));
        }

        let relative = self
            .relativize(path)
            .map_err(GuardError::Denied)?;
        let full_path = self.root.join(&relative);
        if full_path.exists() && !overwrite {
            self.audit
                .record("file", "write_file", agent, "denied", "exists and overwrite=false")
                .await;
            return Err(GuardError::AlreadyExists(relative.display().to_string()));
        }

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full_path, content).await?;
        self.audit
            .record(
                "file",
                "write_file",
                agent,
                "allowed",
                format!("{} ({} bytes)", relative.display(), content.len()),
            )
            .await;
        Ok(relative)
    }

    pub async fn delete_file(&self, path: &Path, agent: &str) -> Result<(), GuardError> {
        let validation = self.validate_path(path, "delete");
        if !validation.allowed {
            self.audit.record("file", "delete_file", agent, "denied", &validation.reason).await;
            return Err(GuardError::Denied(validation.reason));
        }

        let relative = self.relativize(path).map_err(GuardError::Denied)?;
        let full_path = self.root.join(&relative);
        if !full_path.exists() {
            return Err(GuardError::NotFound(relative.display().to_string()));
        }
        tokio::fs::remove_file(&full_path).await?;
        self.audit
            .record("file", "delete_file", agent, "allowed", relative.display().to_string())
            .await;
        Ok(())
    }

    /// Resolve to a workspace-relative path, refusing escapes.
    fn relativize(&self, path: &Path) -> Result<PathBuf, String> {
        let joined = if path.is_absolute() { path.to_path_buf() } else { self.root.join(path) };

        // Normalise `..` without requiring the file to exist.
        let mut normalized = PathBuf::new();
        for component in joined.components() {
            match component {
                std::path::Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(format!("path escapes workspace: {}", path.display()));
                    }
                }
                std::path::Component::CurDir => {}
                other => normalized.push(other),
            }
        }

        normalized
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .map_err(|_| format!("path is outside workspace: {}", path.display()))
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
