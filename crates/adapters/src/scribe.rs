// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact scaffolding.
//!
//! Stage artifacts are markdown files at
//! `aidlc-docs/<phase>/<stage>/<name>.md` with cross-reference headers in
//! the first lines: `<!-- beads-issue: <id> -->` and optionally
//! `<!-- beads-review: <id> -->`. Every artifact carries at least one
//! `# Title` heading.

use gt_core::Phase;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

pub const AIDLC_DOCS_DIR: &str = "aidlc-docs";

/// Headers must appear within the first lines of the file.
const HEADER_SEARCH_LINES: usize = 10;

static ISSUE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*beads-issue:\s*(\S+)\s*-->").expect("constant regex pattern is valid")
});
static REVIEW_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*beads-review:\s*(\S+)\s*-->").expect("constant regex pattern is valid")
});
static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9\-]*$").expect("constant regex pattern is valid")
});

#[derive(Debug, Error)]
pub enum ScribeError {
    #[error("invalid {kind} name '{name}': must be lowercase alphanumeric with hyphens")]
    InvalidName { kind: &'static str, name: String },
    #[error("artifact already exists: {0}")]
    AlreadyExists(PathBuf),
    #[error("artifact not found: {0}")]
    NotFound(PathBuf),
    #[error("missing beads-issue header in {0}")]
    MissingHeader(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Parsed cross-reference header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHeader {
    pub issue_id: String,
    pub review_gate_id: Option<String>,
}

/// Relative artifact path under the workspace root.
pub fn artifact_relpath(phase: Phase, stage: &str, name: &str) -> PathBuf {
    PathBuf::from(AIDLC_DOCS_DIR).join(phase.as_str()).join(stage).join(format!("{name}.md"))
}

fn render_header(issue_id: &str, review_gate_id: Option<&str>) -> String {
    let mut header = format!("<!-- beads-issue: {issue_id} -->\n");
    if let Some(review) = review_gate_id {
        header.push_str(&format!("<!-- beads-review: {review} -->\n"));
    }
    header
}

/// Parse the header from artifact content. The issue header is mandatory.
pub fn parse_header(content: &str, path: &Path) -> Result<ArtifactHeader, ScribeError> {
    let head: String =
        content.lines().take(HEADER_SEARCH_LINES).collect::<Vec<_>>().join("\n");
    let issue_id = ISSUE_HEADER
        .captures(&head)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ScribeError::MissingHeader(path.to_path_buf()))?;
    let review_gate_id =
        REVIEW_HEADER.captures(&head).and_then(|c| c.get(1)).map(|m| m.as_str().to_string());
    Ok(ArtifactHeader { issue_id, review_gate_id })
}

fn validate_name(name: &str, kind: &'static str) -> Result<(), ScribeError> {
    if NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(ScribeError::InvalidName { kind, name: name.to_string() })
    }
}

/// Create a new artifact. Fails if the file already exists.
///
/// Returns the workspace-relative path of the created file.
pub async fn create_artifact(
    workspace_root: &Path,
    phase: Phase,
    stage: &str,
    name: &str,
    content: &str,
    issue_id: &str,
    review_gate_id: Option<&str>,
) -> Result<PathBuf, ScribeError> {
    validate_name(stage, "stage")?;
    validate_name(name, "file")?;

    let relpath = artifact_relpath(phase, stage, name);
    let full_path = workspace_root.join(&relpath);
    if full_path.exists() {
        return Err(ScribeError::AlreadyExists(full_path));
    }
    if let Some(parent) = full_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let full_content = format!("{}{}", render_header(issue_id, review_gate_id), content);
    tokio::fs::write(&full_path, full_content).await?;
    tracing::info!(path = %relpath.display(), issue_id, "artifact created");
    Ok(relpath)
}

/// Replace an artifact's body while preserving its header.
pub async fn update_artifact(
    workspace_root: &Path,
    relpath: &Path,
    content: &str,
) -> Result<(), ScribeError> {
    let full_path = workspace_root.join(relpath);
    if !full_path.exists() {
        return Err(ScribeError::NotFound(full_path));
    }
    let existing = tokio::fs::read_to_string(&full_path).await?;
    let header = parse_header(&existing, &full_path)?;
    let full_content = format!(
        "{}{}",
        render_header(&header.issue_id, header.review_gate_id.as_deref()),
        content
    );
    tokio::fs::write(&full_path, full_content).await?;
    Ok(())
}

/// List artifact relpaths for a phase (optionally narrowed to one stage),
/// sorted for determinism.
pub async fn list_artifacts(
    workspace_root: &Path,
    phase: Phase,
    stage: Option<&str>,
) -> Result<Vec<PathBuf>, ScribeError> {
    let mut base = workspace_root.join(AIDLC_DOCS_DIR).join(phase.as_str());
    if let Some(stage) = stage {
        base = base.join(stage);
    }
    if !base.exists() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    let mut stack = vec![base];
    while let Some(dir) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|e| e == "md") {
                if let Ok(rel) = path.strip_prefix(workspace_root) {
                    found.push(rel.to_path_buf());
                }
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Validation findings for one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Check an artifact: present, headered, has an H1 heading, non-empty body.
pub async fn validate_artifact(
    workspace_root: &Path,
    relpath: &Path,
) -> Result<ValidationReport, ScribeError> {
    let full_path = workspace_root.join(relpath);
    if !full_path.exists() {
        return Ok(ValidationReport { valid: false, errors: vec!["file does not exist".into()] });
    }

    let content = tokio::fs::read_to_string(&full_path).await?;
    let mut errors = Vec::new();
    if parse_header(&content, &full_path).is_err() {
        errors.push("missing beads-issue header".to_string());
    }
    if !content.lines().any(|l| l.starts_with("# ")) {
        errors.push("missing top-level `# Title` heading".to_string());
    }
    if content.trim().is_empty() {
        errors.push("file is empty".to_string());
    }
    Ok(ValidationReport { valid: errors.is_empty(), errors })
}

#[cfg(test)]
#[path = "scribe_tests.rs"]
mod tests;
