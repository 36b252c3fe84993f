// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage workers: the eight chimp specialists plus the Troop fallback.
//!
//! All share one prompt-driven flow: load context, compose the stage
//! prompt, invoke the model, pull artifact paths out of the response with
//! tolerant patterns, and summarise from the leading lines.

use crate::base::{load_context, Worker};
use crate::deps::AgentDeps;
use crate::error::AgentError;
use async_trait::async_trait;
use gt_core::{CompletionEnvelope, CompletionStatus, DispatchEnvelope, WorkerKind};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Response substrings that flag a stage for rework (case-insensitive).
const FAILURE_KEYWORDS: [&str; 3] = ["error:", "failed:", "cannot proceed"];

const SUMMARY_MAX_CHARS: usize = 500;
const SUMMARY_MAX_LINES: usize = 5;

static ARTIFACT_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)artifact:\s*(.+\.md)").expect("constant regex pattern is valid"),
        Regex::new(r"(?i)(?:created|wrote|generated)\s+(?:artifact\s+)?(?:at|to)[:\s]+(.+\.(?:md|py|rs))")
            .expect("constant regex pattern is valid"),
        Regex::new(r"(?i)file\s+(?:written|created)[:\s]+(.+\.(?:md|py|rs))")
            .expect("constant regex pattern is valid"),
    ]
});

/// Extract artifact paths from a model response, deduplicated, in order
/// of first appearance.
pub(crate) fn parse_artifacts(response: &str) -> Vec<String> {
    let mut artifacts: Vec<String> = Vec::new();
    for pattern in ARTIFACT_PATTERNS.iter() {
        for caps in pattern.captures_iter(response) {
            if let Some(m) = caps.get(1) {
                let path =
                    m.as_str().trim().trim_matches(|c| c == '`' || c == '"' || c == '\'').to_string();
                if !path.is_empty() && !artifacts.contains(&path) {
                    artifacts.push(path);
                }
            }
        }
    }
    artifacts
}

/// First non-blank lines of the response, truncated to 500 chars.
pub(crate) fn summarize(response: &str) -> String {
    let summary = response
        .trim()
        .lines()
        .take(SUMMARY_MAX_LINES)
        .filter(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if summary.chars().count() > SUMMARY_MAX_CHARS {
        let truncated: String = summary.chars().take(SUMMARY_MAX_CHARS - 3).collect();
        format!("{truncated}...")
    } else {
        summary
    }
}

pub(crate) fn has_failure_keywords(response: &str) -> bool {
    let lower = response.to_lowercase();
    FAILURE_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// A prompt-driven stage specialist.
pub struct StageWorker {
    kind: WorkerKind,
    deps: AgentDeps,
}

impl StageWorker {
    pub fn new(kind: WorkerKind, deps: AgentDeps) -> Self {
        Self { kind, deps }
    }

    /// Load the role prompt from `<workspace>/prompts/<role>/prompt.md`,
    /// falling back to a built-in prompt when the file is absent.
    async fn load_prompt(&self, workspace_root: &Path) -> String {
        let prompt_path = workspace_root
            .join("prompts")
            .join(self.kind.as_str().to_lowercase())
            .join("prompt.md");
        match tokio::fs::read_to_string(&prompt_path).await {
            Ok(content) => {
                tracing::debug!(worker = %self.kind, chars = content.len(), "prompt loaded");
                content
            }
            Err(_) => {
                tracing::warn!(
                    worker = %self.kind,
                    path = %prompt_path.display(),
                    "prompt file missing, using fallback"
                );
                format!(
                    "You are {}, a specialist agent in the Gorilla Troop system. \
                     You handle the following stages: {}. \
                     Follow the workflow rules and produce markdown artifacts with \
                     beads headers.",
                    self.kind,
                    self.kind.handled_stages().join(", "),
                )
            }
        }
    }

    async fn build_stage_prompt(&self, dispatch: &DispatchEnvelope, context: &str) -> String {
        let mut prompt = self.load_prompt(&dispatch.workspace_root).await;
        prompt.push_str("\n\n---\n\n## Current Task\n");
        prompt.push_str(&format!("**Stage**: {}\n", dispatch.stage_name));
        prompt.push_str(&format!("**Phase**: {}\n", dispatch.phase));
        prompt.push_str(&format!("**Tracking Issue**: {}\n", dispatch.issue_id));
        if let Some(gate) = &dispatch.review_gate_id {
            prompt.push_str(&format!("**Review Gate**: {gate}\n"));
        }
        if let Some(unit) = &dispatch.unit_name {
            prompt.push_str(&format!("**Unit**: {unit}\n"));
        }
        if let Some(instructions) = &dispatch.instructions {
            prompt.push_str(&format!("\n**Instructions**: {instructions}\n"));
        }
        prompt.push_str(&format!(
            "\n**Workspace Root**: {}\n",
            dispatch.workspace_root.display()
        ));
        prompt.push_str(&format!("**Project Key**: {}\n", dispatch.project_key));

        if !context.trim().is_empty() {
            prompt.push_str("\n---\n\n## Input Context (Loaded Artifacts)\n\n");
            prompt.push_str(context);
        }

        prompt.push_str(&format!(
            "\n\n---\n\n## Instructions\n\nExecute the **{}** stage. \
             Follow the stage-specific instructions from your prompt. \
             Produce the required artifacts and register them with the tracking \
             issue. When complete, provide a summary of what was produced.",
            dispatch.stage_name
        ));
        prompt
    }
}

#[async_trait]
impl Worker for StageWorker {
    fn kind(&self) -> WorkerKind {
        self.kind
    }

    fn deps(&self) -> &AgentDeps {
        &self.deps
    }

    async fn execute(
        &self,
        dispatch: &DispatchEnvelope,
    ) -> Result<CompletionEnvelope, AgentError> {
        let context = load_context(dispatch).await;
        tracing::info!(
            worker = %self.kind,
            stage = %dispatch.stage_name,
            inputs = dispatch.input_artifacts.len(),
            "executing stage"
        );

        let prompt = self.build_stage_prompt(dispatch, &context).await;
        let response = self.deps.model.invoke(&prompt).await?;

        let artifacts = parse_artifacts(&response);
        let summary = summarize(&response);

        let mut completion = CompletionEnvelope::completed(
            &dispatch.stage_name,
            &dispatch.issue_id,
            artifacts,
            summary,
        );
        if has_failure_keywords(&response) {
            completion.status = CompletionStatus::NeedsRework;
            completion.rework_reason =
                Some("model response indicates issues that may need attention".to_string());
        }
        Ok(completion)
    }
}

#[cfg(test)]
#[path = "chimp_tests.rs"]
mod tests;
