// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Security scanner (Snake).
//!
//! Runs the standard prompt flow against a list of target files and emits
//! a security report artifact. A scan that surfaces critical or high
//! findings flags the stage for rework.

use crate::base::Worker;
use crate::deps::AgentDeps;
use crate::error::AgentError;
use async_trait::async_trait;
use gt_adapters::scribe;
use gt_core::{CompletionEnvelope, CompletionStatus, DispatchEnvelope, WorkerKind};
use serde::Deserialize;

/// Large target files are truncated for the prompt.
const SCAN_PREVIEW_CHARS: usize = 50_000;

#[derive(Debug, Default, Deserialize)]
struct ScanRequest {
    #[serde(default)]
    stage_name: String,
    #[serde(default)]
    artifact_paths: Vec<String>,
    #[serde(default)]
    code_paths: Vec<String>,
}

impl ScanRequest {
    fn parse(dispatch: &DispatchEnvelope) -> ScanRequest {
        dispatch
            .instructions
            .as_deref()
            .and_then(|i| serde_json::from_str(i).ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
struct Finding {
    #[serde(default)]
    category: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    recommendation: String,
}

#[derive(Debug, Deserialize)]
struct ScanAnalysis {
    #[serde(default)]
    findings: Vec<Finding>,
    #[serde(default)]
    summary: String,
    #[serde(default = "default_passed")]
    passed: bool,
}

fn default_passed() -> bool {
    true
}

/// Parse the scan JSON out of the response; unparseable output is treated
/// as a pass with a note recommending manual review.
fn parse_scan_analysis(response: &str) -> ScanAnalysis {
    let Some(start) = response.find('{') else {
        return fallback_analysis();
    };
    let mut depth = 0usize;
    for (offset, ch) in response[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &response[start..start + offset + 1];
                    return serde_json::from_str(candidate).unwrap_or_else(|_| fallback_analysis());
                }
            }
            _ => {}
        }
    }
    fallback_analysis()
}

fn fallback_analysis() -> ScanAnalysis {
    tracing::warn!("could not parse scan analysis, treating as pass");
    ScanAnalysis {
        findings: Vec::new(),
        summary: "Model response could not be parsed. Manual review recommended.".to_string(),
        passed: true,
    }
}

/// Lowercase a stage name into a directory slug.
fn sanitize_stage_name(stage_name: &str) -> String {
    let mut slug = String::new();
    let mut last_hyphen = true;
    for ch in stage_name.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "security-scan".to_string()
    } else {
        slug
    }
}

fn build_report(stage_name: &str, analysis: &ScanAnalysis) -> String {
    let mut lines = vec![
        format!("# Security Scan Report: {stage_name}\n"),
        format!("**Result**: {}\n", if analysis.passed { "PASSED" } else { "FAILED" }),
        format!("**Findings**: {}\n", analysis.findings.len()),
        format!("\n## Summary\n\n{}\n", analysis.summary),
    ];

    if analysis.findings.is_empty() {
        lines.push("\n## Findings\n\nNo security issues detected.\n".to_string());
    } else {
        lines.push("\n## Findings\n".to_string());
        for (i, finding) in analysis.findings.iter().enumerate() {
            lines.push(format!(
                "### {}. [{}] {}\n",
                i + 1,
                finding.severity.to_uppercase(),
                finding.title
            ));
            lines.push(format!("- **Category**: {}", finding.category));
            lines.push(format!("- **Location**: {}", finding.location));
            lines.push(format!("- **Description**: {}", finding.description));
            if !finding.recommendation.is_empty() {
                lines.push(format!("- **Recommendation**: {}", finding.recommendation));
            }
            lines.push(String::new());
        }
    }
    lines.join("\n")
}

pub struct SecurityScanner {
    deps: AgentDeps,
}

impl SecurityScanner {
    pub fn new(deps: AgentDeps) -> Self {
        Self { deps }
    }

    async fn read_target(&self, dispatch: &DispatchEnvelope, relpath: &str) -> String {
        let full = dispatch.workspace_root.join(relpath);
        match tokio::fs::read_to_string(&full).await {
            Ok(content) if content.chars().count() > SCAN_PREVIEW_CHARS => {
                let preview: String = content.chars().take(SCAN_PREVIEW_CHARS).collect();
                format!("{preview}\n... (truncated, {} chars total)", content.chars().count())
            }
            Ok(content) => content,
            Err(_) => format!("(file not found: {relpath})"),
        }
    }
}

#[async_trait]
impl Worker for SecurityScanner {
    fn kind(&self) -> WorkerKind {
        WorkerKind::Snake
    }

    fn deps(&self) -> &AgentDeps {
        &self.deps
    }

    async fn execute(
        &self,
        dispatch: &DispatchEnvelope,
    ) -> Result<CompletionEnvelope, AgentError> {
        let request = ScanRequest::parse(dispatch);
        let stage_name = if request.stage_name.is_empty() {
            dispatch.stage_name.clone()
        } else {
            request.stage_name.clone()
        };

        // Scan targets: the requested paths plus the dispatch inputs,
        // deduplicated, order preserved.
        let mut artifact_paths = request.artifact_paths.clone();
        for path in &dispatch.input_artifacts {
            if !artifact_paths.contains(path) {
                artifact_paths.push(path.clone());
            }
        }
        let code_paths = request.code_paths;

        if artifact_paths.is_empty() && code_paths.is_empty() {
            tracing::warn!(stage = %stage_name, "no files provided for security scan");
            return Ok(CompletionEnvelope::completed(
                &dispatch.stage_name,
                &dispatch.issue_id,
                vec![],
                "No files provided for security scan.",
            ));
        }

        let mut sections = Vec::new();
        for path in &artifact_paths {
            let content = self.read_target(dispatch, path).await;
            sections.push(format!("## Artifact: {path}\n```\n{content}\n```"));
        }
        for path in &code_paths {
            let content = self.read_target(dispatch, path).await;
            sections.push(format!("## Code: {path}\n```\n{content}\n```"));
        }

        let prompt = format!(
            "Perform a security review of the following files from the '{stage_name}' stage.\n\n\
             Check for:\n\
             1. **Dependency vulnerabilities** -- known CVEs, outdated packages\n\
             2. **Hardcoded secrets** -- API keys, passwords, tokens in code/config\n\
             3. **OWASP issues** -- injection, XSS, CSRF, broken auth\n\
             4. **Insecure configurations** -- overly permissive IAM, open ports\n\
             5. **Injection risks** -- SQL injection, command injection, SSRF\n\n\
             {}\n\n\
             Respond with a JSON object: \"findings\" (list of {{category, severity, title, \
             description, location, recommendation}}), \"summary\", and \"passed\" \
             (false when any finding is critical or high).",
            sections.join("\n\n"),
        );

        let response = self.deps.model.invoke(&prompt).await?;
        let analysis = parse_scan_analysis(&response);
        let critical = analysis
            .findings
            .iter()
            .filter(|f| f.severity == "critical" || f.severity == "high")
            .count();
        tracing::info!(
            findings = analysis.findings.len(),
            critical,
            passed = analysis.passed,
            "scan complete"
        );

        let report = build_report(&stage_name, &analysis);
        let mut output_artifacts = Vec::new();
        match scribe::create_artifact(
            &dispatch.workspace_root,
            dispatch.phase,
            &sanitize_stage_name(&stage_name),
            "security-scan",
            &report,
            &dispatch.issue_id,
            dispatch.review_gate_id.as_deref(),
        )
        .await
        {
            Ok(relpath) => output_artifacts.push(relpath.display().to_string()),
            Err(scribe::ScribeError::AlreadyExists(_)) => {
                tracing::info!("security report already exists, skipping creation");
            }
            Err(e) => tracing::warn!(error = %e, "failed to create security report artifact"),
        }

        let mut completion = CompletionEnvelope::completed(
            &dispatch.stage_name,
            &dispatch.issue_id,
            output_artifacts,
            format!(
                "Security scan for '{stage_name}': {} finding(s), {critical} critical/high. {}. {}",
                analysis.findings.len(),
                if analysis.passed { "PASSED" } else { "FAILED -- rework required" },
                analysis.summary,
            ),
        );
        if !analysis.passed {
            completion.status = CompletionStatus::NeedsRework;
            completion.rework_reason = Some(format!("{critical} critical/high security findings"));
        }
        Ok(completion)
    }
}

#[cfg(test)]
#[path = "security_tests.rs"]
mod tests;
