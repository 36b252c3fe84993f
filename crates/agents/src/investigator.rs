// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error investigator (CuriousGeorge).
//!
//! Invoked when any worker fails. Gathers evidence (attached context, the
//! affected issue, referenced files), asks the model for a structured
//! decision, then either routes a fix suggestion to the source worker or
//! escalates to the human supervisor. Never mutates the affected issue.

use crate::base::{load_context, Worker};
use crate::deps::{AgentDeps, HUMAN_SUPERVISOR};
use crate::error::AgentError;
use async_trait::async_trait;
use gt_adapters::mail::{error_thread, escalation_thread, Importance, OutboundMessage};
use gt_core::{CompletionEnvelope, DispatchEnvelope, WorkerKind};
use serde::Deserialize;

/// Referenced files are previewed up to this many characters.
const FILE_PREVIEW_CHARS: usize = 2000;

#[derive(Debug, Default, Deserialize)]
struct ErrorReport {
    #[serde(default)]
    error_message: String,
    #[serde(default)]
    source_agent: String,
    #[serde(default)]
    affected_issue_id: String,
}

impl ErrorReport {
    fn parse(dispatch: &DispatchEnvelope) -> ErrorReport {
        let Some(instructions) = &dispatch.instructions else {
            return ErrorReport::default();
        };
        match serde_json::from_str(instructions) {
            Ok(report) => report,
            // Plain text is the error message itself.
            Err(_) => ErrorReport { error_message: instructions.clone(), ..Default::default() },
        }
    }
}

/// The model's structured decision.
#[derive(Debug, Deserialize)]
pub(crate) struct Analysis {
    #[serde(default)]
    root_cause: String,
    #[serde(default)]
    fix_suggested: bool,
    #[serde(default)]
    fix_description: String,
    #[serde(default)]
    target_agent: String,
    #[serde(default)]
    escalation_reason: String,
}

impl Analysis {
    fn conservative_default() -> Analysis {
        Analysis {
            root_cause: "Analysis available but could not be structured".to_string(),
            fix_suggested: false,
            fix_description: String::new(),
            target_agent: String::new(),
            escalation_reason: "Model response could not be parsed into an actionable fix"
                .to_string(),
        }
    }
}

/// First balanced `{...}` block in the response, parsed as JSON. Parsing
/// failure forces escalation.
pub(crate) fn parse_analysis(response: &str) -> Analysis {
    let Some(start) = response.find('{') else {
        tracing::warn!("no JSON object in analysis response, escalating");
        return Analysis::conservative_default();
    };
    let mut depth = 0usize;
    for (offset, ch) in response[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &response[start..start + offset + 1];
                    return serde_json::from_str(candidate).unwrap_or_else(|_| {
                        tracing::warn!("unparseable analysis JSON, escalating");
                        Analysis::conservative_default()
                    });
                }
            }
            _ => {}
        }
    }
    Analysis::conservative_default()
}

pub struct ErrorInvestigator {
    deps: AgentDeps,
}

impl ErrorInvestigator {
    pub fn new(deps: AgentDeps) -> Self {
        Self { deps }
    }

    /// Best-effort preview of each referenced file, truncated with a
    /// marker when larger than the cap.
    async fn examine_files(&self, dispatch: &DispatchEnvelope) -> String {
        let mut sections = Vec::new();
        for relpath in dispatch.input_artifacts.iter().chain(dispatch.reference_docs.iter()) {
            let full = dispatch.workspace_root.join(relpath);
            match tokio::fs::read_to_string(&full).await {
                Ok(content) => {
                    let preview: String = content.chars().take(FILE_PREVIEW_CHARS).collect();
                    let marker = if content.chars().count() > FILE_PREVIEW_CHARS {
                        format!("\n... (truncated, {} chars total)", content.chars().count())
                    } else {
                        String::new()
                    };
                    sections.push(format!("### {relpath}\n```\n{preview}{marker}\n```"));
                }
                Err(_) => sections.push(format!("### {relpath}\n(file not found)")),
            }
        }
        sections.join("\n\n")
    }

    async fn issue_evidence(&self, issue_id: &str) -> String {
        if issue_id.is_empty() {
            return "## Issue State\nNo issue id supplied.".to_string();
        }
        match self.deps.store.show(issue_id).await {
            Ok(issue) => format!(
                "## Issue State\n- ID: {}\n- Title: {}\n- Status: {}\n- Assignee: {}\n\
                 - Labels: {}\n- Notes: {}\n",
                issue.id,
                issue.title,
                issue.status,
                issue.assignee.as_deref().unwrap_or("(none)"),
                issue.labels.join(", "),
                issue.notes.as_deref().unwrap_or("(none)"),
            ),
            Err(e) => {
                tracing::debug!(issue = issue_id, error = %e, "could not fetch issue");
                format!("## Issue State\nCould not retrieve issue {issue_id}.")
            }
        }
    }

    async fn send_fix(
        &self,
        dispatch: &DispatchEnvelope,
        issue_id: &str,
        target: &str,
        analysis: &Analysis,
        error_message: &str,
    ) {
        let message = OutboundMessage::new(
            WorkerKind::CuriousGeorge.as_str(),
            target,
            format!("[FIX] Error correction for {issue_id}"),
            format!(
                "**Root Cause**: {}\n\n**Suggested Fix**: {}\n\n**Original Error**: {}\n",
                analysis.root_cause, analysis.fix_description, error_message,
            ),
        )
        .thread(error_thread(issue_id))
        .importance(Importance::High);
        if let Err(e) = self.deps.bus.send(&dispatch.project_key, message).await {
            tracing::warn!(target, error = %e, "failed to send fix suggestion");
        }
    }

    async fn send_escalation(
        &self,
        dispatch: &DispatchEnvelope,
        issue_id: &str,
        source_agent: &str,
        analysis: &Analysis,
        error_message: &str,
        full_response: &str,
    ) {
        let message = OutboundMessage::new(
            WorkerKind::CuriousGeorge.as_str(),
            HUMAN_SUPERVISOR,
            format!("[ESCALATION] Unresolvable error in {issue_id}"),
            format!(
                "**Source Agent**: {source_agent}\n**Root Cause**: {}\n**Error**: {error_message}\n\
                 **Escalation Reason**: {}\n\n**Full Analysis**:\n{full_response}\n",
                analysis.root_cause, analysis.escalation_reason,
            ),
        )
        .thread(escalation_thread(issue_id))
        .importance(Importance::High);
        if let Err(e) = self.deps.bus.send(&dispatch.project_key, message).await {
            tracing::warn!(error = %e, "failed to send escalation");
        }
    }
}

#[async_trait]
impl Worker for ErrorInvestigator {
    fn kind(&self) -> WorkerKind {
        WorkerKind::CuriousGeorge
    }

    fn deps(&self) -> &AgentDeps {
        &self.deps
    }

    async fn execute(
        &self,
        dispatch: &DispatchEnvelope,
    ) -> Result<CompletionEnvelope, AgentError> {
        let report = ErrorReport::parse(dispatch);
        let error_message = if report.error_message.is_empty() {
            "Unknown error".to_string()
        } else {
            report.error_message.clone()
        };
        let source_agent =
            if report.source_agent.is_empty() { "Unknown".to_string() } else { report.source_agent.clone() };
        let issue_id = if report.affected_issue_id.is_empty() {
            dispatch.issue_id.clone()
        } else {
            report.affected_issue_id.clone()
        };

        tracing::info!(
            source = %source_agent,
            issue = %issue_id,
            "investigating error report"
        );

        // Evidence: attached context, issue state, referenced files.
        let mut evidence = Vec::new();
        let context = load_context(dispatch).await;
        if !context.trim().is_empty() {
            evidence.push(format!("## Attached Context\n{context}"));
        }
        evidence.push(self.issue_evidence(&issue_id).await);
        let examined = self.examine_files(dispatch).await;
        if !examined.is_empty() {
            evidence.push(format!("## Examined Files\n{examined}"));
        }

        let prompt = format!(
            "Investigate the following error report and provide your analysis.\n\n\
             ## Error Report\n\
             - **Source Agent**: {source_agent}\n\
             - **Error Message**: {error_message}\n\
             - **Affected Issue**: {issue_id}\n\
             - **Stage**: {}\n\n\
             {}\n\n\
             Respond with a JSON object containing your analysis:\n\
             - \"root_cause\": a brief description of the root cause\n\
             - \"fix_suggested\": true/false\n\
             - \"fix_description\": what to do (if fix_suggested is true)\n\
             - \"target_agent\": which agent should apply the fix (if any)\n\
             - \"escalation_reason\": why escalation is needed (if fix_suggested is false)\n",
            dispatch.stage_name,
            evidence.join("\n\n"),
        );

        let response = self.deps.model.invoke(&prompt).await?;
        let analysis = parse_analysis(&response);

        let summary = if analysis.fix_suggested {
            let target = if analysis.target_agent.is_empty() {
                source_agent.clone()
            } else {
                analysis.target_agent.clone()
            };
            tracing::info!(target = %target, "fix suggested");
            self.send_fix(dispatch, &issue_id, &target, &analysis, &error_message).await;
            format!(
                "Investigation complete. Root cause: {}. Fix suggested to {}: {}",
                analysis.root_cause, target, analysis.fix_description,
            )
        } else {
            tracing::info!(reason = %analysis.escalation_reason, "escalating to human");
            self.send_escalation(
                dispatch,
                &issue_id,
                &source_agent,
                &analysis,
                &error_message,
                &response,
            )
            .await;
            format!(
                "Investigation complete. Root cause: {}. Escalated to {}: {}",
                analysis.root_cause, HUMAN_SUPERVISOR, analysis.escalation_reason,
            )
        };

        Ok(CompletionEnvelope::completed(
            &dispatch.stage_name,
            &dispatch.issue_id,
            vec![],
            summary,
        ))
    }
}

#[cfg(test)]
#[path = "investigator_tests.rs"]
mod tests;
