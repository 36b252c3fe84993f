// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitor (Groomer).
//!
//! Deterministic, no model calls: triages the bus inbox, flags issues
//! stuck in progress, and flags overdue review gates, then reports to the
//! human supervisor. Findings surface as discovered-work items on the
//! completion.

use crate::base::Worker;
use crate::deps::{AgentDeps, HUMAN_SUPERVISOR};
use crate::error::AgentError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gt_adapters::beads::{IssueFilter, IssueRecord};
use gt_adapters::mail::{Importance, OutboundMessage};
use gt_core::{CompletionEnvelope, DispatchEnvelope, WorkerKind};
use serde_json::{json, Map, Value};

/// In-progress issues older than this are stale.
pub const STALE_THRESHOLD_HOURS: f64 = 48.0;

/// Review gates open longer than this are overdue.
pub const OVERDUE_REVIEW_HOURS: f64 = 24.0;

const INBOX_LIMIT: usize = 50;

/// Hours since the issue was last touched (updated, else created).
/// `None` when no timestamp parses.
pub(crate) fn issue_age_hours(issue: &IssueRecord, now: DateTime<Utc>) -> Option<f64> {
    let raw = issue.updated_at.as_deref().or(issue.created_at.as_deref())?;
    let parsed = DateTime::parse_from_rfc3339(&raw.replace("Z", "+00:00")).ok()?;
    let delta = now.signed_duration_since(parsed.with_timezone(&Utc));
    Some(delta.num_seconds() as f64 / 3600.0)
}

fn discovered(kind: &str, issue: &IssueRecord, age_hours: f64) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("type".into(), json!(kind));
    map.insert("issue_id".into(), json!(issue.id));
    map.insert("title".into(), json!(issue.title));
    map.insert("age_hours".into(), json!(age_hours));
    map
}

pub struct MonitorWorker {
    deps: AgentDeps,
}

impl MonitorWorker {
    pub fn new(deps: AgentDeps) -> Self {
        Self { deps }
    }

    /// Summarise and acknowledge unread inbox messages.
    async fn check_inbox(&self, dispatch: &DispatchEnvelope) -> String {
        let messages = match self
            .deps
            .bus
            .fetch_inbox(&dispatch.project_key, self.kind().as_str(), true, INBOX_LIMIT)
            .await
        {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch inbox");
                return format!("## Inbox\nFailed to fetch inbox: {e}");
            }
        };

        if messages.is_empty() {
            return "## Inbox\nNo unread messages.".to_string();
        }

        let mut lines = vec![format!("## Inbox ({} unread messages)\n", messages.len())];
        let mut errors = 0;
        let mut state_changes = 0;
        let mut other = 0;
        for message in &messages {
            let subject = if message.subject.is_empty() { "(no subject)" } else { &message.subject };
            let marker = if subject.contains("[ERROR]") || subject.contains("[ESCALATION]") {
                errors += 1;
                "!!!"
            } else if subject.to_lowercase().contains("state")
                || subject.to_lowercase().contains("status")
            {
                state_changes += 1;
                "-->"
            } else {
                other += 1;
                "   "
            };
            lines.push(format!("- {marker} **{}**: {subject}", message.from_agent));

            if !message.id.is_empty() {
                // Best-effort acknowledgement.
                let _ = self
                    .deps
                    .bus
                    .acknowledge(&dispatch.project_key, self.kind().as_str(), &message.id)
                    .await;
            }
        }
        lines.push(format!(
            "\nSummary: {errors} errors/escalations, {state_changes} state changes, {other} other."
        ));
        lines.join("\n")
    }

    async fn check_stale_issues(
        &self,
        now: DateTime<Utc>,
    ) -> (String, Vec<Map<String, Value>>) {
        let in_progress =
            match self.deps.store.list(IssueFilter::default().status("in_progress")).await {
                Ok(issues) => issues,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to list in-progress issues");
                    return (format!("## Stale Issues\nFailed to query store: {e}"), vec![]);
                }
            };
        if in_progress.is_empty() {
            return ("## Stale Issues\nNo in-progress issues found.".to_string(), vec![]);
        }

        let mut flagged = Vec::new();
        let mut found = Vec::new();
        for issue in &in_progress {
            if let Some(age) = issue_age_hours(issue, now) {
                if age > STALE_THRESHOLD_HOURS {
                    flagged.push(format!(
                        "- **{}** ({}): in_progress for {age:.0}h (threshold: {STALE_THRESHOLD_HOURS:.0}h)",
                        issue.id, issue.title,
                    ));
                    found.push(discovered("stale_issue", issue, age));
                }
            }
        }

        if flagged.is_empty() {
            return (
                format!(
                    "## Stale Issues\n{} in-progress issues, none stale.",
                    in_progress.len()
                ),
                vec![],
            );
        }
        (format!("## Stale Issues ({} detected)\n{}", flagged.len(), flagged.join("\n")), found)
    }

    async fn check_overdue_reviews(
        &self,
        now: DateTime<Utc>,
    ) -> (String, Vec<Map<String, Value>>) {
        let gates = match self
            .deps
            .store
            .list(IssueFilter::default().label("type:review-gate").status("open"))
            .await
        {
            Ok(gates) => gates,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list review gates");
                return (format!("## Overdue Reviews\nFailed to query store: {e}"), vec![]);
            }
        };
        if gates.is_empty() {
            return ("## Overdue Reviews\nNo open review gates found.".to_string(), vec![]);
        }

        let mut flagged = Vec::new();
        let mut found = Vec::new();
        for gate in &gates {
            if let Some(age) = issue_age_hours(gate, now) {
                if age > OVERDUE_REVIEW_HOURS {
                    flagged.push(format!(
                        "- **{}** ({}): open for {age:.0}h (threshold: {OVERDUE_REVIEW_HOURS:.0}h)",
                        gate.id, gate.title,
                    ));
                    found.push(discovered("overdue_review", gate, age));
                }
            }
        }

        if flagged.is_empty() {
            return (
                format!("## Overdue Reviews\n{} open review gates, none overdue.", gates.len()),
                vec![],
            );
        }
        (
            format!("## Overdue Reviews ({} detected)\n{}", flagged.len(), flagged.join("\n")),
            found,
        )
    }
}

#[async_trait]
impl Worker for MonitorWorker {
    fn kind(&self) -> WorkerKind {
        WorkerKind::Groomer
    }

    fn deps(&self) -> &AgentDeps {
        &self.deps
    }

    async fn execute(
        &self,
        dispatch: &DispatchEnvelope,
    ) -> Result<CompletionEnvelope, AgentError> {
        tracing::info!(project = %dispatch.project_key, "starting monitoring cycle");
        let now = Utc::now();

        let mut sections = Vec::new();
        let mut found = Vec::new();

        sections.push(self.check_inbox(dispatch).await);

        let (stale_section, stale_found) = self.check_stale_issues(now).await;
        sections.push(stale_section);
        found.extend(stale_found);

        let (overdue_section, overdue_found) = self.check_overdue_reviews(now).await;
        sections.push(overdue_section);
        found.extend(overdue_found);

        let report = format!("# Monitoring Report\n\n{}", sections.join("\n\n"));
        tracing::info!(
            sections = sections.len(),
            flagged = found.len(),
            "monitoring report compiled"
        );

        // Deliver to the human supervisor; findings raise the importance.
        let importance = if found.is_empty() { Importance::Normal } else { Importance::High };
        let mut subject = "[STATUS] Monitoring report".to_string();
        if !found.is_empty() {
            subject.push_str(&format!(" ({} items flagged)", found.len()));
        }
        let message =
            OutboundMessage::new(self.kind().as_str(), HUMAN_SUPERVISOR, subject, report.clone())
                .thread("groomer-monitoring")
                .importance(importance);
        if let Err(e) = self.deps.bus.send(&dispatch.project_key, message).await {
            tracing::warn!(error = %e, "failed to send monitoring report");
        }

        let mut summary: String = report.chars().take(500).collect();
        if report.chars().count() > 500 {
            summary.push_str("...");
        }
        Ok(CompletionEnvelope::completed(&dispatch.stage_name, &dispatch.issue_id, vec![], summary)
            .with_discovered(found))
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
