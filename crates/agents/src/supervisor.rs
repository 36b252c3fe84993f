// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow graph driver.
//!
//! The per-project supervisor (ProjectMinder): scaffolds the dependency
//! graph in the issue store, picks the next ready stage, builds its
//! dispatch, claims the issue, and hands it to the engine. Stage
//! advancement is serialised per project by an internal lock held across
//! the whole read-claim-dispatch window.
//!
//! Operation handlers never fail outward; they return diagnostic strings
//! and leave user-facing escalation to notifications.

use crate::deps::{AgentDeps, HUMAN_SUPERVISOR};
use gt_adapters::beads::{IssueFilter, IssueRecord, IssueUpdate, NewIssue};
use gt_adapters::mail::{dispatch_thread, OutboundMessage};
use gt_core::{
    CompletionEnvelope, CompletionStatus, DispatchEnvelope, NotificationKind, Phase, WorkerKind,
};
use gt_engine::{AgentEngine, NotificationQueue};
use regex::Regex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex;

static ARTIFACT_NOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"artifact:\s*([^\n]+)").expect("constant regex pattern is valid")
});

/// Conditional inception stages, created unwired; workflow planning
/// decides execute/skip per stage.
const CONDITIONAL_STAGES: [(&str, &str, &str); 4] = [
    (
        "Reverse Engineering",
        "reverse-engineering",
        "Analyze existing codebase. Document architecture, components, tech stack.",
    ),
    ("User Stories", "user-stories", "Create user personas and stories with acceptance criteria."),
    (
        "Application Design",
        "application-design",
        "High-level component identification, methods, business rules, service design.",
    ),
    (
        "Units Generation",
        "units-generation",
        "Decompose system into units of work with boundaries and dependencies.",
    ),
];

/// Routing tag parsed from the incoming context map.
#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorAction {
    Initialize,
    Advance,
    HandleCompletion(CompletionEnvelope),
    RecommendSkip { stage_name: String, issue_id: String, rationale: String },
    CheckReviewGates,
}

impl SupervisorAction {
    /// Parse from a context map; unknown or missing tags mean Advance.
    pub fn from_context(context: &Value) -> SupervisorAction {
        match context.get("action").and_then(Value::as_str) {
            Some("initialize") => SupervisorAction::Initialize,
            Some("handle_completion") => {
                match context.get("completion").cloned().map(serde_json::from_value) {
                    Some(Ok(completion)) => SupervisorAction::HandleCompletion(completion),
                    _ => SupervisorAction::Advance,
                }
            }
            Some("recommend_skip") => SupervisorAction::RecommendSkip {
                stage_name: str_field(context, "stage_name"),
                issue_id: str_field(context, "issue_id"),
                rationale: str_field(context, "rationale"),
            },
            Some("check_review_gates") => SupervisorAction::CheckReviewGates,
            _ => SupervisorAction::Advance,
        }
    }
}

fn str_field(context: &Value, key: &str) -> String {
    context.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Per-project workflow graph driver.
pub struct Supervisor {
    deps: AgentDeps,
    project_key: String,
    workspace_root: PathBuf,
    engine: Option<AgentEngine>,
    notifications: Option<Arc<NotificationQueue>>,
    /// Serialises advancement: one read-claim-dispatch window at a time.
    advance_lock: Mutex<()>,
}

impl Supervisor {
    pub fn new(deps: AgentDeps, project_key: impl Into<String>, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            deps,
            project_key: project_key.into(),
            workspace_root: workspace_root.into(),
            engine: None,
            notifications: None,
            advance_lock: Mutex::new(()),
        }
    }

    pub fn with_engine(mut self, engine: AgentEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_notifications(mut self, notifications: Arc<NotificationQueue>) -> Self {
        self.notifications = Some(notifications);
        self
    }

    pub fn project_key(&self) -> &str {
        &self.project_key
    }

    /// Run one operation. Never fails outward.
    pub async fn run(&self, action: SupervisorAction) -> String {
        match action {
            SupervisorAction::Initialize => self.initialize().await,
            SupervisorAction::Advance => self.advance().await,
            SupervisorAction::HandleCompletion(completion) => {
                self.handle_completion(completion).await
            }
            SupervisorAction::RecommendSkip { stage_name, issue_id, rationale } => {
                self.recommend_skip(&stage_name, &issue_id, &rationale).await
            }
            SupervisorAction::CheckReviewGates => self.check_review_gates().await,
        }
    }

    /// Idempotent scaffold of the project's dependency graph.
    async fn initialize(&self) -> String {
        let project_label = format!("project:{}", self.project_key);

        // Guard: skip when the project already has open inception issues.
        match self
            .deps
            .store
            .list(IssueFilter::default().label("phase:inception").status("open"))
            .await
        {
            Ok(existing) => {
                if existing.iter().any(|i| i.has_label(&project_label)) {
                    tracing::warn!(
                        project = %self.project_key,
                        "project already scaffolded, skipping initialize"
                    );
                    return self.advance().await;
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not check existing issues"),
        }

        tracing::info!(project = %self.project_key, "scaffolding issue graph");

        // Phase epics.
        let inception_epic = match self
            .deps
            .store
            .create(
                NewIssue::epic("INCEPTION PHASE", 1)
                    .description("Planning and architecture. Determines WHAT to build and WHY.")
                    .labels(format!("phase:inception,{project_label}"))
                    .acceptance(
                        "All inception stages completed or skipped with explicit user approval.",
                    ),
            )
            .await
        {
            Ok(epic) => epic,
            Err(e) => {
                tracing::error!(error = %e, "failed to create phase epics");
                return format!("Initialization failed: could not create phase epics: {e}");
            }
        };
        let _ = self
            .deps
            .store
            .create(
                NewIssue::epic("CONSTRUCTION PHASE", 1)
                    .description(
                        "Design, implementation, build and test. Determines HOW to build it.",
                    )
                    .labels(format!("phase:construction,{project_label}"))
                    .acceptance("All units designed, implemented, built, and tested."),
            )
            .await;
        let _ = self
            .deps
            .store
            .create(
                NewIssue::epic("OPERATIONS PHASE", 3)
                    .description("Deployment and monitoring. Placeholder for future workflows.")
                    .labels(format!("phase:operations,{project_label}")),
            )
            .await;

        // Always-execute inception chain.
        let chain = self.scaffold_mandatory_chain(&inception_epic, &project_label).await;
        if let Err(e) = chain {
            tracing::error!(error = %e, "failed to create inception stages");
            return format!("Initialization failed: could not create inception stages: {e}");
        }

        // Conditional stages, unwired; workflow planning wires or skips them.
        for (title, slug, description) in CONDITIONAL_STAGES {
            if let Err(e) = self
                .scaffold_conditional_stage(&inception_epic, &project_label, title, slug, description)
                .await
            {
                tracing::warn!(stage = title, error = %e, "could not create conditional stage");
            }
        }

        tracing::info!(
            project = %self.project_key,
            epic = %inception_epic.id,
            "issue graph scaffolded"
        );
        self.advance().await
    }

    async fn scaffold_mandatory_chain(
        &self,
        epic: &IssueRecord,
        project_label: &str,
    ) -> Result<(), gt_adapters::beads::BeadsError> {
        let store = &self.deps.store;

        let ws_detect = store
            .create(
                NewIssue::task("Workspace Detection", 1)
                    .description(
                        "Analyze workspace state, detect project type (greenfield/brownfield).",
                    )
                    .labels(format!(
                        "phase:inception,stage:workspace-detection,always,{project_label}"
                    ))
                    .acceptance("Workspace state recorded. Project type determined."),
            )
            .await?;
        store.add_dependency(&ws_detect.id, &epic.id, "parent").await?;

        let req_analysis = store
            .create(
                NewIssue::task("Requirements Analysis", 1)
                    .description(
                        "Gather and validate requirements. Generate clarifying questions. \
                         Produce requirements document.",
                    )
                    .labels(format!(
                        "phase:inception,stage:requirements-analysis,always,{project_label}"
                    ))
                    .notes("artifact: aidlc-docs/inception/requirements/requirements.md")
                    .acceptance(
                        "Requirements document generated. All questions answered. \
                         Human review approved.",
                    ),
            )
            .await?;
        store.add_dependency(&req_analysis.id, &epic.id, "parent").await?;
        store.add_dependency(&req_analysis.id, &ws_detect.id, "blocks").await?;

        let req_review = store
            .create(
                NewIssue::task("REVIEW: Requirements Analysis - Awaiting Approval", 0)
                    .description("Human reviews requirements document and approves.")
                    .labels(format!("phase:inception,type:review-gate,{project_label}"))
                    .notes("artifact: aidlc-docs/inception/requirements/requirements.md")
                    .assignee("human")
                    .acceptance("Human approved requirements."),
            )
            .await?;
        store.add_dependency(&req_review.id, &epic.id, "parent").await?;
        store.add_dependency(&req_review.id, &req_analysis.id, "blocks").await?;

        let wf_planning = store
            .create(
                NewIssue::task("Workflow Planning", 1)
                    .description("Determine which stages to execute. Create execution plan.")
                    .labels(format!(
                        "phase:inception,stage:workflow-planning,always,{project_label}"
                    ))
                    .notes("artifact: aidlc-docs/inception/plans/execution-plan.md")
                    .acceptance(
                        "Execution plan generated. Stages marked execute/skip with explicit \
                         user approval.",
                    ),
            )
            .await?;
        store.add_dependency(&wf_planning.id, &epic.id, "parent").await?;
        store.add_dependency(&wf_planning.id, &req_review.id, "blocks").await?;

        let wp_review = store
            .create(
                NewIssue::task("REVIEW: Workflow Planning - Awaiting Approval", 0)
                    .description("Human reviews execution plan and approves stage selections.")
                    .labels(format!("phase:inception,type:review-gate,{project_label}"))
                    .notes("artifact: aidlc-docs/inception/plans/execution-plan.md")
                    .assignee("human")
                    .acceptance("Human approved execution plan."),
            )
            .await?;
        store.add_dependency(&wp_review.id, &epic.id, "parent").await?;
        store.add_dependency(&wp_review.id, &wf_planning.id, "blocks").await?;

        Ok(())
    }

    async fn scaffold_conditional_stage(
        &self,
        epic: &IssueRecord,
        project_label: &str,
        title: &str,
        slug: &str,
        description: &str,
    ) -> Result<(), gt_adapters::beads::BeadsError> {
        let store = &self.deps.store;
        let stage = store
            .create(
                NewIssue::task(title, 2)
                    .description(description)
                    .labels(format!("phase:inception,stage:{slug},conditional,{project_label}")),
            )
            .await?;
        store.add_dependency(&stage.id, &epic.id, "parent").await?;

        let review = store
            .create(
                NewIssue::task(format!("REVIEW: {title} - Awaiting Approval"), 0)
                    .description(format!("Human reviews {} artifacts.", title.to_lowercase()))
                    .labels(format!("phase:inception,type:review-gate,{project_label}"))
                    .assignee("human"),
            )
            .await?;
        store.add_dependency(&review.id, &epic.id, "parent").await?;
        store.add_dependency(&review.id, &stage.id, "blocks").await?;
        Ok(())
    }

    /// Pick the next ready stage and dispatch it.
    async fn advance(&self) -> String {
        let _window = self.advance_lock.lock().await;

        let ready = match self.deps.store.ready().await {
            Ok(ready) => ready,
            Err(e) => {
                tracing::error!(error = %e, "failed to query ready set");
                return format!("Error querying ready issues: {e}");
            }
        };
        tracing::info!(count = ready.len(), "ready set fetched");

        if ready.is_empty() {
            if self.all_stages_done().await {
                tracing::info!(project = %self.project_key, "all stages complete");
                return "All stages complete. Project finished.".to_string();
            }
            tracing::warn!(project = %self.project_key, "no stages ready, pipeline stalled");
            return "No stages ready. Waiting on review gates or Q&A.".to_string();
        }

        // First ready issue carrying a stage label; epics and other
        // non-stage entries are skipped.
        let Some((issue, stage_name)) = ready.iter().find_map(|candidate| {
            candidate.stage().map(|s| (candidate, s.to_string()))
        }) else {
            tracing::warn!(ready = ready.len(), "no actionable stages in ready set");
            return "No actionable stages ready. Waiting on dependencies.".to_string();
        };

        let worker = WorkerKind::for_stage(&stage_name);
        let input_artifacts = self.gather_input_artifacts().await;
        let phase = Phase::parse(issue.phase().unwrap_or("inception"));

        let dispatch = DispatchEnvelope::builder(
            stage_name.clone(),
            issue.id.clone(),
            self.project_key.clone(),
            self.workspace_root.clone(),
        )
        .phase(phase)
        .input_artifacts(input_artifacts)
        .build();

        // Claim before handing off so a concurrent ready query cannot pick
        // the same issue up again.
        if let Err(e) = self.deps.store.update(&issue.id, IssueUpdate::status("in_progress")).await
        {
            tracing::warn!(issue = %issue.id, error = %e, "failed to claim issue");
        }

        self.announce_dispatch(worker, &dispatch).await;
        self.spawn_worker(worker, &dispatch).await;

        tracing::info!(stage = %stage_name, issue = %issue.id, worker = %worker, "stage dispatched");
        format!("Dispatched '{stage_name}' to {worker} (issue {})", issue.id)
    }

    /// Record a worker's completion in the store, then advance.
    async fn handle_completion(&self, completion: CompletionEnvelope) -> String {
        match completion.status {
            CompletionStatus::Completed => {
                let mut notes = vec![format!("Completed: {}", completion.summary)];
                for artifact in &completion.output_artifacts {
                    notes.push(format!("artifact: {artifact}"));
                }
                let update = IssueUpdate::status("done").and_append(notes.join("\n"));
                if let Err(e) = self.deps.store.update(&completion.issue_id, update).await {
                    tracing::error!(issue = %completion.issue_id, error = %e, "completion update failed");
                    return format!("Error updating issue {}: {e}", completion.issue_id);
                }
                tracing::info!(issue = %completion.issue_id, "stage completed");
            }
            CompletionStatus::NeedsRework => {
                let note = format!(
                    "NEEDS REWORK: {}",
                    completion.rework_reason.as_deref().unwrap_or_default()
                );
                if let Err(e) =
                    self.deps.store.update(&completion.issue_id, IssueUpdate::append(note)).await
                {
                    tracing::error!(issue = %completion.issue_id, error = %e, "rework note failed");
                    return format!("Error updating issue {}: {e}", completion.issue_id);
                }
                // Status stays untouched; the review machine owns the flow
                // from here.
                tracing::info!(issue = %completion.issue_id, "stage needs rework");
            }
            CompletionStatus::Failed => {
                // The base contract already routed the error to the
                // investigator; leave the issue claimed for triage.
                tracing::warn!(
                    issue = %completion.issue_id,
                    error = ?completion.error_detail,
                    "stage failed"
                );
            }
        }
        self.advance().await
    }

    /// Propose skipping a conditional stage; the human decides.
    async fn recommend_skip(&self, stage_name: &str, issue_id: &str, rationale: &str) -> String {
        if let Some(notifications) = &self.notifications {
            notifications.create(
                NotificationKind::StatusUpdate,
                format!("Skip recommendation: {stage_name}"),
                rationale.to_string(),
                self.project_key.clone(),
                2,
                Some(issue_id.to_string()),
            );
        }

        let message = OutboundMessage::new(
            WorkerKind::ProjectMinder.as_str(),
            HUMAN_SUPERVISOR,
            format!("Skip recommendation: {stage_name}"),
            format!(
                "**Stage**: {stage_name}\n**Issue**: {issue_id}\n**Rationale**: {rationale}\n\n\
                 Please confirm or deny this skip recommendation."
            ),
        );
        if let Err(e) = self.deps.bus.send(&self.project_key, message).await {
            tracing::warn!(error = %e, "failed to send skip recommendation");
        }

        tracing::info!(stage = stage_name, "skip recommendation sent");
        format!("Skip recommendation for '{stage_name}' sent to {HUMAN_SUPERVISOR}.")
    }

    /// List open review gates.
    async fn check_review_gates(&self) -> String {
        match self
            .deps
            .store
            .list(IssueFilter::default().label("type:review-gate").status("open"))
            .await
        {
            Ok(gates) if gates.is_empty() => "No pending review gates.".to_string(),
            Ok(gates) => {
                let mut lines = vec!["**Pending Review Gates:**".to_string()];
                for gate in gates {
                    lines.push(format!("  - {}: {}", gate.id, gate.title));
                }
                lines.join("\n")
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to check review gates");
                format!("Error checking review gates: {e}")
            }
        }
    }

    /// All non-epic issues done or closed?
    async fn all_stages_done(&self) -> bool {
        match self.deps.store.list(IssueFilter::default()).await {
            Ok(issues) => {
                issues.iter().filter(|i| i.issue_type != "epic").all(|i| i.is_done())
            }
            Err(_) => false,
        }
    }

    /// Artifact paths from every done issue's notes, deduplicated,
    /// order-preserving.
    async fn gather_input_artifacts(&self) -> Vec<String> {
        let issues = match self.deps.store.list(IssueFilter::default()).await {
            Ok(issues) => issues,
            Err(e) => {
                tracing::warn!(error = %e, "failed to gather input artifacts");
                return Vec::new();
            }
        };

        let mut artifacts: Vec<String> = Vec::new();
        for issue in issues.iter().filter(|i| i.status == "done") {
            let Some(notes) = &issue.notes else { continue };
            for caps in ARTIFACT_NOTE.captures_iter(notes) {
                if let Some(m) = caps.get(1) {
                    let path = m.as_str().trim().to_string();
                    if !path.is_empty() && !artifacts.contains(&path) {
                        artifacts.push(path);
                    }
                }
            }
        }
        artifacts
    }

    /// Informational dispatch message on the issue's dispatch thread.
    async fn announce_dispatch(&self, worker: WorkerKind, dispatch: &DispatchEnvelope) {
        let message = OutboundMessage::new(
            WorkerKind::ProjectMinder.as_str(),
            worker.as_str(),
            format!("Dispatch: {}", dispatch.stage_name),
            format!(
                "Stage: {}\nIssue: {}\nPhase: {}\nInput artifacts: {}",
                dispatch.stage_name,
                dispatch.issue_id,
                dispatch.phase,
                dispatch.input_artifacts.join(", "),
            ),
        )
        .thread(dispatch_thread(&dispatch.issue_id));
        if let Err(e) = self.deps.bus.send(&self.project_key, message).await {
            tracing::warn!(error = %e, "failed to send dispatch message");
        }
    }

    /// Hand the dispatch to the engine. Without an engine reference the
    /// dispatch is logged and dropped (the edge is one-way and nullable).
    async fn spawn_worker(&self, worker: WorkerKind, dispatch: &DispatchEnvelope) {
        let Some(engine) = &self.engine else {
            tracing::warn!(worker = %worker, stage = %dispatch.stage_name, "no engine reference");
            return;
        };
        let context = match serde_json::to_value(dispatch) {
            Ok(value) => serde_json::json!({ "dispatch": value }),
            Err(e) => {
                tracing::error!(error = %e, "dispatch serialisation failed");
                return;
            }
        };
        match engine.spawn(worker, context, &self.project_key, Some(dispatch.issue_id.clone())) {
            Ok(instance) => {
                tracing::info!(agent_id = %instance.agent_id, worker = %worker, "worker spawned")
            }
            Err(e) => tracing::warn!(worker = %worker, error = %e, "could not spawn worker"),
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
