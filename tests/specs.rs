// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level end-to-end scenarios.
//!
//! Drives the wired system (engine + supervisor + workers) against the
//! in-memory issue store, the recording bus, and a scripted model.

use gt_adapters::beads::{InMemoryIssueStore, IssueFilter, IssueStore, NewIssue};
use gt_adapters::llm::ScriptedModel;
use gt_adapters::mail::{Importance, RecordingBus};
use gt_agents::{
    wire_engine, AgentDeps, ReviewMachine, Supervisor, SupervisorAction, WiringConfig,
    HUMAN_SUPERVISOR,
};
use gt_core::{AgentStatus, EngineConfig, WorkerKind};
use gt_engine::{AgentEngine, NotificationQueue};
use std::sync::Arc;
use std::time::Duration;

struct World {
    engine: AgentEngine,
    supervisor: Arc<Supervisor>,
    review: ReviewMachine,
    store: Arc<InMemoryIssueStore>,
    bus: Arc<RecordingBus>,
    notifications: Arc<NotificationQueue>,
    ws: tempfile::TempDir,
}

fn world_with(config: EngineConfig, responses: Vec<&str>) -> World {
    let store = Arc::new(InMemoryIssueStore::new());
    let bus = Arc::new(RecordingBus::new());
    let deps = AgentDeps::new(
        Arc::clone(&store) as _,
        Arc::clone(&bus) as _,
        Arc::new(ScriptedModel::new(responses).with_fallback("done")),
    );
    let engine = AgentEngine::new(config);
    let notifications = Arc::new(NotificationQueue::new());
    let ws = tempfile::tempdir().unwrap();
    let wiring =
        WiringConfig { project_key: "sci-calc".into(), workspace_root: ws.path().to_path_buf() };
    let supervisor = wire_engine(&engine, &deps, &wiring, Arc::clone(&notifications));
    let review = ReviewMachine::new(deps, "sci-calc", ws.path()).with_engine(engine.clone());
    World { engine, supervisor, review, store, bus, notifications, ws }
}

fn world(responses: Vec<&str>) -> World {
    world_with(EngineConfig::default(), responses)
}

async fn settle(engine: &AgentEngine) {
    for _ in 0..500 {
        if engine.list_active().is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("engine never settled");
}

// Scenario 1: happy-path advance through a ready stage.
#[tokio::test]
async fn happy_path_advance_records_completion_and_unblocks_downstream() {
    let w = world(vec![
        "Requirements drafted.\nartifact: aidlc-docs/inception/requirements/requirements.md",
    ]);

    let stage = w
        .store
        .create(
            NewIssue::task("Requirements Analysis", 1)
                .labels("phase:inception,stage:requirements-analysis,project:sci-calc"),
        )
        .await
        .unwrap();
    let gate = w
        .store
        .create(
            NewIssue::task("REVIEW: Requirements Analysis - Awaiting Approval", 0)
                .labels("phase:inception,type:review-gate,project:sci-calc")
                .notes("artifact: aidlc-docs/inception/requirements/requirements.md"),
        )
        .await
        .unwrap();
    w.store.add_dependency(&gate.id, &stage.id, "blocks").await.unwrap();

    let result = w.supervisor.run(SupervisorAction::Advance).await;
    assert!(result.contains("requirements-analysis"), "{result}");
    settle(&w.engine).await;

    let done = w.store.show(&stage.id).await.unwrap();
    assert_eq!(done.status, "done");
    let notes = done.notes.unwrap();
    assert!(notes.contains("Completed:"));
    assert!(notes.contains("artifact: aidlc-docs/inception/requirements/requirements.md"));

    // The downstream review gate is now the ready front of the graph.
    let ready = w.store.ready().await.unwrap();
    assert!(ready.iter().any(|i| i.id == gate.id));
}

// Scenario 2: approve then advance dispatches the next stage.
#[tokio::test]
async fn approve_then_advance_dispatches_next_stage() {
    let w = world(vec!["Planned.\nartifact: aidlc-docs/inception/plans/execution-plan.md"]);

    let gate = w
        .store
        .create(
            NewIssue::task("REVIEW: Requirements Analysis - Awaiting Approval", 0)
                .labels("type:review-gate,project:sci-calc")
                .notes("artifact: aidlc-docs/inception/requirements/requirements.md"),
        )
        .await
        .unwrap();
    let next = w
        .store
        .create(
            NewIssue::task("Workflow Planning", 1)
                .labels("phase:inception,stage:workflow-planning,project:sci-calc"),
        )
        .await
        .unwrap();
    w.store.add_dependency(&next.id, &gate.id, "blocks").await.unwrap();

    w.review.approve(&gate.id, Some("ok"), None).await.unwrap();
    assert_eq!(w.store.show(&gate.id).await.unwrap().status, "done");

    // The approval message nudges the supervisor; here we advance directly.
    let result = w.supervisor.run(SupervisorAction::Advance).await;
    assert!(result.contains("workflow-planning"), "{result}");
    assert!(result.contains("Planner"), "{result}");
    settle(&w.engine).await;
    assert_eq!(w.store.show(&next.id).await.unwrap().status, "done");
}

// Scenario 3: reject → rework → corrected artifact resubmitted.
#[tokio::test]
async fn reject_runs_rework_cycle_and_rewrites_artifact() {
    let w = world(vec![
        "```markdown\n# Requirements v2\n\nNow with the NFR section.\n```",
    ]);

    let artifact = "aidlc-docs/inception/requirements/requirements.md";
    let full = w.ws.path().join(artifact);
    tokio::fs::create_dir_all(full.parent().unwrap()).await.unwrap();
    tokio::fs::write(&full, "# Requirements v1\n").await.unwrap();

    let gate = w
        .store
        .create(
            NewIssue::task("REVIEW: Requirements Analysis - Awaiting Approval", 0)
                .labels("type:review-gate,project:sci-calc")
                .notes(format!("artifact: {artifact}")),
        )
        .await
        .unwrap();

    w.review.reject(&gate.id, "missing the NFR section").await.unwrap();
    settle(&w.engine).await;

    // Gibbon ran once and the artifact was rewritten, non-empty.
    let spawned = w.engine.list_all();
    assert!(spawned.iter().any(|a| a.worker == WorkerKind::Gibbon));
    let rewritten = tokio::fs::read_to_string(&full).await.unwrap();
    assert!(rewritten.contains("Requirements v2"));
    assert!(!rewritten.is_empty());
    assert!(w.store.show(&gate.id).await.unwrap().notes.unwrap().contains("REJECTED:"));
}

// Scenario 4: rework exhaustion escalates without calling the model.
#[tokio::test]
async fn rework_exhaustion_escalates_to_the_human() {
    let w = world(vec![]);
    let artifact = "aidlc-docs/inception/requirements/requirements.md";
    let gate = w
        .store
        .create(
            NewIssue::task("REVIEW: Requirements Analysis - Awaiting Approval", 0)
                .labels("type:review-gate,project:sci-calc")
                .notes(format!(
                    "artifact: {artifact}\nREJECTED: r1\nREJECTED: r2\nREJECTED: r3"
                )),
        )
        .await
        .unwrap();

    // Fourth rejection: retry budget (3) is already spent.
    w.review.reject(&gate.id, "still wrong").await.unwrap();
    settle(&w.engine).await;

    let escalations = w.bus.sent_to(HUMAN_SUPERVISOR);
    assert!(
        escalations.iter().any(|m| {
            m.subject.contains("Rework exhausted") && m.importance == Importance::High
        }),
        "no exhaustion escalation in {escalations:?}"
    );
}

// Scenario 5: five spawns under ceiling 2 — see gt-engine unit tests for
// the peak-concurrency assertion; here the wired system drains them all.
#[tokio::test]
async fn concurrent_spawns_under_low_ceiling_all_terminate() {
    let w = world_with(
        EngineConfig { max_concurrent_agents: 2, agent_timeout: Duration::from_secs(30) },
        vec![],
    );
    let ws = tempfile::tempdir().unwrap();
    let dispatch = gt_core::DispatchEnvelope::builder("anything", "gt-1", "sci-calc", ws.path())
        .build();
    let context = serde_json::json!({"dispatch": serde_json::to_value(&dispatch).unwrap()});

    let ids: Vec<String> = (0..5)
        .map(|_| {
            w.engine
                .spawn(WorkerKind::Troop, context.clone(), "sci-calc", None)
                .unwrap()
                .agent_id
        })
        .collect();

    // The ceiling holds at every observation point.
    for _ in 0..200 {
        assert!(w.engine.running_count() <= 2);
        if w.engine.list_active().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    settle(&w.engine).await;
    for id in ids {
        assert!(w.engine.get(&id).unwrap().status.is_terminal());
    }
}

// Scenario 6 (timeout + slot release) lives in gt-engine's unit tests
// where the runner can be made to hang deterministically.

// Scenario 7: investigator fix path.
#[tokio::test]
async fn investigator_fix_path_messages_source_worker() {
    let w = world(vec![
        "{\"root_cause\": \"stale context\", \"fix_suggested\": true, \
         \"fix_description\": \"reload and rerun\", \"target_agent\": \"Sage\"}",
    ]);
    let ws = tempfile::tempdir().unwrap();
    let dispatch = gt_core::DispatchEnvelope::builder("error-investigation", "gt-5", "sci-calc", ws.path())
        .assigned_worker(WorkerKind::CuriousGeorge)
        .instructions(
            serde_json::json!({
                "error_message": "Sage blew up",
                "source_agent": "Sage",
                "affected_issue_id": "gt-5",
            })
            .to_string(),
        )
        .build();
    let context = serde_json::json!({"dispatch": serde_json::to_value(&dispatch).unwrap()});

    w.engine.spawn(WorkerKind::CuriousGeorge, context, "sci-calc", Some("gt-5".into())).unwrap();
    settle(&w.engine).await;

    let to_sage = w.bus.sent_to("Sage");
    assert_eq!(to_sage.len(), 1);
    assert_eq!(to_sage[0].importance, Importance::High);
    assert!(w.bus.sent_to(HUMAN_SUPERVISOR).is_empty());
}

// Scenario 8: investigator escalation path.
#[tokio::test]
async fn investigator_escalation_path_messages_human_only() {
    let w = world(vec![
        "{\"root_cause\": \"infrastructure\", \"fix_suggested\": false, \
         \"escalation_reason\": \"needs operator\"}",
    ]);
    let ws = tempfile::tempdir().unwrap();
    let dispatch = gt_core::DispatchEnvelope::builder("error-investigation", "gt-5", "sci-calc", ws.path())
        .assigned_worker(WorkerKind::CuriousGeorge)
        .instructions(
            serde_json::json!({
                "error_message": "Forge blew up",
                "source_agent": "Forge",
                "affected_issue_id": "gt-5",
            })
            .to_string(),
        )
        .build();
    let context = serde_json::json!({"dispatch": serde_json::to_value(&dispatch).unwrap()});

    w.engine.spawn(WorkerKind::CuriousGeorge, context, "sci-calc", Some("gt-5".into())).unwrap();
    settle(&w.engine).await;

    assert_eq!(w.bus.sent_to(HUMAN_SUPERVISOR).len(), 1);
    assert!(w.bus.sent_to("Forge").is_empty());
}

// Full pipeline: initialize scaffolds the graph and runs it to the first
// human gate.
#[tokio::test]
async fn initialize_runs_to_the_first_review_gate() {
    let w = world(vec![
        // Scout: workspace detection.
        "Workspace scanned. Greenfield.\nartifact: aidlc-docs/inception/workspace/workspace.md",
        // Sage: requirements analysis.
        "Requirements drafted.\nartifact: aidlc-docs/inception/requirements/requirements.md",
    ]);

    let result = w.supervisor.run(SupervisorAction::Initialize).await;
    assert!(result.contains("workspace-detection"), "{result}");
    settle(&w.engine).await;

    // Workspace detection and requirements analysis are done; the
    // requirements review gate blocks further progress.
    let all = w.store.list(IssueFilter::default()).await.unwrap();
    let by_stage = |slug: &str| {
        all.iter().find(|i| i.stage() == Some(slug)).map(|i| i.status.clone()).unwrap_or_default()
    };
    assert_eq!(by_stage("workspace-detection"), "done");
    assert_eq!(by_stage("requirements-analysis"), "done");

    let gates_open = all
        .iter()
        .filter(|i| i.has_label("type:review-gate") && i.status == "open")
        .count();
    assert!(gates_open >= 1);

    let status = w.supervisor.run(SupervisorAction::Advance).await;
    assert!(
        status.contains("Waiting") || status.contains("No actionable"),
        "expected a blocked report, got: {status}"
    );
}

// Idempotence: initialize twice equals once.
#[tokio::test]
async fn initialize_twice_is_idempotent() {
    let w = world(vec![]);
    w.supervisor.run(SupervisorAction::Initialize).await;
    settle(&w.engine).await;
    let count = w.store.list(IssueFilter::default()).await.unwrap().len();

    w.supervisor.run(SupervisorAction::Initialize).await;
    settle(&w.engine).await;
    assert_eq!(w.store.list(IssueFilter::default()).await.unwrap().len(), count);
}

// Shutdown: spawns refused, active drained.
#[tokio::test]
async fn shutdown_refuses_spawns_and_drains() {
    let w = world(vec![]);
    w.engine.shutdown(Duration::from_secs(1)).await;
    assert!(w.engine.list_active().is_empty());
    let err = w
        .engine
        .spawn(WorkerKind::Troop, serde_json::json!({}), "sci-calc", None)
        .unwrap_err();
    assert!(err.to_string().contains("shutting down"));
}

// Notifications surface rejections to the operator in priority order.
#[tokio::test]
async fn rejection_notifications_are_priority_ordered() {
    let w = world(vec![]);
    w.notifications.create(
        gt_core::NotificationKind::Info,
        "background note",
        "",
        "sci-calc",
        3,
        None,
    );
    w.notifications.create(
        gt_core::NotificationKind::Escalation,
        "rework exhausted",
        "",
        "sci-calc",
        0,
        Some("gt-42".into()),
    );

    let unread = w.notifications.get_unread(Some("sci-calc"), 10);
    assert_eq!(unread[0].title, "rework exhausted");
    assert_eq!(unread[1].title, "background note");
}

// Engine observers stay consistent while workers run.
#[tokio::test]
async fn spawned_instances_reach_exactly_one_terminal_state() {
    let w = world(vec![]);
    let ws = tempfile::tempdir().unwrap();
    let dispatch =
        gt_core::DispatchEnvelope::builder("user-stories", "gt-8", "sci-calc", ws.path()).build();
    let context = serde_json::json!({"dispatch": serde_json::to_value(&dispatch).unwrap()});

    let instance = w.engine.spawn(WorkerKind::Bard, context, "sci-calc", None).unwrap();
    assert_eq!(instance.status, AgentStatus::Starting);
    settle(&w.engine).await;

    let terminal = w.engine.get(&instance.agent_id).unwrap();
    assert!(terminal.status.is_terminal());
}
