// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gt_adapters::beads::{InMemoryIssueStore, IssueStore, NewIssue};
use gt_adapters::llm::ScriptedModel;
use gt_adapters::mail::RecordingBus;
use gt_core::EngineConfig;

struct Fixture {
    machine: ReviewMachine,
    store: Arc<InMemoryIssueStore>,
    bus: Arc<RecordingBus>,
    engine: AgentEngine,
    ws: tempfile::TempDir,
}

fn fixture() -> Fixture {
    let store = Arc::new(InMemoryIssueStore::new());
    let bus = Arc::new(RecordingBus::new());
    let deps = AgentDeps::new(
        Arc::clone(&store) as _,
        Arc::clone(&bus) as _,
        Arc::new(ScriptedModel::new(vec![]).with_fallback("ok")),
    );
    let engine = AgentEngine::new(EngineConfig::default());
    let ws = tempfile::tempdir().unwrap();
    let machine = ReviewMachine::new(deps, "sci-calc", ws.path()).with_engine(engine.clone());
    Fixture { machine, store, bus, engine, ws }
}

async fn make_gate(store: &InMemoryIssueStore, artifact: Option<&str>) -> String {
    let mut new = NewIssue::task("REVIEW: Requirements Analysis - Awaiting Approval", 0)
        .labels("phase:inception,type:review-gate,project:sci-calc")
        .assignee("human");
    if let Some(artifact) = artifact {
        new = new.notes(format!("artifact: {artifact}"));
    }
    store.create(new).await.unwrap().id
}

#[tokio::test]
async fn approve_marks_done_and_notifies_supervisor() {
    let f = fixture();
    let gate_id = make_gate(&f.store, Some("aidlc-docs/inception/requirements/requirements.md"))
        .await;

    let result = f.machine.approve(&gate_id, Some("ok"), None).await.unwrap();
    assert!(result.contains("approved"));

    let gate = f.store.show(&gate_id).await.unwrap();
    assert_eq!(gate.status, "done");
    assert!(gate.notes.unwrap().contains("APPROVED. Feedback: ok"));

    let sent = f.bus.sent_to(WorkerKind::ProjectMinder.as_str());
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].thread_id.as_deref(), Some(format!("{gate_id}-review").as_str()));
}

#[tokio::test]
async fn approve_without_feedback_appends_bare_marker() {
    let f = fixture();
    let gate_id = make_gate(&f.store, None).await;
    f.machine.approve(&gate_id, None, None).await.unwrap();

    let notes = f.store.show(&gate_id).await.unwrap().notes.unwrap();
    assert!(notes.contains("APPROVED."));
    assert!(!notes.contains("Feedback:"));
}

#[tokio::test]
async fn approve_applies_operator_edit_to_artifact() {
    let f = fixture();
    let artifact = "aidlc-docs/inception/requirements/requirements.md";
    let full = f.ws.path().join(artifact);
    tokio::fs::create_dir_all(full.parent().unwrap()).await.unwrap();
    tokio::fs::write(&full, "# Draft\n").await.unwrap();
    let gate_id = make_gate(&f.store, Some(artifact)).await;

    f.machine
        .approve(&gate_id, Some("tightened wording"), Some("# Final\n\nEdited by operator.\n"))
        .await
        .unwrap();

    let content = tokio::fs::read_to_string(&full).await.unwrap();
    assert!(content.starts_with("# Final"));
}

#[tokio::test]
async fn reject_requires_feedback() {
    let f = fixture();
    let gate_id = make_gate(&f.store, None).await;
    let err = f.machine.reject(&gate_id, "   ").await.unwrap_err();
    assert!(matches!(err, ReviewError::FeedbackRequired));
}

#[tokio::test]
async fn reject_appends_feedback_and_spawns_gibbon() {
    let f = fixture();
    let artifact = "aidlc-docs/inception/requirements/requirements.md";
    let gate_id = make_gate(&f.store, Some(artifact)).await;

    f.machine.reject(&gate_id, "missing the NFR section").await.unwrap();

    let gate = f.store.show(&gate_id).await.unwrap();
    assert!(gate.notes.unwrap().contains("REJECTED: missing the NFR section"));

    // A Gibbon instance was spawned for the gate.
    let all = f.engine.list_all();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].worker, WorkerKind::Gibbon);
    assert_eq!(all[0].current_task.as_deref(), Some(gate_id.as_str()));
}

#[tokio::test]
async fn retry_count_increments_per_reject_cycle() {
    let f = fixture();
    let gate_id = make_gate(&f.store, Some("aidlc-docs/x.md")).await;

    // Capture the instructions Gibbon receives each cycle by registering
    // a recording runner.
    let seen = Arc::new(counts::Counts::default());
    {
        let seen = Arc::clone(&seen);
        f.engine.register_runner(
            WorkerKind::Gibbon,
            gt_engine::runner_fn(move |_instance, context| {
                let seen = Arc::clone(&seen);
                async move {
                    let dispatch: DispatchEnvelope = serde_json::from_value(
                        context.get("dispatch").cloned().unwrap_or_default(),
                    )
                    .map_err(|e| gt_engine::RunnerError::new(e.to_string()))?;
                    let instructions: serde_json::Value =
                        serde_json::from_str(dispatch.instructions.as_deref().unwrap_or("{}"))
                            .unwrap_or_default();
                    seen.push(
                        instructions.get("retry_count").and_then(|v| v.as_u64()).unwrap_or(99),
                    );
                    Ok(serde_json::json!({}))
                }
            }),
        );
    }

    f.machine.reject(&gate_id, "round one").await.unwrap();
    f.machine.reject(&gate_id, "round two").await.unwrap();
    f.machine.reject(&gate_id, "round three").await.unwrap();

    // Give the engine tasks a moment to run.
    for _ in 0..100 {
        if seen.len() == 3 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(seen.values(), vec![0, 1, 2]);
}

/// Tiny shared counter used by the retry-count test.
mod counts {
    #[derive(Default)]
    pub struct Counts(std::sync::Mutex<Vec<u64>>);

    impl Counts {
        pub fn push(&self, value: u64) {
            if let Ok(mut v) = self.0.lock() {
                v.push(value);
            }
        }

        pub fn len(&self) -> usize {
            self.0.lock().map(|v| v.len()).unwrap_or(0)
        }

        pub fn values(&self) -> Vec<u64> {
            self.0.lock().map(|v| v.clone()).unwrap_or_default()
        }
    }
}

#[tokio::test]
async fn reject_unknown_gate_is_store_error() {
    let f = fixture();
    let err = f.machine.reject("gt-404", "feedback").await.unwrap_err();
    assert!(matches!(err, ReviewError::Store(_)));
}
