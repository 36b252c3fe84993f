// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine wiring.
//!
//! Registers a runner for every worker type. Stage workers (and the
//! Troop fallback) get a fresh instance per invocation and route their
//! completion back into the supervisor, which records it and advances.
//! Cross-cutting workers return their completion without advancing the
//! graph.

use crate::base::Worker;
use crate::chimp::StageWorker;
use crate::deps::AgentDeps;
use crate::gateway::GuardGateway;
use crate::investigator::ErrorInvestigator;
use crate::monitor::MonitorWorker;
use crate::rework::ReworkWorker;
use crate::security::SecurityScanner;
use crate::supervisor::{Supervisor, SupervisorAction};
use gt_core::{CompletionEnvelope, DispatchEnvelope, WorkerKind};
use gt_engine::{runner_fn, AgentEngine, NotificationQueue, RunnerError};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct WiringConfig {
    pub project_key: String,
    pub workspace_root: PathBuf,
}

fn parse_dispatch(context: &Value) -> Result<DispatchEnvelope, RunnerError> {
    let value = context
        .get("dispatch")
        .cloned()
        .ok_or_else(|| RunnerError::new("no dispatch in context"))?;
    serde_json::from_value(value).map_err(|e| RunnerError::new(format!("bad dispatch: {e}")))
}

fn completion_result(completion: &CompletionEnvelope) -> Value {
    json!({
        "status": completion.status,
        "summary": completion.summary,
        "output_artifacts": completion.output_artifacts,
    })
}

fn register_cross_cutting<W, F>(
    engine: &AgentEngine,
    deps: &AgentDeps,
    kind: WorkerKind,
    factory: F,
) where
    W: Worker + 'static,
    F: Fn(AgentDeps) -> W + Send + Sync + 'static,
{
    let deps = deps.clone();
    engine.register_runner(
        kind,
        runner_fn(move |_instance, context| {
            let worker = factory(deps.clone());
            async move {
                let dispatch = parse_dispatch(&context)?;
                let completion = worker.handle_dispatch(&dispatch).await;
                Ok(completion_result(&completion))
            }
        }),
    );
}

/// Register all worker runners and return the project's supervisor.
///
/// Each invocation builds a fresh worker, so no conversation state leaks
/// between tasks.
pub fn wire_engine(
    engine: &AgentEngine,
    deps: &AgentDeps,
    config: &WiringConfig,
    notifications: Arc<NotificationQueue>,
) -> Arc<Supervisor> {
    let supervisor = Arc::new(
        Supervisor::new(deps.clone(), config.project_key.clone(), config.workspace_root.clone())
            .with_engine(engine.clone())
            .with_notifications(notifications),
    );

    // The supervisor runs as a worker too, routed by the action tag.
    {
        let supervisor = Arc::clone(&supervisor);
        engine.register_runner(
            WorkerKind::ProjectMinder,
            runner_fn(move |_instance, context| {
                let supervisor = Arc::clone(&supervisor);
                async move {
                    let action = SupervisorAction::from_context(&context);
                    let summary = supervisor.run(action).await;
                    Ok(json!({ "summary": summary }))
                }
            }),
        );
    }

    // Stage specialists and the generic fallback: completion flows back
    // into the supervisor so the graph keeps moving.
    for kind in WorkerKind::stage_workers().into_iter().chain([WorkerKind::Troop]) {
        let deps = deps.clone();
        let supervisor = Arc::clone(&supervisor);
        engine.register_runner(
            kind,
            runner_fn(move |_instance, context| {
                let worker = StageWorker::new(kind, deps.clone());
                let supervisor = Arc::clone(&supervisor);
                async move {
                    let dispatch = parse_dispatch(&context)?;
                    let completion = worker.handle_dispatch(&dispatch).await;
                    let result = completion_result(&completion);
                    supervisor.run(SupervisorAction::HandleCompletion(completion)).await;
                    Ok(result)
                }
            }),
        );
    }

    register_cross_cutting(engine, deps, WorkerKind::Gibbon, ReworkWorker::new);
    register_cross_cutting(engine, deps, WorkerKind::CuriousGeorge, ErrorInvestigator::new);
    register_cross_cutting(engine, deps, WorkerKind::Snake, SecurityScanner::new);
    register_cross_cutting(engine, deps, WorkerKind::Groomer, MonitorWorker::new);
    register_cross_cutting(engine, deps, WorkerKind::Bonobo, GuardGateway::new);

    tracing::info!(project = %config.project_key, "engine wired");
    supervisor
}

#[cfg(test)]
#[path = "wiring_tests.rs"]
mod tests;
