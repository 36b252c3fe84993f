// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent execution engine.
//!
//! Owns every agent invocation in-process: admission under a counting
//! semaphore, execution via the registered runner, a hard per-invocation
//! deadline, cooperative cancellation, and orderly shutdown. Runner
//! failures are recorded on the instance, never propagated out of the
//! engine.

use gt_core::{AgentInstance, AgentStatus, Clock, EngineConfig, SystemClock, WorkerKind};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Grace period for `stop` and post-shutdown cancellation.
const STOP_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine is shutting down, cannot spawn new agents")]
    ShuttingDown,
    #[error("unknown agent: {0}")]
    UnknownAgent(String),
}

/// Error surfaced by a runner. The engine records it and moves on.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct RunnerError(pub String);

impl RunnerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// An execution function for one worker type.
///
/// Receives a snapshot of the instance and an opaque context map; returns
/// a semantic result map.
#[async_trait::async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, instance: AgentInstance, context: Value) -> Result<Value, RunnerError>;
}

struct FnRunner<F>(F);

#[async_trait::async_trait]
impl<F, Fut> AgentRunner for FnRunner<F>
where
    F: Fn(AgentInstance, Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, RunnerError>> + Send,
{
    async fn run(&self, instance: AgentInstance, context: Value) -> Result<Value, RunnerError> {
        (self.0)(instance, context).await
    }
}

/// Wrap an async closure as an [`AgentRunner`].
pub fn runner_fn<F, Fut>(f: F) -> Arc<dyn AgentRunner>
where
    F: Fn(AgentInstance, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, RunnerError>> + Send + 'static,
{
    Arc::new(FnRunner(f))
}

struct Inner {
    config: EngineConfig,
    semaphore: Semaphore,
    shutting_down: AtomicBool,
    agents: Mutex<HashMap<String, AgentInstance>>,
    runners: Mutex<HashMap<WorkerKind, Arc<dyn AgentRunner>>>,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
    cancels: Mutex<HashMap<String, CancellationToken>>,
}

impl Inner {
    /// Move an instance to `status` unless it already reached a terminal
    /// state. Terminal states are reached exactly once.
    fn transition(&self, agent_id: &str, status: AgentStatus) {
        let mut agents = self.agents.lock();
        if let Some(instance) = agents.get_mut(agent_id) {
            if !instance.status.is_terminal() {
                instance.status = status;
            }
        }
    }
}

/// The in-process scheduler for worker invocations.
#[derive(Clone)]
pub struct AgentEngine {
    inner: Arc<Inner>,
}

impl AgentEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                semaphore: Semaphore::new(config.max_concurrent_agents),
                config,
                shutting_down: AtomicBool::new(false),
                agents: Mutex::new(HashMap::new()),
                runners: Mutex::new(HashMap::new()),
                tasks: Mutex::new(HashMap::new()),
                cancels: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Install the execution function for a worker type. Idempotent; the
    /// latest registration wins.
    pub fn register_runner(&self, worker: WorkerKind, runner: Arc<dyn AgentRunner>) {
        self.inner.runners.lock().insert(worker, runner);
    }

    /// Spawn a new agent instance.
    ///
    /// Returns before the runner executes; the instance is `Starting` until
    /// the admission gate lets it through. Fails once shutdown has begun.
    pub fn spawn(
        &self,
        worker: WorkerKind,
        context: Value,
        project_key: &str,
        task_id: Option<String>,
    ) -> Result<AgentInstance, EngineError> {
        if self.inner.shutting_down.load(Ordering::SeqCst) {
            return Err(EngineError::ShuttingDown);
        }

        let instance =
            AgentInstance::new(worker, project_key, task_id.clone(), SystemClock.epoch_ms());
        let agent_id = instance.agent_id.clone();
        self.inner.agents.lock().insert(agent_id.clone(), instance.clone());

        let token = CancellationToken::new();
        self.inner.cancels.lock().insert(agent_id.clone(), token.clone());

        let inner = Arc::clone(&self.inner);
        let task_agent_id = agent_id.clone();
        let handle = tokio::spawn(async move {
            run_agent(inner, task_agent_id, context, token).await;
        });
        self.inner.tasks.lock().insert(agent_id.clone(), handle);

        tracing::info!(agent_id, worker = %worker, task = ?task_id, "agent spawned");
        Ok(instance)
    }

    /// Request cancellation of an agent.
    ///
    /// Grants up to ~5 s for the runner to wind down, then hard-cancels.
    /// The instance reaches `Stopped` either way and its slot is released.
    pub async fn stop(&self, agent_id: &str, reason: &str) -> Result<(), EngineError> {
        let known = self.inner.agents.lock().contains_key(agent_id);
        if !known {
            return Err(EngineError::UnknownAgent(agent_id.to_string()));
        }

        self.inner.transition(agent_id, AgentStatus::Stopping);
        if let Some(token) = self.inner.cancels.lock().get(agent_id) {
            token.cancel();
        }

        let handle = self.inner.tasks.lock().remove(agent_id);
        if let Some(handle) = handle {
            let abort = handle.abort_handle();
            if tokio::time::timeout(STOP_GRACE, handle).await.is_err() {
                // Runner ignored cancellation; reclaim the slot by force.
                abort.abort();
            }
        }
        // Whatever the runner did, the instance ends Stopped.
        self.inner.transition(agent_id, AgentStatus::Stopped);
        self.inner.cancels.lock().remove(agent_id);
        tracing::info!(agent_id, reason, "agent stopped");
        Ok(())
    }

    pub fn get(&self, agent_id: &str) -> Option<AgentInstance> {
        self.inner.agents.lock().get(agent_id).cloned()
    }

    /// Snapshot of active (starting or running) instances.
    pub fn list_active(&self) -> Vec<AgentInstance> {
        self.inner.agents.lock().values().filter(|a| a.is_active()).cloned().collect()
    }

    /// Snapshot of every instance, terminal ones included.
    pub fn list_all(&self) -> Vec<AgentInstance> {
        self.inner.agents.lock().values().cloned().collect()
    }

    /// Count of instances currently in `Running`.
    pub fn running_count(&self) -> usize {
        self.inner
            .agents
            .lock()
            .values()
            .filter(|a| a.status == AgentStatus::Running)
            .count()
    }

    /// Stop accepting spawns, wait up to `timeout` for active runners,
    /// cancel the remainder, and force every survivor to `Stopped`.
    pub async fn shutdown(&self, timeout: Duration) {
        self.inner.shutting_down.store(true, Ordering::SeqCst);
        tracing::info!(?timeout, "engine shutdown initiated");

        let handles: Vec<(String, JoinHandle<()>)> =
            self.inner.tasks.lock().drain().collect();

        let deadline = Instant::now() + timeout;
        let mut survivors = Vec::new();
        for (agent_id, handle) in handles {
            let abort = handle.abort_handle();
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, handle).await {
                Ok(_) => {}
                Err(_) => survivors.push((agent_id, abort)),
            }
        }

        if !survivors.is_empty() {
            tracing::warn!(count = survivors.len(), "cancelling runners that outlived shutdown");
            let tokens: Vec<CancellationToken> = {
                let cancels = self.inner.cancels.lock();
                survivors.iter().filter_map(|(id, _)| cancels.get(id).cloned()).collect()
            };
            for token in tokens {
                token.cancel();
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
            for (_, abort) in &survivors {
                abort.abort();
            }
        }

        // Force every surviving instance terminal.
        {
            let mut agents = self.inner.agents.lock();
            for instance in agents.values_mut() {
                if !instance.status.is_terminal() {
                    instance.status = AgentStatus::Stopped;
                }
            }
        }
        self.inner.cancels.lock().clear();
        let total = self.inner.agents.lock().len();
        tracing::info!(total, "engine shutdown complete");
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::SeqCst)
    }
}

/// Body of the spawned task for one agent invocation.
async fn run_agent(inner: Arc<Inner>, agent_id: String, context: Value, token: CancellationToken) {
    // Admission gate. Waiting agents stay Starting and can be cancelled
    // before ever running.
    let permit = tokio::select! {
        _ = token.cancelled() => {
            inner.transition(&agent_id, AgentStatus::Stopped);
            inner.tasks.lock().remove(&agent_id);
            return;
        }
        permit = inner.semaphore.acquire() => match permit {
            Ok(permit) => permit,
            Err(_) => {
                inner.transition(&agent_id, AgentStatus::Stopped);
                inner.tasks.lock().remove(&agent_id);
                return;
            }
        },
    };

    inner.transition(&agent_id, AgentStatus::Running);
    let snapshot = inner.agents.lock().get(&agent_id).cloned();
    let Some(snapshot) = snapshot else {
        drop(permit);
        return;
    };
    tracing::info!(agent_id, worker = %snapshot.worker, "agent running");

    let runner = inner.runners.lock().get(&snapshot.worker).cloned();
    match runner {
        None => {
            tracing::error!(agent_id, worker = %snapshot.worker, "no runner registered");
            inner.transition(&agent_id, AgentStatus::Error);
        }
        Some(runner) => {
            let worker = snapshot.worker;
            let deadline = inner.config.agent_timeout;
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!(agent_id, "agent cancelled");
                    inner.transition(&agent_id, AgentStatus::Stopped);
                }
                outcome = tokio::time::timeout(deadline, runner.run(snapshot, context)) => {
                    match outcome {
                        Err(_) => {
                            tracing::error!(
                                agent_id,
                                timeout_secs = deadline.as_secs(),
                                "agent timed out"
                            );
                            inner.transition(&agent_id, AgentStatus::Error);
                        }
                        Ok(Ok(_)) => {
                            tracing::info!(agent_id, worker = %worker, "agent completed");
                            inner.transition(&agent_id, AgentStatus::Stopped);
                        }
                        Ok(Err(e)) => {
                            tracing::error!(agent_id, error = %e, "agent failed");
                            inner.transition(&agent_id, AgentStatus::Error);
                        }
                    }
                }
            }
        }
    }

    // Slot released here regardless of outcome; a slow runner never
    // permanently consumes a permit.
    drop(permit);
    inner.tasks.lock().remove(&agent_id);
    inner.cancels.lock().remove(&agent_id);
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
