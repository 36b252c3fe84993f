// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gt-agents: the troop.
//!
//! The worker base contract, the eight stage specialists, the per-project
//! supervisor, the review/rework machine, and the cross-cutting workers
//! (error investigator, security scanner, monitor, write-guard gateway),
//! plus the wiring that registers them all with the engine.

pub mod base;
pub mod chimp;
pub mod deps;
pub mod error;
pub mod gateway;
pub mod investigator;
pub mod monitor;
pub mod retry;
pub mod review;
pub mod rework;
pub mod security;
pub mod supervisor;
pub mod tools;
pub mod wiring;

pub use base::{load_context, Worker};
pub use chimp::StageWorker;
pub use deps::{AgentDeps, HUMAN_SUPERVISOR, INVESTIGATOR_IDENTITY};
pub use error::AgentError;
pub use gateway::GuardGateway;
pub use investigator::ErrorInvestigator;
pub use monitor::MonitorWorker;
pub use retry::{with_retry, RetryPolicy};
pub use review::{ReviewError, ReviewMachine};
pub use rework::{ReworkWorker, MAX_REWORK_ITERATIONS};
pub use security::SecurityScanner;
pub use supervisor::{Supervisor, SupervisorAction};
pub use wiring::{wire_engine, WiringConfig};
