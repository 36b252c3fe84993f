// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared worker dependencies.

use gt_adapters::beads::IssueStore;
use gt_adapters::llm::LanguageModel;
use gt_adapters::mail::MessageBus;
use std::sync::Arc;

/// The identity escalations are addressed to. Harmbe is the sole human
/// interface of the troop.
pub const HUMAN_SUPERVISOR: &str = "Harmbe";

/// The identity failed workers report to.
pub const INVESTIGATOR_IDENTITY: &str = "CuriousGeorge";

/// External collaborators handed to every worker.
#[derive(Clone)]
pub struct AgentDeps {
    pub store: Arc<dyn IssueStore>,
    pub bus: Arc<dyn MessageBus>,
    pub model: Arc<dyn LanguageModel>,
}

impl AgentDeps {
    pub fn new(
        store: Arc<dyn IssueStore>,
        bus: Arc<dyn MessageBus>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self { store, bus, model }
    }
}
