// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gt-adapters: clients for the runtime's external collaborators.
//!
//! The issue store (`bd` CLI), the message bus (JSON-RPC over HTTP), the
//! language model, the artifact scaffolding layout, and the write guards.
//! Each seam is an object-safe trait with a production implementation and,
//! behind the `test-support` feature, an in-memory fake.

pub mod beads;
pub mod guard;
pub mod llm;
pub mod mail;
pub mod scribe;
pub mod subprocess;

pub use beads::{BeadsCli, BeadsError, IssueFilter, IssueRecord, IssueStore, IssueUpdate, NewIssue};
#[cfg(any(test, feature = "test-support"))]
pub use beads::InMemoryIssueStore;
pub use guard::{AuditLog, FileGuard, GitGuard, GuardError, IssueGuard, Validation};
pub use llm::{LanguageModel, LlmError, ModelEndpoint};
#[cfg(any(test, feature = "test-support"))]
pub use llm::ScriptedModel;
pub use mail::{BusError, Importance, MailMessage, MessageBus, OutboundMessage};
#[cfg(any(test, feature = "test-support"))]
pub use mail::RecordingBus;
pub use subprocess::{run_with_timeout, SubprocessError};
