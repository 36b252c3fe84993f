// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker error classification.
//!
//! The retry helper only re-attempts transient failures: timeouts,
//! connection resets, and generic I/O faults from subprocess or HTTP
//! calls. Everything else propagates immediately.

use gt_adapters::beads::BeadsError;
use gt_adapters::guard::GuardError;
use gt_adapters::llm::LlmError;
use gt_adapters::mail::BusError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("operation timed out: {0}")]
    Timeout(String),
    #[error("connection failure: {0}")]
    Connection(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error(transparent)]
    Store(#[from] BeadsError),
    #[error(transparent)]
    Guard(#[from] GuardError),
    #[error("invalid dispatch: {0}")]
    InvalidDispatch(String),
}

impl AgentError {
    pub fn is_transient(&self) -> bool {
        match self {
            AgentError::Timeout(_) | AgentError::Connection(_) | AgentError::Io(_) => true,
            AgentError::Llm(e) => e.is_transient(),
            AgentError::Bus(e) => e.is_transient(),
            AgentError::Store(e) => e.is_transient(),
            AgentError::Guard(_) | AgentError::InvalidDispatch(_) => false,
        }
    }

    /// Short kind name for error-report subjects.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AgentError::Timeout(_) => "Timeout",
            AgentError::Connection(_) => "Connection",
            AgentError::Io(_) => "Io",
            AgentError::Llm(_) => "Llm",
            AgentError::Bus(_) => "Bus",
            AgentError::Store(_) => "Store",
            AgentError::Guard(_) => "Guard",
            AgentError::InvalidDispatch(_) => "InvalidDispatch",
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
