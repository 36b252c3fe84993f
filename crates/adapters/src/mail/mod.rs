// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message-bus client (Agent Mail).
//!
//! Inter-agent messaging over a JSON-RPC HTTP service. Thread ids tie
//! conversations to tracking issues; `#ops` carries the write-guard audit
//! stream.

mod http;
#[cfg(any(test, feature = "test-support"))]
mod recording;

pub use http::{HttpBus, HttpBusConfig};
#[cfg(any(test, feature = "test-support"))]
pub use recording::RecordingBus;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Audit channel for write-guard operations.
pub const OPS_CHANNEL: &str = "#ops";

pub fn dispatch_thread(issue_id: &str) -> String {
    format!("{issue_id}-dispatch")
}

pub fn review_thread(issue_id: &str) -> String {
    format!("{issue_id}-review")
}

pub fn qa_thread(issue_id: &str) -> String {
    format!("{issue_id}-qa")
}

pub fn error_thread(issue_id: &str) -> String {
    format!("{issue_id}-error")
}

pub fn escalation_thread(issue_id: &str) -> String {
    format!("{issue_id}-escalation")
}

pub fn rework_escalation_thread(issue_id: &str) -> String {
    format!("{issue_id}-rework-escalation")
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("cannot connect to message bus: {0}")]
    Connection(String),
    #[error("message bus request timed out")]
    Timeout,
    #[error("message bus authentication failed ({status})")]
    Unauthorized { status: u16 },
    #[error("message bus error: {0}")]
    Service(String),
    #[error("could not parse bus response: {0}")]
    Parse(String),
}

impl BusError {
    pub fn is_transient(&self) -> bool {
        matches!(self, BusError::Connection(_) | BusError::Timeout)
    }
}

/// Message importance. Escalations and error reports use High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    #[default]
    Normal,
    High,
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Importance::Low => "low",
            Importance::Normal => "normal",
            Importance::High => "high",
        })
    }
}

/// A message to send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub from: String,
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    pub subject: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub importance: Importance,
    #[serde(default)]
    pub ack_required: bool,
}

impl OutboundMessage {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: vec![to.into()],
            cc: Vec::new(),
            subject: subject.into(),
            body: body.into(),
            thread_id: None,
            importance: Importance::Normal,
            ack_required: false,
        }
    }

    pub fn cc(mut self, cc: Vec<String>) -> Self {
        self.cc = cc;
        self
    }

    pub fn thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }

    pub fn ack_required(mut self) -> Self {
        self.ack_required = true;
        self
    }
}

/// A received message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MailMessage {
    pub id: String,
    pub subject: String,
    pub body: String,
    pub from_agent: String,
    #[serde(default)]
    pub to_agents: Vec<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub importance: Importance,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub acknowledged: bool,
}

/// The inter-agent message bus.
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn ensure_project(&self, project: &str) -> Result<(), BusError>;
    async fn register_agent(&self, project: &str, identity: &str) -> Result<(), BusError>;
    async fn send(&self, project: &str, message: OutboundMessage) -> Result<(), BusError>;
    async fn fetch_inbox(
        &self,
        project: &str,
        identity: &str,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<MailMessage>, BusError>;
    async fn acknowledge(
        &self,
        project: &str,
        identity: &str,
        message_id: &str,
    ) -> Result<(), BusError>;
    async fn search(&self, project: &str, query: &str) -> Result<Vec<MailMessage>, BusError>;
    /// Advisory path lease; returns a reservation id.
    async fn reserve_paths(
        &self,
        project: &str,
        identity: &str,
        paths: &[String],
        reason: Option<&str>,
    ) -> Result<String, BusError>;
    async fn release_reservation(
        &self,
        project: &str,
        reservation_id: &str,
    ) -> Result<(), BusError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
