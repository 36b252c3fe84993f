// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recording bus for tests: every send is captured, inboxes are scripted.

use super::{BusError, MailMessage, MessageBus, OutboundMessage};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// In-memory [`MessageBus`] that records sends and serves scripted inboxes.
#[derive(Default)]
pub struct RecordingBus {
    sent: Mutex<Vec<(String, OutboundMessage)>>,
    inbox: Mutex<VecDeque<MailMessage>>,
    acknowledged: Mutex<Vec<String>>,
    registered: Mutex<Vec<(String, String)>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages sent so far, as (project, message).
    pub fn sent(&self) -> Vec<(String, OutboundMessage)> {
        self.sent.lock().clone()
    }

    /// Messages sent to a specific identity.
    pub fn sent_to(&self, identity: &str) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .iter()
            .filter(|(_, m)| m.to.iter().any(|t| t == identity))
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Queue a message for the next `fetch_inbox`.
    pub fn push_inbox(&self, message: MailMessage) {
        self.inbox.lock().push_back(message);
    }

    pub fn acknowledged(&self) -> Vec<String> {
        self.acknowledged.lock().clone()
    }

    pub fn registered(&self) -> Vec<(String, String)> {
        self.registered.lock().clone()
    }
}

#[async_trait]
impl MessageBus for RecordingBus {
    async fn ensure_project(&self, _project: &str) -> Result<(), BusError> {
        Ok(())
    }

    async fn register_agent(&self, project: &str, identity: &str) -> Result<(), BusError> {
        self.registered.lock().push((project.to_string(), identity.to_string()));
        Ok(())
    }

    async fn send(&self, project: &str, message: OutboundMessage) -> Result<(), BusError> {
        self.sent.lock().push((project.to_string(), message));
        Ok(())
    }

    async fn fetch_inbox(
        &self,
        _project: &str,
        _identity: &str,
        _unread_only: bool,
        limit: usize,
    ) -> Result<Vec<MailMessage>, BusError> {
        let mut inbox = self.inbox.lock();
        let take = limit.min(inbox.len());
        Ok(inbox.drain(..take).collect())
    }

    async fn acknowledge(
        &self,
        _project: &str,
        _identity: &str,
        message_id: &str,
    ) -> Result<(), BusError> {
        self.acknowledged.lock().push(message_id.to_string());
        Ok(())
    }

    async fn search(&self, _project: &str, query: &str) -> Result<Vec<MailMessage>, BusError> {
        Ok(self
            .sent
            .lock()
            .iter()
            .filter(|(_, m)| m.subject.contains(query) || m.body.contains(query))
            .map(|(_, m)| MailMessage {
                id: String::new(),
                subject: m.subject.clone(),
                body: m.body.clone(),
                from_agent: m.from.clone(),
                to_agents: m.to.clone(),
                thread_id: m.thread_id.clone(),
                importance: m.importance,
                created_at: String::new(),
                acknowledged: false,
            })
            .collect())
    }

    async fn reserve_paths(
        &self,
        _project: &str,
        _identity: &str,
        _paths: &[String],
        _reason: Option<&str>,
    ) -> Result<String, BusError> {
        Ok("res-1".to_string())
    }

    async fn release_reservation(
        &self,
        _project: &str,
        _reservation_id: &str,
    ) -> Result<(), BusError> {
        Ok(())
    }
}
