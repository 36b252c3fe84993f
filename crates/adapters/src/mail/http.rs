// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC HTTP implementation of the message bus.
//!
//! The service exposes MCP-style tools at `/mcp`; each call is a
//! `tools/call` JSON-RPC request whose result carries a JSON payload in
//! `result.content[0].text`.

use super::{BusError, MailMessage, MessageBus, OutboundMessage};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpBusConfig {
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub timeout: Duration,
}

impl Default for HttpBusConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("AGENT_MAIL_URL")
                .unwrap_or_else(|_| "http://localhost:8765".to_string()),
            bearer_token: std::env::var("AGENT_MAIL_TOKEN").ok(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Production [`MessageBus`] over HTTP.
pub struct HttpBus {
    config: HttpBusConfig,
    client: reqwest::Client,
}

impl HttpBus {
    pub fn new(config: HttpBusConfig) -> Result<Self, BusError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BusError::Connection(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> Result<Self, BusError> {
        Self::new(HttpBusConfig::default())
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value, BusError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": uuid::Uuid::new_v4().to_string(),
            "method": "tools/call",
            "params": { "name": tool, "arguments": arguments },
        });

        let url = format!("{}/mcp", self.config.base_url.trim_end_matches('/'));
        let mut request = self.client.post(&url).json(&payload);
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                BusError::Timeout
            } else {
                BusError::Connection(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(BusError::Unauthorized { status: status.as_u16() });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BusError::Service(format!(
                "HTTP {}: {}",
                status.as_u16(),
                &body[..body.len().min(500)]
            )));
        }

        let data: Value =
            response.json().await.map_err(|e| BusError::Parse(e.to_string()))?;
        if let Some(err) = data.get("error") {
            return Err(BusError::Service(format!(
                "[{}] {}",
                err.get("code").and_then(Value::as_i64).unwrap_or_default(),
                err.get("message").and_then(Value::as_str).unwrap_or("unknown error"),
            )));
        }

        // Tool results arrive as result.content[0].text holding a JSON string.
        let text = data
            .pointer("/result/content/0/text")
            .and_then(Value::as_str)
            .unwrap_or("{}");
        serde_json::from_str(text).or(Ok(Value::String(text.to_string())))
    }
}

#[async_trait]
impl MessageBus for HttpBus {
    async fn ensure_project(&self, project: &str) -> Result<(), BusError> {
        self.call_tool("ensure_project", json!({ "project": project })).await?;
        Ok(())
    }

    async fn register_agent(&self, project: &str, identity: &str) -> Result<(), BusError> {
        self.call_tool(
            "register_agent",
            json!({ "project": project, "agent_name": identity }),
        )
        .await?;
        Ok(())
    }

    async fn send(&self, project: &str, message: OutboundMessage) -> Result<(), BusError> {
        let mut arguments = json!({
            "project": project,
            "from_agent": message.from,
            "to_agents": message.to,
            "cc_agents": message.cc,
            "subject": message.subject,
            "body": message.body,
            "importance": message.importance.to_string(),
        });
        if let Some(thread_id) = &message.thread_id {
            arguments["thread_id"] = json!(thread_id);
        }
        if message.ack_required {
            arguments["ack_required"] = json!(true);
        }
        tracing::debug!(
            to = ?message.to,
            subject = %message.subject,
            importance = %message.importance,
            "sending bus message"
        );
        self.call_tool("send_message", arguments).await?;
        Ok(())
    }

    async fn fetch_inbox(
        &self,
        project: &str,
        identity: &str,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<MailMessage>, BusError> {
        let result = self
            .call_tool(
                "fetch_inbox",
                json!({
                    "project": project,
                    "agent_name": identity,
                    "unread_only": unread_only,
                    "limit": limit,
                }),
            )
            .await?;
        parse_messages(result)
    }

    async fn acknowledge(
        &self,
        project: &str,
        identity: &str,
        message_id: &str,
    ) -> Result<(), BusError> {
        self.call_tool(
            "acknowledge_message",
            json!({ "project": project, "agent_name": identity, "message_id": message_id }),
        )
        .await?;
        Ok(())
    }

    async fn search(&self, project: &str, query: &str) -> Result<Vec<MailMessage>, BusError> {
        let result = self
            .call_tool("search_messages", json!({ "project": project, "query": query }))
            .await?;
        parse_messages(result)
    }

    async fn reserve_paths(
        &self,
        project: &str,
        identity: &str,
        paths: &[String],
        reason: Option<&str>,
    ) -> Result<String, BusError> {
        let result = self
            .call_tool(
                "reserve_paths",
                json!({
                    "project": project,
                    "agent_name": identity,
                    "paths": paths,
                    "reason": reason,
                }),
            )
            .await?;
        result
            .get("reservation_id")
            .or_else(|| result.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| BusError::Parse("no reservation id in response".into()))
    }

    async fn release_reservation(
        &self,
        project: &str,
        reservation_id: &str,
    ) -> Result<(), BusError> {
        self.call_tool(
            "release_reservation",
            json!({ "project": project, "reservation_id": reservation_id }),
        )
        .await?;
        Ok(())
    }
}

fn parse_messages(result: Value) -> Result<Vec<MailMessage>, BusError> {
    let items = match result {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("messages") {
            Some(Value::Array(items)) => items,
            _ => return Ok(Vec::new()),
        },
        _ => return Ok(Vec::new()),
    };
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(|e| BusError::Parse(e.to_string())))
        .collect()
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
