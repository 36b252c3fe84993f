// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Short-id generation for agents and notifications.
//!
//! Agent ids are `{worker}-{8 hex}` (e.g. `scout-3fa94c1b`), notification
//! ids are `notif-{8 hex}`. Ids are unique per process lifetime; there is
//! no cross-restart guarantee.

use crate::stage::WorkerKind;

/// Eight lowercase hex characters from a fresh v4 UUID.
pub fn short_hex() -> String {
    let mut hex = uuid::Uuid::new_v4().simple().to_string();
    hex.truncate(8);
    hex
}

/// Allocate an agent instance id for a worker type.
pub fn agent_id(kind: WorkerKind) -> String {
    format!("{}-{}", kind.as_str().to_lowercase(), short_hex())
}

/// Allocate a notification id.
pub fn notification_id() -> String {
    format!("notif-{}", short_hex())
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
