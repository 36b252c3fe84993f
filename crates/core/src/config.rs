// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration.
//!
//! The two environment-derived values the runtime reads but does not own:
//! concurrency ceiling and per-invocation timeout. Everything else (model
//! id, bus URL, ...) belongs to the adapters.

use std::time::Duration;

pub const DEFAULT_MAX_CONCURRENT_AGENTS: usize = 4;
pub const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(3600);

/// Configuration for the agent execution engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Admission-gate width: at most this many runners execute at once.
    pub max_concurrent_agents: usize,
    /// Hard deadline for a single runner, measured from admission.
    pub agent_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_agents: DEFAULT_MAX_CONCURRENT_AGENTS,
            agent_timeout: DEFAULT_AGENT_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// Read `GT_MAX_CONCURRENT_AGENTS` and `GT_AGENT_TIMEOUT_SECS`,
    /// falling back to the defaults for missing or unparseable values.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(n) = read_env_parse::<usize>("GT_MAX_CONCURRENT_AGENTS") {
            if n > 0 {
                config.max_concurrent_agents = n;
            }
        }
        if let Some(secs) = read_env_parse::<u64>("GT_AGENT_TIMEOUT_SECS") {
            if secs > 0 {
                config.agent_timeout = Duration::from_secs(secs);
            }
        }
        config
    }
}

fn read_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
