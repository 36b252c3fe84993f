// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_project_is_active_with_timestamp() {
    let p = ProjectState::new("sci-calc", "Scientific Calculator", "/tmp/sci-calc");
    assert_eq!(p.status, ProjectStatus::Active);
    assert!(p.paused_at.is_none());
    assert!(p.minder_agent_id.is_none());
    assert!(chrono::DateTime::parse_from_rfc3339(&p.created_at).is_ok());
}

#[test]
fn project_state_serde_round_trip() {
    let p = ProjectState::new("sci-calc", "Sci Calc", "/tmp/ws");
    let json = serde_json::to_string(&p).unwrap();
    let back: ProjectState = serde_json::from_str(&json).unwrap();
    assert_eq!(back, p);
}

#[yare::parameterized(
    simple       = { "scicalc", true },
    hyphenated   = { "sci-calc", true },
    underscored  = { "sci_calc_2", true },
    empty        = { "", false },
    spaced       = { "sci calc", false },
    slashed      = { "sci/calc", false },
    dotted       = { "sci.calc", false },
)]
fn key_validation(key: &str, expected: bool) {
    assert_eq!(valid_project_key(key), expected);
}
