// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gt_core::{ProjectState, ProjectStatus};

#[test]
fn create_get_list() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ProjectRegistry::open(dir.path()).unwrap();

    let project = registry.create("sci-calc", "Sci Calc", "/tmp/sci").unwrap();
    assert_eq!(project.status, ProjectStatus::Active);
    assert_eq!(registry.get("sci-calc").unwrap().name, "Sci Calc");
    assert_eq!(registry.list(None).len(), 1);
    assert!(registry.list(Some(ProjectStatus::Paused)).is_empty());
}

#[test]
fn duplicate_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ProjectRegistry::open(dir.path()).unwrap();
    registry.create("p", "P", "/tmp/p").unwrap();
    assert!(matches!(
        registry.create("p", "P again", "/tmp/p2"),
        Err(RegistryError::AlreadyExists(_))
    ));
}

#[test]
fn invalid_keys_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ProjectRegistry::open(dir.path()).unwrap();
    for key in ["", "a b", "x/y", "dots.here"] {
        assert!(matches!(
            registry.create(key, "n", "/tmp"),
            Err(RegistryError::InvalidKey(_))
        ));
    }
}

#[test]
fn load_save_round_trips_state() {
    let dir = tempfile::tempdir().unwrap();
    {
        let registry = ProjectRegistry::open(dir.path()).unwrap();
        registry.create("alpha", "Alpha", "/tmp/a").unwrap();
        registry.create("beta", "Beta", "/tmp/b").unwrap();
        registry.pause("beta").unwrap();
        registry.set_minder("alpha", Some("projectminder-12ab34cd".into())).unwrap();
    }

    // Fresh open from disk sees identical state.
    let reopened = ProjectRegistry::open(dir.path()).unwrap();
    assert_eq!(reopened.list(None).len(), 2);
    let beta = reopened.get("beta").unwrap();
    assert_eq!(beta.status, ProjectStatus::Paused);
    assert!(beta.paused_at.is_some());
    assert_eq!(
        reopened.get("alpha").unwrap().minder_agent_id.as_deref(),
        Some("projectminder-12ab34cd")
    );
}

#[test]
fn pause_resume_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ProjectRegistry::open(dir.path()).unwrap();
    registry.create("p", "P", "/tmp/p").unwrap();

    registry.pause("p").unwrap();
    assert_eq!(registry.get("p").unwrap().status, ProjectStatus::Paused);

    registry.resume("p").unwrap();
    let project = registry.get("p").unwrap();
    assert_eq!(project.status, ProjectStatus::Active);
    assert!(project.paused_at.is_none());
}

#[test]
fn delete_removes_and_unknown_errors() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ProjectRegistry::open(dir.path()).unwrap();
    registry.create("p", "P", "/tmp/p").unwrap();
    registry.delete("p").unwrap();
    assert!(registry.get("p").is_none());
    assert!(matches!(registry.delete("p"), Err(RegistryError::NotFound(_))));
    assert!(matches!(registry.pause("p"), Err(RegistryError::NotFound(_))));
}

#[test]
fn registry_file_lands_at_known_path() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ProjectRegistry::open(dir.path()).unwrap();
    registry.create("p", "P", "/tmp/p").unwrap();

    let path = dir.path().join(".gorilla-troop/projects.json");
    assert!(path.exists());
    let raw = std::fs::read_to_string(path).unwrap();
    let parsed: std::collections::BTreeMap<String, ProjectState> =
        serde_json::from_str(&raw).unwrap();
    assert!(parsed.contains_key("p"));

    // No temp file left behind after the atomic replace.
    assert!(!dir.path().join(".gorilla-troop/projects.json.tmp").exists());
}

#[test]
fn corrupt_registry_is_an_error_not_data_loss() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(".gorilla-troop")).unwrap();
    std::fs::write(dir.path().join(".gorilla-troop/projects.json"), "{ not json").unwrap();
    assert!(matches!(ProjectRegistry::open(dir.path()), Err(RegistryError::Parse(_))));
}
