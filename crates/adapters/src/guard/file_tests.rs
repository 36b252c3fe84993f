// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::guard::{AuditLog, GuardError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn guard(root: &Path) -> FileGuard {
    FileGuard::new(Arc::new(AuditLog::detached()), root)
}

#[tokio::test]
async fn write_and_reread() {
    let ws = tempfile::tempdir().unwrap();
    let g = guard(ws.path());
    let rel = g
        .write_file(Path::new("aidlc-docs/inception/plans/plan.md"), "# Plan\n", "Gibbon", false)
        .await
        .unwrap();
    assert_eq!(rel, PathBuf::from("aidlc-docs/inception/plans/plan.md"));
    let content = tokio::fs::read_to_string(ws.path().join(rel)).await.unwrap();
    assert_eq!(content, "# Plan\n");
}

#[tokio::test]
async fn refuses_overwrite_without_flag_then_allows_with_it() {
    let ws = tempfile::tempdir().unwrap();
    let g = guard(ws.path());
    let path = Path::new("aidlc-docs/x.md");
    g.write_file(path, "v1", "Gibbon", false).await.unwrap();

    let err = g.write_file(path, "v2", "Gibbon", false).await.unwrap_err();
    assert!(matches!(err, GuardError::AlreadyExists(_)));

    g.write_file(path, "v2", "Gibbon", true).await.unwrap();
    let content = tokio::fs::read_to_string(ws.path().join(path)).await.unwrap();
    assert_eq!(content, "v2");
}

#[yare::parameterized(
    git_dir     = { ".git/config" },
    beads_dir   = { ".beads/db.json" },
    hidden      = { "aidlc-docs/.secret.md" },
    escape      = { "../outside.md" },
    wrong_ext   = { "aidlc-docs/script.sh" },
)]
fn validate_denies(path: &str) {
    let ws = tempfile::tempdir().unwrap();
    let g = guard(ws.path());
    let v = g.validate_path(Path::new(path), "write");
    assert!(!v.allowed, "unexpectedly allowed {path}: {}", v.reason);
}

#[yare::parameterized(
    artifact  = { "aidlc-docs/inception/requirements/requirements.md" },
    source    = { "src/lib.rs" },
    unruled   = { "sandbox/notes.txt" },
)]
fn validate_allows(path: &str) {
    let ws = tempfile::tempdir().unwrap();
    let g = guard(ws.path());
    let v = g.validate_path(Path::new(path), "write");
    assert!(v.allowed, "denied {path}: {}", v.reason);
}

#[tokio::test]
async fn protected_files_cannot_be_deleted() {
    let ws = tempfile::tempdir().unwrap();
    let g = guard(ws.path());
    let v = g.validate_path(Path::new("README.md"), "delete");
    assert!(!v.allowed);

    let err = g.delete_file(Path::new("README.md"), "Forge").await.unwrap_err();
    assert!(matches!(err, GuardError::Denied(_)));
}

#[tokio::test]
async fn delete_removes_file() {
    let ws = tempfile::tempdir().unwrap();
    let g = guard(ws.path());
    let path = Path::new("aidlc-docs/tmp.md");
    g.write_file(path, "x", "Gibbon", false).await.unwrap();
    g.delete_file(path, "Gibbon").await.unwrap();
    assert!(!ws.path().join(path).exists());

    let err = g.delete_file(path, "Gibbon").await.unwrap_err();
    assert!(matches!(err, GuardError::NotFound(_)));
}

#[tokio::test]
async fn oversized_write_is_denied() {
    let ws = tempfile::tempdir().unwrap();
    let g = guard(ws.path());
    let big = "x".repeat(1_048_577);
    let err = g.write_file(Path::new("aidlc-docs/big.md"), &big, "Forge", false).await.unwrap_err();
    assert!(matches!(err, GuardError::Denied(_)));
}

#[tokio::test]
async fn denied_operations_are_audited() {
    let ws = tempfile::tempdir().unwrap();
    let audit = Arc::new(AuditLog::detached());
    let g = FileGuard::new(Arc::clone(&audit), ws.path());
    let _ = g.write_file(Path::new(".git/hook"), "x", "Forge", false).await;

    let entries = audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].result, "denied");
    assert_eq!(entries[0].guard, "file");
}
