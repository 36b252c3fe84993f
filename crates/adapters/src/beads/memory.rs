// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory issue store for tests.
//!
//! Mirrors the `bd` semantics the runtime depends on: sequential `gt-<n>`
//! ids, label filtering, a ready query (open issues with no open blocker),
//! and note appends.

use super::{BeadsError, IssueFilter, IssueRecord, IssueStore, IssueUpdate, NewIssue};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Default)]
struct StoreInner {
    seq: u32,
    issues: BTreeMap<String, IssueRecord>,
    /// (blocked, blocker, dep_type)
    deps: Vec<(String, String, String)>,
}

/// Deterministic in-memory [`IssueStore`].
#[derive(Default)]
pub struct InMemoryIssueStore {
    inner: Mutex<StoreInner>,
}

impl InMemoryIssueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dependencies currently recorded, as (blocked, blocker, dep_type).
    pub fn dependencies(&self) -> Vec<(String, String, String)> {
        self.inner.lock().deps.clone()
    }

    fn matches(issue: &IssueRecord, filter: &IssueFilter) -> bool {
        if let Some(status) = &filter.status {
            if &issue.status != status {
                return false;
            }
        }
        if let Some(label) = &filter.label {
            if !issue.has_label(label) {
                return false;
            }
        }
        if let Some(label_any) = &filter.label_any {
            if !label_any.split(',').any(|l| issue.has_label(l.trim())) {
                return false;
            }
        }
        if let Some(t) = &filter.issue_type {
            if &issue.issue_type != t {
                return false;
            }
        }
        if let Some(p) = filter.priority {
            if issue.priority != p {
                return false;
            }
        }
        if let Some(a) = &filter.assignee {
            if issue.assignee.as_deref() != Some(a.as_str()) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl IssueStore for InMemoryIssueStore {
    async fn create(&self, new: NewIssue) -> Result<IssueRecord, BeadsError> {
        let mut inner = self.inner.lock();
        inner.seq += 1;
        let id = format!("gt-{}", inner.seq);
        let labels = new
            .labels
            .as_deref()
            .map(|s| s.split(',').map(|l| l.trim().to_string()).collect())
            .unwrap_or_default();
        let issue = IssueRecord {
            id: id.clone(),
            title: new.title,
            status: "open".into(),
            issue_type: if new.issue_type.is_empty() { "task".into() } else { new.issue_type },
            priority: new.priority,
            labels,
            assignee: new.assignee,
            description: new.description,
            notes: new.notes,
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            updated_at: None,
        };
        inner.issues.insert(id, issue.clone());
        Ok(issue)
    }

    async fn show(&self, issue_id: &str) -> Result<IssueRecord, BeadsError> {
        self.inner
            .lock()
            .issues
            .get(issue_id)
            .cloned()
            .ok_or_else(|| BeadsError::NotFound(issue_id.to_string()))
    }

    async fn update(&self, issue_id: &str, update: IssueUpdate) -> Result<(), BeadsError> {
        let mut inner = self.inner.lock();
        let issue = inner
            .issues
            .get_mut(issue_id)
            .ok_or_else(|| BeadsError::NotFound(issue_id.to_string()))?;
        if let Some(status) = update.status {
            issue.status = status;
        }
        if let Some(notes) = update.notes {
            issue.notes = Some(notes);
        }
        if let Some(append) = update.append_notes {
            issue.notes = Some(match issue.notes.take() {
                Some(existing) => format!("{existing}\n{append}"),
                None => append,
            });
        }
        if let Some(assignee) = update.assignee {
            issue.assignee = Some(assignee);
        }
        if let Some(priority) = update.priority {
            issue.priority = priority;
        }
        if let Some(label) = update.add_label {
            if !issue.has_label(&label) {
                issue.labels.push(label);
            }
        }
        if let Some(label) = update.remove_label {
            issue.labels.retain(|l| l != &label);
        }
        issue.updated_at = Some(chrono::Utc::now().to_rfc3339());
        Ok(())
    }

    async fn close(&self, issue_id: &str, reason: Option<&str>) -> Result<(), BeadsError> {
        let mut update = IssueUpdate::status("closed");
        if let Some(reason) = reason {
            update.append_notes = Some(format!("Closed: {reason}"));
        }
        self.update(issue_id, update).await
    }

    async fn reopen(&self, issue_id: &str, reason: Option<&str>) -> Result<(), BeadsError> {
        let mut update = IssueUpdate::status("open");
        if let Some(reason) = reason {
            update.append_notes = Some(format!("Reopened: {reason}"));
        }
        self.update(issue_id, update).await
    }

    async fn list(&self, filter: IssueFilter) -> Result<Vec<IssueRecord>, BeadsError> {
        let inner = self.inner.lock();
        let mut issues: Vec<IssueRecord> =
            inner.issues.values().filter(|i| Self::matches(i, &filter)).cloned().collect();
        issues.sort_by_key(|i| i.priority);
        if let Some(limit) = filter.limit {
            issues.truncate(limit);
        }
        Ok(issues)
    }

    async fn ready(&self) -> Result<Vec<IssueRecord>, BeadsError> {
        let inner = self.inner.lock();
        let mut ready: Vec<IssueRecord> = inner
            .issues
            .values()
            .filter(|issue| issue.status == "open")
            .filter(|issue| {
                !inner.deps.iter().any(|(blocked, blocker, dep_type)| {
                    blocked == &issue.id
                        && dep_type == "blocks"
                        && inner.issues.get(blocker).map(|b| !b.is_done()).unwrap_or(false)
                })
            })
            .cloned()
            .collect();
        ready.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.id.cmp(&b.id)));
        Ok(ready)
    }

    async fn blocked(&self) -> Result<Vec<IssueRecord>, BeadsError> {
        let inner = self.inner.lock();
        let blocked: Vec<IssueRecord> = inner
            .issues
            .values()
            .filter(|issue| issue.status == "open")
            .filter(|issue| {
                inner.deps.iter().any(|(b, blocker, dep_type)| {
                    b == &issue.id
                        && dep_type == "blocks"
                        && inner.issues.get(blocker).map(|b| !b.is_done()).unwrap_or(false)
                })
            })
            .cloned()
            .collect();
        Ok(blocked)
    }

    async fn search(&self, query: &str) -> Result<Vec<IssueRecord>, BeadsError> {
        let needle = query.to_lowercase();
        let inner = self.inner.lock();
        Ok(inner
            .issues
            .values()
            .filter(|i| {
                i.title.to_lowercase().contains(&needle)
                    || i.notes.as_deref().is_some_and(|n| n.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }

    async fn add_dependency(
        &self,
        blocked: &str,
        blocker: &str,
        dep_type: &str,
    ) -> Result<(), BeadsError> {
        let mut inner = self.inner.lock();
        if !inner.issues.contains_key(blocked) {
            return Err(BeadsError::NotFound(blocked.to_string()));
        }
        if !inner.issues.contains_key(blocker) {
            return Err(BeadsError::NotFound(blocker.to_string()));
        }
        inner.deps.push((blocked.to_string(), blocker.to_string(), dep_type.to_string()));
        Ok(())
    }

    async fn remove_dependency(&self, blocked: &str, blocker: &str) -> Result<(), BeadsError> {
        self.inner.lock().deps.retain(|(bd, br, _)| !(bd == blocked && br == blocker));
        Ok(())
    }

    async fn dependency_cycles(&self) -> Result<Vec<IssueRecord>, BeadsError> {
        let inner = self.inner.lock();
        let mut cyclic: Vec<IssueRecord> = Vec::new();
        // Small graphs: walk forward from each node through "blocks" edges
        // and see whether it can reach itself.
        for start in inner.issues.keys() {
            let mut stack: Vec<&String> = vec![start];
            let mut seen: Vec<&String> = Vec::new();
            let mut found = false;
            while let Some(node) = stack.pop() {
                for (blocked, blocker, dep_type) in &inner.deps {
                    if dep_type != "blocks" || blocked != node {
                        continue;
                    }
                    if blocker == start {
                        found = true;
                        break;
                    }
                    if !seen.contains(&blocker) {
                        seen.push(blocker);
                        stack.push(blocker);
                    }
                }
                if found {
                    break;
                }
            }
            if found {
                if let Some(issue) = inner.issues.get(start) {
                    cyclic.push(issue.clone());
                }
            }
        }
        Ok(cyclic)
    }

    async fn sync(&self) -> Result<(), BeadsError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
