// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project registry.
//!
//! Multi-project state persisted to
//! `<workspace>/.gorilla-troop/projects.json`. Every write is an atomic
//! replace (write-temp-then-rename); a registry mutex keeps writers
//! single-file.

use gt_core::{valid_project_key, ProjectState, ProjectStatus};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const REGISTRY_DIR: &str = ".gorilla-troop";
pub const REGISTRY_FILE: &str = "projects.json";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("project '{0}' already exists")]
    AlreadyExists(String),
    #[error("project '{0}' not found")]
    NotFound(String),
    #[error("invalid project key '{0}': use alphanumerics, '-' and '_'")]
    InvalidKey(String),
    #[error("could not parse registry file: {0}")]
    Parse(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Persistent registry of projects under one workspace root.
pub struct ProjectRegistry {
    root: PathBuf,
    projects: Mutex<BTreeMap<String, ProjectState>>,
}

impl ProjectRegistry {
    /// Open (or initialise) the registry under `root`. A corrupt registry
    /// file is an error, not silent data loss.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let root = root.into();
        let path = root.join(REGISTRY_DIR).join(REGISTRY_FILE);
        let projects = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).map_err(|e| RegistryError::Parse(e.to_string()))?
        } else {
            BTreeMap::new()
        };
        tracing::info!(count = projects.len(), root = %root.display(), "project registry loaded");
        Ok(Self { root, projects: Mutex::new(projects) })
    }

    fn registry_path(&self) -> PathBuf {
        self.root.join(REGISTRY_DIR).join(REGISTRY_FILE)
    }

    /// Atomic replace: serialize to a temp file, then rename over the
    /// registry. Callers hold the projects lock, so writes are serialised.
    fn save(&self, projects: &BTreeMap<String, ProjectState>) -> Result<(), RegistryError> {
        let path = self.registry_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(projects)
            .map_err(|e| RegistryError::Parse(e.to_string()))?;
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn create(
        &self,
        key: &str,
        name: &str,
        workspace_path: &str,
    ) -> Result<ProjectState, RegistryError> {
        if !valid_project_key(key) {
            return Err(RegistryError::InvalidKey(key.to_string()));
        }
        let mut projects = self.projects.lock();
        if projects.contains_key(key) {
            return Err(RegistryError::AlreadyExists(key.to_string()));
        }
        let project = ProjectState::new(key, name, workspace_path);
        projects.insert(key.to_string(), project.clone());
        self.save(&projects)?;
        tracing::info!(key, name, "project created");
        Ok(project)
    }

    pub fn get(&self, key: &str) -> Option<ProjectState> {
        self.projects.lock().get(key).cloned()
    }

    pub fn list(&self, status: Option<ProjectStatus>) -> Vec<ProjectState> {
        self.projects
            .lock()
            .values()
            .filter(|p| status.map_or(true, |s| p.status == s))
            .cloned()
            .collect()
    }

    pub fn pause(&self, key: &str) -> Result<(), RegistryError> {
        self.mutate(key, |p| {
            p.status = ProjectStatus::Paused;
            p.paused_at = Some(chrono::Utc::now().to_rfc3339());
        })
    }

    pub fn resume(&self, key: &str) -> Result<(), RegistryError> {
        self.mutate(key, |p| {
            p.status = ProjectStatus::Active;
            p.paused_at = None;
        })
    }

    pub fn complete(&self, key: &str) -> Result<(), RegistryError> {
        self.mutate(key, |p| p.status = ProjectStatus::Completed)
    }

    pub fn set_minder(&self, key: &str, agent_id: Option<String>) -> Result<(), RegistryError> {
        self.mutate(key, |p| p.minder_agent_id = agent_id.clone())
    }

    pub fn delete(&self, key: &str) -> Result<(), RegistryError> {
        let mut projects = self.projects.lock();
        if projects.remove(key).is_none() {
            return Err(RegistryError::NotFound(key.to_string()));
        }
        self.save(&projects)?;
        tracing::info!(key, "project deleted");
        Ok(())
    }

    fn mutate(
        &self,
        key: &str,
        apply: impl Fn(&mut ProjectState),
    ) -> Result<(), RegistryError> {
        let mut projects = self.projects.lock();
        let project =
            projects.get_mut(key).ok_or_else(|| RegistryError::NotFound(key.to_string()))?;
        apply(project);
        self.save(&projects)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
