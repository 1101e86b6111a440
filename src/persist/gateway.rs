//! JSON document gateway
//!
//! The on-disk format is a UTF-8 JSON array of task objects:
//! `{ "text", "completed", "expanded", "subtasks": [...] }`. Ids are not
//! persisted; loading assigns fresh ones.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{Task, TaskId};
use crate::store::TaskStore;

/// Errors from saving or loading the tasks file
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed tasks file: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One task as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedTask {
    pub text: String,
    pub completed: bool,
    pub expanded: bool,
    #[serde(default)]
    pub subtasks: Vec<PersistedTask>,
}

/// Handle to the durable tasks document
pub struct TaskFile {
    path: PathBuf,
}

impl TaskFile {
    /// Create a gateway for the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the underlying document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the forest to disk, creating parent directories as needed
    pub fn save(&self, store: &TaskStore) -> Result<(), PersistError> {
        debug!(path = %self.path.display(), tasks = store.len(), "save: called");
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }
        let doc = snapshot(store);
        let json = serde_json::to_string_pretty(&doc)?;
        fs::write(&self.path, json)?;
        debug!("save: written");
        Ok(())
    }

    /// Read the forest from disk
    ///
    /// A missing file is not an error: it yields an empty forest.
    pub fn load(&self) -> Result<TaskStore, PersistError> {
        debug!(path = %self.path.display(), "load: called");
        if !self.path.exists() {
            info!(path = %self.path.display(), "No tasks file found, starting with an empty forest");
            return Ok(TaskStore::new());
        }
        let content = fs::read_to_string(&self.path)?;
        let doc: Vec<PersistedTask> = serde_json::from_str(&content)?;
        let store = restore(&doc);
        debug!(tasks = store.len(), "load: forest rebuilt");
        Ok(store)
    }
}

/// Capture the forest as a persisted document
pub fn snapshot(store: &TaskStore) -> Vec<PersistedTask> {
    store
        .roots()
        .iter()
        .filter_map(|root| snapshot_task(store, *root))
        .collect()
}

fn snapshot_task(store: &TaskStore, id: TaskId) -> Option<PersistedTask> {
    let task = store.get(id).ok()?;
    Some(PersistedTask {
        text: task.text.clone(),
        completed: task.completed,
        expanded: task.expanded,
        subtasks: task
            .children
            .iter()
            .filter_map(|child| snapshot_task(store, *child))
            .collect(),
    })
}

/// Rebuild a forest from a persisted document, assigning fresh ids
pub fn restore(doc: &[PersistedTask]) -> TaskStore {
    let mut store = TaskStore::new();
    for node in doc {
        restore_task(&mut store, None, node);
    }
    store
}

fn restore_task(store: &mut TaskStore, parent: Option<TaskId>, node: &PersistedTask) {
    let mut task = Task::new(node.text.as_str());
    task.completed = node.completed;
    task.expanded = node.expanded;
    let id = task.id;
    store.insert_task(parent, task);
    for child in &node.subtasks {
        restore_task(store, Some(id), child);
    }
}
