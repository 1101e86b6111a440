//! Arena-backed task forest with a transactional parent index

use std::collections::HashMap;

use thiserror::Error;

use crate::domain::{Task, TaskId};

/// Errors from structural store operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("task text must not be empty")]
    EmptyText,

    #[error("task not found: {0}")]
    NotFound(TaskId),
}

/// The task forest
///
/// Tasks live in a flat table keyed by id; children lists reference ids, and
/// the `parent` index is the derived child-to-parent lookup. Every mutator
/// validates its preconditions before touching any map, so a failed operation
/// leaves the store unchanged, and the index never observes a child pointing
/// at a parent that does not list it.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: HashMap<TaskId, Task>,
    roots: Vec<TaskId>,
    parent: HashMap<TaskId, TaskId>,
}

impl TaskStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of tasks in the forest
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the forest holds no tasks
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Root ids in display order
    pub fn roots(&self) -> &[TaskId] {
        &self.roots
    }

    /// Whether a task with this id exists
    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    /// Look up a task by id
    pub fn get(&self, id: TaskId) -> Result<&Task, StoreError> {
        self.tasks.get(&id).ok_or(StoreError::NotFound(id))
    }

    /// Parent of a task; `None` for roots
    pub fn parent_of(&self, id: TaskId) -> Option<TaskId> {
        self.parent.get(&id).copied()
    }

    /// Append a new root task
    pub fn add_root(&mut self, text: &str) -> Result<TaskId, StoreError> {
        if text.trim().is_empty() {
            return Err(StoreError::EmptyText);
        }
        let task = Task::new(text);
        let id = task.id;
        self.tasks.insert(id, task);
        self.roots.push(id);
        Ok(id)
    }

    /// Append a new leaf child to an existing task
    pub fn add_child(&mut self, parent_id: TaskId, text: &str) -> Result<TaskId, StoreError> {
        if text.trim().is_empty() {
            return Err(StoreError::EmptyText);
        }
        if !self.contains(parent_id) {
            return Err(StoreError::NotFound(parent_id));
        }
        let task = Task::new(text);
        let id = task.id;
        self.tasks.insert(id, task);
        self.parent.insert(id, parent_id);
        if let Some(parent) = self.tasks.get_mut(&parent_id) {
            parent.children.push(id);
        }
        Ok(id)
    }

    /// Replace the text of a task
    pub fn set_text(&mut self, id: TaskId, text: &str) -> Result<(), StoreError> {
        if text.trim().is_empty() {
            return Err(StoreError::EmptyText);
        }
        let task = self.tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        task.text = text.to_string();
        Ok(())
    }

    /// Flip the expanded flag of a task, returning the new value
    ///
    /// Touches no other node; a collapsed inner node's descendants keep their
    /// own remembered flags and reappear exactly as they were on re-expand.
    pub fn toggle_expanded(&mut self, id: TaskId) -> Result<bool, StoreError> {
        let task = self.tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        task.expanded = !task.expanded;
        Ok(task.expanded)
    }

    /// Set the expanded flag of a task
    pub fn set_expanded(&mut self, id: TaskId, value: bool) -> Result<(), StoreError> {
        let task = self.tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        task.expanded = value;
        Ok(())
    }

    /// Delete a task and its whole subtree
    ///
    /// O(depth + subtree size): the parent index locates the attachment point
    /// without rescanning the tree. Removes every subtree entry from the task
    /// table and the parent index.
    pub fn delete(&mut self, id: TaskId) -> Result<(), StoreError> {
        if !self.contains(id) {
            return Err(StoreError::NotFound(id));
        }
        match self.parent.get(&id).copied() {
            Some(parent_id) => {
                if let Some(parent) = self.tasks.get_mut(&parent_id) {
                    parent.children.retain(|c| *c != id);
                }
            }
            None => self.roots.retain(|r| *r != id),
        }
        self.remove_subtree(id);
        Ok(())
    }

    /// Atomically replace a task's children with fresh leaves
    ///
    /// The prior subtree under `id` is discarded; one new unchecked, expanded
    /// leaf is installed per string, in order. All texts are validated before
    /// anything is mutated.
    pub fn replace_children(&mut self, id: TaskId, texts: &[String]) -> Result<Vec<TaskId>, StoreError> {
        if !self.contains(id) {
            return Err(StoreError::NotFound(id));
        }
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(StoreError::EmptyText);
        }

        let old_children = self
            .tasks
            .get(&id)
            .map(|t| t.children.clone())
            .unwrap_or_default();
        for child in old_children {
            self.remove_subtree(child);
        }

        let mut new_children = Vec::with_capacity(texts.len());
        for text in texts {
            let task = Task::new(text.as_str());
            let child_id = task.id;
            self.tasks.insert(child_id, task);
            self.parent.insert(child_id, id);
            new_children.push(child_id);
        }
        if let Some(task) = self.tasks.get_mut(&id) {
            task.children = new_children.clone();
        }
        Ok(new_children)
    }

    /// Ids of a subtree in pre-order, the given task first
    pub fn subtree_ids(&self, id: TaskId) -> Vec<TaskId> {
        let mut ids = Vec::new();
        self.collect_subtree(id, &mut ids);
        ids
    }

    fn collect_subtree(&self, id: TaskId, ids: &mut Vec<TaskId>) {
        let Some(task) = self.tasks.get(&id) else {
            return;
        };
        ids.push(id);
        for child in &task.children {
            self.collect_subtree(*child, ids);
        }
    }

    /// Remove a subtree from the task table and the parent index
    ///
    /// The caller is responsible for detaching `id` from its parent's
    /// children list (or the root list) first.
    fn remove_subtree(&mut self, id: TaskId) {
        for sub_id in self.subtree_ids(id) {
            self.tasks.remove(&sub_id);
            self.parent.remove(&sub_id);
        }
    }

    /// Mutable access for same-crate collaborators (cascade, persistence load)
    pub(crate) fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&id)
    }

    /// Install a pre-built task, used when rebuilding the forest from a
    /// persisted document. Bypasses text validation: the document is taken
    /// as-is.
    pub(crate) fn insert_task(&mut self, parent_id: Option<TaskId>, task: Task) {
        let id = task.id;
        self.tasks.insert(id, task);
        match parent_id {
            Some(pid) => {
                self.parent.insert(id, pid);
                if let Some(parent) = self.tasks.get_mut(&pid) {
                    parent.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
    }

    /// Verify that the parent index and the children lists agree (test aid)
    #[cfg(test)]
    pub(crate) fn index_is_consistent(&self) -> bool {
        // every indexed child is listed by its parent
        for (child, parent) in &self.parent {
            match self.tasks.get(parent) {
                Some(p) if p.children.contains(child) => {}
                _ => return false,
            }
        }
        // every listed child is indexed to that parent, every root unindexed
        for (id, task) in &self.tasks {
            for child in &task.children {
                if self.parent.get(child) != Some(id) {
                    return false;
                }
            }
        }
        self.roots.iter().all(|r| !self.parent.contains_key(r))
    }
}
