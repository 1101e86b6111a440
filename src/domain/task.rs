//! The Task entity

use super::TaskId;

/// A single task in the forest
///
/// Tasks form a strict forest: each task appears in at most one parent's
/// `children` list. The list references tasks by id; the owning
/// [`TaskStore`](crate::store::TaskStore) holds the tasks themselves and the
/// derived child-to-parent index.
#[derive(Debug, Clone)]
pub struct Task {
    /// Stable identity, unique across the forest
    pub id: TaskId,

    /// User-supplied description, non-empty at creation
    pub text: String,

    /// Checked state; kept consistent with descendants by the store
    pub completed: bool,

    /// Whether children are shown; preserved but meaningless for leaves
    pub expanded: bool,

    /// Child ids in display order; empty means leaf
    pub children: Vec<TaskId>,
}

impl Task {
    /// Create a fresh task: unchecked, expanded, no children
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: TaskId::generate(),
            text: text.into(),
            completed: false,
            expanded: true,
            children: Vec::new(),
        }
    }

    /// Whether this task has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}
