//! Flattened rendering view of the forest
//!
//! Pre-order rows with depth and a visibility flag derived from ancestor
//! `expanded` flags. The sequence is recomputed from scratch on every call;
//! it is cheap at this scale and keeps the view stateless.

use crate::domain::TaskId;

use super::forest::TaskStore;

/// One row of the flattened forest
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRow {
    pub id: TaskId,
    pub text: String,
    /// Ancestor count; roots are 0
    pub depth: usize,
    pub completed: bool,
    pub expanded: bool,
    pub has_children: bool,
    /// True iff every ancestor is expanded; roots are always visible
    pub visible: bool,
}

impl TaskStore {
    /// Flatten the forest in pre-order: each task before its children,
    /// roots in display order
    pub fn flatten(&self) -> Vec<FlatRow> {
        let mut rows = Vec::with_capacity(self.len());
        for root in self.roots() {
            self.flatten_into(*root, 0, true, &mut rows);
        }
        rows
    }

    /// Only the currently visible rows, in render order
    pub fn visible_rows(&self) -> Vec<FlatRow> {
        self.flatten().into_iter().filter(|r| r.visible).collect()
    }

    fn flatten_into(&self, id: TaskId, depth: usize, ancestors_expanded: bool, rows: &mut Vec<FlatRow>) {
        let Ok(task) = self.get(id) else {
            return;
        };
        rows.push(FlatRow {
            id,
            text: task.text.clone(),
            depth,
            completed: task.completed,
            expanded: task.expanded,
            has_children: !task.is_leaf(),
            visible: ancestors_expanded,
        });
        let children_visible = ancestors_expanded && task.expanded;
        for child in &task.children {
            self.flatten_into(*child, depth + 1, children_visible, rows);
        }
    }
}
