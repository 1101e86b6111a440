//! Completion propagation across the tree
//!
//! A manual check of any node force-sets its whole subtree, then ancestors
//! are recomputed as the AND of their direct children. Both directions run
//! synchronously inside one store call; an unknown id fails before anything
//! is touched.

use crate::domain::TaskId;

use super::forest::{StoreError, TaskStore};

impl TaskStore {
    /// Set the completed flag of a task and propagate through the tree
    ///
    /// Downward: every descendant is set to `value` unconditionally,
    /// overriding any prior child state. Upward: each ancestor becomes the
    /// AND of its direct children's flags; the walk stops at the first
    /// ancestor whose value does not change (recomputation is idempotent, so
    /// stopping early never loses an update).
    pub fn set_completed(&mut self, id: TaskId, value: bool) -> Result<(), StoreError> {
        if !self.contains(id) {
            return Err(StoreError::NotFound(id));
        }

        for sub_id in self.subtree_ids(id) {
            if let Some(task) = self.task_mut(sub_id) {
                task.completed = value;
            }
        }

        let mut current = self.parent_of(id);
        while let Some(ancestor_id) = current {
            let all_done = match self.get(ancestor_id) {
                Ok(ancestor) => ancestor
                    .children
                    .iter()
                    .all(|c| self.get(*c).map(|t| t.completed).unwrap_or(true)),
                Err(_) => break,
            };
            match self.task_mut(ancestor_id) {
                Some(ancestor) if ancestor.completed != all_done => {
                    ancestor.completed = all_done;
                }
                _ => break,
            }
            current = self.parent_of(ancestor_id);
        }

        Ok(())
    }

    /// Flip the completed flag of a task, returning the new value
    pub fn toggle_completed(&mut self, id: TaskId) -> Result<bool, StoreError> {
        let value = !self.get(id)?.completed;
        self.set_completed(id, value)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Root with three leaf children: the Plan trip shape
    fn trip_tree() -> (TaskStore, TaskId, Vec<TaskId>) {
        let mut store = TaskStore::new();
        let root = store.add_root("Plan trip").unwrap();
        let children = vec![
            store.add_child(root, "Book flight").unwrap(),
            store.add_child(root, "Book hotel").unwrap(),
            store.add_child(root, "Pack bags").unwrap(),
        ];
        (store, root, children)
    }

    #[test]
    fn test_checking_parent_cascades_down() {
        let (mut store, root, children) = trip_tree();
        store.set_completed(root, true).unwrap();
        assert!(store.get(root).unwrap().completed);
        for c in &children {
            assert!(store.get(*c).unwrap().completed);
        }

        store.set_completed(root, false).unwrap();
        for c in &children {
            assert!(!store.get(*c).unwrap().completed);
        }
    }

    #[test]
    fn test_downward_cascade_reaches_grandchildren() {
        let mut store = TaskStore::new();
        let root = store.add_root("Plan trip").unwrap();
        let hotel = store.add_child(root, "Book hotel").unwrap();
        let pick = store.add_child(hotel, "Pick a hotel").unwrap();

        store.set_completed(root, true).unwrap();
        assert!(store.get(pick).unwrap().completed);
    }

    #[test]
    fn test_parent_completes_only_when_all_children_do() {
        let (mut store, root, children) = trip_tree();

        store.set_completed(children[0], true).unwrap();
        assert!(!store.get(root).unwrap().completed);

        store.set_completed(children[1], true).unwrap();
        assert!(!store.get(root).unwrap().completed);

        store.set_completed(children[2], true).unwrap();
        assert!(store.get(root).unwrap().completed);
    }

    #[test]
    fn test_unchecking_one_child_unchecks_ancestors() {
        let mut store = TaskStore::new();
        let root = store.add_root("Plan trip").unwrap();
        let hotel = store.add_child(root, "Book hotel").unwrap();
        let pick = store.add_child(hotel, "Pick a hotel").unwrap();
        let pay = store.add_child(hotel, "Pay deposit").unwrap();

        store.set_completed(root, true).unwrap();
        store.set_completed(pick, false).unwrap();

        assert!(!store.get(hotel).unwrap().completed);
        assert!(!store.get(root).unwrap().completed);
        // sibling keeps its own state
        assert!(store.get(pay).unwrap().completed);
    }

    #[test]
    fn test_leaf_toggle_runs_upward_only() {
        let (mut store, root, children) = trip_tree();
        assert!(store.toggle_completed(children[0]).unwrap());
        assert!(store.get(children[0]).unwrap().completed);
        assert!(!store.get(children[1]).unwrap().completed);
        assert!(!store.get(root).unwrap().completed);
    }

    #[test]
    fn test_upward_cascade_stops_at_unchanged_ancestor() {
        // root -> a -> b -> leaf; completing leaf completes b and a,
        // but root stays incomplete because of its other child.
        let mut store = TaskStore::new();
        let root = store.add_root("root").unwrap();
        let a = store.add_child(root, "a").unwrap();
        let other = store.add_child(root, "other").unwrap();
        let b = store.add_child(a, "b").unwrap();
        let leaf = store.add_child(b, "leaf").unwrap();

        store.set_completed(leaf, true).unwrap();
        assert!(store.get(b).unwrap().completed);
        assert!(store.get(a).unwrap().completed);
        assert!(!store.get(root).unwrap().completed);
        assert!(!store.get(other).unwrap().completed);
    }

    #[test]
    fn test_set_completed_unknown_id_leaves_tree_untouched() {
        let (mut store, root, _) = trip_tree();
        let ghost = TaskId::generate();
        assert_eq!(store.set_completed(ghost, true), Err(StoreError::NotFound(ghost)));
        assert!(!store.get(root).unwrap().completed);
    }

    #[test]
    fn test_manual_parent_toggle_overrides_inconsistent_children() {
        let (mut store, root, children) = trip_tree();
        store.set_completed(children[0], true).unwrap();
        // checking the parent directly force-completes everything
        store.set_completed(root, true).unwrap();
        for c in &children {
            assert!(store.get(*c).unwrap().completed);
        }
    }
}
