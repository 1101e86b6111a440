//! Per-task decomposition bookkeeping
//!
//! Tracks which tasks have a request in flight and hands out generation
//! tokens. A result is only applied when its token still matches the task's
//! current dispatch; anything else (task deleted, dispatch superseded) is
//! stale and gets dropped.

use std::collections::HashMap;

use crate::domain::TaskId;

/// In-flight decomposition requests, at most one per task
#[derive(Debug, Default)]
pub struct PendingDecompositions {
    in_flight: HashMap<TaskId, u64>,
    next_generation: u64,
}

impl PendingDecompositions {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a request is outstanding for this task
    pub fn is_pending(&self, id: TaskId) -> bool {
        self.in_flight.contains_key(&id)
    }

    /// Number of outstanding requests across all tasks
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether no request is outstanding
    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Mark a task Pending and hand out the dispatch's generation token
    ///
    /// Returns `None` when a request is already in flight for the task: the
    /// caller must reject the second dispatch.
    pub fn begin(&mut self, id: TaskId) -> Option<u64> {
        if self.in_flight.contains_key(&id) {
            return None;
        }
        let generation = self.next_generation;
        self.next_generation += 1;
        self.in_flight.insert(id, generation);
        Some(generation)
    }

    /// Resolve a dispatch, returning the task to Idle
    ///
    /// Returns `false` when the result is stale: the task is no longer
    /// pending (deleted or already resolved) or the token belongs to a
    /// superseded dispatch.
    pub fn complete(&mut self, id: TaskId, generation: u64) -> bool {
        match self.in_flight.get(&id) {
            Some(current) if *current == generation => {
                self.in_flight.remove(&id);
                true
            }
            _ => false,
        }
    }

    /// Drop any outstanding request for a task (used on delete)
    ///
    /// The spawned call keeps running; its result fails the generation check
    /// on arrival and is discarded.
    pub fn cancel(&mut self, id: TaskId) {
        self.in_flight.remove(&id);
    }
}
