//! Task identity
//!
//! Tasks are identified by generated UUIDs (v7), never by their position in
//! the tree or by value equality of their fields. Two tasks with identical
//! text remain distinguishable, and ids stay valid across arbitrary
//! structural edits for the lifetime of the process.

use uuid::Uuid;

/// Stable identifier for a task
///
/// Ids are unique across the whole forest. They are not persisted; loading a
/// saved document assigns fresh ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generate a new unique id
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the short hex prefix (first 8 chars) for display
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
