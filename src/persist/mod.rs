//! Persistence gateway for the task forest
//!
//! Serializes the forest to a durable JSON document and back. The in-memory
//! store stays authoritative: a failed save never disturbs it, and a missing
//! file on load is simply an empty forest.

mod gateway;

pub use gateway::{restore, snapshot, PersistError, PersistedTask, TaskFile};
