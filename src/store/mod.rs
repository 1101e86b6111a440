//! Task Store - single owner of the task forest
//!
//! The store keeps all tasks in a flat arena keyed by id, with root order and
//! a derived child-to-parent index maintained alongside every structural
//! mutation. Completion propagation and the flattened visibility view live in
//! their own files but operate on the same store.

mod cascade;
mod forest;
mod visibility;

pub use forest::{StoreError, TaskStore};
pub use visibility::FlatRow;
