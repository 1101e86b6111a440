//! Taskforest - AI-assisted hierarchical task manager
//!
//! Taskforest keeps a forest of tasks and subtasks, propagates completion
//! state through the tree, and can ask an external completion service to
//! break a task into subtasks without ever letting the asynchronous call
//! touch the tree directly.
//!
//! # Core Concepts
//!
//! - **Single Mutation Path**: one engine actor owns the forest; every edit,
//!   including decomposition results, goes through its command channel
//! - **Derived Consistency**: checking a task cascades down to descendants
//!   and recomputes ancestors as the AND of their children
//! - **Stale Results Dropped**: a decomposition that outlives its task (or
//!   its dispatch) is discarded by a generation check, never applied
//! - **Durable JSON**: the forest round-trips through a plain JSON document;
//!   the in-memory tree stays authoritative when a save fails
//!
//! # Modules
//!
//! - [`store`] - task forest, completion cascade, flattened visibility view
//! - [`engine`] - engine actor and handle (the write surface)
//! - [`decompose`] - decomposition client and pending-request tracking
//! - [`persist`] - JSON document gateway
//! - [`config`] - configuration types and loading
//! - [`cli`] / [`repl`] - command-line front-end

pub mod cli;
pub mod config;
pub mod decompose;
pub mod domain;
pub mod engine;
pub mod persist;
pub mod repl;
pub mod store;

// Re-export commonly used types
pub use config::{Config, LlmConfig, StorageConfig};
pub use decompose::{
    DecomposeClient, DecomposeError, DecomposeFailureKind, HttpDecomposer, PendingDecompositions,
};
pub use domain::{Task, TaskId};
pub use engine::{EngineCommand, EngineError, EngineEvent, EngineResponse, TaskEngine, TaskRow};
pub use persist::{PersistError, PersistedTask, TaskFile};
pub use store::{FlatRow, StoreError, TaskStore};
