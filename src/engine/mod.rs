//! Task engine - actor that owns the TaskStore
//!
//! All mutations flow through one command channel processed by a single
//! task, so user intents and decomposition completions are applied strictly
//! sequentially and never interleave. The cloneable [`TaskEngine`] handle is
//! the whole write surface; a broadcast channel carries change events to the
//! view.

mod manager;
mod messages;

pub use manager::TaskEngine;
pub use messages::{EngineCommand, EngineError, EngineEvent, EngineResponse, TaskRow};
