//! Decomposition of a task into subtasks via an external completion service
//!
//! The client speaks the chat-completions wire format and returns a plain
//! list of subtask strings; the pending tracker enforces the one-in-flight
//! rule per task and arms the stale-response guard.

mod client;
mod coordinator;
mod error;

pub use client::{DecomposeClient, HttpDecomposer, DEFAULT_SYSTEM_PROMPT};
pub use coordinator::PendingDecompositions;
pub use error::{DecomposeError, DecomposeFailureKind};
