//! Interactive line-oriented session
//!
//! The thin presentation layer over the engine: renders the visible rows,
//! forwards user intents, and surfaces decomposition outcomes. Holds no task
//! state of its own beyond the row snapshot of the last render.

mod session;

pub use session::{run_interactive, ReplSession};
