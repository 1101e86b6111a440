//! Engine commands, responses, and events

use thiserror::Error;
use tokio::sync::oneshot;

use crate::decompose::{DecomposeError, DecomposeFailureKind};
use crate::domain::TaskId;
use crate::persist::PersistError;
use crate::store::{FlatRow, StoreError};

/// Errors from engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("task text must not be empty")]
    EmptyText,

    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("decomposition already running for task {0}")]
    DecomposeInFlight(TaskId),

    #[error("persistence failed: {0}")]
    Persist(#[from] PersistError),

    #[error("engine channel closed")]
    Channel,
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmptyText => EngineError::EmptyText,
            StoreError::NotFound(id) => EngineError::NotFound(id),
        }
    }
}

/// Response from engine operations
pub type EngineResponse<T> = Result<T, EngineError>;

/// One row of the flattened forest as the view renders it
///
/// A snapshot: the view never holds references into the store.
#[derive(Debug, Clone)]
pub struct TaskRow {
    pub id: TaskId,
    pub text: String,
    pub depth: usize,
    pub completed: bool,
    pub expanded: bool,
    pub has_children: bool,
    pub visible: bool,
    /// True while a decomposition request is in flight for this task
    pub decomposing: bool,
}

impl TaskRow {
    pub(crate) fn from_flat(row: FlatRow, decomposing: bool) -> Self {
        Self {
            id: row.id,
            text: row.text,
            depth: row.depth,
            completed: row.completed,
            expanded: row.expanded,
            has_children: row.has_children,
            visible: row.visible,
            decomposing,
        }
    }
}

/// Event broadcast when engine state changes that the view should react to
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The tree was mutated; re-render from the rows
    TreeChanged,
    /// A decomposition request was dispatched (task is now Pending)
    DecomposeStarted { id: TaskId },
    /// A decomposition installed new subtasks (task is Idle again)
    DecomposeCompleted { id: TaskId, subtasks: usize },
    /// A decomposition failed; the task is Idle with no children
    DecomposeFailed {
        id: TaskId,
        kind: DecomposeFailureKind,
        message: String,
    },
    /// Flushing to the tasks file failed; the in-memory tree is intact
    SaveFailed { message: String },
}

/// Commands sent to the engine actor
#[derive(Debug)]
pub enum EngineCommand {
    AddRoot {
        text: String,
        reply: oneshot::Sender<EngineResponse<TaskId>>,
    },
    SetText {
        id: TaskId,
        text: String,
        reply: oneshot::Sender<EngineResponse<()>>,
    },
    SetCompleted {
        id: TaskId,
        value: bool,
        reply: oneshot::Sender<EngineResponse<()>>,
    },
    ToggleCompleted {
        id: TaskId,
        reply: oneshot::Sender<EngineResponse<bool>>,
    },
    ToggleExpanded {
        id: TaskId,
        reply: oneshot::Sender<EngineResponse<bool>>,
    },
    Delete {
        id: TaskId,
        reply: oneshot::Sender<EngineResponse<()>>,
    },
    Decompose {
        id: TaskId,
        reply: oneshot::Sender<EngineResponse<()>>,
    },
    /// Completion of a spawned decomposition call (internal)
    DecomposeFinished {
        id: TaskId,
        generation: u64,
        outcome: Result<Vec<String>, DecomposeError>,
    },
    Rows {
        reply: oneshot::Sender<Vec<TaskRow>>,
    },
    VisibleRows {
        reply: oneshot::Sender<Vec<TaskRow>>,
    },
    IsDecomposing {
        id: TaskId,
        reply: oneshot::Sender<bool>,
    },
    Save {
        reply: oneshot::Sender<EngineResponse<()>>,
    },
    Shutdown,
}
