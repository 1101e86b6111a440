//! TaskEngine - handle and actor that own the forest
//!
//! Modeled as a single actor task processing typed commands. Decomposition
//! calls are spawned off the actor; their results come back as commands on
//! the same channel, so every mutation of the tree happens on one line of
//! control.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::decompose::{DecomposeClient, PendingDecompositions};
use crate::domain::TaskId;
use crate::persist::TaskFile;
use crate::store::TaskStore;

use super::messages::{EngineCommand, EngineError, EngineEvent, EngineResponse, TaskRow};

/// Handle to send commands to the engine actor
#[derive(Clone)]
pub struct TaskEngine {
    tx: mpsc::Sender<EngineCommand>,
    event_tx: broadcast::Sender<EngineEvent>,
}

impl TaskEngine {
    /// Spawn a new engine actor
    ///
    /// Loads the forest from the tasks file (missing file means empty
    /// forest) and takes ownership of it; from here on the actor is the only
    /// writer.
    pub fn spawn(
        tasks_file: impl Into<PathBuf>,
        client: Arc<dyn DecomposeClient>,
    ) -> Result<Self, EngineError> {
        let file = TaskFile::new(tasks_file);
        debug!(path = %file.path().display(), "spawn: called");
        let store = file.load()?;
        info!(tasks = store.len(), "Loaded task forest");

        let (tx, rx) = mpsc::channel(256);
        let (event_tx, _) = broadcast::channel(64);

        let actor = Actor {
            store,
            file,
            client,
            pending: PendingDecompositions::new(),
            tx: tx.clone(),
            event_tx: event_tx.clone(),
        };
        tokio::spawn(actor.run(rx));

        info!("TaskEngine spawned");
        Ok(Self { tx, event_tx })
    }

    /// Subscribe to engine events (for view updates)
    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Append a new root task
    pub async fn add_root(&self, text: &str) -> EngineResponse<TaskId> {
        debug!(text, "add_root: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::AddRoot {
                text: text.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::Channel)?;
        reply_rx.await.map_err(|_| EngineError::Channel)?
    }

    /// Replace the text of a task
    pub async fn set_text(&self, id: TaskId, text: &str) -> EngineResponse<()> {
        debug!(%id, text, "set_text: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::SetText {
                id,
                text: text.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::Channel)?;
        reply_rx.await.map_err(|_| EngineError::Channel)?
    }

    /// Set the completed flag of a task (cascades through the tree)
    pub async fn set_completed(&self, id: TaskId, value: bool) -> EngineResponse<()> {
        debug!(%id, value, "set_completed: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::SetCompleted { id, value, reply: reply_tx })
            .await
            .map_err(|_| EngineError::Channel)?;
        reply_rx.await.map_err(|_| EngineError::Channel)?
    }

    /// Flip the completed flag of a task, returning the new value
    pub async fn toggle_completed(&self, id: TaskId) -> EngineResponse<bool> {
        debug!(%id, "toggle_completed: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::ToggleCompleted { id, reply: reply_tx })
            .await
            .map_err(|_| EngineError::Channel)?;
        reply_rx.await.map_err(|_| EngineError::Channel)?
    }

    /// Flip the expanded flag of a task, returning the new value
    pub async fn toggle_expanded(&self, id: TaskId) -> EngineResponse<bool> {
        debug!(%id, "toggle_expanded: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::ToggleExpanded { id, reply: reply_tx })
            .await
            .map_err(|_| EngineError::Channel)?;
        reply_rx.await.map_err(|_| EngineError::Channel)?
    }

    /// Delete a task and its subtree
    ///
    /// Legal while a decomposition is pending; the late result is discarded.
    pub async fn delete(&self, id: TaskId) -> EngineResponse<()> {
        debug!(%id, "delete: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::Delete { id, reply: reply_tx })
            .await
            .map_err(|_| EngineError::Channel)?;
        reply_rx.await.map_err(|_| EngineError::Channel)?
    }

    /// Request decomposition of a task into subtasks
    ///
    /// Returns as soon as the request is dispatched; completion arrives as a
    /// [`EngineEvent::DecomposeCompleted`] or
    /// [`EngineEvent::DecomposeFailed`] event. Rejected with
    /// [`EngineError::DecomposeInFlight`] while a request is outstanding.
    pub async fn decompose(&self, id: TaskId) -> EngineResponse<()> {
        debug!(%id, "decompose: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::Decompose { id, reply: reply_tx })
            .await
            .map_err(|_| EngineError::Channel)?;
        reply_rx.await.map_err(|_| EngineError::Channel)?
    }

    /// Full flattened row sequence (hidden rows included, `visible` flagged)
    pub async fn rows(&self) -> EngineResponse<Vec<TaskRow>> {
        debug!("rows: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::Rows { reply: reply_tx })
            .await
            .map_err(|_| EngineError::Channel)?;
        reply_rx.await.map_err(|_| EngineError::Channel)
    }

    /// Only the currently visible rows, in render order
    pub async fn visible_rows(&self) -> EngineResponse<Vec<TaskRow>> {
        debug!("visible_rows: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::VisibleRows { reply: reply_tx })
            .await
            .map_err(|_| EngineError::Channel)?;
        reply_rx.await.map_err(|_| EngineError::Channel)
    }

    /// Whether a decomposition request is outstanding for a task
    pub async fn is_decomposing(&self, id: TaskId) -> EngineResponse<bool> {
        debug!(%id, "is_decomposing: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::IsDecomposing { id, reply: reply_tx })
            .await
            .map_err(|_| EngineError::Channel)?;
        reply_rx.await.map_err(|_| EngineError::Channel)
    }

    /// Flush the forest to the tasks file now
    pub async fn save(&self) -> EngineResponse<()> {
        debug!("save: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::Save { reply: reply_tx })
            .await
            .map_err(|_| EngineError::Channel)?;
        reply_rx.await.map_err(|_| EngineError::Channel)?
    }

    /// Shut down the engine actor
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        debug!("shutdown: called");
        self.tx
            .send(EngineCommand::Shutdown)
            .await
            .map_err(|_| EngineError::Channel)
    }
}

/// The actor state: the only writable reference to the tree
struct Actor {
    store: TaskStore,
    file: TaskFile,
    client: Arc<dyn DecomposeClient>,
    pending: PendingDecompositions,
    /// Sender back into our own channel, for spawned decomposition calls
    tx: mpsc::Sender<EngineCommand>,
    event_tx: broadcast::Sender<EngineEvent>,
}

impl Actor {
    async fn run(mut self, mut rx: mpsc::Receiver<EngineCommand>) {
        debug!("engine actor started");

        while let Some(cmd) = rx.recv().await {
            match cmd {
                EngineCommand::AddRoot { text, reply } => {
                    debug!(text, "actor: AddRoot command");
                    let result = self.store.add_root(&text).map_err(EngineError::from);
                    if result.is_ok() {
                        self.flush_and_notify();
                    }
                    let _ = reply.send(result);
                }

                EngineCommand::SetText { id, text, reply } => {
                    debug!(%id, "actor: SetText command");
                    let result = self.store.set_text(id, &text).map_err(EngineError::from);
                    if result.is_ok() {
                        self.flush_and_notify();
                    }
                    let _ = reply.send(result);
                }

                EngineCommand::SetCompleted { id, value, reply } => {
                    debug!(%id, value, "actor: SetCompleted command");
                    let result = self.store.set_completed(id, value).map_err(EngineError::from);
                    if result.is_ok() {
                        self.flush_and_notify();
                    }
                    let _ = reply.send(result);
                }

                EngineCommand::ToggleCompleted { id, reply } => {
                    debug!(%id, "actor: ToggleCompleted command");
                    let result = self.store.toggle_completed(id).map_err(EngineError::from);
                    if result.is_ok() {
                        self.flush_and_notify();
                    }
                    let _ = reply.send(result);
                }

                EngineCommand::ToggleExpanded { id, reply } => {
                    debug!(%id, "actor: ToggleExpanded command");
                    let result = self.store.toggle_expanded(id).map_err(EngineError::from);
                    if result.is_ok() {
                        self.flush_and_notify();
                    }
                    let _ = reply.send(result);
                }

                EngineCommand::Delete { id, reply } => {
                    debug!(%id, "actor: Delete command");
                    let result = self.store.delete(id).map_err(EngineError::from);
                    if result.is_ok() {
                        // a late decomposition result for this task is now stale
                        self.pending.cancel(id);
                        self.flush_and_notify();
                    }
                    let _ = reply.send(result);
                }

                EngineCommand::Decompose { id, reply } => {
                    debug!(%id, "actor: Decompose command");
                    let _ = reply.send(self.start_decompose(id));
                }

                EngineCommand::DecomposeFinished { id, generation, outcome } => {
                    debug!(%id, generation, "actor: DecomposeFinished command");
                    self.finish_decompose(id, generation, outcome);
                }

                EngineCommand::Rows { reply } => {
                    debug!("actor: Rows command");
                    let _ = reply.send(self.rows(false));
                }

                EngineCommand::VisibleRows { reply } => {
                    debug!("actor: VisibleRows command");
                    let _ = reply.send(self.rows(true));
                }

                EngineCommand::IsDecomposing { id, reply } => {
                    debug!(%id, "actor: IsDecomposing command");
                    let _ = reply.send(self.pending.is_pending(id));
                }

                EngineCommand::Save { reply } => {
                    debug!("actor: Save command");
                    let result = self.file.save(&self.store).map_err(EngineError::from);
                    let _ = reply.send(result);
                }

                EngineCommand::Shutdown => {
                    debug!("actor: Shutdown command");
                    info!("TaskEngine shutting down");
                    break;
                }
            }
        }

        debug!("engine actor stopped");
    }

    /// Dispatch a decomposition request for a task
    ///
    /// Clear-on-start policy: the task's prior children are discarded and it
    /// is expanded right away, so arriving subtasks become visible without
    /// another user action.
    fn start_decompose(&mut self, id: TaskId) -> EngineResponse<()> {
        let task_text = match self.store.get(id) {
            Ok(task) => task.text.clone(),
            Err(e) => return Err(e.into()),
        };
        let Some(generation) = self.pending.begin(id) else {
            debug!(%id, "start_decompose: already pending, rejecting");
            return Err(EngineError::DecomposeInFlight(id));
        };

        self.store.replace_children(id, &[]).map_err(EngineError::from)?;
        self.store.set_expanded(id, true).map_err(EngineError::from)?;
        let _ = self.event_tx.send(EngineEvent::DecomposeStarted { id });
        self.flush_and_notify();

        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = client.decompose(&task_text).await;
            let _ = tx
                .send(EngineCommand::DecomposeFinished { id, generation, outcome })
                .await;
        });

        info!(%id, "Decomposition dispatched");
        Ok(())
    }

    /// Apply a decomposition result on the mutation path
    fn finish_decompose(
        &mut self,
        id: TaskId,
        generation: u64,
        outcome: Result<Vec<String>, crate::decompose::DecomposeError>,
    ) {
        if !self.pending.complete(id, generation) {
            debug!(%id, generation, "finish_decompose: stale result discarded");
            return;
        }
        if !self.store.contains(id) {
            debug!(%id, "finish_decompose: task gone, result discarded");
            return;
        }

        match outcome {
            Ok(texts) => match self.store.replace_children(id, &texts) {
                Ok(children) => {
                    info!(%id, subtasks = children.len(), "Decomposition installed");
                    let _ = self.event_tx.send(EngineEvent::DecomposeCompleted {
                        id,
                        subtasks: children.len(),
                    });
                    self.flush_and_notify();
                }
                Err(e) => {
                    warn!(%id, error = %e, "Decomposition result rejected by the store");
                    let _ = self.event_tx.send(EngineEvent::DecomposeFailed {
                        id,
                        kind: crate::decompose::DecomposeFailureKind::Format,
                        message: e.to_string(),
                    });
                }
            },
            Err(e) => {
                warn!(%id, error = %e, "Decomposition failed");
                let _ = self.event_tx.send(EngineEvent::DecomposeFailed {
                    id,
                    kind: e.kind(),
                    message: e.to_string(),
                });
            }
        }
    }

    fn rows(&self, visible_only: bool) -> Vec<TaskRow> {
        let flat = if visible_only {
            self.store.visible_rows()
        } else {
            self.store.flatten()
        };
        flat.into_iter()
            .map(|row| {
                let decomposing = self.pending.is_pending(row.id);
                TaskRow::from_flat(row, decomposing)
            })
            .collect()
    }

    /// Flush after a successful mutation and tell the view to re-render
    ///
    /// A failed save is surfaced as an event and a warning; the in-memory
    /// forest stays authoritative.
    fn flush_and_notify(&mut self) {
        if let Err(e) = self.file.save(&self.store) {
            warn!(error = %e, "Failed to save tasks file");
            let _ = self.event_tx.send(EngineEvent::SaveFailed { message: e.to_string() });
        }
        let _ = self.event_tx.send(EngineEvent::TreeChanged);
    }
}
