//! Integration tests for taskforest
//!
//! These tests drive the engine through its public handle the way the view
//! does, with a scripted decomposition client in place of the HTTP one.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::tempdir;
use tokio::sync::broadcast;

use taskforest::{
    DecomposeClient, DecomposeError, DecomposeFailureKind, EngineError, EngineEvent, TaskEngine, TaskId,
};

/// Scripted stand-in for the HTTP decomposition client
struct StubDecomposer {
    responses: Mutex<VecDeque<Result<Vec<String>, DecomposeError>>>,
    delay: Option<Duration>,
}

impl StubDecomposer {
    fn new(responses: Vec<Result<Vec<String>, DecomposeError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            delay: None,
        }
    }

    fn with_subtasks(subtasks: &[&str]) -> Self {
        Self::new(vec![Ok(subtasks.iter().map(|s| s.to_string()).collect())])
    }

    fn failing(status: u16) -> Self {
        Self::new(vec![Err(DecomposeError::Api {
            status,
            message: "Internal Server Error".to_string(),
        })])
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl DecomposeClient for StubDecomposer {
    async fn decompose(&self, _task_text: &str) -> Result<Vec<String>, DecomposeError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![]))
    }
}

/// Wait until the engine broadcasts a decomposition outcome for `id`
async fn wait_for_outcome(rx: &mut broadcast::Receiver<EngineEvent>, id: TaskId) -> EngineEvent {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for decomposition outcome")
            .expect("event channel closed");
        match &event {
            EngineEvent::DecomposeCompleted { id: event_id, .. }
            | EngineEvent::DecomposeFailed { id: event_id, .. }
                if *event_id == id =>
            {
                return event;
            }
            _ => {}
        }
    }
}

// =============================================================================
// Decomposition scenarios
// =============================================================================

#[tokio::test]
async fn successful_decomposition_installs_three_leaves() {
    let temp = tempdir().expect("Failed to create temp dir");
    let client = StubDecomposer::with_subtasks(&["Book flight", "Book hotel", "Pack bags"]);
    let engine = TaskEngine::spawn(temp.path().join("tasks.json"), Arc::new(client)).unwrap();
    let mut events = engine.subscribe_events();

    let root = engine.add_root("Plan trip").await.unwrap();
    engine.decompose(root).await.unwrap();

    match wait_for_outcome(&mut events, root).await {
        EngineEvent::DecomposeCompleted { subtasks, .. } => assert_eq!(subtasks, 3),
        other => panic!("unexpected event: {:?}", other),
    }

    let rows = engine.visible_rows().await.unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].text, "Plan trip");
    assert_eq!(
        rows[1..].iter().map(|r| r.text.as_str()).collect::<Vec<_>>(),
        vec!["Book flight", "Book hotel", "Pack bags"]
    );
    for row in &rows[1..] {
        assert!(!row.completed);
        assert!(!row.has_children);
        assert_eq!(row.depth, 1);
    }

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn http_500_leaves_task_idle_with_no_children() {
    let temp = tempdir().expect("Failed to create temp dir");
    let engine = TaskEngine::spawn(
        temp.path().join("tasks.json"),
        Arc::new(StubDecomposer::failing(500)),
    )
    .unwrap();
    let mut events = engine.subscribe_events();

    let root = engine.add_root("Plan trip").await.unwrap();
    engine.decompose(root).await.unwrap();

    match wait_for_outcome(&mut events, root).await {
        EngineEvent::DecomposeFailed { kind, .. } => assert_eq!(kind, DecomposeFailureKind::Format),
        other => panic!("unexpected event: {:?}", other),
    }

    let rows = engine.rows().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].has_children);
    assert!(!rows[0].decomposing);

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn clear_on_start_does_not_restore_old_children_on_failure() {
    let temp = tempdir().expect("Failed to create temp dir");
    let client = StubDecomposer::new(vec![
        Ok(vec!["Book flight".to_string(), "Book hotel".to_string()]),
        Err(DecomposeError::Api {
            status: 500,
            message: "boom".to_string(),
        }),
    ]);
    let engine = TaskEngine::spawn(temp.path().join("tasks.json"), Arc::new(client)).unwrap();
    let mut events = engine.subscribe_events();

    let root = engine.add_root("Plan trip").await.unwrap();
    engine.decompose(root).await.unwrap();
    wait_for_outcome(&mut events, root).await;
    assert_eq!(engine.rows().await.unwrap().len(), 3);

    // second decomposition fails; the first batch of children is gone for good
    engine.decompose(root).await.unwrap();
    wait_for_outcome(&mut events, root).await;

    let rows = engine.rows().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].has_children);

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn pending_task_rejects_second_decompose() {
    let temp = tempdir().expect("Failed to create temp dir");
    let client = StubDecomposer::with_subtasks(&["one"]).delayed(Duration::from_millis(150));
    let engine = TaskEngine::spawn(temp.path().join("tasks.json"), Arc::new(client)).unwrap();
    let mut events = engine.subscribe_events();

    let root = engine.add_root("Plan trip").await.unwrap();
    engine.decompose(root).await.unwrap();

    assert!(engine.is_decomposing(root).await.unwrap());
    let rows = engine.rows().await.unwrap();
    assert!(rows[0].decomposing);

    assert!(matches!(
        engine.decompose(root).await,
        Err(EngineError::DecomposeInFlight(_))
    ));

    wait_for_outcome(&mut events, root).await;
    assert_eq!(engine.rows().await.unwrap().len(), 2);

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn delete_while_pending_discards_the_late_result() {
    let temp = tempdir().expect("Failed to create temp dir");
    let client = StubDecomposer::with_subtasks(&["late"]).delayed(Duration::from_millis(100));
    let engine = TaskEngine::spawn(temp.path().join("tasks.json"), Arc::new(client)).unwrap();
    let mut events = engine.subscribe_events();

    let root = engine.add_root("Plan trip").await.unwrap();
    let keeper = engine.add_root("Water plants").await.unwrap();
    engine.decompose(root).await.unwrap();
    engine.delete(root).await.unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    let rows = engine.rows().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, keeper);

    while let Ok(event) = events.try_recv() {
        assert!(!matches!(
            event,
            EngineEvent::DecomposeCompleted { .. } | EngineEvent::DecomposeFailed { .. }
        ));
    }

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn decompositions_on_different_tasks_run_independently() {
    let temp = tempdir().expect("Failed to create temp dir");
    let client = StubDecomposer::new(vec![
        Ok(vec!["a1".to_string()]),
        Ok(vec!["b1".to_string(), "b2".to_string()]),
    ]);
    let engine = TaskEngine::spawn(temp.path().join("tasks.json"), Arc::new(client)).unwrap();
    let mut events = engine.subscribe_events();

    let first = engine.add_root("First").await.unwrap();
    let second = engine.add_root("Second").await.unwrap();

    engine.decompose(first).await.unwrap();
    wait_for_outcome(&mut events, first).await;
    engine.decompose(second).await.unwrap();
    wait_for_outcome(&mut events, second).await;

    let rows = engine.rows().await.unwrap();
    assert_eq!(rows.len(), 5);

    engine.shutdown().await.unwrap();
}

// =============================================================================
// Completion and visibility through the engine
// =============================================================================

#[tokio::test]
async fn completing_children_one_by_one_completes_the_root() {
    let temp = tempdir().expect("Failed to create temp dir");
    let client = StubDecomposer::with_subtasks(&["Book flight", "Book hotel", "Pack bags"]);
    let engine = TaskEngine::spawn(temp.path().join("tasks.json"), Arc::new(client)).unwrap();
    let mut events = engine.subscribe_events();

    let root = engine.add_root("Plan trip").await.unwrap();
    engine.decompose(root).await.unwrap();
    wait_for_outcome(&mut events, root).await;

    let children: Vec<TaskId> = engine.rows().await.unwrap()[1..].iter().map(|r| r.id).collect();

    engine.toggle_completed(children[0]).await.unwrap();
    assert!(!engine.rows().await.unwrap()[0].completed);

    engine.toggle_completed(children[1]).await.unwrap();
    engine.toggle_completed(children[2]).await.unwrap();
    assert!(engine.rows().await.unwrap()[0].completed);

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn completing_the_root_completes_every_child() {
    let temp = tempdir().expect("Failed to create temp dir");
    let client = StubDecomposer::with_subtasks(&["Book flight", "Book hotel", "Pack bags"]);
    let engine = TaskEngine::spawn(temp.path().join("tasks.json"), Arc::new(client)).unwrap();
    let mut events = engine.subscribe_events();

    let root = engine.add_root("Plan trip").await.unwrap();
    engine.decompose(root).await.unwrap();
    wait_for_outcome(&mut events, root).await;

    engine.set_completed(root, true).await.unwrap();

    let rows = engine.rows().await.unwrap();
    assert!(rows.iter().all(|r| r.completed));

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn collapsing_the_root_hides_children_and_expanding_restores_order() {
    let temp = tempdir().expect("Failed to create temp dir");
    let client = StubDecomposer::with_subtasks(&["Book flight", "Book hotel", "Pack bags"]);
    let engine = TaskEngine::spawn(temp.path().join("tasks.json"), Arc::new(client)).unwrap();
    let mut events = engine.subscribe_events();

    let root = engine.add_root("Plan trip").await.unwrap();
    engine.decompose(root).await.unwrap();
    wait_for_outcome(&mut events, root).await;

    engine.toggle_expanded(root).await.unwrap();
    let visible = engine.visible_rows().await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, root);

    engine.toggle_expanded(root).await.unwrap();
    let visible = engine.visible_rows().await.unwrap();
    assert_eq!(
        visible.iter().map(|r| r.text.as_str()).collect::<Vec<_>>(),
        vec!["Plan trip", "Book flight", "Book hotel", "Pack bags"]
    );

    engine.shutdown().await.unwrap();
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn the_forest_survives_an_engine_restart() {
    let temp = tempdir().expect("Failed to create temp dir");
    let path = temp.path().join("tasks.json");

    {
        let client = StubDecomposer::with_subtasks(&["Book flight", "Book hotel"]);
        let engine = TaskEngine::spawn(&path, Arc::new(client)).unwrap();
        let mut events = engine.subscribe_events();

        let root = engine.add_root("Plan trip").await.unwrap();
        engine.decompose(root).await.unwrap();
        wait_for_outcome(&mut events, root).await;
        engine.toggle_expanded(root).await.unwrap();
        engine.shutdown().await.unwrap();
    }

    let engine = TaskEngine::spawn(&path, Arc::new(StubDecomposer::with_subtasks(&[]))).unwrap();
    let rows = engine.rows().await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].text, "Plan trip");
    assert!(!rows[0].expanded);
    assert!(!rows[1].visible);
    assert!(!rows[2].visible);

    let visible = engine.visible_rows().await.unwrap();
    assert_eq!(visible.len(), 1);

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn starting_without_a_tasks_file_yields_an_empty_forest() {
    let temp = tempdir().expect("Failed to create temp dir");
    let engine = TaskEngine::spawn(
        temp.path().join("absent.json"),
        Arc::new(StubDecomposer::with_subtasks(&[])),
    )
    .unwrap();

    assert!(engine.rows().await.unwrap().is_empty());
    engine.shutdown().await.unwrap();
}
