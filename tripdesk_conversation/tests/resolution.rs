//! Session resolution against a scripted backend.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::ScriptedBackend;
use serde_json::json;
use tripdesk_conversation::{ConversationConfig, ConversationManager, Resolution};
use tripdesk_core::{Role, SessionSummary};

fn manager(backend: &Arc<ScriptedBackend>) -> ConversationManager<Arc<ScriptedBackend>> {
    let (manager, _events) =
        ConversationManager::new(Arc::clone(backend), ConversationConfig::default());
    manager
}

fn open_session(id: &str, hours_ago: i64) -> SessionSummary {
    SessionSummary {
        status: Some("active".to_string()),
        updated_at: Some(Utc::now() - Duration::hours(hours_ago)),
        ..SessionSummary::new(id)
    }
}

#[tokio::test]
async fn concurrent_resolution_creates_one_session() {
    let backend = Arc::new(ScriptedBackend::new());
    let manager = manager(&backend);

    let (first, second) = tokio::join!(manager.resolve(None), manager.resolve(None));

    let outcomes = [first.ok().flatten(), second.ok().flatten()];
    assert_eq!(outcomes.iter().filter(|o| o.is_some()).count(), 1);
    assert_eq!(backend.creates(), 1);
    assert_eq!(manager.session_id().as_deref(), Some("created-1"));
}

#[tokio::test]
async fn sequential_resolution_without_id_is_idempotent() {
    let backend = Arc::new(ScriptedBackend::new());
    let manager = manager(&backend);

    let first = manager.resolve(None).await;
    let second = manager.resolve(None).await;

    assert!(matches!(first, Ok(Some(Resolution::Created(_)))));
    assert!(matches!(second, Ok(None)));
    assert_eq!(backend.creates(), 1);
    assert_eq!(backend.lists(), 1);
}

#[tokio::test]
async fn same_external_id_fetches_history_once() {
    let backend = Arc::new(ScriptedBackend::new().with_history(
        "S1",
        vec![json!({"id": "m1", "role": "user", "content": "Flights to Rome"})],
    ));
    let manager = manager(&backend);

    let first = manager.resolve(Some("S1")).await;
    let second = manager.resolve(Some("S1")).await;

    assert!(matches!(first, Ok(Some(Resolution::Explicit(ref id))) if id == "S1"));
    assert!(matches!(second, Ok(None)));
    assert_eq!(backend.history_fetches(), vec!["S1".to_string()]);
    assert_eq!(backend.lists(), 0);
    assert_eq!(backend.creates(), 0);
}

#[tokio::test]
async fn switching_external_id_refreshes() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_history("S1", vec![json!({"id": "a", "role": "user", "content": "one"})])
            .with_history("S2", vec![json!({"id": "b", "role": "user", "content": "two"})]),
    );
    let manager = manager(&backend);

    assert!(manager.resolve(Some("S1")).await.is_ok());
    assert!(manager.resolve(Some("S2")).await.is_ok());

    assert_eq!(
        backend.history_fetches(),
        vec!["S1".to_string(), "S2".to_string()]
    );
    assert_eq!(manager.session_id().as_deref(), Some("S2"));
    let messages = manager.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, "b");
}

#[tokio::test]
async fn explicit_id_with_empty_history_gets_welcome() {
    let backend = Arc::new(ScriptedBackend::new());
    let manager = manager(&backend);

    let resolution = manager.resolve(Some("S7")).await;
    assert!(matches!(resolution, Ok(Some(Resolution::Explicit(_)))));

    let messages = manager.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::Assistant);
    assert_eq!(
        messages[0].content,
        ConversationConfig::default().welcome_message
    );
    assert!(messages[0].is_local());
}

#[tokio::test]
async fn resumes_most_recent_open_session() {
    let mut finished = open_session("finished", 0);
    finished.outcome = Some("booked".to_string());

    let backend = Arc::new(
        ScriptedBackend::new()
            .with_session(open_session("older", 30))
            .with_session(finished)
            .with_session(open_session("recent", 2))
            .with_history(
                "recent",
                vec![
                    json!({"message_id": "r1", "role": "user", "message": "Paris in May"}),
                    json!({"id": "r2", "role": "assistant", "content": "Searching...",
                           "tool_calls": [{"name": "search_flights", "input": {"to": "CDG"}}]}),
                ],
            ),
    );
    let manager = manager(&backend);

    let resolution = manager.resolve(None).await;
    assert!(matches!(resolution, Ok(Some(Resolution::Resumed(ref id))) if id == "recent"));
    assert_eq!(backend.creates(), 0);
    assert_eq!(backend.history_fetches(), vec!["recent".to_string()]);

    let messages = manager.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].id, "r1");
    assert_eq!(messages[0].content, "Paris in May");
    assert_eq!(
        messages[1].tool_calls[0].arguments.get("to"),
        Some(&json!("CDG"))
    );
}

#[tokio::test]
async fn creates_when_nothing_is_open() {
    let mut closed = open_session("closed", 1);
    closed.status = Some("archived".to_string());
    let backend = Arc::new(ScriptedBackend::new().with_session(closed));
    let manager = manager(&backend);

    let resolution = manager.resolve(None).await;
    assert!(matches!(resolution, Ok(Some(Resolution::Created(ref id))) if id == "created-1"));
    assert!(backend.history_fetches().is_empty());
    assert_eq!(manager.messages().len(), 1);
}

#[tokio::test]
async fn failed_resolution_reports_and_can_retry() {
    let backend = Arc::new(ScriptedBackend {
        fail_listing: true,
        ..ScriptedBackend::new()
    });
    let manager = manager(&backend);

    let first = manager.resolve(None).await;
    assert!(first.is_err());
    assert!(manager.session_id().is_none());

    let messages = manager.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::System);
    assert!(messages[0].content.contains("connection refused"));

    // The guard was released, so a retry reaches the backend again.
    let second = manager.resolve(None).await;
    assert!(second.is_err());
    assert_eq!(backend.lists(), 2);
    assert_eq!(backend.creates(), 0);
}

#[tokio::test]
async fn later_external_id_supersedes_an_outstanding_one() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_history("S1", vec![json!({"id": "a", "role": "user", "content": "one"})])
            .with_history("S2", vec![json!({"id": "b", "role": "user", "content": "two"})]),
    );
    let manager = manager(&backend);

    let (first, second) = tokio::join!(manager.resolve(Some("S1")), manager.resolve(Some("S2")));

    assert!(matches!(first, Ok(None)));
    assert!(matches!(second, Ok(Some(Resolution::Explicit(ref id))) if id == "S2"));
    assert_eq!(
        backend.history_fetches(),
        vec!["S1".to_string(), "S2".to_string()]
    );
    assert_eq!(manager.session_id().as_deref(), Some("S2"));
    let messages = manager.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, "b");
}
