//! Cross-component scenario coverage (§8 TESTABLE PROPERTIES) exercised
//! through the `orchestrator-mocks` test doubles, the same way each
//! component's own unit tests are built, just composed end to end.

use std::sync::Arc;

use chrono::{Duration, Utc};
use orchestrator_core::error::OrchestratorError;
use orchestrator_core::models::{
    CompletionCriterion, MessageRole, Priority, StatusChangeMetadata, TodoItem, TodoStatus, WorkTask,
    WorkTaskStatus,
};
use orchestrator_core::traits::TaskStore;
use orchestrator_engine::{ConversationOrchestrator, TodoGraphEngine, TodoGraphEvent};
use orchestrator_mocks::{InMemorySessionStore, InMemoryTaskStore, StubNlpBackend, TestClock};

fn task() -> WorkTask {
    let now = Utc::now();
    WorkTask {
        id: "task-1".into(),
        title: "Add OAuth".into(),
        description: "desc".into(),
        content: "Implement OAuth2 with Google".into(),
        submitter: "alice".into(),
        team: "platform".into(),
        priority: Priority::High,
        category: "security".into(),
        tags: vec![],
        status: WorkTaskStatus::Submitted,
        sensitivity_score: None,
        retention_ttl: None,
        version: 0,
        created_at: now,
        updated_at: now,
    }
}

fn todo(id: &str, deps: &[&str], status: TodoStatus) -> TodoItem {
    let now = Utc::now();
    TodoItem {
        id: id.into(),
        task_id: "task-1".into(),
        title: id.into(),
        description: id.into(),
        priority: Priority::Medium,
        estimated_hours: 2.0,
        assignee: None,
        due_date: None,
        dependencies: deps.iter().map(|s| s.to_string()).collect(),
        category: "development".into(),
        status,
        related_workgroups: vec![],
        deliverable_ids: vec![],
        quality_check_ids: vec![],
        completion_criteria: vec![CompletionCriterion {
            description: "done".into(),
            mandatory: true,
            met: status == TodoStatus::Completed,
            satisfied_by_deliverable: None,
        }],
        status_history: vec![],
        refines_todo_id: None,
        version: 1,
        created_at: now,
        updated_at: now,
    }
}

/// S3: completing a todo whose own dependency is still pending must be
/// rejected before it ever reaches the store, with no event published.
#[tokio::test]
async fn completing_a_todo_with_unsatisfied_dependency_is_rejected() {
    let store = Arc::new(InMemoryTaskStore::default());
    store.put_task(task()).await.unwrap();
    store.put_todo(todo("a", &[], TodoStatus::Pending)).await.unwrap();
    store.put_todo(todo("b", &["a"], TodoStatus::Pending)).await.unwrap();

    let engine = TodoGraphEngine::new(store.clone(), Arc::new(TestClock::default()));
    let mut events = engine.subscribe();

    let result = engine
        .update_status("b", TodoStatus::Completed, StatusChangeMetadata::default())
        .await;

    assert!(matches!(result, Err(OrchestratorError::InvalidState { .. })));
    assert!(events.try_recv().is_err());

    let b = store.get_todo("b").await.unwrap().unwrap();
    assert_eq!(b.status, TodoStatus::Pending);
    assert!(b.status_history.is_empty());
}

/// S4: completing a shared dependency makes every sibling that depended on
/// it alone eligible to start, and the progress snapshot reflects the move.
#[tokio::test]
async fn completing_a_shared_dependency_cascades_eligibility() {
    let store = Arc::new(InMemoryTaskStore::default());
    store.put_task(task()).await.unwrap();
    store.put_todo(todo("a", &[], TodoStatus::InProgress)).await.unwrap();
    store.put_todo(todo("b", &["a"], TodoStatus::Pending)).await.unwrap();
    store.put_todo(todo("c", &["a"], TodoStatus::Pending)).await.unwrap();

    let engine = TodoGraphEngine::new(store.clone(), Arc::new(TestClock::default()));
    let mut events = engine.subscribe();

    let impact = engine
        .update_status("a", TodoStatus::Completed, StatusChangeMetadata::default())
        .await
        .unwrap();

    let mut newly_eligible = impact.newly_eligible.clone();
    newly_eligible.sort();
    assert_eq!(newly_eligible, vec!["b".to_string(), "c".to_string()]);

    let mut eligible_seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let TodoGraphEvent::EligibleToStart(e) = event {
            eligible_seen.push(e.todo_id);
        }
    }
    eligible_seen.sort();
    assert_eq!(eligible_seen, vec!["b".to_string(), "c".to_string()]);

    let a = store.get_todo("a").await.unwrap().unwrap();
    assert_eq!(a.status_history.len(), 1);

    let snapshot = engine.progress("task-1").await.unwrap();
    assert_eq!(snapshot.total, 3);
    assert_eq!(snapshot.completed, 1);
}

/// S5: an overdue, in-progress, critical-priority todo on the critical path
/// is detected as a single timeline blocker at critical severity.
#[tokio::test]
async fn overdue_critical_todo_on_the_critical_path_is_a_critical_timeline_blocker() {
    let store = Arc::new(InMemoryTaskStore::default());
    store.put_task(task()).await.unwrap();

    let mut overdue = todo("d", &[], TodoStatus::InProgress);
    overdue.priority = Priority::Critical;
    overdue.due_date = Some(Utc::now() - Duration::days(1));
    store.put_todo(overdue).await.unwrap();

    let engine = TodoGraphEngine::new(store, Arc::new(TestClock::default()));
    let blockers = engine.identify_blockers("task-1").await.unwrap();

    assert_eq!(blockers.len(), 1);
    assert_eq!(blockers[0].todo_id, "d");
    assert_eq!(blockers[0].kind, orchestrator_core::models::BlockerKind::Timeline);
    assert_eq!(blockers[0].severity, orchestrator_core::models::Severity::Critical);
}

/// S6: branching a conversation isolates the branch's own messages from the
/// main line; the main line's history is unaffected by what happens on a
/// branch forked from it.
#[tokio::test]
async fn branched_messages_stay_off_the_main_line() {
    let co = ConversationOrchestrator::new(
        Arc::new(InMemorySessionStore::default()),
        Arc::new(StubNlpBackend::new()),
        Arc::new(TestClock::default()),
    );
    let session = co.start_session("u1", "team-a", "persona-1").await.unwrap();

    let m1 = co
        .send_message(&session.id, MessageRole::User, "m1", &[], None, None)
        .await
        .unwrap();
    let m2 = co
        .send_message(&session.id, MessageRole::Agent, "m2", &[], None, None)
        .await
        .unwrap();
    let branch = co
        .create_branch(&session.id, &m2.id, "alt-approach", None)
        .await
        .unwrap();
    let m3 = co
        .send_message(&session.id, MessageRole::User, "m3", &[], None, None)
        .await
        .unwrap();
    let m4 = co
        .send_message(
            &session.id,
            MessageRole::Agent,
            "m4",
            &[],
            Some(branch.id.as_str()),
            Some(m2.id.as_str()),
        )
        .await
        .unwrap();

    let (main_history, _) = co
        .get_history(&session.id, None, None, None, None, None, 0)
        .await
        .unwrap();
    assert_eq!(
        main_history.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
        vec![m1.id.as_str(), m2.id.as_str(), m3.id.as_str()]
    );

    let (branch_history, _) = co
        .get_history(&session.id, Some(branch.id.as_str()), None, None, None, None, 0)
        .await
        .unwrap();
    assert_eq!(
        branch_history.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
        vec![m4.id.as_str()]
    );
}
