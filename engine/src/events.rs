//! Status-change event fan-out for `SubscribeEvents` (§4.4).

use chrono::{DateTime, Utc};
use orchestrator_core::models::{StatusChangeImpact, TodoStatus};
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct StatusChangeEvent {
    pub todo_id: String,
    pub task_id: String,
    pub from: TodoStatus,
    pub to: TodoStatus,
    pub at: DateTime<Utc>,
    pub impact: StatusChangeImpact,
}

/// A todo whose dependencies just all became `Completed`, so it is now
/// legal to move it to `InProgress` (§4.4.3).
#[derive(Debug, Clone)]
pub struct EligibleToStartEvent {
    pub todo_id: String,
    pub task_id: String,
    pub at: DateTime<Utc>,
}

/// Everything a `SubscribeEvents` caller can receive from the todo graph (§6).
#[derive(Debug, Clone)]
pub enum TodoGraphEvent {
    StatusChanged(StatusChangeEvent),
    EligibleToStart(EligibleToStartEvent),
}

/// Thin wrapper over a `tokio::sync::broadcast` channel. Lagging subscribers
/// drop the oldest events rather than blocking publishers.
pub struct EventBus {
    sender: broadcast::Sender<TodoGraphEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TodoGraphEvent> {
        self.sender.subscribe()
    }

    /// No-op if there are currently no subscribers.
    pub fn publish(&self, event: TodoGraphEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator_core::models::Severity;

    fn sample_event() -> TodoGraphEvent {
        TodoGraphEvent::StatusChanged(StatusChangeEvent {
            todo_id: "todo-1".into(),
            task_id: "task-1".into(),
            from: TodoStatus::Pending,
            to: TodoStatus::InProgress,
            at: Utc::now(),
            impact: StatusChangeImpact {
                todo_id: "todo-1".into(),
                affects_critical_path: false,
                dependent_todo_ids: vec![],
                risk_level: Severity::Low,
                recommended_actions: vec![],
                newly_eligible: vec![],
            },
        })
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.publish(sample_event());
        let received = rx.recv().await.unwrap();
        match received {
            TodoGraphEvent::StatusChanged(e) => assert_eq!(e.todo_id, "todo-1"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_eligible_to_start_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.publish(TodoGraphEvent::EligibleToStart(EligibleToStartEvent {
            todo_id: "todo-2".into(),
            task_id: "task-1".into(),
            at: Utc::now(),
        }));
        let received = rx.recv().await.unwrap();
        match received {
            TodoGraphEvent::EligibleToStart(e) => assert_eq!(e.todo_id, "todo-2"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(sample_event());
    }
}
