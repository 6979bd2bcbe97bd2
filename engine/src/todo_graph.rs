//! Todo Graph Engine (TGE) — §4.4.
//!
//! Owns todo status transitions, dependency/critical-path analysis, blocker
//! detection, progress snapshots, and completion projection.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use orchestrator_core::error::{OrchestratorError, Result};
use orchestrator_core::models::{
    Blocker, BlockerKind, Priority, ProgressReport, ProgressSnapshot, ProjectedCompletion, Severity,
    StatusChangeImpact, StatusChangeMetadata, StatusHistoryEntry, TimeRange, TodoItem, TodoStatus,
};
use orchestrator_core::traits::{Clock, TaskStore};

use crate::events::{EligibleToStartEvent, EventBus, StatusChangeEvent, TodoGraphEvent};

const VELOCITY_WINDOW_DAYS: i64 = 7;

pub struct TodoGraphEngine {
    store: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl TodoGraphEngine {
    pub fn new(store: Arc<dyn TaskStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            events: EventBus::default(),
        }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<TodoGraphEvent> {
        self.events.subscribe()
    }

    /// `UpdateStatus(todoId, newStatus, metadata) -> StatusChangeImpact` (§4.4).
    pub async fn update_status(
        &self,
        todo_id: &str,
        new_status: TodoStatus,
        metadata: StatusChangeMetadata,
    ) -> Result<StatusChangeImpact> {
        let todo = self
            .store
            .get_todo(todo_id)
            .await?
            .ok_or_else(|| OrchestratorError::not_found("todo", todo_id))?;

        let legal = todo.status.can_transition_to(new_status);
        if !legal && !metadata.force {
            return Err(OrchestratorError::invalid_transition(todo.status, new_status));
        }

        if new_status == TodoStatus::Completed && !todo.mandatory_criteria_met() && !metadata.force {
            return Err(OrchestratorError::invalid_state(
                "mandatory_criteria_unmet",
                format!("todo '{todo_id}' has unmet mandatory completion criteria"),
            ));
        }

        if new_status == TodoStatus::InProgress && !metadata.force {
            for dep_id in &todo.dependencies {
                let dep = self.store.get_todo(dep_id).await?;
                if dep.map(|d| d.status) != Some(TodoStatus::Completed) {
                    return Err(OrchestratorError::dependencies_not_satisfied(todo_id));
                }
            }
        }

        let now = self.clock.now();
        let mut updated = todo.clone();
        updated.status_history.push(StatusHistoryEntry {
            from: todo.status,
            to: new_status,
            at: now,
            reason: metadata.reason.clone(),
            forced: metadata.force && !legal,
            forced_by: if metadata.force { metadata.authorized_by.clone() } else { None },
            forced_reason: if metadata.force && !legal { metadata.reason.clone() } else { None },
        });
        updated.status = new_status;
        updated.updated_at = now;
        self.store.update_todo_cas(updated, todo.version).await?;

        let all_todos = self.store.query_todos_by_task(&todo.task_id).await?;
        let dependent_todo_ids: Vec<String> = all_todos
            .iter()
            .filter(|t| t.dependencies.iter().any(|d| d == todo_id))
            .map(|t| t.id.clone())
            .collect();

        let newly_eligible = if new_status == TodoStatus::Completed {
            dependent_todo_ids
                .iter()
                .filter(|id| {
                    all_todos
                        .iter()
                        .find(|t| &t.id == *id)
                        .map(|t| {
                            t.dependencies.iter().all(|d| {
                                if d == todo_id {
                                    true
                                } else {
                                    all_todos
                                        .iter()
                                        .find(|o| &o.id == d)
                                        .map(|o| o.status == TodoStatus::Completed)
                                        .unwrap_or(false)
                                }
                            })
                        })
                        .unwrap_or(false)
                })
                .cloned()
                .collect()
        } else {
            vec![]
        };

        let critical_path = critical_path_ids(&all_todos);
        let affects_critical_path = critical_path.contains(todo_id);
        let risk_level = if affects_critical_path && new_status == TodoStatus::Blocked {
            Severity::High
        } else if new_status == TodoStatus::Blocked {
            Severity::Medium
        } else {
            Severity::Low
        };
        let recommended_actions = if new_status == TodoStatus::Blocked && affects_critical_path {
            vec!["escalate: blocked todo sits on the critical path".to_string()]
        } else {
            vec![]
        };

        let impact = StatusChangeImpact {
            todo_id: todo_id.to_string(),
            affects_critical_path,
            dependent_todo_ids,
            risk_level,
            recommended_actions,
            newly_eligible,
        };

        self.events.publish(TodoGraphEvent::StatusChanged(StatusChangeEvent {
            todo_id: todo_id.to_string(),
            task_id: todo.task_id.clone(),
            from: todo.status,
            to: new_status,
            at: now,
            impact: impact.clone(),
        }));

        for eligible_id in &impact.newly_eligible {
            self.events.publish(TodoGraphEvent::EligibleToStart(EligibleToStartEvent {
                todo_id: eligible_id.clone(),
                task_id: todo.task_id.clone(),
                at: now,
            }));
        }

        Ok(impact)
    }

    /// `IdentifyBlockers(taskId) -> Blocker[]` (§4.4.2). Composed from explicit
    /// `blocked` todos and overdue todos; sorted critical > high > medium > low.
    pub async fn identify_blockers(&self, task_id: &str) -> Result<Vec<Blocker>> {
        let todos = self.store.query_todos_by_task(task_id).await?;
        let now = self.clock.now();
        let critical_path = critical_path_ids(&todos);
        let mut blockers = Vec::new();

        for todo in &todos {
            if todo.status != TodoStatus::Blocked {
                continue;
            }
            let unmet: Vec<&TodoItem> = todo
                .dependencies
                .iter()
                .filter_map(|d| todos.iter().find(|t| &t.id == d))
                .filter(|t| t.status != TodoStatus::Completed)
                .collect();
            let (kind, description) = if !unmet.is_empty() {
                (
                    BlockerKind::Dependency,
                    format!(
                        "waiting on {} unfinished dependenc{}",
                        unmet.len(),
                        if unmet.len() == 1 { "y" } else { "ies" }
                    ),
                )
            } else {
                (BlockerKind::Technical, "blocked with no unmet dependency".to_string())
            };
            blockers.push(Blocker {
                id: format!("blocker-{}", todo.id),
                todo_id: todo.id.clone(),
                kind,
                severity: blocker_severity(todo, &critical_path),
                description,
                detected_at: now,
                auto_detected: true,
                resolved_at: None,
            });
        }

        for todo in &todos {
            if todo.status == TodoStatus::Completed || todo.status == TodoStatus::Blocked {
                continue;
            }
            if todo.due_date.map(|d| d < now).unwrap_or(false) {
                blockers.push(Blocker {
                    id: format!("blocker-{}-overdue", todo.id),
                    todo_id: todo.id.clone(),
                    kind: BlockerKind::Timeline,
                    severity: blocker_severity(todo, &critical_path),
                    description: "todo is past its due date".to_string(),
                    detected_at: now,
                    auto_detected: true,
                    resolved_at: None,
                });
            }
        }

        blockers.sort_by(|a, b| b.severity.cmp(&a.severity));
        Ok(blockers)
    }

    /// `Progress(taskId) -> ProgressSnapshot` (§4.4).
    pub async fn progress(&self, task_id: &str) -> Result<ProgressSnapshot> {
        let todos = self.store.query_todos_by_task(task_id).await?;
        let now = self.clock.now();
        let total = todos.len() as u32;
        let completed = todos.iter().filter(|t| t.status == TodoStatus::Completed).count() as u32;
        let in_progress = todos.iter().filter(|t| t.status == TodoStatus::InProgress).count() as u32;
        let blocked = todos.iter().filter(|t| t.status == TodoStatus::Blocked).count() as u32;
        let completion_pct = if total == 0 {
            0.0
        } else {
            completed as f32 / total as f32 * 100.0
        };
        let velocity = compute_velocity(&todos, now);
        let projected_completion = project_completion(&todos, velocity, now);

        Ok(ProgressSnapshot {
            task_id: task_id.to_string(),
            total,
            completed,
            in_progress,
            blocked,
            completion_pct,
            velocity,
            projected_completion,
            computed_at: now,
        })
    }

    /// `GenerateReport(taskId, range) -> ProgressReport` (§4.4).
    pub async fn generate_report(&self, task_id: &str, range: TimeRange) -> Result<ProgressReport> {
        let todos = self.store.query_todos_by_task(task_id).await?;
        let completed_in_range = todos
            .iter()
            .filter(|t| {
                t.status == TodoStatus::Completed && t.updated_at >= range.from && t.updated_at <= range.to
            })
            .count() as u32;

        let blockers = self.identify_blockers(task_id).await?;
        let mut quality_summary = Vec::new();
        for todo in &todos {
            let deliverables = self.store.query_deliverables_by_todo(&todo.id).await?;
            quality_summary.extend(deliverables.into_iter().filter_map(|d| d.quality));
        }

        let snapshot = self.progress(task_id).await?;

        Ok(ProgressReport {
            task_id: task_id.to_string(),
            range,
            completed_in_range,
            current_blockers: blockers.into_iter().filter(|b| b.is_open()).collect(),
            quality_summary,
            velocity: snapshot.velocity,
            snapshot,
        })
    }
}

fn compute_velocity(todos: &[TodoItem], now: DateTime<Utc>) -> f32 {
    let window_start = now - Duration::days(VELOCITY_WINDOW_DAYS);
    let completed_recent = todos
        .iter()
        .filter(|t| t.status == TodoStatus::Completed && t.updated_at >= window_start)
        .count();
    completed_recent as f32 / VELOCITY_WINDOW_DAYS as f32
}

fn project_completion(
    todos: &[TodoItem],
    velocity: f32,
    now: DateTime<Utc>,
) -> Option<ProjectedCompletion> {
    let remaining = todos.iter().filter(|t| t.status != TodoStatus::Completed).count();
    if remaining == 0 || velocity <= 0.0 {
        return None;
    }
    let days = remaining as f32 / velocity;
    let realistic = now + Duration::days(days.ceil() as i64);
    let optimistic = now + Duration::days((days * 0.7).ceil() as i64);
    let pessimistic = now + Duration::days((days * 1.5).ceil() as i64);
    Some(ProjectedCompletion {
        optimistic,
        realistic,
        pessimistic,
    })
}

/// Default `medium`, elevated to `high` when either condition holds and to
/// `critical` when both hold (§4.4.4).
fn blocker_severity(todo: &TodoItem, critical_path: &HashSet<String>) -> Severity {
    let on_critical_path = critical_path.contains(&todo.id);
    let critical_priority = todo.priority == Priority::Critical;
    match (on_critical_path, critical_priority) {
        (true, true) => Severity::Critical,
        (true, false) | (false, true) => Severity::High,
        (false, false) => Severity::Medium,
    }
}

/// Ids of todos on the longest (by estimated hours) dependency chain.
fn critical_path_ids(todos: &[TodoItem]) -> HashSet<String> {
    let by_id: HashMap<&str, &TodoItem> = todos.iter().map(|t| (t.id.as_str(), t)).collect();
    let mut memo: HashMap<String, f32> = HashMap::new();

    fn longest<'a>(id: &'a str, by_id: &HashMap<&'a str, &'a TodoItem>, memo: &mut HashMap<String, f32>) -> f32 {
        if let Some(v) = memo.get(id) {
            return *v;
        }
        let todo = match by_id.get(id) {
            Some(t) => t,
            None => return 0.0,
        };
        let mut best = 0.0_f32;
        for dep in &todo.dependencies {
            best = best.max(longest(dep, by_id, memo));
        }
        let total = best + todo.estimated_hours;
        memo.insert(id.to_string(), total);
        total
    }

    for t in todos {
        longest(&t.id, &by_id, &mut memo);
    }

    let max_len = memo.values().cloned().fold(0.0_f32, f32::max);
    let mut path = HashSet::new();
    if max_len <= 0.0 {
        return path;
    }
    let end = memo
        .iter()
        .filter(|(_, v)| (**v - max_len).abs() < f32::EPSILON)
        .map(|(k, _)| k.clone())
        .next();

    if let Some(mut cur) = end {
        loop {
            path.insert(cur.clone());
            let todo = match by_id.get(cur.as_str()) {
                Some(t) => t,
                None => break,
            };
            let next = todo
                .dependencies
                .iter()
                .filter(|d| by_id.contains_key(d.as_str()))
                .max_by(|a, b| memo[*a].partial_cmp(&memo[*b]).unwrap());
            match next {
                Some(n) => cur = n.clone(),
                None => break,
            }
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator_core::models::{CompletionCriterion, Priority};
    use orchestrator_mocks::{InMemoryTaskStore, TestClock};

    fn todo(id: &str, deps: &[&str], hours: f32, status: TodoStatus) -> TodoItem {
        let now = Utc::now();
        TodoItem {
            id: id.into(),
            task_id: "task-1".into(),
            title: id.into(),
            description: id.into(),
            priority: Priority::Medium,
            estimated_hours: hours,
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

    async fn engine_with(todos: Vec<TodoItem>) -> (TodoGraphEngine, Arc<InMemoryTaskStore>) {
        let store = Arc::new(InMemoryTaskStore::default());
        for t in todos {
            store.put_todo(t).await.unwrap();
        }
        let engine = TodoGraphEngine::new(store.clone(), Arc::new(TestClock::default()));
        (engine, store)
    }

    #[tokio::test]
    async fn cannot_start_todo_with_unmet_dependency() {
        let (engine, _store) = engine_with(vec![
            todo("a", &[], 2.0, TodoStatus::Pending),
            todo("b", &["a"], 2.0, TodoStatus::Pending),
        ])
        .await;
        let result = engine
            .update_status("b", TodoStatus::InProgress, StatusChangeMetadata::default())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn completing_dependency_marks_dependent_eligible() {
        let (engine, _store) = engine_with(vec![
            todo("a", &[], 2.0, TodoStatus::InProgress),
            todo("b", &["a"], 2.0, TodoStatus::Pending),
        ])
        .await;
        let impact = engine
            .update_status("a", TodoStatus::Completed, StatusChangeMetadata::default())
            .await
            .unwrap();
        assert!(impact.newly_eligible.contains(&"b".to_string()));
    }

    #[tokio::test]
    async fn completing_dependency_emits_eligible_to_start() {
        let (engine, _store) = engine_with(vec![
            todo("a", &[], 2.0, TodoStatus::InProgress),
            todo("b", &["a"], 2.0, TodoStatus::Pending),
            todo("c", &["a"], 2.0, TodoStatus::Pending),
        ])
        .await;
        let mut rx = engine.subscribe();
        engine
            .update_status("a", TodoStatus::Completed, StatusChangeMetadata::default())
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, TodoGraphEvent::StatusChanged(_)));

        let mut eligible: Vec<String> = Vec::new();
        for _ in 0..2 {
            match rx.recv().await.unwrap() {
                TodoGraphEvent::EligibleToStart(e) => eligible.push(e.todo_id),
                other => panic!("unexpected event: {other:?}"),
            }
        }
        eligible.sort();
        assert_eq!(eligible, vec!["b".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn completed_todo_is_a_sink() {
        let (engine, _store) = engine_with(vec![todo("a", &[], 2.0, TodoStatus::Completed)]).await;
        let result = engine
            .update_status("a", TodoStatus::Pending, StatusChangeMetadata::default())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn forced_transition_records_audit_trail() {
        let (engine, store) = engine_with(vec![todo("a", &[], 2.0, TodoStatus::Completed)]).await;
        let metadata = StatusChangeMetadata {
            reason: Some("rollback bad deploy".into()),
            force: true,
            authorized_by: Some("admin-1".into()),
        };
        engine
            .update_status("a", TodoStatus::InProgress, metadata)
            .await
            .unwrap();
        let updated = store.get_todo("a").await.unwrap().unwrap();
        let entry = updated.status_history.last().unwrap();
        assert!(entry.forced);
        assert_eq!(entry.forced_by.as_deref(), Some("admin-1"));
    }

    #[tokio::test]
    async fn progress_reports_zero_when_no_todos() {
        let (engine, _store) = engine_with(vec![]).await;
        let snapshot = engine.progress("task-1").await.unwrap();
        assert_eq!(snapshot.total, 0);
        assert_eq!(snapshot.completion_pct, 0.0);
    }

    #[test]
    fn critical_path_follows_longest_chain() {
        let todos = vec![
            todo("a", &[], 1.0, TodoStatus::Pending),
            todo("b", &["a"], 5.0, TodoStatus::Pending),
            todo("c", &["a"], 1.0, TodoStatus::Pending),
        ];
        let path = critical_path_ids(&todos);
        assert!(path.contains("b"));
        assert!(path.contains("a"));
        assert!(!path.contains("c"));
    }
}
