//! In-memory `TaskStore` double with error injection and call tracking,
//! following the teacher's mock-repository idiom.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orchestrator_core::error::{OrchestratorError, Result};
use orchestrator_core::models::{Deliverable, TaskAnalysisResult, TodoItem, WorkTask, WorkTaskStatus};
use orchestrator_core::traits::{StoreStats, TaskStore};
use parking_lot::Mutex;

#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<HashMap<String, WorkTask>>,
    todos: Mutex<HashMap<String, TodoItem>>,
    deliverables: Mutex<HashMap<String, Deliverable>>,
    analysis_results: Mutex<HashMap<String, Vec<TaskAnalysisResult>>>,
    error_injection: Mutex<Option<OrchestratorError>>,
    call_history: Mutex<Vec<String>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject_error(&self, error: OrchestratorError) {
        *self.error_injection.lock() = Some(error);
    }

    pub fn call_history(&self) -> Vec<String> {
        self.call_history.lock().clone()
    }

    pub fn assert_called(&self, method: &str) {
        let history = self.call_history.lock();
        assert!(
            history.iter().any(|c| c.contains(method)),
            "method '{method}' was not called, history: {history:?}"
        );
    }

    fn check_error_injection(&self) -> Result<()> {
        if let Some(err) = self.error_injection.lock().take() {
            return Err(err);
        }
        Ok(())
    }

    fn record(&self, method: &str) {
        self.call_history.lock().push(method.to_string());
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn put_task(&self, task: WorkTask) -> Result<()> {
        self.record("put_task");
        self.check_error_injection()?;
        self.tasks.lock().insert(task.id.clone(), task);
        Ok(())
    }

    async fn get_task(&self, id: &str) -> Result<Option<WorkTask>> {
        self.record("get_task");
        self.check_error_injection()?;
        Ok(self.tasks.lock().get(id).cloned())
    }

    async fn update_task_cas(&self, task: WorkTask, expected_version: i64) -> Result<()> {
        self.record("update_task_cas");
        self.check_error_injection()?;
        let mut tasks = self.tasks.lock();
        let current = tasks
            .get(&task.id)
            .ok_or_else(|| OrchestratorError::not_found("task", &task.id))?;
        if current.version != expected_version {
            return Err(OrchestratorError::conflict("task", &task.id));
        }
        let mut updated = task;
        updated.version = expected_version + 1;
        tasks.insert(updated.id.clone(), updated);
        Ok(())
    }

    async fn query_tasks_by_team_status(
        &self,
        team_id: &str,
        status: Option<WorkTaskStatus>,
    ) -> Result<Vec<WorkTask>> {
        self.record("query_tasks_by_team_status");
        self.check_error_injection()?;
        Ok(self
            .tasks
            .lock()
            .values()
            .filter(|t| t.team == team_id && status.map(|s| s == t.status).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn put_todo(&self, todo: TodoItem) -> Result<()> {
        self.record("put_todo");
        self.check_error_injection()?;
        self.todos.lock().insert(todo.id.clone(), todo);
        Ok(())
    }

    async fn get_todo(&self, id: &str) -> Result<Option<TodoItem>> {
        self.record("get_todo");
        self.check_error_injection()?;
        Ok(self.todos.lock().get(id).cloned())
    }

    async fn update_todo_cas(&self, todo: TodoItem, expected_version: i64) -> Result<()> {
        self.record("update_todo_cas");
        self.check_error_injection()?;
        let mut todos = self.todos.lock();
        let current = todos
            .get(&todo.id)
            .ok_or_else(|| OrchestratorError::not_found("todo", &todo.id))?;
        if current.version != expected_version {
            return Err(OrchestratorError::conflict("todo", &todo.id));
        }
        let mut updated = todo;
        updated.version = expected_version + 1;
        todos.insert(updated.id.clone(), updated);
        Ok(())
    }

    async fn query_todos_by_task(&self, task_id: &str) -> Result<Vec<TodoItem>> {
        self.record("query_todos_by_task");
        self.check_error_injection()?;
        Ok(self
            .todos
            .lock()
            .values()
            .filter(|t| t.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn query_todos_by_assignee_due(
        &self,
        assignee: &str,
        due_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<TodoItem>> {
        self.record("query_todos_by_assignee_due");
        self.check_error_injection()?;
        Ok(self
            .todos
            .lock()
            .values()
            .filter(|t| t.assignee.as_deref() == Some(assignee))
            .filter(|t| match (due_before, t.due_date) {
                (Some(before), Some(due)) => due < before,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .cloned()
            .collect())
    }

    async fn replace_pending_todos(&self, task_id: &str, todos: Vec<TodoItem>) -> Result<()> {
        self.record("replace_pending_todos");
        self.check_error_injection()?;
        let mut store = self.todos.lock();
        store.retain(|_, t| !(t.task_id == task_id && t.status == orchestrator_core::models::TodoStatus::Pending));
        for todo in todos {
            store.insert(todo.id.clone(), todo);
        }
        Ok(())
    }

    async fn put_deliverable(&self, deliverable: Deliverable) -> Result<()> {
        self.record("put_deliverable");
        self.check_error_injection()?;
        self.deliverables
            .lock()
            .insert(deliverable.id.clone(), deliverable);
        Ok(())
    }

    async fn get_deliverable(&self, id: &str) -> Result<Option<Deliverable>> {
        self.record("get_deliverable");
        self.check_error_injection()?;
        Ok(self.deliverables.lock().get(id).cloned())
    }

    async fn update_deliverable_cas(
        &self,
        deliverable: Deliverable,
        expected_version: i64,
    ) -> Result<()> {
        self.record("update_deliverable_cas");
        self.check_error_injection()?;
        let mut deliverables = self.deliverables.lock();
        let current = deliverables
            .get(&deliverable.id)
            .ok_or_else(|| OrchestratorError::not_found("deliverable", &deliverable.id))?;
        if current.version != expected_version {
            return Err(OrchestratorError::conflict("deliverable", &deliverable.id));
        }
        let mut updated = deliverable;
        updated.version = expected_version + 1;
        deliverables.insert(updated.id.clone(), updated);
        Ok(())
    }

    async fn query_deliverables_by_todo(&self, todo_id: &str) -> Result<Vec<Deliverable>> {
        self.record("query_deliverables_by_todo");
        self.check_error_injection()?;
        Ok(self
            .deliverables
            .lock()
            .values()
            .filter(|d| d.todo_id == todo_id)
            .cloned()
            .collect())
    }

    async fn put_analysis_result(&self, result: TaskAnalysisResult) -> Result<()> {
        self.record("put_analysis_result");
        self.check_error_injection()?;
        self.analysis_results
            .lock()
            .entry(result.task_id.clone())
            .or_default()
            .push(result);
        Ok(())
    }

    async fn get_latest_analysis_result(&self, task_id: &str) -> Result<Option<TaskAnalysisResult>> {
        self.record("get_latest_analysis_result");
        self.check_error_injection()?;
        Ok(self
            .analysis_results
            .lock()
            .get(task_id)
            .and_then(|v| v.iter().max_by_key(|r| r.version).cloned()))
    }

    async fn health_check(&self) -> Result<()> {
        self.record("health_check");
        self.check_error_injection()
    }

    async fn stats(&self) -> Result<StoreStats> {
        self.record("stats");
        self.check_error_injection()?;
        Ok(StoreStats {
            task_count: self.tasks.lock().len() as u64,
            todo_count: self.todos.lock().len() as u64,
            deliverable_count: self.deliverables.lock().len() as u64,
            session_count: 0,
        })
    }
}

pub type SharedTaskStore = Arc<InMemoryTaskStore>;
