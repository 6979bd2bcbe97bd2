use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orchestrator_core::error::{OrchestratorError, Result};
use orchestrator_core::models::{
    Branch, Deliverable, Message, MessageRole, Session, Summary, SummaryKind, TaskAnalysisResult,
    TodoItem, WorkTask, WorkTaskStatus,
};
use orchestrator_core::traits::{SessionStore, StoreStats, TaskStore};
use sqlx::{migrate::MigrateDatabase, Row, Sqlite, SqlitePool};

use crate::common::{
    from_json, role_to_string, sqlx_error_to_orchestrator_error, summary_kind_to_string,
    task_status_to_string, to_json, todo_status_to_string,
};

/// SQLite-backed implementation of `TaskStore`.
///
/// Each entity is stored whole as JSON in a `data` column; a handful of
/// sibling columns (`team`, `status`, `assignee`, ...) are kept in sync
/// purely so the query methods this trait requires can use an index
/// instead of deserializing every row.
#[derive(Debug, Clone)]
pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    /// `database_url` is a file path, `sqlite://...` URL, or `:memory:`.
    pub async fn new(database_url: &str) -> Result<Self> {
        let db_url = if database_url.starts_with(":memory:") || database_url.starts_with("sqlite://")
        {
            database_url.to_string()
        } else {
            format!("sqlite://{database_url}")
        };

        if !db_url.contains(":memory:") && !Sqlite::database_exists(&db_url).await.unwrap_or(false)
        {
            Sqlite::create_database(&db_url)
                .await
                .map_err(sqlx_error_to_orchestrator_error)?;
        }

        let connect_options = if db_url.contains(":memory:") {
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(&db_url)
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Memory)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true)
        } else {
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(db_url.replace("sqlite://", ""))
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true)
        };

        let pool = SqlitePool::connect_with(connect_options)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations/sqlite")
            .run(&self.pool)
            .await
            .map_err(|e| {
                OrchestratorError::internal(format!("migration failed: {e}"), "db-migrate")
            })?;
        tracing::info!("task store migrations completed");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn put_task(&self, task: WorkTask) -> Result<()> {
        let data = to_json(&task)?;
        sqlx::query(
            "INSERT INTO tasks (id, team, status, version, data) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET team = excluded.team, status = excluded.status,
                version = excluded.version, data = excluded.data",
        )
        .bind(&task.id)
        .bind(&task.team)
        .bind(task_status_to_string(task.status))
        .bind(task.version)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;
        Ok(())
    }

    async fn get_task(&self, id: &str) -> Result<Option<WorkTask>> {
        let row = sqlx::query("SELECT data FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        row.map(|r| from_json(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn update_task_cas(&self, mut task: WorkTask, expected_version: i64) -> Result<()> {
        task.version = expected_version + 1;
        let data = to_json(&task)?;
        let result = sqlx::query(
            "UPDATE tasks SET team = ?, status = ?, version = ?, data = ? WHERE id = ? AND version = ?",
        )
        .bind(&task.team)
        .bind(task_status_to_string(task.status))
        .bind(task.version)
        .bind(data)
        .bind(&task.id)
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;

        if result.rows_affected() == 0 {
            if self.get_task(&task.id).await?.is_none() {
                return Err(OrchestratorError::not_found("task", &task.id));
            }
            return Err(OrchestratorError::conflict("task", &task.id));
        }
        Ok(())
    }

    async fn query_tasks_by_team_status(
        &self,
        team_id: &str,
        status: Option<WorkTaskStatus>,
    ) -> Result<Vec<WorkTask>> {
        let rows = match status {
            Some(status) => {
                sqlx::query("SELECT data FROM tasks WHERE team = ? AND status = ?")
                    .bind(team_id)
                    .bind(task_status_to_string(status))
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                sqlx::query("SELECT data FROM tasks WHERE team = ?")
                    .bind(team_id)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(sqlx_error_to_orchestrator_error)?;

        rows.iter()
            .map(|r| from_json(r.get::<String, _>("data").as_str()))
            .collect()
    }

    async fn put_todo(&self, todo: TodoItem) -> Result<()> {
        let data = to_json(&todo)?;
        sqlx::query(
            "INSERT INTO todos (id, task_id, status, assignee, due_date, version, data)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET task_id = excluded.task_id, status = excluded.status,
                assignee = excluded.assignee, due_date = excluded.due_date,
                version = excluded.version, data = excluded.data",
        )
        .bind(&todo.id)
        .bind(&todo.task_id)
        .bind(todo_status_to_string(todo.status))
        .bind(&todo.assignee)
        .bind(todo.due_date)
        .bind(todo.version)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;
        Ok(())
    }

    async fn get_todo(&self, id: &str) -> Result<Option<TodoItem>> {
        let row = sqlx::query("SELECT data FROM todos WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        row.map(|r| from_json(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn update_todo_cas(&self, mut todo: TodoItem, expected_version: i64) -> Result<()> {
        todo.version = expected_version + 1;
        let data = to_json(&todo)?;
        let result = sqlx::query(
            "UPDATE todos SET status = ?, assignee = ?, due_date = ?, version = ?, data = ?
             WHERE id = ? AND version = ?",
        )
        .bind(todo_status_to_string(todo.status))
        .bind(&todo.assignee)
        .bind(todo.due_date)
        .bind(todo.version)
        .bind(data)
        .bind(&todo.id)
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;

        if result.rows_affected() == 0 {
            if self.get_todo(&todo.id).await?.is_none() {
                return Err(OrchestratorError::not_found("todo", &todo.id));
            }
            return Err(OrchestratorError::conflict("todo", &todo.id));
        }
        Ok(())
    }

    async fn query_todos_by_task(&self, task_id: &str) -> Result<Vec<TodoItem>> {
        let rows = sqlx::query("SELECT data FROM todos WHERE task_id = ?")
            .bind(task_id)
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        rows.iter()
            .map(|r| from_json(r.get::<String, _>("data").as_str()))
            .collect()
    }

    async fn query_todos_by_assignee_due(
        &self,
        assignee: &str,
        due_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<TodoItem>> {
        let rows = match due_before {
            Some(before) => {
                sqlx::query("SELECT data FROM todos WHERE assignee = ? AND due_date < ?")
                    .bind(assignee)
                    .bind(before)
                    .fetch_all(&self.pool)
                    .await
            }
            None => sqlx::query("SELECT data FROM todos WHERE assignee = ?")
                .bind(assignee)
                .fetch_all(&self.pool)
                .await,
        }
        .map_err(sqlx_error_to_orchestrator_error)?;

        rows.iter()
            .map(|r| from_json(r.get::<String, _>("data").as_str()))
            .collect()
    }

    async fn replace_pending_todos(&self, task_id: &str, todos: Vec<TodoItem>) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_orchestrator_error)?;

        sqlx::query("DELETE FROM todos WHERE task_id = ? AND status = ?")
            .bind(task_id)
            .bind(todo_status_to_string(
                orchestrator_core::models::TodoStatus::Pending,
            ))
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;

        for todo in todos {
            let data = to_json(&todo)?;
            sqlx::query(
                "INSERT INTO todos (id, task_id, status, assignee, due_date, version, data)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET task_id = excluded.task_id, status = excluded.status,
                    assignee = excluded.assignee, due_date = excluded.due_date,
                    version = excluded.version, data = excluded.data",
            )
            .bind(&todo.id)
            .bind(&todo.task_id)
            .bind(todo_status_to_string(todo.status))
            .bind(&todo.assignee)
            .bind(todo.due_date)
            .bind(todo.version)
            .bind(data)
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        }

        tx.commit().await.map_err(sqlx_error_to_orchestrator_error)?;
        Ok(())
    }

    async fn put_deliverable(&self, deliverable: Deliverable) -> Result<()> {
        let data = to_json(&deliverable)?;
        sqlx::query(
            "INSERT INTO deliverables (id, todo_id, version, data) VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET todo_id = excluded.todo_id,
                version = excluded.version, data = excluded.data",
        )
        .bind(&deliverable.id)
        .bind(&deliverable.todo_id)
        .bind(deliverable.version)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;
        Ok(())
    }

    async fn get_deliverable(&self, id: &str) -> Result<Option<Deliverable>> {
        let row = sqlx::query("SELECT data FROM deliverables WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        row.map(|r| from_json(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn update_deliverable_cas(
        &self,
        mut deliverable: Deliverable,
        expected_version: i64,
    ) -> Result<()> {
        deliverable.version = expected_version + 1;
        let data = to_json(&deliverable)?;
        let result = sqlx::query(
            "UPDATE deliverables SET version = ?, data = ? WHERE id = ? AND version = ?",
        )
        .bind(deliverable.version)
        .bind(data)
        .bind(&deliverable.id)
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;

        if result.rows_affected() == 0 {
            if self.get_deliverable(&deliverable.id).await?.is_none() {
                return Err(OrchestratorError::not_found("deliverable", &deliverable.id));
            }
            return Err(OrchestratorError::conflict("deliverable", &deliverable.id));
        }
        Ok(())
    }

    async fn query_deliverables_by_todo(&self, todo_id: &str) -> Result<Vec<Deliverable>> {
        let rows = sqlx::query("SELECT data FROM deliverables WHERE todo_id = ?")
            .bind(todo_id)
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        rows.iter()
            .map(|r| from_json(r.get::<String, _>("data").as_str()))
            .collect()
    }

    async fn put_analysis_result(&self, result: TaskAnalysisResult) -> Result<()> {
        let data = to_json(&result)?;
        sqlx::query(
            "INSERT INTO analysis_results (task_id, version, generated_at, data) VALUES (?, ?, ?, ?)
             ON CONFLICT(task_id, version) DO UPDATE SET generated_at = excluded.generated_at, data = excluded.data",
        )
        .bind(&result.task_id)
        .bind(result.version)
        .bind(result.generated_at)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;
        Ok(())
    }

    async fn get_latest_analysis_result(&self, task_id: &str) -> Result<Option<TaskAnalysisResult>> {
        let row = sqlx::query(
            "SELECT data FROM analysis_results WHERE task_id = ? ORDER BY version DESC LIMIT 1",
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;
        row.map(|r| from_json(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let (tasks, todos, deliverables) = tokio::try_join!(
            sqlx::query("SELECT COUNT(*) as c FROM tasks").fetch_one(&self.pool),
            sqlx::query("SELECT COUNT(*) as c FROM todos").fetch_one(&self.pool),
            sqlx::query("SELECT COUNT(*) as c FROM deliverables").fetch_one(&self.pool),
        )
        .map_err(sqlx_error_to_orchestrator_error)?;

        Ok(StoreStats {
            task_count: tasks.get::<i64, _>("c") as u64,
            todo_count: todos.get::<i64, _>("c") as u64,
            deliverable_count: deliverables.get::<i64, _>("c") as u64,
            session_count: 0,
        })
    }
}

/// SQLite-backed implementation of `SessionStore`, sharing a pool with
/// `SqliteTaskStore` when both are constructed against the same database
/// file (`connect` runs the shared migration, then hands out a pool clone).
#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Convenience constructor for callers without an existing `SqliteTaskStore` pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let store = SqliteTaskStore::new(database_url).await?;
        store.migrate().await?;
        Ok(Self::new(store.pool().clone()))
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn put_session(&self, session: Session) -> Result<()> {
        let data = to_json(&session)?;
        sqlx::query(
            "INSERT INTO sessions (id, status, message_seq, data) VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET status = excluded.status,
                message_seq = excluded.message_seq, data = excluded.data",
        )
        .bind(&session.id)
        .bind(session_status_to_string(session.status))
        .bind(session.message_seq as i64)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>> {
        let row = sqlx::query("SELECT data FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        row.map(|r| from_json(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn update_session_cas(&self, session: Session, expected_seq: u64) -> Result<()> {
        let data = to_json(&session)?;
        let result = sqlx::query(
            "UPDATE sessions SET status = ?, message_seq = ?, data = ? WHERE id = ? AND message_seq = ?",
        )
        .bind(session_status_to_string(session.status))
        .bind(session.message_seq as i64)
        .bind(data)
        .bind(&session.id)
        .bind(expected_seq as i64)
        .execute(&self.pool)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;

        if result.rows_affected() == 0 {
            if self.get_session(&session.id).await?.is_none() {
                return Err(OrchestratorError::not_found("session", &session.id));
            }
            return Err(OrchestratorError::conflict("session", &session.id));
        }
        Ok(())
    }

    async fn append_message(&self, message: Message) -> Result<()> {
        let session = self
            .get_session(&message.session_id)
            .await?
            .ok_or_else(|| OrchestratorError::not_found("session", &message.session_id))?;
        if session.status != orchestrator_core::models::SessionStatus::Active {
            return Err(OrchestratorError::invalid_state(
                "session_not_active",
                format!("session '{}' is not active", message.session_id),
            ));
        }

        let data = to_json(&message)?;
        sqlx::query(
            "INSERT INTO messages (id, session_id, branch_id, role, timestamp, seq, data)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(&message.session_id)
        .bind(&message.branch_id)
        .bind(role_to_string(message.role))
        .bind(message.timestamp)
        .bind(message.seq as i64)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;
        Ok(())
    }

    async fn query_messages(
        &self,
        session_id: &str,
        branch_id: Option<&str>,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        roles: Option<&[MessageRole]>,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<(Vec<Message>, bool)> {
        let mut query_builder: sqlx::QueryBuilder<Sqlite> =
            sqlx::QueryBuilder::new("SELECT data FROM messages WHERE session_id = ");
        query_builder.push_bind(session_id.to_string());

        match branch_id {
            Some(branch_id) => {
                query_builder.push(" AND branch_id = ");
                query_builder.push_bind(branch_id.to_string());
            }
            None => {
                query_builder.push(" AND branch_id IS NULL");
            }
        }
        if let Some(since) = since {
            query_builder.push(" AND timestamp >= ");
            query_builder.push_bind(since);
        }
        if let Some(until) = until {
            query_builder.push(" AND timestamp <= ");
            query_builder.push_bind(until);
        }
        if let Some(roles) = roles {
            if !roles.is_empty() {
                query_builder.push(" AND role IN (");
                let mut separated = query_builder.separated(", ");
                for role in roles {
                    separated.push_bind(role_to_string(*role).to_string());
                }
                separated.push_unseparated(")");
            }
        }

        query_builder.push(" ORDER BY timestamp ASC, seq ASC");

        // Fetch one extra row so `has_more` can be derived without a second query.
        let page_size = limit.unwrap_or(usize::MAX);
        if let Some(limit) = limit {
            query_builder.push(" LIMIT ");
            query_builder.push_bind((limit + 1) as i64);
        }
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset as i64);

        let rows = query_builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;

        let has_more = limit.is_some() && rows.len() > page_size;
        let mut messages = rows
            .iter()
            .map(|r| from_json(r.get::<String, _>("data").as_str()))
            .collect::<Result<Vec<Message>>>()?;
        messages.truncate(page_size);

        Ok((messages, has_more))
    }

    async fn put_branch(&self, branch: Branch) -> Result<()> {
        let data = to_json(&branch)?;
        sqlx::query(
            "INSERT INTO branches (id, session_id, data) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET session_id = excluded.session_id, data = excluded.data",
        )
        .bind(&branch.id)
        .bind(&branch.session_id)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;
        Ok(())
    }

    async fn get_branch(&self, id: &str) -> Result<Option<Branch>> {
        let row = sqlx::query("SELECT data FROM branches WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        row.map(|r| from_json(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn put_summary(&self, summary: Summary) -> Result<()> {
        let data = to_json(&summary)?;
        sqlx::query(
            "INSERT INTO summaries (id, session_id, kind, created_at, data) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data",
        )
        .bind(&summary.id)
        .bind(&summary.session_id)
        .bind(summary_kind_to_string(summary.kind))
        .bind(summary.created_at)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;
        Ok(())
    }

    async fn latest_summary(&self, session_id: &str, kind: SummaryKind) -> Result<Option<Summary>> {
        let row = sqlx::query(
            "SELECT data FROM summaries WHERE session_id = ? AND kind = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(session_id)
        .bind(summary_kind_to_string(kind))
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;
        row.map(|r| from_json(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn expire_idle_sessions(&self, idle_before: DateTime<Utc>) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT data FROM sessions WHERE status = ?")
            .bind(session_status_to_string(
                orchestrator_core::models::SessionStatus::Active,
            ))
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;

        let mut expired_ids = Vec::new();
        for row in rows {
            let mut session: Session = from_json(row.get::<String, _>("data").as_str())?;
            if session.last_activity_at < idle_before {
                session.status = orchestrator_core::models::SessionStatus::Expired;
                let data = to_json(&session)?;
                sqlx::query("UPDATE sessions SET status = ?, data = ? WHERE id = ?")
                    .bind(session_status_to_string(session.status))
                    .bind(data)
                    .bind(&session.id)
                    .execute(&self.pool)
                    .await
                    .map_err(sqlx_error_to_orchestrator_error)?;
                expired_ids.push(session.id);
            }
        }
        Ok(expired_ids)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        Ok(())
    }
}

fn session_status_to_string(status: orchestrator_core::models::SessionStatus) -> &'static str {
    use orchestrator_core::models::SessionStatus;
    match status {
        SessionStatus::Active => "active",
        SessionStatus::Ended => "ended",
        SessionStatus::Expired => "expired",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator_core::models::Priority;

    async fn test_store() -> SqliteTaskStore {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let store = SqliteTaskStore::new(&format!(":memory:test_{timestamp}"))
            .await
            .unwrap();
        store.migrate().await.unwrap();
        store
    }

    fn sample_task() -> WorkTask {
        let now = Utc::now();
        WorkTask {
            id: "task-1".into(),
            title: "Rotate credentials".into(),
            description: "Rotate the leaked API key".into(),
            content: "full submission body".into(),
            submitter: "alice".into(),
            team: "security".into(),
            priority: Priority::High,
            category: "security".into(),
            tags: vec!["urgent".into()],
            status: WorkTaskStatus::Submitted,
            sensitivity_score: None,
            retention_ttl: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = test_store().await;
        store.put_task(sample_task()).await.unwrap();
        let fetched = store.get_task("task-1").await.unwrap().unwrap();
        assert_eq!(fetched.title, "Rotate credentials");
    }

    #[tokio::test]
    async fn cas_update_rejects_stale_version() {
        let store = test_store().await;
        store.put_task(sample_task()).await.unwrap();
        let task = store.get_task("task-1").await.unwrap().unwrap();

        store.update_task_cas(task.clone(), 1).await.unwrap();
        let result = store.update_task_cas(task, 1).await;
        assert!(matches!(result, Err(OrchestratorError::Conflict(_))));
    }

    #[tokio::test]
    async fn query_by_team_and_status_filters() {
        let store = test_store().await;
        store.put_task(sample_task()).await.unwrap();
        let matches = store
            .query_tasks_by_team_status("security", Some(WorkTaskStatus::Submitted))
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);

        let none = store
            .query_tasks_by_team_status("security", Some(WorkTaskStatus::Completed))
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
