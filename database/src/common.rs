use orchestrator_core::error::OrchestratorError;
use orchestrator_core::models::{MessageRole, SummaryKind, TodoStatus, WorkTaskStatus};

pub fn task_status_to_string(status: WorkTaskStatus) -> &'static str {
    match status {
        WorkTaskStatus::Submitted => "submitted",
        WorkTaskStatus::Analyzing => "analyzing",
        WorkTaskStatus::Analyzed => "analyzed",
        WorkTaskStatus::InProgress => "in_progress",
        WorkTaskStatus::Completed => "completed",
        WorkTaskStatus::Cancelled => "cancelled",
    }
}

pub fn todo_status_to_string(status: TodoStatus) -> &'static str {
    match status {
        TodoStatus::Pending => "pending",
        TodoStatus::InProgress => "in_progress",
        TodoStatus::Completed => "completed",
        TodoStatus::Blocked => "blocked",
    }
}

pub fn role_to_string(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Agent => "agent",
        MessageRole::System => "system",
    }
}

pub fn string_to_role(s: &str) -> Option<MessageRole> {
    match s {
        "user" => Some(MessageRole::User),
        "agent" => Some(MessageRole::Agent),
        "system" => Some(MessageRole::System),
        _ => None,
    }
}

pub fn summary_kind_to_string(kind: SummaryKind) -> &'static str {
    match kind {
        SummaryKind::Session => "session",
        SummaryKind::Periodic => "periodic",
        SummaryKind::Topic => "topic",
    }
}

/// Correlation ids for internal errors don't need global uniqueness beyond
/// "distinguishable in logs"; a nanosecond timestamp is enough and keeps
/// this module free of a `uuid` dependency.
fn correlation_id() -> String {
    format!("db-{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0))
}

/// Maps a `sqlx::Error` onto the orchestration core's error taxonomy.
/// Unique-constraint violations surface as `Conflict` since the only id
/// collisions this schema can produce are CAS races on entities already
/// present.
pub fn sqlx_error_to_orchestrator_error(err: sqlx::Error) -> OrchestratorError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message();
            if message.contains("UNIQUE constraint failed") {
                OrchestratorError::conflict("row", message)
            } else {
                OrchestratorError::internal(
                    format!("database constraint error: {message}"),
                    correlation_id(),
                )
            }
        }
        sqlx::Error::RowNotFound => OrchestratorError::not_found("row", "<unknown>"),
        sqlx::Error::PoolTimedOut => {
            OrchestratorError::Transient("connection pool timeout".to_string())
        }
        sqlx::Error::Io(io_err) => {
            OrchestratorError::internal(format!("database i/o error: {io_err}"), correlation_id())
        }
        _ => OrchestratorError::internal(
            format!("database operation failed: {err}"),
            correlation_id(),
        ),
    }
}

pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String, OrchestratorError> {
    serde_json::to_string(value).map_err(|e| {
        OrchestratorError::internal(format!("failed to serialize row: {e}"), correlation_id())
    })
}

pub fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, OrchestratorError> {
    serde_json::from_str(raw).map_err(|e| {
        OrchestratorError::internal(format!("failed to deserialize row: {e}"), correlation_id())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_are_stable() {
        assert_eq!(task_status_to_string(WorkTaskStatus::Analyzed), "analyzed");
        assert_eq!(todo_status_to_string(TodoStatus::Blocked), "blocked");
        assert_eq!(string_to_role("agent"), Some(MessageRole::Agent));
        assert_eq!(string_to_role("bogus"), None);
    }

    #[test]
    fn json_round_trips() {
        let value = vec!["a".to_string(), "b".to_string()];
        let raw = to_json(&value).unwrap();
        let back: Vec<String> = from_json(&raw).unwrap();
        assert_eq!(value, back);
    }
}
