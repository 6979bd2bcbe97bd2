use crate::{
    error::{OrchestratorError, Result},
    models::{Deliverable, DeliverableStatus, NewWorkTask, TodoItem, TodoStatus},
};

/// Validation utilities for work-task orchestration operations.
pub struct Validator;

impl Validator {
    /// Team/user/persona identifiers must:
    /// - Be 1-50 characters long
    /// - Contain only letters, numbers, hyphens, and underscores
    /// - Start and end with an alphanumeric character
    pub fn validate_identifier(field: &str, value: &str) -> Result<()> {
        if value.is_empty() {
            return Err(OrchestratorError::validation(format!(
                "field '{field}' cannot be empty"
            )));
        }
        if value.len() > 50 {
            return Err(OrchestratorError::validation(format!(
                "field '{field}' must be at most 50 characters long"
            )));
        }
        let first = value.chars().next().unwrap();
        let last = value.chars().last().unwrap();
        if !first.is_alphanumeric() || !last.is_alphanumeric() {
            return Err(OrchestratorError::validation(format!(
                "field '{field}' must start and end with a letter or number"
            )));
        }
        if !value.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
            return Err(OrchestratorError::validation(format!(
                "field '{field}' can only contain letters, numbers, hyphens, and underscores"
            )));
        }
        Ok(())
    }

    /// Titles must be 1-200 non-whitespace-only characters.
    pub fn validate_title(title: &str) -> Result<()> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(OrchestratorError::validation("title cannot be empty"));
        }
        if trimmed.len() > 200 {
            return Err(OrchestratorError::validation(
                "title must be at most 200 characters long",
            ));
        }
        Ok(())
    }

    /// Free-text bodies (description/content) must be 1-20000 non-whitespace-only characters.
    pub fn validate_body(field: &str, body: &str) -> Result<()> {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Err(OrchestratorError::validation(format!(
                "field '{field}' cannot be empty"
            )));
        }
        if trimmed.len() > 20_000 {
            return Err(OrchestratorError::validation(format!(
                "field '{field}' must be at most 20000 characters long"
            )));
        }
        Ok(())
    }

    pub fn validate_new_work_task(task: &NewWorkTask) -> Result<()> {
        Self::validate_title(&task.title)?;
        Self::validate_body("description", &task.description)?;
        Self::validate_body("content", &task.content)?;
        Self::validate_identifier("submitter", &task.submitter)?;
        Self::validate_identifier("team", &task.team)?;
        for tag in &task.tags {
            if tag.trim().is_empty() || tag.len() > 50 {
                return Err(OrchestratorError::validation(
                    "tags must be non-empty and at most 50 characters long",
                ));
            }
        }
        Ok(())
    }

    /// Check whether a todo status transition is legal per §4.4.1; `force`
    /// bypasses I2's dependency check but is still subject to the state
    /// machine table and is always recorded (caller records the audit trail).
    pub fn validate_todo_transition(todo: &TodoItem, new_status: TodoStatus) -> Result<()> {
        if !todo.status.can_transition_to(new_status) {
            return Err(OrchestratorError::invalid_transition(todo.status, new_status));
        }
        Ok(())
    }

    pub fn validate_deliverable_transition(
        deliverable: &Deliverable,
        new_status: DeliverableStatus,
    ) -> Result<()> {
        use DeliverableStatus::*;
        let legal = matches!(
            (deliverable.status, new_status),
            (Submitted, Validating)
                | (Validating, Approved)
                | (Validating, Rejected)
                | (Validating, NeedsRevision)
                | (NeedsRevision, Submitted)
        );
        if !legal {
            return Err(OrchestratorError::invalid_transition(
                format!("{:?}", deliverable.status),
                format!("{:?}", new_status),
            ));
        }
        Ok(())
    }

    /// Deliverable upload size limit enforcement (§8 boundary behavior: exact
    /// limit succeeds, one byte over is rejected).
    pub fn validate_deliverable_size(size: u64, limit: u64) -> Result<()> {
        if size > limit {
            return Err(OrchestratorError::validation(format!(
                "deliverable size {size} exceeds limit {limit}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompletionCriterion, Priority};
    use chrono::Utc;

    fn sample_task() -> NewWorkTask {
        NewWorkTask {
            title: "Add OAuth".into(),
            description: "Implement OAuth2 login".into(),
            content: "Implement OAuth2 with Google. Then integrate with API.".into(),
            submitter: "alice".into(),
            team: "platform".into(),
            priority: Priority::High,
            category: "security".into(),
            tags: vec!["auth".into()],
            retention_ttl: None,
        }
    }

    #[test]
    fn valid_new_task_passes() {
        assert!(Validator::validate_new_work_task(&sample_task()).is_ok());
    }

    #[test]
    fn empty_title_rejected() {
        let mut t = sample_task();
        t.title = "   ".into();
        assert!(Validator::validate_new_work_task(&t).is_err());
    }

    #[test]
    fn bad_identifier_rejected() {
        let mut t = sample_task();
        t.team = "-bad".into();
        assert!(Validator::validate_new_work_task(&t).is_err());
    }

    #[test]
    fn deliverable_size_boundary() {
        assert!(Validator::validate_deliverable_size(100, 100).is_ok());
        assert!(Validator::validate_deliverable_size(101, 100).is_err());
    }

    fn sample_todo(status: TodoStatus) -> TodoItem {
        TodoItem {
            id: "t1".into(),
            task_id: "task1".into(),
            title: "x".into(),
            description: "y".into(),
            priority: Priority::Medium,
            estimated_hours: 1.0,
            assignee: None,
            due_date: None,
            dependencies: vec![],
            category: "development".into(),
            status,
            related_workgroups: vec![],
            deliverable_ids: vec![],
            quality_check_ids: vec![],
            completion_criteria: vec![CompletionCriterion {
                description: "x".into(),
                mandatory: false,
                met: false,
                satisfied_by_deliverable: None,
            }],
            status_history: vec![],
            refines_todo_id: None,
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn completed_todo_cannot_transition() {
        let todo = sample_todo(TodoStatus::Completed);
        assert!(Validator::validate_todo_transition(&todo, TodoStatus::Pending).is_err());
    }

    #[test]
    fn pending_to_in_progress_ok() {
        let todo = sample_todo(TodoStatus::Pending);
        assert!(Validator::validate_todo_transition(&todo, TodoStatus::InProgress).is_ok());
    }
}
