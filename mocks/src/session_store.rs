//! In-memory `SessionStore` double.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orchestrator_core::error::{OrchestratorError, Result};
use orchestrator_core::models::{Branch, Message, MessageRole, Session, SessionStatus, Summary, SummaryKind};
use orchestrator_core::traits::SessionStore;
use parking_lot::Mutex;

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    messages: Mutex<HashMap<String, Vec<Message>>>,
    branches: Mutex<HashMap<String, Branch>>,
    summaries: Mutex<HashMap<String, Vec<Summary>>>,
    error_injection: Mutex<Option<OrchestratorError>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject_error(&self, error: OrchestratorError) {
        *self.error_injection.lock() = Some(error);
    }

    fn check_error_injection(&self) -> Result<()> {
        if let Some(err) = self.error_injection.lock().take() {
            return Err(err);
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put_session(&self, session: Session) -> Result<()> {
        self.check_error_injection()?;
        self.sessions.lock().insert(session.id.clone(), session);
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>> {
        self.check_error_injection()?;
        Ok(self.sessions.lock().get(id).cloned())
    }

    async fn update_session_cas(&self, session: Session, expected_seq: u64) -> Result<()> {
        self.check_error_injection()?;
        let mut sessions = self.sessions.lock();
        let current = sessions
            .get(&session.id)
            .ok_or_else(|| OrchestratorError::not_found("session", &session.id))?;
        if current.message_seq != expected_seq {
            return Err(OrchestratorError::conflict("session", &session.id));
        }
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn append_message(&self, message: Message) -> Result<()> {
        self.check_error_injection()?;
        let sessions = self.sessions.lock();
        let session = sessions
            .get(&message.session_id)
            .ok_or_else(|| OrchestratorError::not_found("session", &message.session_id))?;
        if session.status != SessionStatus::Active {
            return Err(OrchestratorError::invalid_state(
                "session_not_active",
                format!("session '{}' is not active", message.session_id),
            ));
        }
        drop(sessions);
        self.messages
            .lock()
            .entry(message.session_id.clone())
            .or_default()
            .push(message);
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
        self.check_error_injection()?;
        let messages = self.messages.lock();
        let mut filtered: Vec<Message> = messages
            .get(session_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|m| m.branch_id.as_deref() == branch_id)
            .filter(|m| since.map(|s| m.timestamp >= s).unwrap_or(true))
            .filter(|m| until.map(|u| m.timestamp <= u).unwrap_or(true))
            .filter(|m| roles.map(|r| r.contains(&m.role)).unwrap_or(true))
            .collect();
        filtered.sort_by_key(|m| (m.timestamp, m.seq));

        let total = filtered.len();
        let page: Vec<Message> = filtered.into_iter().skip(offset).take(limit.unwrap_or(usize::MAX)).collect();
        let has_more = offset + page.len() < total;
        Ok((page, has_more))
    }

    async fn put_branch(&self, branch: Branch) -> Result<()> {
        self.check_error_injection()?;
        self.branches.lock().insert(branch.id.clone(), branch);
        Ok(())
    }

    async fn get_branch(&self, id: &str) -> Result<Option<Branch>> {
        self.check_error_injection()?;
        Ok(self.branches.lock().get(id).cloned())
    }

    async fn put_summary(&self, summary: Summary) -> Result<()> {
        self.check_error_injection()?;
        self.summaries
            .lock()
            .entry(summary.session_id.clone())
            .or_default()
            .push(summary);
        Ok(())
    }

    async fn latest_summary(&self, session_id: &str, kind: SummaryKind) -> Result<Option<Summary>> {
        self.check_error_injection()?;
        Ok(self
            .summaries
            .lock()
            .get(session_id)
            .and_then(|v| v.iter().filter(|s| s.kind == kind).max_by_key(|s| s.created_at).cloned()))
    }

    async fn expire_idle_sessions(&self, idle_before: DateTime<Utc>) -> Result<Vec<String>> {
        self.check_error_injection()?;
        let mut sessions = self.sessions.lock();
        let mut expired = Vec::new();
        for session in sessions.values_mut() {
            if session.status == SessionStatus::Active && session.last_activity_at < idle_before {
                session.status = SessionStatus::Expired;
                expired.push(session.id.clone());
            }
        }
        Ok(expired)
    }

    async fn health_check(&self) -> Result<()> {
        self.check_error_injection()
    }
}
