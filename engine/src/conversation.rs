//! Conversation Orchestrator (CO) — §4.6.
//!
//! Session/message/branch/summary lifecycle. Message ordering is governed
//! by the session's monotonic `message_seq` counter, which breaks ties when
//! two messages share a timestamp (I5).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use orchestrator_core::error::{OrchestratorError, Result};
use orchestrator_core::models::{
    Branch, Message, MessageRole, MemoryContext, Session, SessionStatus, Summary, SummaryKind,
    TimeRange,
};
use orchestrator_core::traits::{Clock, NlpBackend, SessionStore};
use uuid::Uuid;

const DEFAULT_SHORT_TERM_LIMIT: usize = 20;
const SUMMARY_KINDS: &[SummaryKind] = &[SummaryKind::Session, SummaryKind::Periodic, SummaryKind::Topic];
/// §4.6 default `summaryThreshold`: message count since the last periodic
/// summary that triggers generating a fresh one.
const SUMMARY_THRESHOLD: usize = 20;
const ACTION_ITEM_MARKERS: &[&str] = &["will ", "need to ", "needs to ", "should ", "must ", "todo"];

pub struct ConversationOrchestrator {
    sessions: Arc<dyn SessionStore>,
    nlp: Arc<dyn NlpBackend>,
    clock: Arc<dyn Clock>,
}

impl ConversationOrchestrator {
    pub fn new(sessions: Arc<dyn SessionStore>, nlp: Arc<dyn NlpBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { sessions, nlp, clock }
    }

    /// `StartSession(userId, teamId, personaId) -> Session` (§4.6).
    pub async fn start_session(&self, user_id: &str, team_id: &str, persona_id: &str) -> Result<Session> {
        let now = self.clock.now();
        let session = Session {
            id: format!("session-{}", Uuid::new_v4()),
            user_id: user_id.to_string(),
            team_id: team_id.to_string(),
            persona_id: persona_id.to_string(),
            started_at: now,
            last_activity_at: now,
            status: SessionStatus::Active,
            context_ref: None,
            message_seq: 0,
        };
        self.sessions.put_session(session.clone()).await?;
        Ok(session)
    }

    /// `SendMessage(sessionId, role, content, ...) -> Message` (§4.6, I6).
    /// `references` names the source ids (knowledge references, deliverables,
    /// other messages) this message cites; the Memory Context's `semantic`
    /// field is built from these, so a message with no citations should pass
    /// an empty slice rather than omitting genuinely-known sources.
    #[allow(clippy::too_many_arguments)]
    pub async fn send_message(
        &self,
        session_id: &str,
        role: MessageRole,
        content: &str,
        references: &[String],
        branch_id: Option<&str>,
        parent_message_id: Option<&str>,
    ) -> Result<Message> {
        let session = self
            .sessions
            .get_session(session_id)
            .await?
            .ok_or_else(|| OrchestratorError::not_found("session", session_id))?;

        if session.status != SessionStatus::Active {
            return Err(OrchestratorError::invalid_state(
                "session_not_active",
                format!("session '{session_id}' is not active"),
            ));
        }

        let now = self.clock.now();
        let seq = session.message_seq + 1;
        let message = Message {
            id: format!("msg-{}", Uuid::new_v4()),
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            timestamp: now,
            seq,
            references: references.to_vec(),
            branch_id: branch_id.map(String::from),
            parent_message_id: parent_message_id.map(String::from),
        };

        self.sessions.append_message(message.clone()).await?;

        let mut updated = session.clone();
        updated.message_seq = seq;
        updated.last_activity_at = now;
        self.sessions
            .update_session_cas(updated, session.message_seq)
            .await?;

        self.maybe_trigger_periodic_summary(session_id).await?;

        Ok(message)
    }

    /// Generates a fresh `periodic` summary once the message count since the
    /// last one exceeds `SUMMARY_THRESHOLD` (§4.6).
    async fn maybe_trigger_periodic_summary(&self, session_id: &str) -> Result<()> {
        let last = self
            .sessions
            .latest_summary(session_id, SummaryKind::Periodic)
            .await?;
        let since = last.map(|s| s.created_at);
        let (messages, _) = self
            .sessions
            .query_messages(session_id, None, since, None, None, None, 0)
            .await?;
        if messages.len() > SUMMARY_THRESHOLD {
            self.generate_summary(session_id, SummaryKind::Periodic, None)
                .await?;
        }
        Ok(())
    }

    /// `GetSessionHistory(sessionId, filters...) -> (Message[], hasMore)` (§4.6).
    #[allow(clippy::too_many_arguments)]
    pub async fn get_history(
        &self,
        session_id: &str,
        branch_id: Option<&str>,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        roles: Option<&[MessageRole]>,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<(Vec<Message>, bool)> {
        self.sessions
            .query_messages(session_id, branch_id, since, until, roles, limit, offset)
            .await
    }

    /// `CreateBranch(sessionId, parentMessageId, name, description?) -> Branch` (§4.6).
    pub async fn create_branch(
        &self,
        session_id: &str,
        parent_message_id: &str,
        name: &str,
        description: Option<String>,
    ) -> Result<Branch> {
        let branch = Branch {
            id: format!("branch-{}", Uuid::new_v4()),
            session_id: session_id.to_string(),
            parent_message_id: parent_message_id.to_string(),
            name: name.to_string(),
            description,
            created_at: self.clock.now(),
        };
        self.sessions.put_branch(branch.clone()).await?;
        Ok(branch)
    }

    /// `GenerateSummary(sessionId, kind, range?) -> Summary` (§4.6). Falls
    /// back to a truncation summary and empty key points when the NLP
    /// backend degrades, same as the Analysis Pipeline's key-point stage.
    pub async fn generate_summary(
        &self,
        session_id: &str,
        kind: SummaryKind,
        range: Option<TimeRange>,
    ) -> Result<Summary> {
        let (messages, _) = self
            .sessions
            .query_messages(
                session_id,
                None,
                range.as_ref().map(|r| r.from),
                range.as_ref().map(|r| r.to),
                None,
                None,
                0,
            )
            .await?;

        let combined = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let text = match self.nlp.summarize(&combined).await {
            Ok(summary) if !summary.is_empty() => summary,
            _ => combined.chars().take(280).collect(),
        };
        let key_topics = match self.nlp.extract_key_points(&combined).await {
            Ok(extraction) if !extraction.degraded => extraction.key_points,
            _ => vec![],
        };
        let action_items = rule_based_action_items(&combined);

        let summary = Summary {
            id: format!("summary-{}", Uuid::new_v4()),
            session_id: session_id.to_string(),
            kind,
            text,
            key_topics,
            action_items,
            insights: String::new(),
            time_range: range,
            created_at: self.clock.now(),
        };
        self.sessions.put_summary(summary.clone()).await?;
        Ok(summary)
    }

    /// `EndSession(sessionId)` (§4.6).
    pub async fn end_session(&self, session_id: &str) -> Result<()> {
        let mut session = self
            .sessions
            .get_session(session_id)
            .await?
            .ok_or_else(|| OrchestratorError::not_found("session", session_id))?;
        let expected_seq = session.message_seq;
        session.status = SessionStatus::Ended;
        self.sessions.update_session_cas(session, expected_seq).await
    }

    /// Expires sessions idle for longer than `idle_for`.
    pub async fn expire_idle_sessions(&self, idle_for: Duration) -> Result<Vec<String>> {
        let cutoff = self.clock.now() - idle_for;
        self.sessions.expire_idle_sessions(cutoff).await
    }

    /// Assembles the short/long-term memory context handed to an agent
    /// persona. `semantic` is the de-duped union of `references[]` across
    /// the short-term messages; `procedural` is the open action items
    /// carried by the session's summaries (§4.6).
    pub async fn memory_context(&self, session_id: &str) -> Result<MemoryContext> {
        let (short_term, _) = self
            .sessions
            .query_messages(session_id, None, None, None, None, Some(DEFAULT_SHORT_TERM_LIMIT), 0)
            .await?;

        let mut long_term = Vec::new();
        for kind in SUMMARY_KINDS {
            if let Some(summary) = self.sessions.latest_summary(session_id, *kind).await? {
                long_term.push(summary);
            }
        }

        let mut semantic = Vec::new();
        for message in &short_term {
            for reference in &message.references {
                if !semantic.contains(reference) {
                    semantic.push(reference.clone());
                }
            }
        }

        let mut procedural = Vec::new();
        for summary in &long_term {
            for item in &summary.action_items {
                if !procedural.contains(item) {
                    procedural.push(item.clone());
                }
            }
        }

        Ok(MemoryContext {
            short_term,
            long_term,
            semantic,
            procedural,
        })
    }
}

/// Sentences carrying a commitment marker ("will", "need to", "must", ...),
/// same rule-based fallback idiom as the Analysis Pipeline's key points.
fn rule_based_action_items(content: &str) -> Vec<String> {
    content
        .split(['.', '!', '?', '\n'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter(|s| {
            let lower = s.to_lowercase();
            ACTION_ITEM_MARKERS.iter().any(|m| lower.contains(m))
        })
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator_mocks::{InMemorySessionStore, StubNlpBackend, TestClock};

    fn orchestrator() -> ConversationOrchestrator {
        ConversationOrchestrator::new(
            Arc::new(InMemorySessionStore::default()),
            Arc::new(StubNlpBackend::new()),
            Arc::new(TestClock::default()),
        )
    }

    #[tokio::test]
    async fn messages_get_monotonic_sequence_numbers() {
        let co = orchestrator();
        let session = co.start_session("u1", "team-a", "persona-1").await.unwrap();
        let m1 = co
            .send_message(&session.id, MessageRole::User, "hello", &[], None, None)
            .await
            .unwrap();
        let m2 = co
            .send_message(&session.id, MessageRole::Agent, "hi there", &[], None, None)
            .await
            .unwrap();
        assert_eq!(m1.seq, 1);
        assert_eq!(m2.seq, 2);
    }

    #[tokio::test]
    async fn cannot_send_message_to_ended_session() {
        let co = orchestrator();
        let session = co.start_session("u1", "team-a", "persona-1").await.unwrap();
        co.end_session(&session.id).await.unwrap();
        let result = co
            .send_message(&session.id, MessageRole::User, "still there?", &[], None, None)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn memory_context_includes_recent_messages() {
        let co = orchestrator();
        let session = co.start_session("u1", "team-a", "persona-1").await.unwrap();
        co.send_message(&session.id, MessageRole::User, "first message", &[], None, None)
            .await
            .unwrap();
        let context = co.memory_context(&session.id).await.unwrap();
        assert_eq!(context.short_term.len(), 1);
    }

    #[tokio::test]
    async fn memory_context_dedupes_semantic_references_across_messages() {
        let co = orchestrator();
        let session = co.start_session("u1", "team-a", "persona-1").await.unwrap();
        co.send_message(
            &session.id,
            MessageRole::Agent,
            "citing doc a",
            &["doc-a".to_string(), "doc-b".to_string()],
            None,
            None,
        )
        .await
        .unwrap();
        co.send_message(
            &session.id,
            MessageRole::Agent,
            "citing doc b again",
            &["doc-b".to_string()],
            None,
            None,
        )
        .await
        .unwrap();
        let context = co.memory_context(&session.id).await.unwrap();
        assert_eq!(context.semantic, vec!["doc-a".to_string(), "doc-b".to_string()]);
    }

    #[tokio::test]
    async fn memory_context_procedural_pulls_action_items_from_summaries() {
        let co = orchestrator();
        let session = co.start_session("u1", "team-a", "persona-1").await.unwrap();
        co.send_message(
            &session.id,
            MessageRole::User,
            "We need to rotate the credentials before launch.",
            &[],
            None,
            None,
        )
        .await
        .unwrap();
        co.generate_summary(&session.id, SummaryKind::Session, None)
            .await
            .unwrap();
        let context = co.memory_context(&session.id).await.unwrap();
        assert!(context
            .procedural
            .iter()
            .any(|item| item.contains("rotate the credentials")));
    }

    #[tokio::test]
    async fn periodic_summary_triggers_after_threshold_messages() {
        let co = orchestrator();
        let session = co.start_session("u1", "team-a", "persona-1").await.unwrap();
        for i in 0..(SUMMARY_THRESHOLD + 1) {
            co.send_message(&session.id, MessageRole::User, &format!("message {i}"), &[], None, None)
                .await
                .unwrap();
        }
        let summary = co
            .sessions
            .latest_summary(&session.id, SummaryKind::Periodic)
            .await
            .unwrap();
        assert!(summary.is_some());
    }
}
