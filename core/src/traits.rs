//! External interface contracts consumed by the orchestration core (§6).
//! Implementations are injected; nothing in `engine` depends on a concrete
//! backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{
    Branch, DataProtectionPolicy, Deliverable, KnowledgeReference, Message, Session, Severity,
    Summary, SummaryKind, TaskAnalysisResult, TodoItem, ValidationReport, WorkTask,
    WorkTaskStatus,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub task_count: u64,
    pub todo_count: u64,
    pub deliverable_count: u64,
    pub session_count: u64,
}

/// Key/value + secondary-index store for `WorkTask`, `TodoItem`,
/// `Deliverable`, and `TaskAnalysisResult`. Updates to an entity that already
/// exists must be conditional on its current `version` (compare-and-set);
/// callers see a `Conflict` error on mismatch.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn put_task(&self, task: WorkTask) -> Result<()>;
    async fn get_task(&self, id: &str) -> Result<Option<WorkTask>>;
    /// Updates only if `task.version == expected_version` in the store; bumps
    /// the stored version by one on success.
    async fn update_task_cas(&self, task: WorkTask, expected_version: i64) -> Result<()>;
    async fn query_tasks_by_team_status(
        &self,
        team_id: &str,
        status: Option<WorkTaskStatus>,
    ) -> Result<Vec<WorkTask>>;

    async fn put_todo(&self, todo: TodoItem) -> Result<()>;
    async fn get_todo(&self, id: &str) -> Result<Option<TodoItem>>;
    async fn update_todo_cas(&self, todo: TodoItem, expected_version: i64) -> Result<()>;
    async fn query_todos_by_task(&self, task_id: &str) -> Result<Vec<TodoItem>>;
    async fn query_todos_by_assignee_due(
        &self,
        assignee: &str,
        due_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<TodoItem>>;
    /// AP stage 6: atomically replace every todo still `pending` for this
    /// task with a newly generated set (re-analysis preserves in-progress
    /// and completed todos; see Open Question #1).
    async fn replace_pending_todos(&self, task_id: &str, todos: Vec<TodoItem>) -> Result<()>;

    async fn put_deliverable(&self, deliverable: Deliverable) -> Result<()>;
    async fn get_deliverable(&self, id: &str) -> Result<Option<Deliverable>>;
    async fn update_deliverable_cas(
        &self,
        deliverable: Deliverable,
        expected_version: i64,
    ) -> Result<()>;
    async fn query_deliverables_by_todo(&self, todo_id: &str) -> Result<Vec<Deliverable>>;

    async fn put_analysis_result(&self, result: TaskAnalysisResult) -> Result<()>;
    async fn get_latest_analysis_result(&self, task_id: &str) -> Result<Option<TaskAnalysisResult>>;

    async fn health_check(&self) -> Result<()>;
    async fn stats(&self) -> Result<StoreStats>;
}

/// Partitioned by `sessionId`; supports range scans over the composite sort
/// keys described in §6 (`MSG#<timestamp>#<messageId>`, `SUMMARY#<kind>#<timestamp>`).
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put_session(&self, session: Session) -> Result<()>;
    async fn get_session(&self, id: &str) -> Result<Option<Session>>;
    /// CAS on `Session.message_seq`, used to serialize concurrent appends (I5, §5).
    async fn update_session_cas(&self, session: Session, expected_seq: u64) -> Result<()>;

    /// Appends are rejected with `InvalidState` if the session is not `active` (I6).
    async fn append_message(&self, message: Message) -> Result<()>;
    async fn query_messages(
        &self,
        session_id: &str,
        branch_id: Option<&str>,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        roles: Option<&[crate::models::MessageRole]>,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<(Vec<Message>, bool)>;

    async fn put_branch(&self, branch: Branch) -> Result<()>;
    async fn get_branch(&self, id: &str) -> Result<Option<Branch>>;

    async fn put_summary(&self, summary: Summary) -> Result<()>;
    async fn latest_summary(&self, session_id: &str, kind: SummaryKind) -> Result<Option<Summary>>;

    /// Returns the ids of sessions transitioned to `expired`.
    async fn expire_idle_sessions(&self, idle_before: DateTime<Utc>) -> Result<Vec<String>>;

    async fn health_check(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct ObjectMetadata {
    pub size: u64,
    pub checksum: String,
}

/// Deliverable payloads live here; server-side encryption is assumed by the
/// implementation, not modeled in this contract.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()>;
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectMetadata>;
}

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub text: String,
    pub filters: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub query_id: String,
    pub items: Vec<KnowledgeReference>,
    pub degraded: bool,
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: SearchQuery) -> Result<SearchResults>;
    async fn submit_feedback(&self, query_id: &str, relevance_label: f32) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct KeyPointExtraction {
    pub key_points: Vec<String>,
    pub degraded: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PiiHit {
    pub detected_type: String,
    pub start: usize,
    pub end: usize,
    pub confidence: f32,
}

#[derive(Debug, Clone, Default)]
pub struct PiiDetection {
    pub hits: Vec<PiiHit>,
}

#[async_trait]
pub trait NlpBackend: Send + Sync {
    async fn extract_key_points(&self, content: &str) -> Result<KeyPointExtraction>;
    async fn detect_pii(&self, content: &str) -> Result<PiiDetection>;
    async fn summarize(&self, content: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Slack,
    Teams,
    Email,
    Sns,
}

#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Idempotent on `message_id`: resending the same id must not duplicate delivery.
    async fn send(
        &self,
        recipient: &str,
        channel: NotificationChannel,
        message: &str,
        urgency: Severity,
        message_id: &str,
    ) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct ContentValidation {
    pub compliant: bool,
    pub score: f32,
    pub violations: Vec<String>,
}

#[async_trait]
pub trait RulesEngine: Send + Sync {
    async fn validate_content(
        &self,
        text: &str,
        policy: &DataProtectionPolicy,
    ) -> Result<ContentValidation>;
    async fn validate_artifact(&self, artifact: &Deliverable) -> Result<ValidationReport>;
}

#[async_trait]
pub trait Kms: Send + Sync {
    async fn encrypt(&self, key_id: &str, plaintext: Vec<u8>) -> Result<Vec<u8>>;
    async fn decrypt(&self, key_id: &str, ciphertext: Vec<u8>) -> Result<Vec<u8>>;
}

/// Injected monotonic UTC clock, used throughout the engine so tests can
/// control "now" deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
