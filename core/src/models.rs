use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Priority level shared by work tasks and todos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// Severity scale used by sensitivity categories and blockers alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

// ---------------------------------------------------------------------
// WorkTask
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkTaskStatus {
    Submitted,
    Analyzing,
    Analyzed,
    InProgress,
    Completed,
    Cancelled,
}

impl fmt::Display for WorkTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkTaskStatus::Submitted => "submitted",
            WorkTaskStatus::Analyzing => "analyzing",
            WorkTaskStatus::Analyzed => "analyzed",
            WorkTaskStatus::InProgress => "in_progress",
            WorkTaskStatus::Completed => "completed",
            WorkTaskStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl WorkTaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkTaskStatus::Completed | WorkTaskStatus::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkTask {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub submitter: String,
    pub team: String,
    pub priority: Priority,
    pub category: String,
    pub tags: Vec<String>,
    pub status: WorkTaskStatus,
    /// 0-100, set by the Sensitivity Gate. `None` until first scanned.
    pub sensitivity_score: Option<u8>,
    pub retention_ttl: Option<i64>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkTask {
    pub title: String,
    pub description: String,
    pub content: String,
    pub submitter: String,
    pub team: String,
    pub priority: Priority,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub retention_ttl: Option<i64>,
}

// ---------------------------------------------------------------------
// TaskAnalysisResult
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeReference {
    pub source_id: String,
    pub source_type: String,
    pub title: String,
    pub snippet: String,
    pub relevance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedInvolvement {
    Consultation,
    Collaboration,
    Approval,
    Notification,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMatchDetail {
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityInfo {
    pub active_assignments: u32,
    pub capacity_limit: u32,
    pub fit: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPerformance {
    pub completed_count: u32,
    pub success_rate: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedWorkgroup {
    pub team_id: String,
    pub relevance: f32,
    pub skill_match: SkillMatchDetail,
    pub capacity: CapacityInfo,
    pub historical_performance: HistoricalPerformance,
    pub recent_similarity: f32,
    pub recommended_involvement: RecommendedInvolvement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactorKind {
    Technical,
    Resource,
    Timeline,
    Compliance,
    Security,
    Business,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub kind: RiskFactorKind,
    /// 0.0-1.0
    pub probability: f32,
    /// 0.0-1.0
    pub impact: f32,
}

impl RiskFactor {
    pub fn score(&self) -> f32 {
        self.probability * self.impact
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub factors: Vec<RiskFactor>,
    /// max over all factor scores
    pub overall: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffortEstimate {
    pub hours: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAnalysisResult {
    pub task_id: String,
    pub version: i64,
    pub key_points: Vec<String>,
    pub workgroups: Vec<RelatedWorkgroup>,
    /// Ids of the `TodoItem`s produced for this version.
    pub todos: Vec<String>,
    pub knowledge_refs: Vec<KnowledgeReference>,
    pub risk_assessment: RiskAssessment,
    pub effort_estimate: EffortEstimate,
    pub generated_at: DateTime<Utc>,
    /// Set when the pipeline degraded one or more stages (§4.3 partial failure).
    pub degraded_stages: Vec<String>,
}

// ---------------------------------------------------------------------
// TodoItem
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
    Blocked,
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TodoStatus::Pending => "pending",
            TodoStatus::InProgress => "in_progress",
            TodoStatus::Completed => "completed",
            TodoStatus::Blocked => "blocked",
        };
        write!(f, "{s}")
    }
}

impl TodoStatus {
    /// Status state machine table from §4.4.1. `completed` is a sink; every
    /// other transition out of it is illegal (I3).
    pub fn can_transition_to(self, new_status: TodoStatus) -> bool {
        use TodoStatus::*;
        match (self, new_status) {
            (Completed, _) => false,
            (a, b) if a == b => false,
            (Pending, InProgress) | (Pending, Blocked) => true,
            (InProgress, Pending) | (InProgress, Completed) | (InProgress, Blocked) => true,
            (Blocked, Pending) | (Blocked, InProgress) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockerKind {
    Dependency,
    Resource,
    Approval,
    Technical,
    External,
    Timeline,
    Quality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub from: TodoStatus,
    pub to: TodoStatus,
    pub at: DateTime<Utc>,
    pub reason: Option<String>,
    pub forced: bool,
    pub forced_by: Option<String>,
    pub forced_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusChangeMetadata {
    pub reason: Option<String>,
    pub force: bool,
    pub authorized_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChangeImpact {
    pub todo_id: String,
    pub affects_critical_path: bool,
    pub dependent_todo_ids: Vec<String>,
    pub risk_level: Severity,
    pub recommended_actions: Vec<String>,
    /// Dependent todos that became eligible to start as a result of this change.
    pub newly_eligible: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub task_id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub estimated_hours: f32,
    pub assignee: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    /// Ids of todos in the same task that must complete first.
    pub dependencies: Vec<String>,
    pub category: String,
    pub status: TodoStatus,
    pub related_workgroups: Vec<String>,
    pub deliverable_ids: Vec<String>,
    pub quality_check_ids: Vec<String>,
    pub completion_criteria: Vec<CompletionCriterion>,
    pub status_history: Vec<StatusHistoryEntry>,
    /// Set when this todo refines an earlier, already-started todo (re-analysis, Open Question #1).
    pub refines_todo_id: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionCriterion {
    pub description: String,
    pub mandatory: bool,
    pub met: bool,
    /// Deliverable that satisfied this criterion, if any.
    pub satisfied_by_deliverable: Option<String>,
}

impl TodoItem {
    /// I4: a todo whose mandatory criteria are unmet cannot be `completed`.
    pub fn mandatory_criteria_met(&self) -> bool {
        self.completion_criteria
            .iter()
            .filter(|c| c.mandatory)
            .all(|c| c.met)
    }
}

// ---------------------------------------------------------------------
// Blocker
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blocker {
    pub id: String,
    pub todo_id: String,
    pub kind: BlockerKind,
    pub severity: Severity,
    pub description: String,
    pub detected_at: DateTime<Utc>,
    pub auto_detected: bool,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Blocker {
    pub fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }
}

// ---------------------------------------------------------------------
// Deliverable
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverableStatus {
    Submitted,
    Validating,
    Approved,
    Rejected,
    NeedsRevision,
}

impl DeliverableStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, DeliverableStatus::Approved | DeliverableStatus::Rejected)
    }

    pub fn is_non_terminal(self) -> bool {
        !self.is_terminal()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCategory {
    Format,
    Content,
    Security,
    Compliance,
    Technical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Pass,
    Fail,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub category: ValidationCategory,
    pub name: String,
    pub outcome: CheckOutcome,
    pub mandatory: bool,
    pub evidence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub checks: Vec<ValidationCheck>,
}

impl ValidationReport {
    pub fn mandatory_failed(&self) -> bool {
        self.checks
            .iter()
            .any(|c| c.mandatory && c.outcome == CheckOutcome::Fail)
    }

    pub fn non_mandatory_failed(&self) -> bool {
        self.checks
            .iter()
            .any(|c| !c.mandatory && c.outcome != CheckOutcome::Pass)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityDimension {
    Completeness,
    Accuracy,
    Consistency,
    Usability,
    Maintainability,
    Performance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityDimensionScore {
    pub dimension: QualityDimension,
    pub weight: f32,
    /// 0.0-1.0
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub dimensions: Vec<QualityDimensionScore>,
    pub overall: f32,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deliverable {
    pub id: String,
    pub todo_id: String,
    pub file_name: String,
    pub file_type: String,
    pub size: u64,
    pub storage_key: String,
    pub submitter: String,
    pub submitted_at: DateTime<Utc>,
    pub version: i64,
    pub previous_version_id: Option<String>,
    pub validation: Option<ValidationReport>,
    pub quality: Option<QualityAssessment>,
    pub status: DeliverableStatus,
    pub checksum: String,
}

// ---------------------------------------------------------------------
// Session / Message / Branch / Summary
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Ended,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub team_id: String,
    pub persona_id: String,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub context_ref: Option<String>,
    /// Monotonic intra-session counter, used as the tie-break in I5.
    pub message_seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Agent,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Monotonic per-session counter assigned at append time; breaks ties on `timestamp` (I5).
    pub seq: u64,
    pub references: Vec<String>,
    pub branch_id: Option<String>,
    pub parent_message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub session_id: String,
    pub parent_message_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryKind {
    Session,
    Periodic,
    Topic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub id: String,
    pub session_id: String,
    pub kind: SummaryKind,
    pub text: String,
    pub key_topics: Vec<String>,
    pub action_items: Vec<String>,
    pub insights: String,
    pub time_range: Option<TimeRange>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryContext {
    pub short_term: Vec<Message>,
    pub long_term: Vec<Summary>,
    pub semantic: Vec<String>,
    pub procedural: Vec<String>,
}

// ---------------------------------------------------------------------
// ProgressSnapshot
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedCompletion {
    pub optimistic: DateTime<Utc>,
    pub realistic: DateTime<Utc>,
    pub pessimistic: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub task_id: String,
    pub total: u32,
    pub completed: u32,
    pub in_progress: u32,
    pub blocked: u32,
    pub completion_pct: f32,
    pub velocity: f32,
    pub projected_completion: Option<ProjectedCompletion>,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub task_id: String,
    pub range: TimeRange,
    pub completed_in_range: u32,
    pub current_blockers: Vec<Blocker>,
    pub quality_summary: Vec<QualityAssessment>,
    pub velocity: f32,
    pub snapshot: ProgressSnapshot,
}

// ---------------------------------------------------------------------
// Sensitivity Gate data model (§4.1)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityCategory {
    Pii,
    Credentials,
    Financial,
    Health,
    Proprietary,
}

/// Explicit sum type per §9 design note, replacing a free-form detection record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Detection {
    Pii {
        detected_type: String,
        start: usize,
        end: usize,
        confidence: f32,
    },
    Credential {
        detected_type: String,
        start: usize,
        end: usize,
        severity: Severity,
    },
    Financial {
        detected_type: String,
        start: usize,
        end: usize,
        severity: Severity,
    },
    Health {
        detected_type: String,
        start: usize,
        end: usize,
        severity: Severity,
    },
    Proprietary {
        marker: String,
        start: usize,
        end: usize,
        severity: Severity,
    },
}

impl Detection {
    pub fn category(&self) -> SensitivityCategory {
        match self {
            Detection::Pii { .. } => SensitivityCategory::Pii,
            Detection::Credential { .. } => SensitivityCategory::Credentials,
            Detection::Financial { .. } => SensitivityCategory::Financial,
            Detection::Health { .. } => SensitivityCategory::Health,
            Detection::Proprietary { .. } => SensitivityCategory::Proprietary,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Detection::Pii { confidence, .. } => {
                if *confidence >= 0.9 {
                    Severity::High
                } else if *confidence >= 0.6 {
                    Severity::Medium
                } else {
                    Severity::Low
                }
            }
            Detection::Credential { severity, .. }
            | Detection::Financial { severity, .. }
            | Detection::Health { severity, .. }
            | Detection::Proprietary { severity, .. } => *severity,
        }
    }

    pub fn span(&self) -> (usize, usize) {
        match self {
            Detection::Pii { start, end, .. }
            | Detection::Credential { start, end, .. }
            | Detection::Financial { start, end, .. }
            | Detection::Health { start, end, .. }
            | Detection::Proprietary { start, end, .. } => (*start, *end),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataProtectionPolicy {
    pub auto_mask: bool,
    /// Override of the default approval threshold (50) if set.
    pub approval_threshold: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityScanResult {
    pub detections: Vec<Detection>,
    pub category_severity: Vec<(SensitivityCategory, Severity)>,
    pub score: u8,
    pub masked_content: String,
    pub requires_approval: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_status_transitions_match_table() {
        use TodoStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(Pending.can_transition_to(Blocked));
        assert!(!Pending.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Pending));
        assert!(InProgress.can_transition_to(Blocked));
        assert!(Blocked.can_transition_to(Pending));
        assert!(Blocked.can_transition_to(InProgress));
        assert!(!Blocked.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Completed.can_transition_to(Blocked));
    }

    #[test]
    fn mandatory_criteria_gate_completion() {
        let mut todo = sample_todo();
        assert!(!todo.mandatory_criteria_met());
        todo.completion_criteria[0].met = true;
        assert!(todo.mandatory_criteria_met());
    }

    fn sample_todo() -> TodoItem {
        TodoItem {
            id: "todo-1".into(),
            task_id: "task-1".into(),
            title: "Do thing".into(),
            description: "desc".into(),
            priority: Priority::Medium,
            estimated_hours: 2.0,
            assignee: None,
            due_date: None,
            dependencies: vec![],
            category: "development".into(),
            status: TodoStatus::InProgress,
            related_workgroups: vec![],
            deliverable_ids: vec![],
            quality_check_ids: vec![],
            completion_criteria: vec![CompletionCriterion {
                description: "artifact approved".into(),
                mandatory: true,
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
}
