//! Orchestration engine: the six cooperating components built on top of
//! `orchestrator-core`'s models, errors, and external interface contracts.
//!
//! - [`sensitivity`] - Sensitivity Gate (SG), §4.1
//! - [`knowledge`] - Knowledge & Workgroup Resolver (KWR), §4.2
//! - [`analysis`] - Analysis Pipeline (AP), §4.3
//! - [`todo_graph`] - Todo Graph Engine (TGE), §4.4
//! - [`deliverable`] - Deliverable Quality Machine (DQM), §4.5
//! - [`conversation`] - Conversation Orchestrator (CO), §4.6

pub mod analysis;
pub mod conversation;
pub mod deliverable;
pub mod events;
pub mod knowledge;
pub mod resilience;
pub mod sensitivity;
pub mod todo_graph;

pub use analysis::{AnalysisOutcome, AnalysisPipeline};
pub use conversation::ConversationOrchestrator;
pub use deliverable::DeliverableQualityMachine;
pub use events::{EligibleToStartEvent, EventBus, StatusChangeEvent, TodoGraphEvent};
pub use knowledge::{KnowledgeWorkgroupResolver, WorkgroupProfile};
pub use resilience::BackendGuard;
pub use sensitivity::SensitivityGate;
pub use todo_graph::TodoGraphEngine;
