//! Default wiring for the capabilities the engine consumes but this
//! workspace does not implement for real (§6 "Consumed", spec.md Non-goals:
//! real NLP/search/notification/object-store/KMS integrations are out of
//! scope). Each of these is a working, conservative local stand-in so the
//! server is runnable out of the box; swap any of them for a real adapter
//! behind the same trait without touching `engine`.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use orchestrator_core::error::{OrchestratorError, Result};
use orchestrator_core::models::{
    CheckOutcome, DataProtectionPolicy, Deliverable, Severity, ValidationCategory, ValidationCheck,
    ValidationReport,
};
use orchestrator_core::traits::{
    ContentValidation, KeyPointExtraction, Kms, NlpBackend, NotificationChannel,
    NotificationTransport, ObjectMetadata, ObjectStore, PiiDetection, RulesEngine, SearchBackend,
    SearchQuery, SearchResults,
};

const BLOCKED_EXTENSIONS: &[&str] = &["exe", "sh", "bat", "cmd", "ps1", "dll", "so"];

/// Always reports degraded so callers fall back to the rule-based paths
/// already implemented in `engine` (key-point extraction, summarization).
/// There is no local PII detector, so `detect_pii` returns no hits — the
/// Sensitivity Gate's own regex batteries remain the primary defense.
#[derive(Debug, Default)]
pub struct UnavailableNlpBackend;

#[async_trait]
impl NlpBackend for UnavailableNlpBackend {
    async fn extract_key_points(&self, _content: &str) -> Result<KeyPointExtraction> {
        Ok(KeyPointExtraction {
            key_points: vec![],
            degraded: true,
        })
    }

    async fn detect_pii(&self, _content: &str) -> Result<PiiDetection> {
        Ok(PiiDetection { hits: vec![] })
    }

    async fn summarize(&self, _content: &str) -> Result<String> {
        Err(OrchestratorError::Transient(
            "no nlp backend configured".to_string(),
        ))
    }
}

/// Returns no results; the Knowledge & Workgroup Resolver degrades to its
/// static workgroup profiles without search-sourced knowledge refs.
#[derive(Debug, Default)]
pub struct UnavailableSearchBackend;

#[async_trait]
impl SearchBackend for UnavailableSearchBackend {
    async fn search(&self, _query: SearchQuery) -> Result<SearchResults> {
        Ok(SearchResults {
            query_id: "unavailable".to_string(),
            items: vec![],
            degraded: true,
        })
    }

    async fn submit_feedback(&self, _query_id: &str, _relevance_label: f32) -> Result<()> {
        Ok(())
    }
}

/// Logs the notification instead of delivering it. Idempotent on
/// `message_id` trivially, since nothing is retained between calls.
#[derive(Debug, Default)]
pub struct LoggingNotificationTransport;

#[async_trait]
impl NotificationTransport for LoggingNotificationTransport {
    async fn send(
        &self,
        recipient: &str,
        channel: NotificationChannel,
        message: &str,
        urgency: Severity,
        message_id: &str,
    ) -> Result<()> {
        tracing::info!(
            recipient,
            ?channel,
            ?urgency,
            message_id,
            message,
            "notification (no transport configured, logged only)"
        );
        Ok(())
    }
}

/// Policy/format checks only; never calls out anywhere. Blocks a small
/// default list of executable extensions, mirroring §4.5's "executables and
/// scripts blocked by default" for quick validation.
#[derive(Debug, Default)]
pub struct LocalRulesEngine;

#[async_trait]
impl RulesEngine for LocalRulesEngine {
    async fn validate_content(
        &self,
        text: &str,
        policy: &DataProtectionPolicy,
    ) -> Result<ContentValidation> {
        let violations: Vec<String> = if policy.auto_mask && text.is_empty() {
            vec!["empty content under auto-mask policy".to_string()]
        } else {
            vec![]
        };
        Ok(ContentValidation {
            compliant: violations.is_empty(),
            score: if violations.is_empty() { 1.0 } else { 0.0 },
            violations,
        })
    }

    async fn validate_artifact(&self, artifact: &Deliverable) -> Result<ValidationReport> {
        let extension = artifact
            .file_name
            .rsplit('.')
            .next()
            .unwrap_or("")
            .to_lowercase();
        let blocked = BLOCKED_EXTENSIONS.contains(&extension.as_str());

        let checks = vec![
            ValidationCheck {
                category: ValidationCategory::Format,
                name: "file_extension".to_string(),
                outcome: if blocked {
                    CheckOutcome::Fail
                } else {
                    CheckOutcome::Pass
                },
                mandatory: true,
                evidence: format!("extension '{extension}'"),
            },
            ValidationCheck {
                category: ValidationCategory::Technical,
                name: "non_empty".to_string(),
                outcome: if artifact.size > 0 {
                    CheckOutcome::Pass
                } else {
                    CheckOutcome::Fail
                },
                mandatory: true,
                evidence: format!("{} bytes", artifact.size),
            },
        ];

        Ok(ValidationReport { checks })
    }
}

/// Identity "encryption" — a placeholder until a real KMS is wired in. The
/// `RulesEngine`/`Sensitivity Gate` layer is what actually protects
/// deliverable content today; this trait exists so callers written against
/// `Kms` compile without one.
#[derive(Debug, Default)]
pub struct NoopKms;

#[async_trait]
impl Kms for NoopKms {
    async fn encrypt(&self, _key_id: &str, plaintext: Vec<u8>) -> Result<Vec<u8>> {
        Ok(plaintext)
    }

    async fn decrypt(&self, _key_id: &str, ciphertext: Vec<u8>) -> Result<Vec<u8>> {
        Ok(ciphertext)
    }
}

/// Deliverable payloads on the local filesystem, one file per `(bucket,
/// key)` pair. A real deployment would swap this for an encrypted-at-rest
/// object store behind the same trait.
#[derive(Debug, Clone)]
pub struct FilesystemObjectStore {
    root: PathBuf,
}

impl FilesystemObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path(bucket, key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                OrchestratorError::internal(format!("failed to create object dir: {e}"), "objstore")
            })?;
        }
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            OrchestratorError::internal(format!("failed to write object: {e}"), "objstore")
        })
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        tokio::fs::read(self.path(bucket, key)).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                OrchestratorError::not_found("object", key)
            } else {
                OrchestratorError::internal(format!("failed to read object: {e}"), "objstore")
            }
        })
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectMetadata> {
        let metadata = tokio::fs::metadata(self.path(bucket, key))
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OrchestratorError::not_found("object", key)
                } else {
                    OrchestratorError::internal(format!("failed to stat object: {e}"), "objstore")
                }
            })?;
        Ok(ObjectMetadata {
            size: metadata.len(),
            checksum: String::new(),
        })
    }
}

/// Bundles every injected backend the engine needs, beyond `TaskStore`/
/// `SessionStore` which the caller supplies separately.
#[derive(Clone)]
pub struct Backends {
    pub nlp: Arc<dyn NlpBackend>,
    pub search: Arc<dyn SearchBackend>,
    pub notifications: Arc<dyn NotificationTransport>,
    pub rules: Arc<dyn RulesEngine>,
    pub kms: Arc<dyn Kms>,
    pub objects: Arc<dyn ObjectStore>,
}

impl Backends {
    pub fn local(object_store_root: impl Into<PathBuf>) -> Self {
        Self {
            nlp: Arc::new(UnavailableNlpBackend),
            search: Arc::new(UnavailableSearchBackend),
            notifications: Arc::new(LoggingNotificationTransport),
            rules: Arc::new(LocalRulesEngine),
            kms: Arc::new(NoopKms),
            objects: Arc::new(FilesystemObjectStore::new(object_store_root)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator_core::models::DeliverableStatus;
    use tempfile::TempDir;

    #[tokio::test]
    async fn local_rules_engine_blocks_executables() {
        let rules = LocalRulesEngine;
        let artifact = Deliverable {
            id: "d-1".into(),
            todo_id: "t-1".into(),
            file_name: "payload.exe".into(),
            file_type: "application/octet-stream".into(),
            size: 10,
            storage_key: "k".into(),
            submitter: "alice".into(),
            submitted_at: chrono::Utc::now(),
            version: 1,
            previous_version_id: None,
            validation: None,
            quality: None,
            status: DeliverableStatus::Submitted,
            checksum: "abc".into(),
        };
        let report = rules.validate_artifact(&artifact).await.unwrap();
        assert!(report.mandatory_failed());
    }

    #[tokio::test]
    async fn filesystem_object_store_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemObjectStore::new(dir.path());
        store
            .put("deliverables", "d-1.bin", vec![1, 2, 3])
            .await
            .unwrap();
        let bytes = store.get("deliverables", "d-1.bin").await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn filesystem_object_store_missing_key_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemObjectStore::new(dir.path());
        let result = store.get("deliverables", "missing.bin").await;
        assert!(matches!(result, Err(OrchestratorError::NotFound(_))));
    }
}
