//! Stub implementations of the smaller external interfaces (§6): search,
//! NLP, object storage, notifications, rules engine, and KMS. Each supports
//! error injection via a `fail` flag so engine tests can exercise the
//! degraded-result paths without a real backend.

use std::collections::HashMap;

use async_trait::async_trait;
use orchestrator_core::error::{OrchestratorError, Result};
use orchestrator_core::models::{DataProtectionPolicy, Deliverable, KnowledgeReference, Severity, ValidationCheck, ValidationReport};
use orchestrator_core::traits::{
    ContentValidation, KeyPointExtraction, Kms, NlpBackend, NotificationChannel,
    NotificationTransport, ObjectMetadata, ObjectStore, PiiDetection, PiiHit, RulesEngine,
    SearchBackend, SearchQuery, SearchResults,
};
use parking_lot::Mutex;

#[derive(Default)]
pub struct StubSearchBackend {
    pub fail: bool,
    pub results: Vec<KnowledgeReference>,
}

#[async_trait]
impl SearchBackend for StubSearchBackend {
    async fn search(&self, _query: SearchQuery) -> Result<SearchResults> {
        if self.fail {
            return Err(OrchestratorError::Transient("search backend unavailable".into()));
        }
        Ok(SearchResults {
            query_id: "stub-query".into(),
            items: self.results.clone(),
            degraded: false,
        })
    }

    async fn submit_feedback(&self, _query_id: &str, _relevance_label: f32) -> Result<()> {
        Ok(())
    }
}

pub struct StubNlpBackend {
    degraded: bool,
    pii_hits: Vec<PiiHit>,
}

impl StubNlpBackend {
    pub fn new() -> Self {
        Self {
            degraded: false,
            pii_hits: vec![],
        }
    }

    /// Always reports a degraded, empty extraction, forcing callers onto the
    /// rule-based key-point fallback.
    pub fn degraded() -> Self {
        Self {
            degraded: true,
            pii_hits: vec![],
        }
    }

    pub fn with_pii(hits: Vec<PiiHit>) -> Self {
        Self {
            degraded: false,
            pii_hits: hits,
        }
    }
}

impl Default for StubNlpBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NlpBackend for StubNlpBackend {
    async fn extract_key_points(&self, content: &str) -> Result<KeyPointExtraction> {
        if self.degraded {
            return Ok(KeyPointExtraction {
                key_points: vec![],
                degraded: true,
            });
        }
        let points = content
            .split(['.', '!', '?'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        Ok(KeyPointExtraction {
            key_points: points,
            degraded: false,
        })
    }

    async fn detect_pii(&self, _content: &str) -> Result<PiiDetection> {
        Ok(PiiDetection {
            hits: self.pii_hits.clone(),
        })
    }

    async fn summarize(&self, content: &str) -> Result<String> {
        Ok(content.chars().take(200).collect())
    }
}

#[derive(Default)]
pub struct StubObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

#[async_trait]
impl ObjectStore for StubObjectStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.objects
            .lock()
            .insert((bucket.to_string(), key.to_string()), bytes);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.objects
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| OrchestratorError::not_found("object", key))
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectMetadata> {
        let objects = self.objects.lock();
        let bytes = objects
            .get(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| OrchestratorError::not_found("object", key))?;
        Ok(ObjectMetadata {
            size: bytes.len() as u64,
            checksum: format!("{:x}", bytes.iter().fold(0u64, |acc, b| acc.wrapping_add(*b as u64))),
        })
    }
}

#[derive(Default)]
pub struct StubNotificationTransport {
    sent: Mutex<Vec<String>>,
}

impl StubNotificationTransport {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl NotificationTransport for StubNotificationTransport {
    async fn send(
        &self,
        recipient: &str,
        _channel: NotificationChannel,
        _message: &str,
        _urgency: Severity,
        message_id: &str,
    ) -> Result<()> {
        let mut sent = self.sent.lock();
        if sent.iter().any(|id| id == message_id) {
            return Ok(());
        }
        sent.push(message_id.to_string());
        let _ = recipient;
        Ok(())
    }
}

#[derive(Default)]
pub struct StubRulesEngine {
    pub compliant: bool,
    pub violations: Vec<String>,
}

#[async_trait]
impl RulesEngine for StubRulesEngine {
    async fn validate_content(
        &self,
        _text: &str,
        _policy: &DataProtectionPolicy,
    ) -> Result<ContentValidation> {
        Ok(ContentValidation {
            compliant: self.violations.is_empty() || self.compliant,
            score: if self.violations.is_empty() { 1.0 } else { 0.3 },
            violations: self.violations.clone(),
        })
    }

    async fn validate_artifact(&self, _artifact: &Deliverable) -> Result<ValidationReport> {
        Ok(ValidationReport {
            checks: Vec::<ValidationCheck>::new(),
        })
    }
}

#[derive(Default)]
pub struct StubKms;

#[async_trait]
impl Kms for StubKms {
    async fn encrypt(&self, _key_id: &str, plaintext: Vec<u8>) -> Result<Vec<u8>> {
        Ok(plaintext)
    }

    async fn decrypt(&self, _key_id: &str, ciphertext: Vec<u8>) -> Result<Vec<u8>> {
        Ok(ciphertext)
    }
}
