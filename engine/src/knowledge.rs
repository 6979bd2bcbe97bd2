//! Knowledge & Workgroup Resolver (KWR) — §4.2.

use std::sync::Arc;

use orchestrator_core::error::Result;
use orchestrator_core::models::{
    CapacityInfo, HistoricalPerformance, KnowledgeReference, RecommendedInvolvement,
    RelatedWorkgroup, SkillMatchDetail,
};
use orchestrator_core::traits::{Clock, SearchBackend, SearchQuery, SystemClock};

use crate::resilience::BackendGuard;

const DEFAULT_TOP_K: usize = 5;

/// Static capability/skill profile for a workgroup, supplied by the caller
/// (typically loaded from an org directory outside this crate's scope).
#[derive(Debug, Clone)]
pub struct WorkgroupProfile {
    pub team_id: String,
    pub skills: Vec<String>,
    pub active_assignments: u32,
    pub capacity_limit: u32,
    pub historical_completed: u32,
    pub historical_success_rate: f32,
    pub recent_topics: Vec<String>,
}

pub struct KnowledgeWorkgroupResolver {
    search: Arc<dyn SearchBackend>,
    guard: BackendGuard,
    workgroups: Vec<WorkgroupProfile>,
    top_k: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ResolveResult {
    pub knowledge_refs: Vec<KnowledgeReference>,
    pub workgroups: Vec<RelatedWorkgroup>,
    pub degraded: bool,
}

impl KnowledgeWorkgroupResolver {
    pub fn new(search: Arc<dyn SearchBackend>, workgroups: Vec<WorkgroupProfile>) -> Self {
        Self::with_clock(search, workgroups, Arc::new(SystemClock))
    }

    pub fn with_clock(
        search: Arc<dyn SearchBackend>,
        workgroups: Vec<WorkgroupProfile>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            search,
            guard: BackendGuard::with_defaults(clock),
            workgroups,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Resolves knowledge references and ranked workgroups for a task's
    /// content and extracted key points. A search backend failure degrades
    /// the knowledge side of the result rather than aborting the caller.
    pub async fn resolve(&self, content: &str, key_points: &[String]) -> Result<ResolveResult> {
        let query_text = if key_points.is_empty() {
            content.to_string()
        } else {
            key_points.join(" ")
        };

        let (knowledge_refs, degraded) = match self
            .guard
            .call(|| {
                self.search.search(SearchQuery {
                    text: query_text.clone(),
                    filters: vec![],
                })
            })
            .await
        {
            Ok(results) => (results.items, results.degraded),
            Err(_) => (vec![], true),
        };

        let workgroups = self.rank_workgroups(&query_text);

        Ok(ResolveResult {
            knowledge_refs,
            workgroups,
            degraded,
        })
    }

    fn rank_workgroups(&self, query_text: &str) -> Vec<RelatedWorkgroup> {
        let query_terms = tokenize(query_text);

        let mut ranked: Vec<(f32, RelatedWorkgroup)> = self
            .workgroups
            .iter()
            .map(|wg| {
                let matched: Vec<String> = wg
                    .skills
                    .iter()
                    .filter(|s| query_terms.contains(&s.to_lowercase()))
                    .cloned()
                    .collect();
                let missing: Vec<String> = wg
                    .skills
                    .iter()
                    .filter(|s| !matched.contains(s))
                    .cloned()
                    .collect();
                let skill_match = if wg.skills.is_empty() {
                    0.0
                } else {
                    matched.len() as f32 / wg.skills.len() as f32
                };
                let capacity_fit = if wg.capacity_limit == 0 {
                    0.0
                } else {
                    1.0 - (wg.active_assignments as f32 / wg.capacity_limit as f32).min(1.0)
                };
                let recent_similarity = {
                    let overlap = wg
                        .recent_topics
                        .iter()
                        .filter(|t| query_terms.contains(&t.to_lowercase()))
                        .count();
                    if wg.recent_topics.is_empty() {
                        0.0
                    } else {
                        overlap as f32 / wg.recent_topics.len() as f32
                    }
                };

                // §4.2 ranking formula.
                let relevance = 0.5 * skill_match
                    + 0.2 * capacity_fit
                    + 0.2 * wg.historical_success_rate
                    + 0.1 * recent_similarity;

                let recommended_involvement = if skill_match >= 0.6 {
                    RecommendedInvolvement::Collaboration
                } else if skill_match >= 0.3 {
                    RecommendedInvolvement::Consultation
                } else if capacity_fit < 0.2 {
                    RecommendedInvolvement::Notification
                } else {
                    RecommendedInvolvement::Notification
                };

                (
                    relevance,
                    RelatedWorkgroup {
                        team_id: wg.team_id.clone(),
                        relevance,
                        skill_match: SkillMatchDetail {
                            matched_skills: matched,
                            missing_skills: missing,
                            score: skill_match,
                        },
                        capacity: CapacityInfo {
                            active_assignments: wg.active_assignments,
                            capacity_limit: wg.capacity_limit,
                            fit: capacity_fit,
                        },
                        historical_performance: HistoricalPerformance {
                            completed_count: wg.historical_completed,
                            success_rate: wg.historical_success_rate,
                        },
                        recent_similarity,
                        recommended_involvement,
                    },
                )
            })
            .collect();

        // Ties break by higher capacity, then lexicographic team id (§4.2).
        ranked.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap()
                .then_with(|| b.1.capacity.capacity_limit.cmp(&a.1.capacity.capacity_limit))
                .then_with(|| a.1.team_id.cmp(&b.1.team_id))
        });

        ranked
            .into_iter()
            .take(self.top_k)
            .map(|(_, wg)| wg)
            .collect()
    }
}

fn tokenize(text: &str) -> std::collections::HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use orchestrator_core::traits::SearchResults;

    struct StubSearch {
        degraded: bool,
    }

    #[async_trait]
    impl SearchBackend for StubSearch {
        async fn search(&self, _query: SearchQuery) -> Result<SearchResults> {
            if self.degraded {
                return Err(orchestrator_core::error::OrchestratorError::Transient(
                    "search down".into(),
                ));
            }
            Ok(SearchResults {
                query_id: "q1".into(),
                items: vec![],
                degraded: false,
            })
        }
        async fn submit_feedback(&self, _query_id: &str, _relevance_label: f32) -> Result<()> {
            Ok(())
        }
    }

    fn profile(team: &str, skills: &[&str], active: u32, cap: u32, success: f32) -> WorkgroupProfile {
        WorkgroupProfile {
            team_id: team.into(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            active_assignments: active,
            capacity_limit: cap,
            historical_completed: 10,
            historical_success_rate: success,
            recent_topics: vec![],
        }
    }

    #[tokio::test]
    async fn ranks_security_team_top_for_oauth_content() {
        let resolver = KnowledgeWorkgroupResolver::new(
            Arc::new(StubSearch { degraded: false }),
            vec![
                profile("security-team", &["oauth", "security", "auth"], 1, 5, 0.9),
                profile("billing-team", &["invoicing", "payments"], 1, 5, 0.9),
            ],
        );
        let result = resolver
            .resolve("Implement OAuth2 with Google", &["oauth".to_string()])
            .await
            .unwrap();
        assert_eq!(result.workgroups[0].team_id, "security-team");
    }

    #[tokio::test]
    async fn search_failure_degrades_without_aborting() {
        let resolver = KnowledgeWorkgroupResolver::new(
            Arc::new(StubSearch { degraded: true }),
            vec![profile("team-a", &["x"], 0, 5, 0.5)],
        );
        let result = resolver.resolve("content", &[]).await.unwrap();
        assert!(result.degraded);
        assert!(result.knowledge_refs.is_empty());
        assert_eq!(result.workgroups.len(), 1);
    }

    #[tokio::test]
    async fn top_k_limits_result_size() {
        let resolver = KnowledgeWorkgroupResolver::new(
            Arc::new(StubSearch { degraded: false }),
            (0..10)
                .map(|i| profile(&format!("team-{i}"), &["x"], 0, 5, 0.5))
                .collect(),
        )
        .with_top_k(3);
        let result = resolver.resolve("x content", &[]).await.unwrap();
        assert_eq!(result.workgroups.len(), 3);
    }
}
