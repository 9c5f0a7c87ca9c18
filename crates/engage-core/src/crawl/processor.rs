//! Runs crawl results through the analysis pipeline and persists the
//! outcome, bridging the crawl scheduler and the posting queue (§4.6).

use super::scheduler::CrawlResultHandler;
use crate::llm::LlmProvider;
use crate::model::{CrawlResult, Platform, TenantContext};
use crate::pipeline::{self, PipelineInput};
use crate::storage::{engagement_queue, posts, responses, risk_scores, signals, DbPool};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Default tenant context used when a crawl source carries no organization
/// of its own. Operators are expected to register real tenant contexts via
/// [`CrawlProcessor::set_tenant_context`]; this exists so the pipeline has
/// something to generate against out of the box.
pub fn default_tenant_context() -> TenantContext {
    TenantContext {
        app_name: "Engage".to_string(),
        value_prop: "A tool that helps people work through what they're going through"
            .to_string(),
        target_audience: "People discussing their problems online".to_string(),
        key_benefits: vec![
            "Practical guidance".to_string(),
            "A non-judgmental space".to_string(),
        ],
        website_url: String::new(),
    }
}

/// Id used when a crawl result carries no organization of its own.
pub const DEFAULT_ORGANIZATION_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Running totals for one [`CrawlProcessor::process`] call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlStats {
    pub total_posts: usize,
    pub new_posts: usize,
    pub duplicates: usize,
    pub processed: usize,
    pub blocked: usize,
    pub queued: usize,
    pub errors: usize,
}

/// Detects the platform a crawled URL belongs to, for crawlers (like
/// Google) that can surface content from more than one site.
fn detect_platform(url: &str) -> Platform {
    let lower = url.to_lowercase();
    if lower.contains("reddit.com") {
        Platform::Reddit
    } else if lower.contains("twitter.com") || lower.contains("x.com") {
        Platform::Twitter
    } else {
        Platform::Quora
    }
}

/// Queue priority from a CTS score: 1 is highest, 5 is lowest.
fn priority_from_cts(cts_score: f64) -> i32 {
    if cts_score >= 0.8 {
        1
    } else if cts_score >= 0.6 {
        2
    } else if cts_score >= 0.4 {
        3
    } else if cts_score >= 0.2 {
        4
    } else {
        5
    }
}

/// Runs every post in a crawl result through the five-stage pipeline,
/// dedupes against already-seen posts, and persists new content alongside
/// its generated response and queue entry.
pub struct CrawlProcessor {
    pool: DbPool,
    llm: Arc<dyn LlmProvider>,
    tenant_contexts: Mutex<HashMap<String, TenantContext>>,
}

impl CrawlProcessor {
    pub fn new(pool: DbPool, llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            pool,
            llm,
            tenant_contexts: Mutex::new(HashMap::new()),
        }
    }

    /// Register a tenant's business context, used when generating responses
    /// for posts processed under that organization.
    pub async fn set_tenant_context(&self, organization_id: &str, context: TenantContext) {
        self.tenant_contexts
            .lock()
            .await
            .insert(organization_id.to_string(), context);
    }

    async fn tenant_context_for(&self, organization_id: &str) -> TenantContext {
        self.tenant_contexts
            .lock()
            .await
            .get(organization_id)
            .cloned()
            .unwrap_or_else(default_tenant_context)
    }

    /// Process one crawl result for a given organization, returning
    /// aggregate stats. Errors on individual posts never abort the batch.
    pub async fn process(
        &self,
        config_name: &str,
        result: CrawlResult,
        organization_id: &str,
    ) -> CrawlStats {
        let mut stats = CrawlStats {
            total_posts: result.posts.len(),
            ..Default::default()
        };
        let tenant_context = self.tenant_context_for(organization_id).await;

        for post in result.posts {
            if post.external_url.is_empty() || post.content.is_empty() {
                continue;
            }

            match posts::find_by_external_url(&self.pool, &post.external_url).await {
                Ok(Some(_)) => {
                    stats.duplicates += 1;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(url = %post.external_url, error = %e, "dedupe lookup failed");
                    stats.errors += 1;
                    continue;
                }
            }

            stats.new_posts += 1;
            let platform = detect_platform(&post.external_url);

            let pipeline_input = PipelineInput {
                text: post.content.clone(),
                platform,
                tenant_context: tenant_context.clone(),
            };

            let pipeline_out = match pipeline::run(self.llm.as_ref(), pipeline_input).await {
                Ok(out) => out,
                Err(e) => {
                    tracing::error!(url = %post.external_url, error = %e, "pipeline run failed");
                    stats.errors += 1;
                    continue;
                }
            };

            let post_id = match posts::insert(&self.pool, organization_id, &post).await {
                Ok(id) => id,
                Err(e) => {
                    tracing::error!(url = %post.external_url, error = %e, "failed to persist post");
                    stats.errors += 1;
                    continue;
                }
            };

            let Some(signal) = pipeline_out.signal.as_ref() else {
                stats.errors += 1;
                continue;
            };
            if let Err(e) = signals::insert(&self.pool, &post_id, signal).await {
                tracing::error!(post_id = %post_id, error = %e, "failed to persist signal");
            }

            let Some(risk) = pipeline_out.risk.as_ref() else {
                stats.errors += 1;
                continue;
            };
            if let Err(e) = risk_scores::insert(&self.pool, &post_id, risk).await {
                tracing::error!(post_id = %post_id, error = %e, "failed to persist risk score");
            }

            if pipeline_out.blocked {
                tracing::info!(url = %post.external_url, "post blocked by crisis detection, not queued");
                stats.blocked += 1;
                continue;
            }

            stats.processed += 1;

            let (Some(response_set), Some(cta), Some(cts)) =
                (pipeline_out.responses.as_ref(), pipeline_out.cta.as_ref(), pipeline_out.cts.as_ref())
            else {
                stats.errors += 1;
                continue;
            };

            let response_id =
                match responses::insert(&self.pool, &post_id, organization_id, response_set, cta).await {
                    Ok(id) => id,
                    Err(e) => {
                        tracing::error!(post_id = %post_id, error = %e, "failed to persist response");
                        stats.errors += 1;
                        continue;
                    }
                };

            let priority = priority_from_cts(cts.cts_score);
            match engagement_queue::insert(
                &self.pool,
                organization_id,
                &post_id,
                &response_id,
                priority,
                cts.cts_score,
                !cts.can_auto_post,
                &cts.decision_factors,
            )
            .await
            {
                Ok(_) => stats.queued += 1,
                Err(e) => {
                    tracing::error!(post_id = %post_id, error = %e, "failed to queue post");
                    stats.errors += 1;
                }
            }
        }

        tracing::info!(
            source = %config_name,
            new_posts = stats.new_posts,
            duplicates = stats.duplicates,
            processed = stats.processed,
            queued = stats.queued,
            errors = stats.errors,
            "crawl processing complete",
        );

        stats
    }
}

#[async_trait]
impl CrawlResultHandler for CrawlProcessor {
    async fn handle(&self, config_name: &str, result: CrawlResult) {
        self.process(config_name, result, DEFAULT_ORGANIZATION_ID).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{GenerationParams, LlmResponse, TokenUsage};
    use crate::model::{ContentType, CrawledPost};
    use crate::storage::init_test_db;
    use chrono::Utc;
    use std::sync::Mutex as StdMutex;

    struct ScriptedLlm {
        responses: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _system: &str,
            _user_message: &str,
            _params: &GenerationParams,
        ) -> Result<LlmResponse, LlmError> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(LlmError::NotConfigured);
            }
            let text = responses.remove(0);
            Ok(LlmResponse {
                text,
                usage: TokenUsage::default(),
                model: "scripted".to_string(),
            })
        }

        async fn health_check(&self) -> Result<(), LlmError> {
            Ok(())
        }
    }

    fn non_crisis_script() -> Vec<String> {
        vec![
            serde_json::json!({
                "problem_category": "financial_stress",
                "emotional_intensity": 0.5,
                "keywords": ["budget"],
                "confidence": 0.7,
                "reasoning": "money stress"
            })
            .to_string(),
            serde_json::json!({
                "risk_score": 0.2,
                "risk_factors": [],
                "context_flags": [],
                "sentiment": "negative",
                "engagement_recommendation": "safe"
            })
            .to_string(),
            serde_json::json!({
                "problem_understanding": "budgeting struggle",
                "emotional_tone": "frustrated",
                "key_pain_points": ["money"],
                "response_strategy": "empathize",
                "value_first_response": "Budgeting is hard.",
                "soft_cta_response": "A shared tracker might help.",
                "contextual_response": "Consider a regular check-in."
            })
            .to_string(),
        ]
    }

    fn sample_post(url: &str) -> CrawledPost {
        CrawledPost {
            external_id: "abc".to_string(),
            external_url: url.to_string(),
            content: "My partner and I keep fighting about money.".to_string(),
            content_type: ContentType::Post,
            author_handle: Some("u1".to_string()),
            author_display_name: None,
            platform_metadata: HashMap::new(),
            external_created_at: Some(Utc::now()),
            crawled_at: Utc::now(),
            platform: "reddit".to_string(),
            keywords_matched: vec!["budget".to_string()],
            engagement_metrics: HashMap::new(),
            parent_id: None,
        }
    }

    #[tokio::test]
    async fn new_post_is_processed_and_queued() {
        let pool = init_test_db().await.unwrap();
        let llm = Arc::new(ScriptedLlm {
            responses: StdMutex::new(non_crisis_script()),
        });
        let processor = CrawlProcessor::new(pool.clone(), llm);

        let result = CrawlResult {
            platform: "reddit".to_string(),
            posts: vec![sample_post("https://reddit.com/r/test/abc")],
            total_found: 1,
            ..Default::default()
        };

        let stats = processor.process("test-source", result, "org1").await;
        assert_eq!(stats.new_posts, 1);
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.errors, 0);

        let queued = engagement_queue::list_by_status(&pool, "org1", "queued", 10)
            .await
            .unwrap();
        assert_eq!(queued.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_post_is_skipped_on_second_pass() {
        let pool = init_test_db().await.unwrap();
        let mut script = non_crisis_script();
        script.extend(non_crisis_script());
        let llm = Arc::new(ScriptedLlm {
            responses: StdMutex::new(script),
        });
        let processor = CrawlProcessor::new(pool.clone(), llm);

        let post = sample_post("https://reddit.com/r/test/dup");
        let first = CrawlResult {
            platform: "reddit".to_string(),
            posts: vec![post.clone()],
            ..Default::default()
        };
        let second = CrawlResult {
            platform: "reddit".to_string(),
            posts: vec![post],
            ..Default::default()
        };

        processor.process("test-source", first, "org1").await;
        let stats = processor.process("test-source", second, "org1").await;
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.new_posts, 0);
    }

    #[tokio::test]
    async fn crisis_post_is_blocked_and_not_queued() {
        let pool = init_test_db().await.unwrap();
        let script = vec![serde_json::json!({
            "problem_category": "mental_health_depression",
            "emotional_intensity": 0.9,
            "keywords": ["hopeless"],
            "confidence": 0.8,
            "reasoning": "crisis"
        })
        .to_string()];
        let llm = Arc::new(ScriptedLlm {
            responses: StdMutex::new(script),
        });
        let processor = CrawlProcessor::new(pool.clone(), llm);

        let mut post = sample_post("https://reddit.com/r/test/crisis");
        post.content = "I want to end it all".to_string();
        let result = CrawlResult {
            platform: "reddit".to_string(),
            posts: vec![post],
            ..Default::default()
        };

        let stats = processor.process("test-source", result, "org1").await;
        assert_eq!(stats.blocked, 1);
        assert_eq!(stats.queued, 0);
    }

    #[test]
    fn priority_thresholds_match_spec() {
        assert_eq!(priority_from_cts(0.9), 1);
        assert_eq!(priority_from_cts(0.7), 2);
        assert_eq!(priority_from_cts(0.5), 3);
        assert_eq!(priority_from_cts(0.3), 4);
        assert_eq!(priority_from_cts(0.1), 5);
    }

    #[test]
    fn detect_platform_matches_known_domains() {
        assert_eq!(detect_platform("https://reddit.com/r/x"), Platform::Reddit);
        assert_eq!(detect_platform("https://x.com/y"), Platform::Twitter);
        assert_eq!(detect_platform("https://quora.com/z"), Platform::Quora);
    }
}
