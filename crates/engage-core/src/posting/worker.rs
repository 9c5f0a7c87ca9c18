//! Auto-post worker: pulls eligible queued responses and posts them (§4.8).
//!
//! Unlike the Python source's callback-injection design, this worker calls
//! `storage::`/`posting::` functions directly, matching how
//! [`crate::crawl::processor::CrawlProcessor`] is wired -- there's no
//! pluggable-backend requirement here, so the extra indirection would only
//! make the control flow harder to follow.

use crate::automation::{LoopScheduler, Runtime};
use crate::posting::eligibility::{AutoPostEligibility, ResponseData};
use crate::posting::org_limits::RateLimitManager;
use crate::posting::PlatformPoster;
use crate::storage::{engagement_queue, posts, responses, risk_scores, DbPool};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle state of the worker's processing loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Stopped,
    Starting,
    Running,
    Paused,
    Stopping,
    Error,
}

/// Outcome of one `process_eligible_responses` pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingStats {
    pub processed: usize,
    pub posted: usize,
    pub requires_review: usize,
    pub denied: usize,
    pub errors: usize,
    pub duration_ms: u64,
}

/// Priority score on the Python source's 0-100 scale (higher = more
/// urgent), then inverted to this codebase's ascending-priority convention
/// (lower number processes first). Used to re-rank a fetched batch in
/// memory with freshness and CTA-level signals the stored `priority`
/// column (set once at enqueue time) doesn't capture.
fn calculate_queue_priority(cts_score: f64, cta_level: i32, age_hours: f64) -> i32 {
    let mut score = 50.0;
    score += cts_score * 20.0;
    score += (3 - cta_level) as f64 * 5.0;
    score += if age_hours < 1.0 {
        10.0
    } else if age_hours < 6.0 {
        5.0
    } else {
        0.0
    };
    let score = score.clamp(0.0, 100.0);
    (100.0 - score) as i32
}

/// Polls the engagement queue for eligible responses and posts them.
pub struct AutoPostWorker {
    pool: DbPool,
    rate_limits: Arc<RateLimitManager>,
    posters: HashMap<String, Arc<dyn PlatformPoster>>,
    organization_ids: Vec<String>,
    check_interval: Duration,
    batch_size: i64,
    runtime: tokio::sync::Mutex<Runtime>,
    status: Arc<std::sync::Mutex<WorkerStatus>>,
    paused: Arc<AtomicBool>,
}

impl AutoPostWorker {
    pub fn new(
        pool: DbPool,
        rate_limits: Arc<RateLimitManager>,
        posters: HashMap<String, Arc<dyn PlatformPoster>>,
        organization_ids: Vec<String>,
        check_interval: Duration,
        batch_size: i64,
    ) -> Self {
        Self {
            pool,
            rate_limits,
            posters,
            organization_ids,
            check_interval,
            batch_size,
            runtime: tokio::sync::Mutex::new(Runtime::new()),
            status: Arc::new(std::sync::Mutex::new(WorkerStatus::Stopped)),
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn status(&self) -> WorkerStatus {
        *self.status.lock().unwrap()
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        *self.status.lock().unwrap() = WorkerStatus::Paused;
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        *self.status.lock().unwrap() = WorkerStatus::Running;
    }

    /// Start the periodic processing loop. Runs one pass immediately, then
    /// wakes on `check_interval` (plus jitter) until stopped.
    pub async fn start(self: &Arc<Self>) {
        {
            let mut status = self.status.lock().unwrap();
            if *status == WorkerStatus::Running || *status == WorkerStatus::Starting {
                return;
            }
            *status = WorkerStatus::Starting;
        }

        let worker = self.clone();
        let scheduler =
            LoopScheduler::new(self.check_interval, Duration::from_secs(0), Duration::from_secs(10));
        let cancel = self.runtime.lock().await.cancel_token();

        *self.status.lock().unwrap() = WorkerStatus::Running;

        let task = async move {
            let mut first = true;
            loop {
                if first {
                    first = false;
                } else {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = scheduler.tick() => {}
                    }
                }
                if cancel.is_cancelled() {
                    break;
                }
                if worker.paused.load(Ordering::SeqCst) {
                    continue;
                }

                let stats = worker.process_eligible_responses().await;
                tracing::info!(
                    processed = stats.processed,
                    posted = stats.posted,
                    requires_review = stats.requires_review,
                    denied = stats.denied,
                    errors = stats.errors,
                    "auto-post worker pass complete"
                );
            }
        };

        self.runtime.lock().await.spawn("auto-post-worker", task);
    }

    pub async fn stop(&self) {
        {
            let mut status = self.status.lock().unwrap();
            if *status == WorkerStatus::Stopped {
                return;
            }
            *status = WorkerStatus::Stopping;
        }
        self.runtime.lock().await.shutdown().await;
        *self.status.lock().unwrap() = WorkerStatus::Stopped;
    }

    /// Fetch a batch of queued engagement decisions per organization, run
    /// eligibility + rate-limit checks, and post the ones that pass.
    pub async fn process_eligible_responses(&self) -> ProcessingStats {
        let start = std::time::Instant::now();
        let mut stats = ProcessingStats::default();

        for organization_id in &self.organization_ids {
            let org_limits = self.rate_limits.get_org_limits(organization_id).await;
            let entries = match engagement_queue::list_by_status(
                &self.pool,
                organization_id,
                "queued",
                self.batch_size,
            )
            .await
            {
                Ok(e) => e,
                Err(e) => {
                    tracing::error!(organization_id = %organization_id, error = %e, "failed to list queued engagements");
                    stats.errors += 1;
                    continue;
                }
            };

            let mut batch = Vec::new();
            for entry in entries {
                let stored_response = match responses::get_for_post(&self.pool, &entry.post_id).await
                {
                    Ok(Some(r)) => r,
                    Ok(None) => {
                        tracing::warn!(post_id = %entry.post_id, "queued entry has no response, skipping");
                        stats.errors += 1;
                        continue;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to load response for queued entry");
                        stats.errors += 1;
                        continue;
                    }
                };

                let stored_post = match posts::get(&self.pool, &entry.post_id).await {
                    Ok(Some(p)) => p,
                    _ => {
                        stats.errors += 1;
                        continue;
                    }
                };

                let risk = risk_scores::get_for_post(&self.pool, &entry.post_id)
                    .await
                    .ok()
                    .flatten();

                let age_hours = Utc::now()
                    .signed_duration_since(stored_post.post.crawled_at)
                    .num_minutes() as f64
                    / 60.0;
                let priority = calculate_queue_priority(
                    entry.cts_score,
                    stored_response.cta.cta_level,
                    age_hours,
                );

                batch.push((priority, entry, stored_response, stored_post, risk));
            }
            batch.sort_by_key(|(priority, ..)| *priority);

            for (_, entry, stored_response, stored_post, risk) in batch {
                stats.processed += 1;

                let subreddit = stored_post
                    .post
                    .platform_metadata
                    .get("subreddit")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());

                let response_data = ResponseData {
                    response_id: stored_response.id.clone(),
                    cts_score: entry.cts_score,
                    risk_level: risk.map(|r| r.risk_level).unwrap_or(crate::model::RiskLevel::Low),
                    cta_level: stored_response.cta.cta_level,
                    platform: stored_post.post.platform.clone(),
                    can_auto_post: !entry.requires_review,
                    status: stored_response.status.clone(),
                    target_url: stored_post.post.external_url.clone(),
                    subreddit,
                };

                let checker = AutoPostEligibility::new(&self.rate_limits);
                let eligibility = checker.check(&response_data, &org_limits).await;

                if !eligibility.eligible {
                    if eligibility.requires_review {
                        stats.requires_review += 1;
                        let _ = engagement_queue::update_status(
                            &self.pool,
                            &entry.id,
                            "requires_review",
                            false,
                        )
                        .await;
                    } else {
                        stats.denied += 1;
                    }
                    continue;
                }

                let Some(poster) = self.posters.get(&response_data.platform) else {
                    tracing::warn!(platform = %response_data.platform, "no poster configured for platform");
                    stats.errors += 1;
                    continue;
                };

                let result = poster
                    .post(&stored_response.responses.selected_response, &response_data.target_url)
                    .await;

                if result.success {
                    stats.posted += 1;
                    self.rate_limits
                        .record_post(
                            organization_id,
                            &response_data.platform,
                            response_data.subreddit.as_deref().unwrap_or(""),
                        )
                        .await;
                    let _ = engagement_queue::update_status(&self.pool, &entry.id, "posted", false)
                        .await;
                    let _ = responses::update_status(&self.pool, &stored_response.id, "posted").await;
                } else {
                    stats.errors += 1;
                    let _ =
                        engagement_queue::update_status(&self.pool, &entry.id, "failed", true).await;
                }
            }
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_rewards_high_cts_and_low_cta() {
        let urgent = calculate_queue_priority(0.95, 0, 0.5);
        let routine = calculate_queue_priority(0.3, 3, 20.0);
        assert!(urgent < routine);
    }

    #[test]
    fn priority_clamped_to_valid_range() {
        let p = calculate_queue_priority(1.0, 0, 0.1);
        assert!((0..=100).contains(&p));
    }

    #[tokio::test]
    async fn process_eligible_responses_handles_empty_queue() {
        let pool = crate::storage::init_test_db().await.unwrap();
        let worker = AutoPostWorker::new(
            pool,
            Arc::new(RateLimitManager::new()),
            HashMap::new(),
            vec!["org1".to_string()],
            Duration::from_secs(300),
            10,
        );
        let stats = worker.process_eligible_responses().await;
        assert_eq!(stats.processed, 0);
    }
}
