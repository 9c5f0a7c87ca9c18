//! `/posting/*` (§6) — direct queue access and auto-post automation control.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::Json;
use engage_core::model::{OrgLimits, PostResult, QueueItem, QueueItemStatus};
use engage_core::posting::{
    AutoPostEligibility, AutoPostWorker, PlatformPoster, PostCallback, ProcessingStats,
    ResponseData, WorkerStatus,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

/// Bridges [`PostingQueue`](engage_core::posting::PostingQueue) items to the
/// poster registry for [`WorkerPool`](engage_core::posting::WorkerPool).
/// An item whose platform has no registered poster fails non-retryably
/// rather than panicking -- the pool's own platform set can't drift from
/// `AppState.posters` once built, so this only fires on operator
/// misconfiguration (enqueuing a platform never wired up).
pub struct PosterCallback {
    posters: HashMap<String, Arc<dyn PlatformPoster>>,
}

impl PosterCallback {
    pub fn new(posters: HashMap<String, Arc<dyn PlatformPoster>>) -> Self {
        Self { posters }
    }
}

#[async_trait]
impl PostCallback for PosterCallback {
    async fn post(&self, item: &QueueItem) -> PostResult {
        match self.posters.get(&item.platform) {
            Some(poster) => poster.post(&item.response_text, &item.target_url).await,
            None => PostResult {
                success: false,
                retryable: false,
                error_code: Some("NO_POSTER".to_string()),
                error: Some(format!("no poster configured for platform '{}'", item.platform)),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PostNowRequest {
    pub platform: String,
    pub response_text: String,
    pub target_url: String,
}

#[derive(Debug, Serialize)]
pub struct PostNowResponse {
    pub result: PostResult,
}

/// `POST /posting/post` — post immediately, bypassing the queue. For manual
/// one-off posts, not auto-posted content (which always goes through
/// `/posting/queue/enqueue` and the worker pool).
pub async fn post_now(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PostNowRequest>,
) -> Result<Json<PostNowResponse>, ApiError> {
    let poster = state
        .posters
        .get(&req.platform)
        .ok_or_else(|| ApiError::BadRequest(format!("no poster configured for platform '{}'", req.platform)))?;
    let result = poster.post(&req.response_text, &req.target_url).await;
    Ok(Json(PostNowResponse { result }))
}

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub response_id: String,
    pub organization_id: String,
    pub platform: String,
    pub target_url: String,
    pub response_text: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_priority() -> i32 {
    5
}
fn default_max_retries() -> u32 {
    3
}

/// `POST /posting/queue`.
pub async fn enqueue(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EnqueueRequest>,
) -> Result<Json<QueueItem>, ApiError> {
    let item = QueueItem {
        id: uuid::Uuid::new_v4(),
        response_id: req.response_id,
        organization_id: req.organization_id,
        platform: req.platform,
        target_url: req.target_url,
        response_text: req.response_text,
        priority: req.priority,
        status: QueueItemStatus::Queued,
        retry_count: 0,
        max_retries: req.max_retries,
        created_at: chrono::Utc::now(),
        scheduled_for: None,
        started_at: None,
        completed_at: None,
        last_error: None,
        result: None,
        metadata: std::collections::HashMap::new(),
    };

    state
        .posting_queue
        .enqueue(item.clone())
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(item))
}

/// `GET /posting/status/{response_id}` — a stored response's current
/// posting status, independent of whether it ever entered the in-memory
/// queue (it may have been posted directly by the auto-post worker).
pub async fn response_status(
    State(state): State<Arc<AppState>>,
    Path(response_id): Path<String>,
) -> Result<Json<engage_core::storage::responses::StoredResponse>, ApiError> {
    engage_core::storage::responses::get(&state.db, &response_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("response {response_id} not found")))
}

/// `GET /posting/queue/{item_id}`.
pub async fn queue_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<uuid::Uuid>,
) -> Result<Json<QueueItem>, ApiError> {
    state
        .posting_queue
        .get(item_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("queue item {item_id} not found")))
}

/// `DELETE /posting/queue/{item_id}` — cancel a queued or retry-pending item.
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<uuid::Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.posting_queue.cancel(item_id).await {
        Ok(Json(serde_json::json!({ "cancelled": true })))
    } else {
        Err(ApiError::Conflict(format!(
            "queue item {item_id} does not exist or is already being processed"
        )))
    }
}

#[derive(Debug, Serialize)]
pub struct QueueStatsResponse {
    pub total_items: usize,
    pub by_status: std::collections::HashMap<String, usize>,
    pub by_platform: std::collections::HashMap<String, usize>,
    pub in_flight: usize,
}

/// `GET /posting/queue/stats`.
pub async fn queue_stats(State(state): State<Arc<AppState>>) -> Json<QueueStatsResponse> {
    let stats = state.posting_queue.get_stats().await;
    let in_flight = state.posting_pool.in_flight_count().await;
    Json(QueueStatsResponse {
        total_items: stats.total_items,
        by_status: stats.by_status,
        by_platform: stats.by_platform,
        in_flight,
    })
}

/// Build the [`AutoPostWorker`] the automation routes operate on, from
/// config + the poster registry already wired into [`AppState`].
fn build_worker(state: &AppState) -> Arc<AutoPostWorker> {
    Arc::new(AutoPostWorker::new(
        state.db.clone(),
        state.rate_limits.clone(),
        state.posters.clone(),
        vec![state.config.org.organization_id.clone()],
        Duration::from_secs(state.config.posting.check_interval_seconds),
        i64::from(state.config.posting.batch_size),
    ))
}

/// `POST /posting/automation/enable` — start the auto-post worker loop.
pub async fn automation_enable(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let mut guard = state.worker.lock().await;
    let worker = guard.get_or_insert_with(|| build_worker(&state)).clone();
    worker.start().await;
    *guard = Some(worker);
    Json(serde_json::json!({ "status": "running" }))
}

/// `POST /posting/automation/disable` — stop the auto-post worker loop.
pub async fn automation_disable(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let guard = state.worker.lock().await;
    if let Some(worker) = guard.as_ref() {
        worker.stop().await;
    }
    Json(serde_json::json!({ "status": "stopped" }))
}

#[derive(Debug, Serialize)]
pub struct AutomationStatusResponse {
    pub status: WorkerStatus,
}

/// `GET /posting/automation/status`.
pub async fn automation_status(State(state): State<Arc<AppState>>) -> Json<AutomationStatusResponse> {
    let guard = state.worker.lock().await;
    let status = guard.as_ref().map(|w| w.status()).unwrap_or(WorkerStatus::Stopped);
    Json(AutomationStatusResponse { status })
}

/// `POST /posting/automation/trigger` — run one `process_eligible_responses`
/// pass immediately, without starting the periodic loop.
pub async fn automation_trigger(State(state): State<Arc<AppState>>) -> Json<ProcessingStats> {
    let mut guard = state.worker.lock().await;
    let worker = guard.get_or_insert_with(|| build_worker(&state)).clone();
    *guard = Some(worker.clone());
    drop(guard);
    Json(worker.process_eligible_responses().await)
}

/// `PUT /posting/automation/limits/{organization_id}` — install an explicit
/// rate-limit policy override.
pub async fn set_limits(
    State(state): State<Arc<AppState>>,
    Path(organization_id): Path<String>,
    Json(mut limits): Json<OrgLimits>,
) -> Json<OrgLimits> {
    limits.organization_id = organization_id;
    state.rate_limits.set_org_limits(limits.clone()).await;
    Json(limits)
}

/// `GET /posting/automation/limits/{organization_id}`.
pub async fn get_limits(
    State(state): State<Arc<AppState>>,
    Path(organization_id): Path<String>,
) -> Json<OrgLimits> {
    Json(state.rate_limits.get_org_limits(&organization_id).await)
}

#[derive(Debug, Deserialize)]
pub struct EligibilityRequest {
    pub organization_id: String,
    pub response: ResponseData,
}

/// `POST /posting/automation/eligibility` — dry-run the eligibility gate
/// against a hypothetical response, without enqueuing or posting anything.
pub async fn check_eligibility(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EligibilityRequest>,
) -> Json<engage_core::posting::EligibilityResult> {
    let limits = state.rate_limits.get_org_limits(&req.organization_id).await;
    let checker = AutoPostEligibility::new(&state.rate_limits);
    Json(checker.check(&req.response, &limits).await)
}
