//! `/crawlers/*` (§6) — on-demand crawler search and scheduler control.
//!
//! The scheduler itself drives its own background polling loops; these
//! routes are for operators who want to trigger a one-off search, register a
//! new source, or inspect/pause the running schedule without waiting for the
//! next tick.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use engage_core::crawl::{CrawlConfig, CrawlJobStatus};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CrawlerSourceStatus {
    pub config: CrawlConfig,
    pub status: CrawlJobStatus,
}

/// `GET /crawlers/status` — every registered source's config and run counters.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<Vec<CrawlerSourceStatus>> {
    let scheduler = state.crawl_scheduler.lock().await;
    let configs = scheduler.list_configs().await;
    let mut out = Vec::with_capacity(configs.len());
    for config in configs {
        let status = scheduler.get_status(&config.name).await.unwrap_or_default();
        out.push(CrawlerSourceStatus { config, status });
    }
    Json(out)
}

/// `POST /crawlers/schedule` — register (or replace) a crawl source.
///
/// Sources added after the scheduler has started are not picked up until
/// the next `POST /crawlers/scheduler/start`, matching
/// [`engage_core::crawl::CrawlScheduler::register`]'s own contract.
pub async fn schedule(
    State(state): State<Arc<AppState>>,
    Json(config): Json<CrawlConfig>,
) -> Result<Json<CrawlConfig>, ApiError> {
    let crawler = state
        .crawlers
        .get(&config.platform)
        .cloned()
        .ok_or_else(|| ApiError::BadRequest(format!("no crawler registered for platform '{}'", config.platform)))?;

    let scheduler = state.crawl_scheduler.lock().await;
    scheduler.register(config.clone(), crawler).await;
    Ok(Json(config))
}

/// `POST /crawlers/scheduler/start`.
pub async fn scheduler_start(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    let handler = state
        .crawl_processor
        .clone()
        .ok_or_else(|| ApiError::BadRequest("no crawl processor configured".to_string()))?;
    let mut scheduler = state.crawl_scheduler.lock().await;
    scheduler.start(handler).await;
    Ok(Json(serde_json::json!({ "running": true })))
}

/// `POST /crawlers/scheduler/stop`.
pub async fn scheduler_stop(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let mut scheduler = state.crawl_scheduler.lock().await;
    scheduler.stop().await;
    Json(serde_json::json!({ "running": false }))
}

/// `POST /crawlers/scheduler/pause`.
pub async fn scheduler_pause(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let scheduler = state.crawl_scheduler.lock().await;
    scheduler.pause();
    Json(serde_json::json!({ "paused": true }))
}

/// `POST /crawlers/scheduler/resume`.
pub async fn scheduler_resume(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let scheduler = state.crawl_scheduler.lock().await;
    scheduler.resume();
    Json(serde_json::json!({ "paused": false }))
}

/// `GET /crawlers/health/{platform}`.
pub async fn health(
    State(state): State<Arc<AppState>>,
    Path(platform): Path<String>,
) -> Result<Json<engage_core::crawl::CrawlHealth>, ApiError> {
    let crawler = state
        .crawlers
        .get(&platform)
        .ok_or_else(|| ApiError::NotFound(format!("no crawler registered for platform '{platform}'")))?;
    Ok(Json(crawler.health_check().await))
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub subreddits: Vec<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Organization whose tenant context generates the response set for any
    /// new posts found. Defaults to the processor's fallback context.
    #[serde(default = "default_organization_id")]
    pub organization_id: String,
}

fn default_limit() -> u32 {
    25
}
fn default_organization_id() -> String {
    engage_core::crawl::processor::DEFAULT_ORGANIZATION_ID.to_string()
}

/// `POST /crawlers/{platform}/search` — one-off search, run synchronously
/// through the analysis pipeline and persisted like a scheduled crawl.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Path(platform): Path<String>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<engage_core::crawl::CrawlStats>, ApiError> {
    let crawler = state
        .crawlers
        .get(&platform)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("no crawler registered for platform '{platform}'")))?;
    let processor = state
        .crawl_processor
        .clone()
        .ok_or_else(|| ApiError::BadRequest("no crawl processor configured".to_string()))?;

    let result = if req.keywords.is_empty() {
        crawler.get_recent(&req.subreddits, req.limit).await
    } else {
        crawler.search(&req.keywords, Some(&req.subreddits), req.limit).await
    };
    let result = result.map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let stats = processor.process(&platform, result, &req.organization_id).await;
    Ok(Json(stats))
}

#[derive(Debug, Deserialize)]
pub struct MonitorRequest {
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_organization_id")]
    pub organization_id: String,
}

/// `POST /crawlers/{platform}/monitor` — keyword-free poll of `sources`
/// (subreddits, accounts), the one-off counterpart to what the scheduler
/// runs when a registered source has no configured keywords.
pub async fn monitor(
    State(state): State<Arc<AppState>>,
    Path(platform): Path<String>,
    Json(req): Json<MonitorRequest>,
) -> Result<Json<engage_core::crawl::CrawlStats>, ApiError> {
    let crawler = state
        .crawlers
        .get(&platform)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("no crawler registered for platform '{platform}'")))?;
    let processor = state
        .crawl_processor
        .clone()
        .ok_or_else(|| ApiError::BadRequest("no crawl processor configured".to_string()))?;

    let result = crawler
        .get_recent(&req.sources, req.limit)
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let stats = processor.process(&platform, result, &req.organization_id).await;
    Ok(Json(stats))
}

/// `POST /crawlers/run/{config_name}` — run one registered source
/// immediately, using its stored keywords/subreddits/limit, outside its
/// normal schedule.
pub async fn run_by_name(
    State(state): State<Arc<AppState>>,
    Path(config_name): Path<String>,
) -> Result<Json<engage_core::crawl::CrawlStats>, ApiError> {
    let processor = state
        .crawl_processor
        .clone()
        .ok_or_else(|| ApiError::BadRequest("no crawl processor configured".to_string()))?;

    let scheduler = state.crawl_scheduler.lock().await;
    let configs = scheduler.list_configs().await;
    let config = configs
        .into_iter()
        .find(|c| c.name == config_name)
        .ok_or_else(|| ApiError::NotFound(format!("no crawl source named '{config_name}'")))?;
    drop(scheduler);

    let crawler = state
        .crawlers
        .get(&config.platform)
        .cloned()
        .ok_or_else(|| ApiError::BadRequest(format!("no crawler registered for platform '{}'", config.platform)))?;

    let result = if config.keywords.is_empty() {
        crawler.get_recent(&config.subreddits, config.limit).await
    } else {
        crawler
            .search(&config.keywords, Some(&config.subreddits), config.limit)
            .await
    };
    let result = result.map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let stats = processor
        .process(&config_name, result, engage_core::crawl::processor::DEFAULT_ORGANIZATION_ID)
        .await;
    Ok(Json(stats))
}
