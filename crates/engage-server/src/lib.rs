//! Engage HTTP API server.
//!
//! Exposes `engage-core`'s analysis pipeline, crawl scheduler, and posting
//! queue as a REST API (§6) so an operator dashboard or a cron/systemd job
//! can drive the platform without linking against the core crate directly.

pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the complete axum router with all API routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .route("/health", get(routes::health::health))
        .route("/health/live", get(routes::health::live))
        .route("/health/ready", get(routes::health::ready))
        .route("/pipeline/analyze", post(routes::pipeline::analyze))
        .route("/skills/signal-detection", post(routes::skills::signal_detection))
        .route("/skills/risk-scoring", post(routes::skills::risk_scoring))
        .route(
            "/skills/response-generation",
            post(routes::skills::response_generation),
        )
        .route("/skills/cta-classifier", post(routes::skills::cta_classifier))
        .route("/skills/cts-decision", post(routes::skills::cts_decision))
        .route("/crawlers/status", get(routes::crawlers::status))
        .route("/crawlers/schedule", post(routes::crawlers::schedule))
        .route("/crawlers/health/{platform}", get(routes::crawlers::health))
        .route("/crawlers/{platform}/search", post(routes::crawlers::search))
        .route("/crawlers/{platform}/monitor", post(routes::crawlers::monitor))
        .route("/crawlers/run/{config_name}", post(routes::crawlers::run_by_name))
        .route("/crawlers/scheduler/start", post(routes::crawlers::scheduler_start))
        .route("/crawlers/scheduler/stop", post(routes::crawlers::scheduler_stop))
        .route("/crawlers/scheduler/pause", post(routes::crawlers::scheduler_pause))
        .route("/crawlers/scheduler/resume", post(routes::crawlers::scheduler_resume))
        .route(
            "/posting/post",
            post(routes::posting::post_now),
        )
        .route("/posting/queue", post(routes::posting::enqueue))
        .route(
            "/posting/queue/stats",
            get(routes::posting::queue_stats),
        )
        .route(
            "/posting/queue/{item_id}",
            get(routes::posting::queue_item).delete(routes::posting::cancel),
        )
        .route("/posting/status/{response_id}", get(routes::posting::response_status))
        .route(
            "/posting/automation/enable",
            post(routes::posting::automation_enable),
        )
        .route(
            "/posting/automation/disable",
            post(routes::posting::automation_disable),
        )
        .route(
            "/posting/automation/trigger",
            post(routes::posting::automation_trigger),
        )
        .route(
            "/posting/automation/status",
            get(routes::posting::automation_status),
        )
        .route(
            "/posting/automation/limits/{organization_id}",
            put(routes::posting::set_limits).get(routes::posting::get_limits),
        )
        .route(
            "/posting/automation/eligibility",
            post(routes::posting::check_eligibility),
        );

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
