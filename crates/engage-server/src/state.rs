//! Shared application state for the engage server.

use std::collections::HashMap;
use std::sync::Arc;

use engage_core::config::Config;
use engage_core::crawl::processor::CrawlProcessor;
use engage_core::crawl::scheduler::CrawlScheduler;
use engage_core::crawl::Crawler;
use engage_core::llm::LlmProvider;
use engage_core::posting::{AutoPostWorker, PlatformPoster, PostingQueue, RateLimitManager, WorkerPool};
use engage_core::ratelimit::RateLimiterRegistry;
use engage_core::storage::DbPool;
use tokio::sync::Mutex;

/// Shared application state accessible by all route handlers.
pub struct AppState {
    /// SQLite connection pool.
    pub db: DbPool,
    /// Loaded configuration (rate limits, pipeline thresholds, org identity).
    pub config: Config,
    /// LLM provider backing the analysis pipeline; `None` disables
    /// `/pipeline/analyze` and `/skills/*` with a clear error instead of
    /// panicking on first use.
    pub llm: Option<Arc<dyn LlmProvider>>,
    /// Crawl scheduler, shared across `/crawlers/*` routes.
    pub crawl_scheduler: Mutex<CrawlScheduler>,
    /// Crawl result processor (pipeline + persistence), used both by the
    /// scheduler's background loops and by the synchronous `/crawlers/run`
    /// and `/crawlers/{platform}/search` routes.
    pub crawl_processor: Option<Arc<CrawlProcessor>>,
    /// Platform crawlers, keyed by platform name, for on-demand
    /// `/crawlers/*` searches independent of scheduler registration.
    pub crawlers: HashMap<String, Arc<dyn Crawler>>,
    /// Per-name rate limiter cache shared by crawl adapters.
    pub rate_limiters: RateLimiterRegistry,
    /// Org-scoped posting rate limits and usage accounting.
    pub rate_limits: Arc<RateLimitManager>,
    /// In-memory posting queue backing `/posting/queue*`.
    pub posting_queue: Arc<PostingQueue>,
    /// Worker pool draining `posting_queue`, running from server startup
    /// for as long as the process is up -- it is the queue's generic
    /// execution engine, not an org-level automation toggle.
    pub posting_pool: Arc<WorkerPool>,
    /// Platform posters, keyed by platform name (`"reddit"`, `"twitter"`).
    pub posters: HashMap<String, Arc<dyn PlatformPoster>>,
    /// Auto-post worker driving the posting queue on a schedule; started
    /// via `POST /posting/automation/enable`.
    pub worker: Mutex<Option<Arc<AutoPostWorker>>>,
}
