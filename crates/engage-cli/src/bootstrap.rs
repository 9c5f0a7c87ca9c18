//! Shared dependency construction for `run`/`tick`/`test`.
//!
//! Mirrors how `engage-server`'s binary wires the same subsystems; the two
//! binaries each bootstrap their own copy rather than sharing a `main`-only
//! helper, since neither depends on the other.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use engage_core::config::Config;
use engage_core::crawl::google::GoogleCrawler;
use engage_core::crawl::processor::CrawlProcessor;
use engage_core::crawl::quora::QuoraCrawler;
use engage_core::crawl::reddit::RedditCrawler;
use engage_core::crawl::scheduler::{
    CrawlConfig as ScheduledCrawlConfig, CrawlFrequency, CrawlScheduler,
};
use engage_core::crawl::twitter::TwitterCrawler;
use engage_core::crawl::Crawler;
use engage_core::llm::openai_compat::OpenAiCompatProvider;
use engage_core::llm::LlmProvider;
use engage_core::model::{PostResult, QueueItem};
use engage_core::posting::posters::{RedditPoster, TwitterPoster};
use engage_core::posting::{
    AutoPostWorker, PlatformPoster, PostCallback, PostingQueue, RateLimitManager, WorkerPool,
};
use engage_core::storage::{self, DbPool};

/// Every long-lived subsystem `run` and `tick` need, built once from config.
pub struct Deps {
    pub db: DbPool,
    pub llm: Option<Arc<dyn LlmProvider>>,
    pub crawl_scheduler: CrawlScheduler,
    pub crawl_processor: Option<Arc<CrawlProcessor>>,
    pub crawlers: HashMap<String, Arc<dyn Crawler>>,
    pub rate_limits: Arc<RateLimitManager>,
    pub posting_queue: Arc<PostingQueue>,
    pub posting_pool: Arc<WorkerPool>,
    pub posters: HashMap<String, Arc<dyn PlatformPoster>>,
}

impl Deps {
    pub async fn build(config: &Config) -> anyhow::Result<Self> {
        let db = storage::init_db(&config.storage.db_path).await?;

        let llm = build_llm(config);
        let crawl_processor = llm
            .clone()
            .map(|llm| Arc::new(CrawlProcessor::new(db.clone(), llm)));

        let mut crawl_scheduler = CrawlScheduler::new();
        let crawlers = build_crawlers();
        let frequency: CrawlFrequency =
            config.crawl.frequency.parse().unwrap_or(CrawlFrequency::EverySixHours);
        for (platform, crawler) in &crawlers {
            crawl_scheduler
                .register(
                    ScheduledCrawlConfig {
                        name: platform.clone(),
                        platform: platform.clone(),
                        keywords: config.crawl.keywords.clone(),
                        subreddits: config.crawl.subreddits.clone(),
                        frequency,
                        limit: config.crawl.limit_per_job,
                        enabled: true,
                    },
                    crawler.clone(),
                )
                .await;
        }

        let rate_limits = Arc::new(RateLimitManager::new());
        rate_limits.set_org_limits(config.to_org_limits()).await;

        let posting_queue = Arc::new(PostingQueue::new(config.to_queue_config()));
        let posters = build_posters();
        let posting_pool = Arc::new(WorkerPool::new(posting_queue.clone()));

        Ok(Self {
            db,
            llm,
            crawl_scheduler,
            crawl_processor,
            crawlers,
            rate_limits,
            posting_queue,
            posting_pool,
            posters,
        })
    }

    /// Build the [`AutoPostWorker`] `run`/`tick` drive, from config + the
    /// poster registry already built into this bundle.
    pub fn build_worker(&self, config: &Config) -> Arc<AutoPostWorker> {
        Arc::new(AutoPostWorker::new(
            self.db.clone(),
            self.rate_limits.clone(),
            self.posters.clone(),
            vec![config.org.organization_id.clone()],
            std::time::Duration::from_secs(config.posting.check_interval_seconds),
            i64::from(config.posting.batch_size),
        ))
    }

    pub fn posting_callback(&self) -> Arc<dyn PostCallback> {
        Arc::new(PosterCallback { posters: self.posters.clone() })
    }
}

/// Bridges `PostingQueue` items to the poster registry for `WorkerPool`,
/// same shape as `engage-server`'s route-layer callback.
struct PosterCallback {
    posters: HashMap<String, Arc<dyn PlatformPoster>>,
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

fn build_llm(config: &Config) -> Option<Arc<dyn LlmProvider>> {
    let api_key = config.llm.api_key.clone()?;
    let base_url = config
        .llm
        .base_url
        .clone()
        .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
    Some(Arc::new(OpenAiCompatProvider::new(
        base_url,
        api_key,
        config.llm.model.clone(),
        config.llm.model.clone(),
        config.llm.provider.clone(),
    )))
}

/// Build one crawler + posting adapter per platform from environment
/// credentials. Platforms without credentials are left unregistered rather
/// than failing startup.
fn build_crawlers() -> HashMap<String, Arc<dyn Crawler>> {
    let mut crawlers: HashMap<String, Arc<dyn Crawler>> = HashMap::new();

    if let (Ok(client_id), Ok(client_secret)) =
        (std::env::var("REDDIT_CLIENT_ID"), std::env::var("REDDIT_CLIENT_SECRET"))
    {
        let user_agent = std::env::var("REDDIT_USER_AGENT")
            .unwrap_or_else(|_| "engage/0.1 (by /u/engage-bot)".to_string());
        crawlers.insert(
            "reddit".to_string(),
            Arc::new(RedditCrawler::new(client_id, client_secret, user_agent)),
        );
    }
    if let Ok(bearer_token) = std::env::var("TWITTER_BEARER_TOKEN") {
        crawlers.insert("twitter".to_string(), Arc::new(TwitterCrawler::new(bearer_token)));
    }
    crawlers.insert("quora".to_string(), Arc::new(QuoraCrawler::new()));
    if let Ok(api_key) = std::env::var("GOOGLE_API_KEY") {
        crawlers.insert("google".to_string(), Arc::new(GoogleCrawler::new(api_key)));
    }

    crawlers
}

fn build_posters() -> HashMap<String, Arc<dyn PlatformPoster>> {
    let mut posters: HashMap<String, Arc<dyn PlatformPoster>> = HashMap::new();

    if let (Ok(client_id), Ok(client_secret)) =
        (std::env::var("REDDIT_CLIENT_ID"), std::env::var("REDDIT_CLIENT_SECRET"))
    {
        let user_agent = std::env::var("REDDIT_USER_AGENT")
            .unwrap_or_else(|_| "engage/0.1 (by /u/engage-bot)".to_string());
        posters.insert(
            "reddit".to_string(),
            Arc::new(RedditPoster::new(
                client_id,
                client_secret,
                std::env::var("REDDIT_USERNAME").ok(),
                std::env::var("REDDIT_PASSWORD").ok(),
                user_agent,
            )),
        );
    }
    if let Ok(bearer_token) = std::env::var("TWITTER_BEARER_TOKEN") {
        posters.insert("twitter".to_string(), Arc::new(TwitterPoster::new(bearer_token)));
    }

    posters
}
