//! Engage API server binary.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use engage_core::config::Config;
use engage_core::crawl::processor::CrawlProcessor;
use engage_core::crawl::scheduler::{CrawlConfig as ScheduledCrawlConfig, CrawlFrequency, CrawlScheduler};
use engage_core::crawl::{google::GoogleCrawler, quora::QuoraCrawler, reddit::RedditCrawler, twitter::TwitterCrawler, Crawler};
use engage_core::llm::openai_compat::OpenAiCompatProvider;
use engage_core::llm::LlmProvider;
use engage_core::posting::posters::{RedditPoster, TwitterPoster};
use engage_core::posting::{PlatformPoster, PostingQueue, RateLimitManager, WorkerPool};
use engage_core::ratelimit::RateLimiterRegistry;
use engage_core::storage;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use engage_server::routes::posting::PosterCallback;
use engage_server::state::AppState;

/// Engage API server — REST front end for the crawl scheduler, analysis
/// pipeline, and posting queue.
#[derive(Parser)]
#[command(name = "engage-server", version, about)]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Host address to bind to. Use 0.0.0.0 for LAN access.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Path to the engage configuration file.
    #[arg(long)]
    config: Option<String>,
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
/// credentials. Platforms without credentials are simply left unregistered
/// rather than failing startup -- crawling/posting is best-effort per
/// platform, not all-or-nothing.
fn build_crawlers() -> HashMap<String, Arc<dyn Crawler>> {
    let mut crawlers: HashMap<String, Arc<dyn Crawler>> = HashMap::new();

    if let (Ok(client_id), Ok(client_secret)) =
        (std::env::var("REDDIT_CLIENT_ID"), std::env::var("REDDIT_CLIENT_SECRET"))
    {
        let user_agent =
            std::env::var("REDDIT_USER_AGENT").unwrap_or_else(|_| "engage/0.1 (by /u/engage-bot)".to_string());
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
        let user_agent =
            std::env::var("REDDIT_USER_AGENT").unwrap_or_else(|_| "engage/0.1 (by /u/engage-bot)".to_string());
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

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let config = Config::load_and_validate(cli.config.as_deref()).map_err(|errors| {
        anyhow::anyhow!(
            "config invalid: {}",
            errors.iter().map(std::string::ToString::to_string).collect::<Vec<_>>().join("; ")
        )
    })?;

    tracing::info!(
        db = %config.storage.db_path,
        host = %cli.host,
        port = cli.port,
        "starting engage server"
    );

    let pool = storage::init_db(&config.storage.db_path)
        .await
        .context("failed to initialize database")?;

    let llm = build_llm(&config);
    if llm.is_none() {
        tracing::warn!("no LLM provider configured -- /pipeline/analyze and /skills/* will return an error");
    }

    let crawl_processor = llm.clone().map(|llm| Arc::new(CrawlProcessor::new(pool.clone(), llm)));

    let mut crawl_scheduler = CrawlScheduler::new();
    let crawlers = build_crawlers();
    let frequency: CrawlFrequency = config.crawl.frequency.parse().unwrap_or(CrawlFrequency::EverySixHours);
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
    posting_pool
        .start(config.posting.worker_count, Arc::new(PosterCallback::new(posters.clone())))
        .await;

    let state = Arc::new(AppState {
        db: pool,
        config,
        llm,
        crawl_scheduler: Mutex::new(crawl_scheduler),
        crawl_processor,
        crawlers,
        rate_limiters: RateLimiterRegistry::new(),
        rate_limits,
        posting_queue,
        posting_pool,
        posters,
        worker: Mutex::new(None),
    });

    let router = engage_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", cli.host, cli.port)).await?;
    tracing::info!("listening on http://{}:{}", cli.host, cli.port);
    axum::serve(listener, router).await?;

    Ok(())
}
