//! `engage stats` -- crawl, pipeline, and posting activity for the
//! organization configured in `config.toml`.

use clap::Args;
use engage_core::config::Config;
use serde::Serialize;

/// Arguments for the `stats` subcommand.
#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Print results as JSON instead of a human summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Default, Serialize)]
struct Stats {
    total_posts: i64,
    posts_by_platform: Vec<(String, i64)>,
    signals_detected: i64,
    risk_by_level: Vec<(String, i64)>,
    responses_by_status: Vec<(String, i64)>,
    engagement_by_status: Vec<(String, i64)>,
    crawl_sources: Vec<String>,
}

pub async fn execute(config: &Config, args: StatsArgs) -> anyhow::Result<()> {
    let pool = engage_core::storage::init_db(&config.storage.db_path).await?;

    let total_posts: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
        .fetch_one(&pool)
        .await?;
    let posts_by_platform: Vec<(String, i64)> =
        sqlx::query_as("SELECT platform, COUNT(*) FROM posts GROUP BY platform ORDER BY platform")
            .fetch_all(&pool)
            .await?;
    let signals_detected: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM signals")
        .fetch_one(&pool)
        .await?;
    let risk_by_level: Vec<(String, i64)> =
        sqlx::query_as("SELECT risk_level, COUNT(*) FROM risk_scores GROUP BY risk_level ORDER BY risk_level")
            .fetch_all(&pool)
            .await?;
    let responses_by_status: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM responses GROUP BY status ORDER BY status")
            .fetch_all(&pool)
            .await?;
    let engagement_by_status: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM engagement_queue GROUP BY status ORDER BY status")
            .fetch_all(&pool)
            .await?;

    let stats = Stats {
        total_posts: total_posts.0,
        posts_by_platform,
        signals_detected: signals_detected.0,
        risk_by_level,
        responses_by_status,
        engagement_by_status,
        crawl_sources: config_crawl_sources(config),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Engage stats for '{}'\n", config.org.organization_id);
    println!("Posts crawled: {}", stats.total_posts);
    for (platform, count) in &stats.posts_by_platform {
        println!("  {platform}: {count}");
    }
    println!("\nSignals detected: {}", stats.signals_detected);
    println!("\nRisk distribution:");
    for (level, count) in &stats.risk_by_level {
        println!("  {level}: {count}");
    }
    println!("\nResponses by status:");
    for (status, count) in &stats.responses_by_status {
        println!("  {status}: {count}");
    }
    println!("\nEngagement queue by status:");
    for (status, count) in &stats.engagement_by_status {
        println!("  {status}: {count}");
    }
    println!("\nConfigured crawl sources: {}", stats.crawl_sources.join(", "));

    Ok(())
}

/// Platforms this config would register a crawl source for, based on which
/// credential env vars are present -- mirrors `bootstrap::Deps::build`'s
/// registration logic without constructing the adapters.
fn config_crawl_sources(_config: &Config) -> Vec<String> {
    let mut sources = vec!["quora".to_string()];
    if std::env::var("REDDIT_CLIENT_ID").is_ok() {
        sources.push("reddit".to_string());
    }
    if std::env::var("TWITTER_BEARER_TOKEN").is_ok() {
        sources.push("twitter".to_string());
    }
    if std::env::var("GOOGLE_API_KEY").is_ok() {
        sources.push("google".to_string());
    }
    sources.sort();
    sources
}
