//! `engage tick` -- run one crawl + analysis + auto-post pass per registered
//! source, then exit. Meant for cron/systemd-timer invocation rather than a
//! long-lived process.

use clap::Args;
use engage_core::config::Config;
use serde::Serialize;

use crate::bootstrap::Deps;

/// Arguments for the `tick` subcommand.
#[derive(Debug, Args)]
pub struct TickArgs {
    /// Print the resulting stats as JSON instead of a human summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Default, Serialize)]
struct TickReport {
    crawls: Vec<CrawlOutcome>,
    posting: engage_core::posting::ProcessingStats,
}

#[derive(Debug, Serialize)]
struct CrawlOutcome {
    source: String,
    stats: engage_core::crawl::processor::CrawlStats,
}

pub async fn execute(config: &Config, args: TickArgs) -> anyhow::Result<()> {
    let deps = Deps::build(config).await?;
    let mut report = TickReport::default();

    match &deps.crawl_processor {
        Some(processor) => {
            for (name, crawler) in &deps.crawlers {
                crawler.initialize().await.ok();
                let outcome = if config.crawl.keywords.is_empty() {
                    crawler.get_recent(&config.crawl.subreddits, config.crawl.limit_per_job).await
                } else {
                    crawler
                        .search(&config.crawl.keywords, Some(&config.crawl.subreddits), config.crawl.limit_per_job)
                        .await
                };
                crawler.close().await.ok();

                match outcome {
                    Ok(result) => {
                        let stats =
                            processor.process(name, result, &config.org.organization_id).await;
                        report.crawls.push(CrawlOutcome { source: name.clone(), stats });
                    }
                    Err(e) => {
                        tracing::error!(source = %name, error = %e, "crawl pass failed");
                    }
                }
            }
        }
        None => {
            tracing::warn!("no LLM provider configured -- skipping crawl pass");
        }
    }

    let worker = deps.build_worker(config);
    report.posting = worker.process_eligible_responses().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for crawl in &report.crawls {
            println!(
                "{}: {} new, {} duplicate, {} queued, {} blocked, {} errors",
                crawl.source,
                crawl.stats.new_posts,
                crawl.stats.duplicates,
                crawl.stats.queued,
                crawl.stats.blocked,
                crawl.stats.errors
            );
        }
        println!(
            "posting: {} processed, {} posted, {} requires review, {} denied, {} errors",
            report.posting.processed,
            report.posting.posted,
            report.posting.requires_review,
            report.posting.denied,
            report.posting.errors
        );
    }

    Ok(())
}
