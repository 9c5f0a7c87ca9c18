//! `engage run` -- start crawling, analysis, and auto-posting until a
//! shutdown signal arrives.

use clap::Args;
use engage_core::automation::wait_for_shutdown_signal;
use engage_core::config::Config;

use crate::bootstrap::Deps;

/// Arguments for the `run` subcommand.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Print a periodic status summary (0 = disabled, overrides config)
    #[arg(long)]
    pub status_interval: Option<u64>,
}

pub async fn execute(config: &Config, args: RunArgs) -> anyhow::Result<()> {
    tracing::info!(
        organization_id = %config.org.organization_id,
        auto_post_enabled = config.auto_post_enabled,
        "starting engage"
    );

    let mut deps = Deps::build(config).await?;

    if deps.llm.is_none() {
        tracing::warn!("no LLM provider configured -- crawled posts will not be analyzed");
    }
    if let Some(processor) = deps.crawl_processor.clone() {
        deps.crawl_scheduler.start(processor).await;
        tracing::info!(sources = deps.crawlers.len(), "crawl scheduler started");
    } else {
        tracing::warn!("crawl scheduler not started (no LLM provider to process results)");
    }

    deps.posting_pool
        .start(config.posting.worker_count, deps.posting_callback())
        .await;
    tracing::info!(workers = config.posting.worker_count, "posting worker pool started");

    let worker = deps.build_worker(config);
    if config.auto_post_enabled {
        worker.start().await;
        tracing::info!("auto-post worker started");
    } else {
        tracing::info!("auto-post worker not started (auto_post_enabled = false)");
    }

    let status_interval = args.status_interval.unwrap_or(config.logging.status_interval_seconds);
    let status_handle = if status_interval > 0 {
        let queue = deps.posting_queue.clone();
        let pool = deps.posting_pool.clone();
        let interval = std::time::Duration::from_secs(status_interval);
        Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let stats = queue.get_stats().await;
                tracing::info!(
                    queue_total = stats.total_items,
                    in_flight = pool.in_flight_count().await,
                    "status"
                );
            }
        }))
    } else {
        None
    };

    wait_for_shutdown_signal().await;
    tracing::info!("shutting down");

    if let Some(handle) = status_handle {
        handle.abort();
    }
    deps.crawl_scheduler.stop().await;
    deps.posting_pool.stop().await;
    if config.auto_post_enabled {
        worker.stop().await;
    }

    Ok(())
}
