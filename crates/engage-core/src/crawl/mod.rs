//! Platform crawlers, the crawl scheduler, and the crawl processor (§4.3/§4.4/§4.6).
//!
//! Every adapter implements [`Crawler`], a small async-trait contract that
//! mirrors what a web-scraping or API-polling integration actually needs:
//! connect, search, poll for recent activity, disconnect, and report health.
//! [`CrawlScheduler`] fires each configured source on its own cadence;
//! [`processor::CrawlProcessor`] turns a raw [`CrawlResult`] into persisted
//! posts and queued responses.

pub mod google;
pub mod processor;
pub mod quora;
pub mod reddit;
pub mod scheduler;
pub mod twitter;

pub use processor::{CrawlProcessor, CrawlStats};
pub use scheduler::{CrawlConfig, CrawlFrequency, CrawlJobStatus, CrawlScheduler};

use crate::error::CrawlError;
use crate::model::CrawlResult;
use async_trait::async_trait;
use serde::Serialize;

/// Point-in-time health of one crawler adapter.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlHealth {
    pub platform: String,
    pub initialized: bool,
    pub status: String,
}

/// Case-insensitive substring match, used by every adapter to decide which
/// configured keywords a piece of content actually matched.
pub(crate) fn matching_keywords(text: &str, keywords: &[String]) -> Vec<String> {
    let text_lower = text.to_lowercase();
    keywords
        .iter()
        .filter(|kw| text_lower.contains(&kw.to_lowercase()))
        .cloned()
        .collect()
}

/// Contract every platform crawler implements.
///
/// Object-safe so adapters are held as `Arc<dyn Crawler>` in the scheduler's
/// source registry. `&self` methods rely on interior mutability (an
/// `AtomicBool` initialized flag, a `Mutex`-guarded token/session) rather
/// than `&mut self`, since the scheduler drives many sources concurrently
/// from one shared handle.
#[async_trait]
pub trait Crawler: Send + Sync {
    /// Stable identifier for this adapter, e.g. `"reddit"`.
    fn platform_name(&self) -> &str;

    /// Acquire credentials/sessions. Idempotent: calling twice is a no-op.
    async fn initialize(&self) -> Result<(), CrawlError>;

    /// Release any held session/connection. Idempotent.
    async fn close(&self) -> Result<(), CrawlError>;

    /// Search for content matching `keywords`, optionally scoped to
    /// `subreddits` (Reddit only; ignored elsewhere).
    async fn search(
        &self,
        keywords: &[String],
        subreddits: Option<&[String]>,
        limit: u32,
    ) -> Result<CrawlResult, CrawlError>;

    /// Fetch recent posts from `sources` (subreddits, accounts, etc.)
    /// without a keyword filter.
    async fn get_recent(&self, sources: &[String], limit: u32) -> Result<CrawlResult, CrawlError>;

    /// Report adapter health without raising on a disconnected state.
    async fn health_check(&self) -> CrawlHealth;
}
