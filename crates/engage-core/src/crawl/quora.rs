//! Quora crawler adapter (§4.3).
//!
//! The source implementation scrapes Quora's HTML with a rotating
//! user-agent pool, which is both fragile (breaks on any markup change)
//! and not something this crate's dependency stack carries an HTML parser
//! for. Per the allowance for this platform, this adapter is a structural
//! stub: it satisfies the [`Crawler`] contract and reports its limitation
//! through `CrawlResult::errors` rather than returning `Err`, so a
//! misconfigured-but-enabled Quora source degrades the same way an
//! API-down platform would (skipped with an error recorded, not a crash).

use super::{CrawlHealth, Crawler};
use crate::error::CrawlError;
use crate::model::CrawlResult;
use std::sync::atomic::{AtomicBool, Ordering};

/// Structural placeholder for Quora discovery; see module docs.
pub struct QuoraCrawler {
    initialized: AtomicBool,
}

impl QuoraCrawler {
    pub fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
        }
    }

    fn not_implemented_result(&self) -> CrawlResult {
        CrawlResult {
            platform: "quora".to_string(),
            errors: vec![
                "quora crawling requires HTML scraping, which this adapter does not implement"
                    .to_string(),
            ],
            ..Default::default()
        }
    }
}

impl Default for QuoraCrawler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Crawler for QuoraCrawler {
    fn platform_name(&self) -> &str {
        "quora"
    }

    async fn initialize(&self) -> Result<(), CrawlError> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), CrawlError> {
        self.initialized.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn search(
        &self,
        _keywords: &[String],
        _subreddits: Option<&[String]>,
        _limit: u32,
    ) -> Result<CrawlResult, CrawlError> {
        Ok(self.not_implemented_result())
    }

    async fn get_recent(&self, _sources: &[String], _limit: u32) -> Result<CrawlResult, CrawlError> {
        Ok(self.not_implemented_result())
    }

    async fn health_check(&self) -> CrawlHealth {
        CrawlHealth {
            platform: "quora".to_string(),
            initialized: self.initialized.load(Ordering::SeqCst),
            status: "not_implemented".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_reports_error_without_panicking() {
        let crawler = QuoraCrawler::new();
        crawler.initialize().await.unwrap();
        let result = crawler.search(&["budget".to_string()], None, 10).await.unwrap();
        assert!(result.posts.is_empty());
        assert_eq!(result.errors.len(), 1);
    }

    #[tokio::test]
    async fn health_check_reports_not_implemented() {
        let crawler = QuoraCrawler::new();
        let health = crawler.health_check().await;
        assert_eq!(health.status, "not_implemented");
    }
}
