//! Google Search crawler adapter, backed by SerpAPI (§4.3).

use super::{matching_keywords, CrawlHealth, Crawler};
use crate::error::CrawlError;
use crate::model::{ContentType, CrawlResult, CrawledPost};
use crate::ratelimit::{RateLimiter, RateLimiterConfig};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

const SERPAPI_BASE_URL: &str = "https://serpapi.com/search";

/// Crawls Google organic search results for keyword matches via SerpAPI.
pub struct GoogleCrawler {
    client: reqwest::Client,
    api_key: String,
    rate_limiter: Arc<RateLimiter>,
    initialized: AtomicBool,
}

impl GoogleCrawler {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            rate_limiter: Arc::new(RateLimiter::new("google", RateLimiterConfig::serpapi())),
            initialized: AtomicBool::new(false),
        }
    }

    fn has_credentials(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn fetch(&self, query: &str, num_results: u32) -> Result<SerpApiResponse, CrawlError> {
        self.rate_limiter.acquire().await;

        let result = self
            .client
            .get(SERPAPI_BASE_URL)
            .query(&[
                ("q", query.to_string()),
                ("engine", "google".to_string()),
                ("api_key", self.api_key.clone()),
                ("num", num_results.to_string()),
            ])
            .send()
            .await;

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                self.rate_limiter.record_failure().await;
                return Err(CrawlError::Network { source: e });
            }
        };

        if response.status().as_u16() == 429 {
            self.rate_limiter.record_rate_limit_hit().await;
            return Err(CrawlError::RateLimited {
                retry_after_secs: None,
            });
        }
        if !response.status().is_success() {
            self.rate_limiter.record_failure().await;
            return Err(CrawlError::ApiError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: SerpApiResponse = response
            .json()
            .await
            .map_err(|_| CrawlError::Parse("invalid serpapi response".to_string()))?;
        self.rate_limiter.record_success().await;
        Ok(body)
    }

    async fn search_with_filter(
        &self,
        keywords: &[String],
        site_filter: Option<&str>,
        limit: u32,
    ) -> Result<CrawlResult, CrawlError> {
        if !self.has_credentials() {
            return Ok(CrawlResult {
                platform: "google".to_string(),
                errors: vec!["serpapi key not configured".to_string()],
                ..Default::default()
            });
        }

        let start = Instant::now();
        let mut query = keywords
            .iter()
            .map(|k| format!("\"{k}\""))
            .collect::<Vec<_>>()
            .join(" OR ");
        if let Some(filter) = site_filter {
            query = format!("{query} {filter}");
        }

        let mut posts = Vec::new();
        let mut errors = Vec::new();
        let mut rate_limited = false;

        match self.fetch(&query, limit.clamp(1, 100)).await {
            Ok(body) => {
                for result in body.organic_results.unwrap_or_default() {
                    let matched =
                        matching_keywords(&format!("{} {}", result.title, result.snippet.clone().unwrap_or_default()), keywords);
                    if matched.is_empty() {
                        continue;
                    }
                    posts.push(parse_result(result, matched));
                }
            }
            Err(CrawlError::RateLimited { .. }) => {
                rate_limited = true;
                errors.push("rate limited by serpapi".to_string());
            }
            Err(e) => errors.push(e.to_string()),
        }

        posts.truncate(limit as usize);

        Ok(CrawlResult {
            platform: "google".to_string(),
            total_found: posts.len() as u32,
            posts,
            crawl_time_seconds: start.elapsed().as_secs_f64(),
            errors,
            rate_limited,
            next_cursor: None,
        })
    }
}

#[async_trait]
impl Crawler for GoogleCrawler {
    fn platform_name(&self) -> &str {
        "google"
    }

    async fn initialize(&self) -> Result<(), CrawlError> {
        if !self.has_credentials() {
            tracing::warn!("serpapi key not configured; crawler will return empty results");
        }
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), CrawlError> {
        self.initialized.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn search(
        &self,
        keywords: &[String],
        _subreddits: Option<&[String]>,
        limit: u32,
    ) -> Result<CrawlResult, CrawlError> {
        self.search_with_filter(keywords, None, limit).await
    }

    async fn get_recent(&self, sources: &[String], limit: u32) -> Result<CrawlResult, CrawlError> {
        // Google search has no notion of "recent from a source list"; treat
        // each entry as a site: filter applied to an empty keyword query.
        if sources.is_empty() {
            return Ok(CrawlResult {
                platform: "google".to_string(),
                ..Default::default()
            });
        }
        let filter = sources
            .iter()
            .map(|s| format!("site:{s}"))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.search_with_filter(&[], Some(&filter), limit).await
    }

    async fn health_check(&self) -> CrawlHealth {
        CrawlHealth {
            platform: "google".to_string(),
            initialized: self.initialized.load(Ordering::SeqCst),
            status: if self.has_credentials() {
                "ready".to_string()
            } else {
                "missing_credentials".to_string()
            },
        }
    }
}

fn parse_result(result: OrganicResult, keywords_matched: Vec<String>) -> CrawledPost {
    CrawledPost {
        external_id: format!("google_{:x}", md5_like_hash(&result.link)),
        external_url: result.link,
        content: format!(
            "{}\n\n{}",
            result.title,
            result.snippet.clone().unwrap_or_default()
        ),
        content_type: ContentType::SearchResult,
        author_handle: None,
        author_display_name: None,
        platform_metadata: std::collections::HashMap::new(),
        external_created_at: None,
        crawled_at: Utc::now(),
        platform: "google".to_string(),
        keywords_matched,
        engagement_metrics: std::collections::HashMap::new(),
        parent_id: None,
    }
}

/// Google search results carry no stable id; derive a short, deterministic
/// one from the result URL so the same link always dedupes to the same id.
fn md5_like_hash(s: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

#[derive(Deserialize)]
struct SerpApiResponse {
    organic_results: Option<Vec<OrganicResult>>,
}

#[derive(Deserialize)]
struct OrganicResult {
    title: String,
    link: String,
    snippet: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(
            md5_like_hash("https://example.com"),
            md5_like_hash("https://example.com")
        );
        assert_ne!(
            md5_like_hash("https://example.com/a"),
            md5_like_hash("https://example.com/b")
        );
    }

    #[tokio::test]
    async fn search_without_key_returns_configured_error() {
        let crawler = GoogleCrawler::new(String::new());
        let result = crawler.search(&["budget".to_string()], None, 10).await.unwrap();
        assert!(result.posts.is_empty());
        assert_eq!(result.errors.len(), 1);
    }

    #[tokio::test]
    async fn get_recent_with_no_sources_is_empty() {
        let crawler = GoogleCrawler::new("key".to_string());
        let result = crawler.get_recent(&[], 10).await.unwrap();
        assert!(result.posts.is_empty());
        assert!(result.errors.is_empty());
    }
}
