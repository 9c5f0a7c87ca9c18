//! Reddit crawler adapter, backed by the OAuth JSON API (§4.3).
//!
//! Uses an app-only (`client_credentials`) OAuth token rather than
//! `asyncpraw`'s full user-context flow, since this adapter only ever
//! reads public listings. The token is refreshed lazily a few seconds
//! before it expires.

use super::{matching_keywords, CrawlHealth, Crawler};
use crate::error::CrawlError;
use crate::model::{ContentType, CrawlResult, CrawledPost};
use crate::ratelimit::{RateLimiter, RateLimiterConfig};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";

struct RedditToken {
    access_token: String,
    expires_at: Instant,
}

/// Crawls Reddit search and subreddit listings via the OAuth JSON API.
pub struct RedditCrawler {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    user_agent: String,
    rate_limiter: Arc<RateLimiter>,
    token: Mutex<Option<RedditToken>>,
    initialized: AtomicBool,
}

impl RedditCrawler {
    pub fn new(client_id: String, client_secret: String, user_agent: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id,
            client_secret,
            user_agent,
            rate_limiter: Arc::new(RateLimiter::new("reddit", RateLimiterConfig::reddit_oauth())),
            token: Mutex::new(None),
            initialized: AtomicBool::new(false),
        }
    }

    fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    async fn access_token(&self) -> Result<String, CrawlError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.expires_at > Instant::now() + std::time::Duration::from_secs(10) {
                return Ok(token.access_token.clone());
            }
        }

        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header("User-Agent", &self.user_agent)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| CrawlError::Network { source: e })?;

        if !response.status().is_success() {
            return Err(CrawlError::AuthFailed {
                message: format!("reddit token request returned {}", response.status()),
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|_| CrawlError::Parse("invalid reddit token response".to_string()))?;

        let access_token = body.access_token.clone();
        *guard = Some(RedditToken {
            access_token: body.access_token,
            expires_at: Instant::now() + std::time::Duration::from_secs(body.expires_in),
        });

        Ok(access_token)
    }

    async fn fetch_listing(&self, path: &str) -> Result<RedditListing, CrawlError> {
        self.rate_limiter.acquire().await;
        let token = self.access_token().await?;

        let result = self
            .client
            .get(format!("{API_BASE}{path}"))
            .bearer_auth(token)
            .header("User-Agent", &self.user_agent)
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

        let listing = response
            .json::<RedditListing>()
            .await
            .map_err(|_| CrawlError::Parse("invalid reddit listing response".to_string()))?;
        self.rate_limiter.record_success().await;
        Ok(listing)
    }
}

#[async_trait]
impl Crawler for RedditCrawler {
    fn platform_name(&self) -> &str {
        "reddit"
    }

    async fn initialize(&self) -> Result<(), CrawlError> {
        if !self.has_credentials() {
            tracing::warn!("reddit credentials not configured; crawler will return empty results");
        }
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), CrawlError> {
        self.initialized.store(false, Ordering::SeqCst);
        *self.token.lock().await = None;
        Ok(())
    }

    async fn search(
        &self,
        keywords: &[String],
        subreddits: Option<&[String]>,
        limit: u32,
    ) -> Result<CrawlResult, CrawlError> {
        if !self.has_credentials() {
            return Ok(CrawlResult {
                platform: "reddit".to_string(),
                errors: vec!["reddit credentials not configured".to_string()],
                ..Default::default()
            });
        }

        let start = Instant::now();
        let query = keywords
            .iter()
            .map(|k| format!("\"{k}\""))
            .collect::<Vec<_>>()
            .join(" OR ");
        let query = urlencoding_simple(&query);

        let mut posts = Vec::new();
        let mut errors = Vec::new();
        let mut rate_limited = false;

        let subs: Vec<String> = subreddits.map(|s| s.to_vec()).unwrap_or_default();
        let paths = if subs.is_empty() {
            vec![format!("/search.json?q={query}&limit={limit}&sort=relevance")]
        } else {
            subs.iter()
                .map(|sr| {
                    format!(
                        "/r/{sr}/search.json?q={query}&restrict_sr=1&limit={limit}&sort=relevance"
                    )
                })
                .collect()
        };

        for path in paths {
            match self.fetch_listing(&path).await {
                Ok(listing) => {
                    for child in listing.data.children {
                        let matched =
                            matching_keywords(&format!("{} {}", child.data.title.clone().unwrap_or_default(), child.data.selftext.clone().unwrap_or_default()), keywords);
                        if matched.is_empty() {
                            continue;
                        }
                        posts.push(parse_submission(child.data, matched));
                    }
                }
                Err(CrawlError::RateLimited { .. }) => {
                    rate_limited = true;
                    errors.push(format!("rate limited on {path}"));
                }
                Err(e) => errors.push(e.to_string()),
            }
        }

        posts.truncate(limit as usize);

        Ok(CrawlResult {
            platform: "reddit".to_string(),
            total_found: posts.len() as u32,
            posts,
            crawl_time_seconds: start.elapsed().as_secs_f64(),
            errors,
            rate_limited,
            next_cursor: None,
        })
    }

    async fn get_recent(&self, sources: &[String], limit: u32) -> Result<CrawlResult, CrawlError> {
        if !self.has_credentials() {
            return Ok(CrawlResult {
                platform: "reddit".to_string(),
                errors: vec!["reddit credentials not configured".to_string()],
                ..Default::default()
            });
        }

        let start = Instant::now();
        let mut posts = Vec::new();
        let mut errors = Vec::new();
        let mut rate_limited = false;

        for subreddit in sources {
            let path = format!("/r/{subreddit}/new.json?limit={limit}");
            match self.fetch_listing(&path).await {
                Ok(listing) => {
                    for child in listing.data.children {
                        posts.push(parse_submission(child.data, Vec::new()));
                    }
                }
                Err(CrawlError::RateLimited { .. }) => {
                    rate_limited = true;
                    errors.push(format!("rate limited on r/{subreddit}"));
                }
                Err(e) => errors.push(e.to_string()),
            }
        }

        Ok(CrawlResult {
            platform: "reddit".to_string(),
            total_found: posts.len() as u32,
            posts,
            crawl_time_seconds: start.elapsed().as_secs_f64(),
            errors,
            rate_limited,
            next_cursor: None,
        })
    }

    async fn health_check(&self) -> CrawlHealth {
        CrawlHealth {
            platform: "reddit".to_string(),
            initialized: self.initialized.load(Ordering::SeqCst),
            status: if self.has_credentials() {
                "ready".to_string()
            } else {
                "missing_credentials".to_string()
            },
        }
    }
}

fn parse_submission(data: RedditPostData, keywords_matched: Vec<String>) -> CrawledPost {
    let content = match &data.selftext {
        Some(text) if !text.is_empty() => {
            format!("{}\n\n{}", data.title.clone().unwrap_or_default(), text)
        }
        _ => data.title.clone().unwrap_or_default(),
    };

    let content_type = if data.is_self.unwrap_or(true) {
        ContentType::Post
    } else {
        ContentType::Thread
    };

    let mut platform_metadata = std::collections::HashMap::new();
    platform_metadata.insert(
        "subreddit".to_string(),
        serde_json::Value::String(data.subreddit.clone().unwrap_or_default()),
    );
    platform_metadata.insert(
        "over_18".to_string(),
        serde_json::Value::Bool(data.over_18.unwrap_or(false)),
    );
    platform_metadata.insert(
        "stickied".to_string(),
        serde_json::Value::Bool(data.stickied.unwrap_or(false)),
    );
    platform_metadata.insert(
        "locked".to_string(),
        serde_json::Value::Bool(data.locked.unwrap_or(false)),
    );

    let mut engagement_metrics = std::collections::HashMap::new();
    engagement_metrics.insert("upvotes".to_string(), data.score.unwrap_or(0));
    engagement_metrics.insert(
        "upvote_ratio".to_string(),
        (data.upvote_ratio.unwrap_or(0.0) * 100.0) as i64,
    );
    engagement_metrics.insert("num_comments".to_string(), data.num_comments.unwrap_or(0));

    let external_created_at: Option<DateTime<Utc>> =
        Utc.timestamp_opt(data.created_utc as i64, 0).single();

    CrawledPost {
        external_id: format!("reddit_{}", data.id),
        external_url: format!("https://reddit.com{}", data.permalink),
        content,
        content_type,
        author_handle: data.author.clone(),
        author_display_name: data.author,
        platform_metadata,
        external_created_at,
        crawled_at: Utc::now(),
        platform: "reddit".to_string(),
        keywords_matched,
        engagement_metrics,
        parent_id: None,
    }
}

/// Minimal percent-encoding for search query strings (no external crate
/// dependency needed for the handful of characters Reddit's API cares about).
fn urlencoding_simple(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct RedditListing {
    data: RedditListingData,
}

#[derive(Deserialize)]
struct RedditListingData {
    children: Vec<RedditChild>,
}

#[derive(Deserialize)]
struct RedditChild {
    data: RedditPostData,
}

#[derive(Deserialize)]
struct RedditPostData {
    id: String,
    title: Option<String>,
    selftext: Option<String>,
    permalink: String,
    author: Option<String>,
    subreddit: Option<String>,
    created_utc: f64,
    score: Option<i64>,
    upvote_ratio: Option<f64>,
    num_comments: Option<i64>,
    is_self: Option<bool>,
    over_18: Option<bool>,
    stickied: Option<bool>,
    locked: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urlencoding_preserves_alnum_and_escapes_rest() {
        assert_eq!(urlencoding_simple("a b"), "a%20b");
        assert_eq!(urlencoding_simple("\"x\""), "%22x%22");
        assert_eq!(urlencoding_simple("abc-123_.~"), "abc-123_.~");
    }

    #[test]
    fn parse_submission_builds_self_post_content() {
        let data = RedditPostData {
            id: "abc123".to_string(),
            title: Some("Need advice".to_string()),
            selftext: Some("Longer body text".to_string()),
            permalink: "/r/test/comments/abc123/need_advice/".to_string(),
            author: Some("someuser".to_string()),
            subreddit: Some("test".to_string()),
            created_utc: 1_700_000_000.0,
            score: Some(42),
            upvote_ratio: Some(0.95),
            num_comments: Some(3),
            is_self: Some(true),
            over_18: Some(false),
            stickied: Some(false),
            locked: Some(false),
        };
        let post = parse_submission(data, vec!["advice".to_string()]);
        assert_eq!(post.external_id, "reddit_abc123");
        assert!(post.content.contains("Need advice"));
        assert!(post.content.contains("Longer body text"));
        assert_eq!(post.content_type, ContentType::Post);
        assert_eq!(post.engagement_metrics["upvotes"], 42);
        assert_eq!(post.engagement_metrics["upvote_ratio"], 95);
    }

    #[tokio::test]
    async fn search_without_credentials_returns_error_not_failure() {
        let crawler = RedditCrawler::new(String::new(), String::new(), "test-agent".to_string());
        let result = crawler
            .search(&["budget".to_string()], None, 10)
            .await
            .unwrap();
        assert!(result.posts.is_empty());
        assert_eq!(result.errors.len(), 1);
    }

    #[tokio::test]
    async fn health_check_reports_missing_credentials() {
        let crawler = RedditCrawler::new(String::new(), String::new(), "test-agent".to_string());
        crawler.initialize().await.unwrap();
        let health = crawler.health_check().await;
        assert_eq!(health.status, "missing_credentials");
        assert!(health.initialized);
    }
}
