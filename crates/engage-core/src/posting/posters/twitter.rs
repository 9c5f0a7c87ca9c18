//! Twitter/X poster: submits an auto-post's response as a reply via the
//! Twitter API v2 (§4.8).

use crate::error::PostError;
use crate::model::PostResult;
use crate::posting::delay;
use crate::posting::PlatformPoster;
use crate::ratelimit::{RateLimiter, RateLimiterConfig};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

const API_BASE: &str = "https://api.twitter.com/2";
const MAX_TWEET_LEN: usize = 280;

/// Extracts the tweet id from a status URL
/// (`https://twitter.com/<user>/status/<id>` or `/statuses/<id>`).
pub fn parse_twitter_url(url: &str) -> Option<String> {
    let marker = url.find("/status")?;
    let rest = &url[marker..];
    let digits_start = rest.find(|c: char| c.is_ascii_digit())?;
    let digits: String = rest[digits_start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

fn truncate_to_tweet_length(text: &str) -> String {
    if text.chars().count() <= MAX_TWEET_LEN {
        return text.to_string();
    }
    let truncated: String = text.chars().take(MAX_TWEET_LEN - 3).collect();
    format!("{truncated}...")
}

/// Posts generated replies to Twitter/X via the v2 `POST /tweets` endpoint.
pub struct TwitterPoster {
    client: reqwest::Client,
    bearer_token: String,
    rate_limiter: Arc<RateLimiter>,
}

impl TwitterPoster {
    pub fn new(bearer_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            bearer_token,
            rate_limiter: Arc::new(RateLimiter::new("twitter-post", RateLimiterConfig::twitter_free_tier())),
        }
    }

    fn has_credentials(&self) -> bool {
        !self.bearer_token.is_empty()
    }

    fn classify_status(status: u16, body: &str) -> PostError {
        match status {
            401 => PostError::AuthFailed,
            403 => {
                if body.to_lowercase().contains("duplicate") {
                    PostError::DuplicatePost
                } else {
                    PostError::AuthFailed
                }
            }
            429 => PostError::RateLimit { wait_seconds: None },
            s if s >= 500 => PostError::Transient(format!("twitter api error {s}: {body}")),
            s => PostError::Transient(format!("twitter api error {s}: {body}")),
        }
    }
}

#[async_trait]
impl PlatformPoster for TwitterPoster {
    fn platform(&self) -> &str {
        "twitter"
    }

    async fn initialize(&self) -> Result<(), PostError> {
        if !self.has_credentials() {
            return Err(PostError::MissingCredentials);
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), PostError> {
        Ok(())
    }

    async fn post(&self, response_text: &str, target_url: &str) -> PostResult {
        let Some(tweet_id) = parse_twitter_url(target_url) else {
            return PostResult {
                success: false,
                error: Some("could not parse a tweet id from target_url".to_string()),
                error_code: Some("INVALID_TARGET".to_string()),
                retryable: false,
                platform: "twitter".to_string(),
                ..Default::default()
            };
        };

        let text = truncate_to_tweet_length(response_text);
        let wait = delay::jitter(
            delay::human_like_delay(response_text.len(), text.len(), true),
            0.1,
        );
        tokio::time::sleep(wait).await;

        self.rate_limiter.acquire().await;

        let body = serde_json::json!({
            "text": text,
            "reply": { "in_reply_to_tweet_id": tweet_id },
        });

        let result = self
            .client
            .post(format!("{API_BASE}/tweets"))
            .bearer_auth(&self.bearer_token)
            .json(&body)
            .send()
            .await;

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                self.rate_limiter.record_failure().await;
                return post_error_result(PostError::Transient(e.to_string()));
            }
        };

        let status = response.status().as_u16();
        if status == 201 {
            let parsed: TweetResponse = match response.json().await {
                Ok(p) => p,
                Err(e) => {
                    self.rate_limiter.record_failure().await;
                    return post_error_result(PostError::Transient(format!(
                        "invalid tweet response: {e}"
                    )));
                }
            };
            self.rate_limiter.record_success().await;
            return PostResult {
                success: true,
                external_id: Some(parsed.data.id.clone()),
                external_url: Some(format!("https://twitter.com/i/status/{}", parsed.data.id)),
                posted_at: Some(chrono::Utc::now()),
                platform: "twitter".to_string(),
                method: "api".to_string(),
                ..Default::default()
            };
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let error_body = response.text().await.unwrap_or_default();

        if status == 429 {
            self.rate_limiter.record_rate_limit_hit().await;
            return post_error_result(PostError::RateLimit {
                wait_seconds: retry_after,
            });
        }

        self.rate_limiter.record_failure().await;
        post_error_result(Self::classify_status(status, &error_body))
    }

    async fn verify_posted(&self, external_id: &str) -> bool {
        self.rate_limiter.acquire().await;
        let result = self
            .client
            .get(format!("{API_BASE}/tweets/{external_id}"))
            .bearer_auth(&self.bearer_token)
            .send()
            .await;
        matches!(result, Ok(r) if r.status().is_success())
    }
}

fn post_error_result(error: PostError) -> PostResult {
    PostResult {
        success: false,
        error: Some(error.to_string()),
        error_code: Some(error_code_for(&error)),
        retryable: error.is_retryable(),
        metadata: error
            .wait_seconds()
            .map(|s| {
                let mut m = std::collections::HashMap::new();
                m.insert("wait_seconds".to_string(), serde_json::json!(s));
                m
            })
            .unwrap_or_default(),
        platform: "twitter".to_string(),
        ..Default::default()
    }
}

fn error_code_for(error: &PostError) -> String {
    match error {
        PostError::RateLimit { .. } => "RATELIMIT".to_string(),
        PostError::DuplicatePost => "DUPLICATE_TWEET".to_string(),
        PostError::AuthFailed => "AUTH_FAILED".to_string(),
        PostError::MissingCredentials => "MISSING_CREDENTIALS".to_string(),
        PostError::Transient(_) => "API_ERROR".to_string(),
        PostError::WorkerError(_) => "WORKER_ERROR".to_string(),
        _ => "API_ERROR".to_string(),
    }
}

#[derive(Deserialize)]
struct TweetResponse {
    data: TweetData,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_status_url() {
        assert_eq!(
            parse_twitter_url("https://twitter.com/someuser/status/123456789"),
            Some("123456789".to_string())
        );
    }

    #[test]
    fn parses_statuses_url() {
        assert_eq!(
            parse_twitter_url("https://x.com/someuser/statuses/987654321"),
            Some("987654321".to_string())
        );
    }

    #[test]
    fn rejects_non_status_url() {
        assert_eq!(parse_twitter_url("https://x.com/someuser"), None);
    }

    #[test]
    fn truncates_long_tweets() {
        let long = "a".repeat(300);
        let truncated = truncate_to_tweet_length(&long);
        assert_eq!(truncated.chars().count(), 280);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn leaves_short_tweets_untouched() {
        let short = "hello world";
        assert_eq!(truncate_to_tweet_length(short), short);
    }

    #[test]
    fn classify_status_duplicate_vs_forbidden() {
        assert!(matches!(
            TwitterPoster::classify_status(403, "duplicate content detected"),
            PostError::DuplicatePost
        ));
        assert!(matches!(
            TwitterPoster::classify_status(403, "not authorized"),
            PostError::AuthFailed
        ));
    }

    #[tokio::test]
    async fn initialize_without_bearer_token_fails() {
        let poster = TwitterPoster::new(String::new());
        let result = poster.initialize().await;
        assert!(matches!(result, Err(PostError::MissingCredentials)));
    }

    #[tokio::test]
    async fn post_with_unparseable_target_fails_without_network_call() {
        let poster = TwitterPoster::new("token".to_string());
        let result = poster.post("hello", "https://x.com/someuser").await;
        assert!(!result.success);
        assert_eq!(result.error_code, Some("INVALID_TARGET".to_string()));
        assert!(!result.retryable);
    }
}
