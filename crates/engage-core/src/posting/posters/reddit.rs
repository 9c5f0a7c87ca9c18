//! Reddit poster: submits an auto-post's response as a comment reply via
//! Reddit's OAuth API (§4.8).
//!
//! Posting needs write scope, unlike [`crate::crawl::reddit`]'s read-only
//! app-only token, so this adapter performs the password grant (Reddit's
//! "script" app type) when a username/password pair is configured; without
//! one it stays read-only and every `post()` call fails with
//! `MissingCredentials`.

use crate::error::PostError;
use crate::model::PostResult;
use crate::posting::delay;
use crate::posting::PlatformPoster;
use crate::ratelimit::{RateLimiter, RateLimiterConfig};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";

/// Subreddits where unsolicited self-promotion or bot replies are reliably
/// removed; auto-posting here is refused outright rather than attempted
/// and silently filtered by moderators.
const STRICT_SELFPROMO_SUBREDDITS: &[&str] = &[
    "askreddit",
    "askscience",
    "iama",
    "science",
    "news",
    "worldnews",
    "politics",
    "todayilearned",
    "explainlikeimfive",
    "askhistorians",
    "legaladvice",
    "personalfinance",
    "relationships",
    "relationship_advice",
    "advice",
    "askdocs",
    "medical_advice",
    "nostupidquestions",
    "outoftheloop",
    "changemyview",
];

pub fn is_subreddit_blocked(subreddit: &str) -> bool {
    STRICT_SELFPROMO_SUBREDDITS
        .iter()
        .any(|s| s.eq_ignore_ascii_case(subreddit))
}

/// Pieces extracted from a reddit.com URL: subreddit, submission id, and an
/// optional comment id when the URL points at a specific comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedditUrlParts {
    pub subreddit: Option<String>,
    pub post_id: Option<String>,
    pub comment_id: Option<String>,
}

pub fn parse_reddit_url(url: &str) -> RedditUrlParts {
    let subreddit = extract_between(url, "/r/", "/").map(|s| s.to_string());
    let post_id = extract_between(url, "/comments/", "/").map(|s| s.to_string());

    let comment_id = post_id.as_ref().and_then(|pid| {
        let marker = format!("/comments/{pid}/");
        url.find(&marker).and_then(|idx| {
            let rest = &url[idx + marker.len()..];
            let rest = rest.trim_start_matches(|c: char| c != '/').trim_start_matches('/');
            extract_segment(rest)
        })
    });

    RedditUrlParts {
        subreddit,
        post_id,
        comment_id,
    }
}

fn extract_between<'a>(s: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let idx = s.find(start)? + start.len();
    let rest = &s[idx..];
    let end_idx = rest.find(end).unwrap_or(rest.len());
    let candidate = &rest[..end_idx];
    if candidate.is_empty() {
        None
    } else {
        Some(candidate)
    }
}

fn extract_segment(s: &str) -> Option<&str> {
    let end = s.find('/').unwrap_or(s.len());
    let candidate = &s[..end];
    if candidate.is_empty() {
        None
    } else {
        Some(candidate)
    }
}

struct RedditToken {
    access_token: String,
    expires_at: Instant,
}

/// Posts generated replies to Reddit via the OAuth comment-submission API.
pub struct RedditPoster {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    username: Option<String>,
    password: Option<String>,
    user_agent: String,
    rate_limiter: Arc<RateLimiter>,
    token: Mutex<Option<RedditToken>>,
}

impl RedditPoster {
    pub fn new(
        client_id: String,
        client_secret: String,
        username: Option<String>,
        password: Option<String>,
        user_agent: String,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id,
            client_secret,
            username,
            password,
            user_agent,
            rate_limiter: Arc::new(RateLimiter::new("reddit-post", RateLimiterConfig::reddit_oauth())),
            token: Mutex::new(None),
        }
    }

    fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    async fn access_token(&self) -> Result<String, PostError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.expires_at > Instant::now() + std::time::Duration::from_secs(10) {
                return Ok(token.access_token.clone());
            }
        }

        let mut form = vec![("grant_type".to_string(), "password".to_string())];
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            form.push(("username".to_string(), username.clone()));
            form.push(("password".to_string(), password.clone()));
        } else {
            // No write-capable credentials: fall back to an app-only token,
            // which will be rejected by the submission endpoint with a clear
            // auth error rather than silently reading instead of posting.
            form = vec![("grant_type".to_string(), "client_credentials".to_string())];
        }

        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header("User-Agent", &self.user_agent)
            .form(&form)
            .send()
            .await
            .map_err(|e| PostError::Transient(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PostError::AuthFailed);
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| PostError::Transient(format!("invalid token response: {e}")))?;

        let access_token = body.access_token.clone();
        *guard = Some(RedditToken {
            access_token: body.access_token,
            expires_at: Instant::now() + std::time::Duration::from_secs(body.expires_in),
        });
        Ok(access_token)
    }

    fn classify_api_error(status: u16, body: &str) -> PostError {
        let lower = body.to_lowercase();
        if status == 429 || lower.contains("ratelimit") {
            let wait_seconds = extract_wait_seconds(&lower);
            return PostError::RateLimit { wait_seconds };
        }
        if lower.contains("deleted") {
            return PostError::DeletedContent;
        }
        if lower.contains("thread_locked") || lower.contains("locked") {
            return PostError::ThreadLocked;
        }
        if lower.contains("user_required") || status == 401 || status == 403 {
            return PostError::AuthFailed;
        }
        PostError::Transient(format!("reddit api error {status}: {body}"))
    }
}

/// Parses Reddit's "you are doing that too much. try again in 9 minutes" /
/// "...in 30 seconds" style rate-limit messages.
fn extract_wait_seconds(lower_message: &str) -> Option<u64> {
    let digits: String = lower_message
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let amount: u64 = digits.parse().ok()?;
    if lower_message.contains("minute") {
        Some(amount * 60)
    } else if lower_message.contains("second") {
        Some(amount)
    } else {
        None
    }
}

#[async_trait]
impl PlatformPoster for RedditPoster {
    fn platform(&self) -> &str {
        "reddit"
    }

    async fn initialize(&self) -> Result<(), PostError> {
        if !self.has_credentials() {
            return Err(PostError::MissingCredentials);
        }
        if self.username.is_none() || self.password.is_none() {
            tracing::warn!("reddit poster has no write-capable credentials; posting will fail auth");
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), PostError> {
        *self.token.lock().await = None;
        Ok(())
    }

    async fn post(&self, response_text: &str, target_url: &str) -> PostResult {
        let parts = parse_reddit_url(target_url);
        if let Some(subreddit) = &parts.subreddit {
            if is_subreddit_blocked(subreddit) {
                return PostResult {
                    success: false,
                    error: Some(format!("r/{subreddit} blocks auto-posted replies")),
                    error_code: Some("BLOCKED_SUBREDDIT".to_string()),
                    retryable: false,
                    platform: "reddit".to_string(),
                    ..Default::default()
                };
            }
        }

        let wait = delay::human_like_delay(response_text.len(), response_text.len(), true);
        let wait = delay::jitter(wait, 0.15);
        tokio::time::sleep(wait).await;

        self.rate_limiter.acquire().await;

        let token = match self.access_token().await {
            Ok(t) => t,
            Err(e) => {
                self.rate_limiter.record_failure().await;
                return post_error_result(e);
            }
        };

        let parent_fullname = match (&parts.comment_id, &parts.post_id) {
            (Some(cid), _) => format!("t1_{cid}"),
            (None, Some(pid)) => format!("t3_{pid}"),
            (None, None) => {
                return PostResult {
                    success: false,
                    error: Some("could not parse a reddit submission/comment id from target_url".to_string()),
                    error_code: Some("INVALID_TARGET".to_string()),
                    retryable: false,
                    platform: "reddit".to_string(),
                    ..Default::default()
                };
            }
        };

        let result = self
            .client
            .post(format!("{API_BASE}/api/comment"))
            .bearer_auth(token)
            .header("User-Agent", &self.user_agent)
            .form(&[
                ("thing_id", parent_fullname.as_str()),
                ("text", response_text),
                ("api_type", "json"),
            ])
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
        let body = response.text().await.unwrap_or_default();

        if status != 200 || body.contains("\"errors\":[[") && !body.contains("\"errors\":[]") {
            self.rate_limiter.record_failure().await;
            return post_error_result(Self::classify_api_error(status, &body));
        }

        self.rate_limiter.record_success().await;

        let external_id = extract_between(&body, "\"id\": \"", "\"")
            .or_else(|| extract_between(&body, "\"id\":\"", "\""))
            .map(|s| s.to_string());

        PostResult {
            success: true,
            external_id: external_id.clone(),
            external_url: Some(target_url.to_string()),
            posted_at: Some(chrono::Utc::now()),
            platform: "reddit".to_string(),
            method: "api".to_string(),
            ..Default::default()
        }
    }

    async fn verify_posted(&self, external_id: &str) -> bool {
        let token = match self.access_token().await {
            Ok(t) => t,
            Err(_) => return false,
        };
        self.rate_limiter.acquire().await;
        let result = self
            .client
            .get(format!("{API_BASE}/api/info?id=t1_{external_id}"))
            .bearer_auth(token)
            .header("User-Agent", &self.user_agent)
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
        platform: "reddit".to_string(),
        ..Default::default()
    }
}

fn error_code_for(error: &PostError) -> String {
    match error {
        PostError::RateLimit { .. } => "RATELIMIT".to_string(),
        PostError::DeletedContent => "DELETED_COMMENT".to_string(),
        PostError::ThreadLocked => "THREAD_LOCKED".to_string(),
        PostError::DuplicatePost => "DUPLICATE_POST".to_string(),
        PostError::MissingCredentials => "MISSING_CREDENTIALS".to_string(),
        PostError::AuthFailed => "AUTH_REQUIRED".to_string(),
        PostError::BlacklistedCommunity { .. } => "BLOCKED_SUBREDDIT".to_string(),
        PostError::Transient(_) => "API_ERROR".to_string(),
        PostError::WorkerError(_) => "WORKER_ERROR".to_string(),
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}
