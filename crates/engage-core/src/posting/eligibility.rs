//! Auto-post eligibility gate (§4.7): the last check before a generated
//! response is queued for unattended posting.
//!
//! Distinct from [`super::org_limits::RateLimitManager`]: that module asks
//! "is it safe to post *something* right now"; this module asks "is *this
//! specific response* good enough to post without a human looking at it
//! first". A response can pass every rate limit and still fail here on
//! content grounds, or vice versa.

use super::org_limits::RateLimitManager;
use crate::model::{OrgLimits, RiskLevel};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One response under eligibility review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseData {
    pub response_id: String,
    pub cts_score: f64,
    pub risk_level: RiskLevel,
    pub cta_level: i32,
    pub platform: String,
    pub can_auto_post: bool,
    pub status: String,
    pub target_url: String,
    pub subreddit: Option<String>,
}

impl ResponseData {
    pub fn new(response_id: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            response_id: response_id.into(),
            cts_score: 0.0,
            risk_level: RiskLevel::Low,
            cta_level: 0,
            platform: platform.into(),
            can_auto_post: true,
            status: "pending".to_string(),
            target_url: String::new(),
            subreddit: None,
        }
    }
}

/// Outcome of running [`AutoPostEligibility::check`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct EligibilityResult {
    pub eligible: bool,
    pub reason: String,
    pub checks_passed: Vec<String>,
    pub checks_failed: Vec<String>,
    pub requires_review: bool,
    pub suggested_action: String,
    /// Side-channel detail for callers -- currently only `retry_after_seconds`,
    /// populated when `rate_limits` is the sole failing check (§4.9).
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Evaluates whether a response may be auto-posted without human review.
pub struct AutoPostEligibility<'a> {
    rate_limits: &'a RateLimitManager,
}

impl<'a> AutoPostEligibility<'a> {
    pub fn new(rate_limits: &'a RateLimitManager) -> Self {
        Self { rate_limits }
    }

    /// Run every eligibility check against `response` under `limits`.
    ///
    /// Checks 1 (`org_auto_post_enabled`) and 2 (`response_status`) are
    /// gating preconditions and return immediately on failure -- there's no
    /// point scoring content quality for a response that's already been
    /// rejected or for an organization that never wanted auto-posting.
    /// Checks 3 through 8 are independent content/pacing criteria and all
    /// run regardless of earlier failures, so the result reports every
    /// reason a response fell short, not just the first.
    pub async fn check(&self, response: &ResponseData, limits: &OrgLimits) -> EligibilityResult {
        let mut result = EligibilityResult::default();

        if !limits.auto_post_enabled {
            result.reason = "auto-posting is disabled for this organization".to_string();
            result.checks_failed.push("org_auto_post_enabled".to_string());
            result.suggested_action = "queue for manual review".to_string();
            return result;
        }
        result.checks_passed.push("org_auto_post_enabled".to_string());

        if response.status != "pending" && response.status != "approved" {
            result.reason = format!("response status '{}' is not postable", response.status);
            result.checks_failed.push("response_status".to_string());
            result.suggested_action = "skip".to_string();
            return result;
        }
        result.checks_passed.push("response_status".to_string());

        let mut reasons = Vec::new();

        if response.can_auto_post {
            result.checks_passed.push("pipeline_can_auto_post".to_string());
        } else {
            result.checks_failed.push("pipeline_can_auto_post".to_string());
            reasons.push("pipeline marked this response as not auto-postable".to_string());
        }

        if response.cts_score >= limits.min_cts_score {
            result.checks_passed.push("cts_score".to_string());
        } else {
            result.checks_failed.push("cts_score".to_string());
            reasons.push(format!(
                "cts score {:.2} below minimum {:.2}",
                response.cts_score, limits.min_cts_score
            ));
        }

        if limits.allowed_risk_levels.contains(&response.risk_level) {
            result.checks_passed.push("risk_level".to_string());
        } else {
            result.checks_failed.push("risk_level".to_string());
            reasons.push(format!("risk level {} is not in the allowed set", response.risk_level));
        }

        if response.cta_level <= limits.max_cta_level {
            result.checks_passed.push("cta_level".to_string());
        } else {
            result.checks_failed.push("cta_level".to_string());
            reasons.push(format!(
                "cta level {} exceeds maximum {}",
                response.cta_level, limits.max_cta_level
            ));
        }

        let subreddit = response.subreddit.as_deref();
        match self
            .rate_limits
            .check_limits(&limits.organization_id, &response.platform, subreddit)
            .await
        {
            Ok(()) => result.checks_passed.push("rate_limits".to_string()),
            Err(denial) => {
                result.checks_failed.push("rate_limits".to_string());
                reasons.push(denial.reason().to_string());
            }
        }

        if let Some(subreddit) = subreddit {
            if limits
                .blacklisted_subreddits
                .iter()
                .any(|b| b.eq_ignore_ascii_case(subreddit))
            {
                result.checks_failed.push("subreddit_blacklist".to_string());
                reasons.push(format!("r/{subreddit} is blacklisted"));
            } else {
                result.checks_passed.push("subreddit_blacklist".to_string());
            }
        } else {
            result.checks_passed.push("subreddit_blacklist".to_string());
        }

        result.eligible = result.checks_failed.is_empty();
        result.requires_review = ["cts_score", "cta_level", "pipeline_can_auto_post"]
            .iter()
            .any(|c| result.checks_failed.iter().any(|f| f == c));

        if result.checks_failed == ["rate_limits"] {
            let wait = self
                .rate_limits
                .get_time_until_allowed(&limits.organization_id, &response.platform, subreddit)
                .await;
            result
                .metadata
                .insert("retry_after_seconds".to_string(), serde_json::json!(wait));
        }

        result.reason = if reasons.is_empty() {
            "all checks passed".to_string()
        } else {
            reasons.join("; ")
        };
        result.suggested_action = if result.eligible {
            "auto_post".to_string()
        } else if result.requires_review {
            "queue for manual review".to_string()
        } else {
            "retry later".to_string()
        };

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posting::org_limits::default_org_limits;

    fn eligible_response() -> ResponseData {
        ResponseData {
            response_id: "r1".to_string(),
            cts_score: 0.9,
            risk_level: RiskLevel::Low,
            cta_level: 0,
            platform: "reddit".to_string(),
            can_auto_post: true,
            status: "pending".to_string(),
            target_url: "https://reddit.com/r/rust/x".to_string(),
            subreddit: Some("rust".to_string()),
        }
    }

    #[tokio::test]
    async fn fully_eligible_response_is_approved() {
        let rl = RateLimitManager::new();
        let limits = default_org_limits("org1");
        let checker = AutoPostEligibility::new(&rl);

        let result = checker.check(&eligible_response(), &limits).await;
        assert!(result.eligible);
        assert!(!result.requires_review);
        assert_eq!(result.suggested_action, "auto_post");
    }

    #[tokio::test]
    async fn org_disabled_short_circuits_without_content_checks() {
        let rl = RateLimitManager::new();
        let mut limits = default_org_limits("org1");
        limits.auto_post_enabled = false;
        let checker = AutoPostEligibility::new(&rl);

        let result = checker.check(&eligible_response(), &limits).await;
        assert!(!result.eligible);
        assert_eq!(result.checks_failed, vec!["org_auto_post_enabled".to_string()]);
        assert!(result.checks_passed.is_empty());
    }

    #[tokio::test]
    async fn rejected_status_short_circuits() {
        let rl = RateLimitManager::new();
        let limits = default_org_limits("org1");
        let checker = AutoPostEligibility::new(&rl);
        let mut response = eligible_response();
        response.status = "rejected".to_string();

        let result = checker.check(&response, &limits).await;
        assert!(!result.eligible);
        assert_eq!(result.checks_failed, vec!["response_status".to_string()]);
    }

    #[tokio::test]
    async fn low_cts_score_requires_review_but_accumulates_other_checks() {
        let rl = RateLimitManager::new();
        let limits = default_org_limits("org1");
        let checker = AutoPostEligibility::new(&rl);
        let mut response = eligible_response();
        response.cts_score = 0.1;

        let result = checker.check(&response, &limits).await;
        assert!(!result.eligible);
        assert!(result.requires_review);
        assert!(result.checks_failed.contains(&"cts_score".to_string()));
        // Other independent checks still ran and passed.
        assert!(result.checks_passed.contains(&"risk_level".to_string()));
    }

    #[tokio::test]
    async fn high_risk_level_fails_without_requiring_review() {
        let rl = RateLimitManager::new();
        let limits = default_org_limits("org1");
        let checker = AutoPostEligibility::new(&rl);
        let mut response = eligible_response();
        response.risk_level = RiskLevel::High;

        let result = checker.check(&response, &limits).await;
        assert!(!result.eligible);
        assert!(!result.requires_review);
        assert_eq!(result.suggested_action, "retry later");
    }

    #[tokio::test]
    async fn blacklisted_subreddit_fails_independently_of_other_checks() {
        let rl = RateLimitManager::new();
        let mut limits = default_org_limits("org1");
        limits.blacklisted_subreddits = vec!["rust".to_string()];
        let checker = AutoPostEligibility::new(&rl);

        let result = checker.check(&eligible_response(), &limits).await;
        assert!(!result.eligible);
        assert!(result.checks_failed.contains(&"subreddit_blacklist".to_string()));
    }

    #[tokio::test]
    async fn rate_limit_failure_alone_populates_retry_after_seconds() {
        let rl = RateLimitManager::new();
        rl.record_post("org1", "reddit", "rust").await;
        let limits = default_org_limits("org1");
        let checker = AutoPostEligibility::new(&rl);

        let result = checker.check(&eligible_response(), &limits).await;
        assert!(!result.eligible);
        assert_eq!(result.checks_failed, vec!["rate_limits".to_string()]);
        assert!(!result.requires_review);
        assert_eq!(result.suggested_action, "retry later");
        let retry_after = result
            .metadata
            .get("retry_after_seconds")
            .and_then(|v| v.as_u64())
            .expect("retry_after_seconds present");
        assert!(retry_after > 0);
    }

    #[tokio::test]
    async fn excessive_cta_level_requires_review() {
        let rl = RateLimitManager::new();
        let limits = default_org_limits("org1");
        let checker = AutoPostEligibility::new(&rl);
        let mut response = eligible_response();
        response.cta_level = 3;

        let result = checker.check(&response, &limits).await;
        assert!(!result.eligible);
        assert!(result.requires_review);
    }
}
