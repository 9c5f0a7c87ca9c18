//! Shared data model flowing between the crawler, pipeline, and posting layers.
//!
//! These types cross module boundaries by value (arena-free ownership): a
//! `CrawledPost` or `QueueItem` moves from producer to consumer rather than
//! living behind a shared handle. Cross-component references use opaque
//! string ids that are resolved through the storage layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The platform a post/response originated from or targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Reddit,
    Twitter,
    Quora,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Reddit => "reddit",
            Platform::Twitter => "twitter",
            Platform::Quora => "quora",
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reddit" => Ok(Platform::Reddit),
            "twitter" | "x" => Ok(Platform::Twitter),
            "quora" => Ok(Platform::Quora),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed enum of content shapes a crawler can discover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Post,
    Comment,
    Reply,
    Thread,
    Question,
    Answer,
    Tweet,
    Retweet,
    SearchResult,
}

/// Discovered content, normalized from a platform-native shape.
///
/// Created by a `Crawler`, deduped on `external_url` by the crawl
/// processor, and immutable once persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawledPost {
    pub external_id: String,
    pub external_url: String,
    pub content: String,
    pub content_type: ContentType,
    pub author_handle: Option<String>,
    pub author_display_name: Option<String>,
    #[serde(default)]
    pub platform_metadata: HashMap<String, serde_json::Value>,
    pub external_created_at: Option<DateTime<Utc>>,
    pub crawled_at: DateTime<Utc>,
    pub platform: String,
    #[serde(default)]
    pub keywords_matched: Vec<String>,
    #[serde(default)]
    pub engagement_metrics: HashMap<String, i64>,
    pub parent_id: Option<String>,
}

/// Outcome of one crawl call. Partial success is allowed: `errors` may be
/// non-empty while `posts` still carries results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlResult {
    pub platform: String,
    #[serde(default)]
    pub posts: Vec<CrawledPost>,
    #[serde(default)]
    pub total_found: u32,
    #[serde(default)]
    pub crawl_time_seconds: f64,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub rate_limited: bool,
    pub next_cursor: Option<String>,
}

/// Closed vocabulary of problem categories signal detection can assign.
pub const PROBLEM_CATEGORIES: &[&str] = &[
    "relationship_communication",
    "relationship_trust",
    "relationship_boundaries",
    "family_conflict",
    "family_dynamics",
    "workplace_conflict",
    "workplace_career",
    "workplace_management",
    "financial_stress",
    "financial_planning",
    "mental_health_anxiety",
    "mental_health_depression",
    "mental_health_stress",
    "social_isolation",
    "social_confidence",
    "parenting_discipline",
    "parenting_development",
    "health_chronic",
    "health_lifestyle",
    "personal_growth",
    "decision_making",
    "other",
];

/// Stage-1 pipeline output: the problem a post describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub problem_category: String,
    pub emotional_intensity: f64,
    pub keywords: Vec<String>,
    pub confidence: f64,
}

/// Closed risk classification. `Blocked` is only ever set by the crisis
/// detector short-circuit, never derived from an LLM score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Blocked,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage-2 pipeline output. Invariant: `risk_level == Blocked` implies
/// `risk_score == 1.0` and a crisis pattern was matched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Risk {
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub risk_factors: Vec<String>,
    pub context_flags: Vec<String>,
    pub recommended_action: String,
}

/// Which of the three generated variants was selected, chosen solely by
/// the incoming risk level (high -> value_first, medium -> soft_cta,
/// low -> contextual).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    ValueFirst,
    SoftCta,
    Contextual,
}

/// Stage-3 pipeline output: three parallel drafts plus the selected one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Responses {
    pub value_first_response: String,
    pub soft_cta_response: String,
    pub contextual_response: String,
    pub selected_response: String,
    pub selected_type: ResponseType,
}

impl Responses {
    /// Pick the variant and type for a given (non-blocked) risk level.
    pub fn select_for_risk(
        risk_level: RiskLevel,
        value_first: String,
        soft_cta: String,
        contextual: String,
    ) -> Self {
        let (selected, selected_type) = match risk_level {
            RiskLevel::High => (value_first.clone(), ResponseType::ValueFirst),
            RiskLevel::Medium => (soft_cta.clone(), ResponseType::SoftCta),
            RiskLevel::Low | RiskLevel::Blocked => (contextual.clone(), ResponseType::Contextual),
        };
        Self {
            value_first_response: value_first,
            soft_cta_response: soft_cta,
            contextual_response: contextual,
            selected_response: selected,
            selected_type,
        }
    }
}

/// Closed CTA enum, bijective with `cta_level` {0:none, 1:soft, 2:medium, 3:direct}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CtaType {
    None,
    Soft,
    Medium,
    Direct,
}

impl CtaType {
    pub fn from_level(level: i32) -> Self {
        match level {
            0 => CtaType::None,
            1 => CtaType::Soft,
            2 => CtaType::Medium,
            _ => CtaType::Direct,
        }
    }

    pub fn level(self) -> i32 {
        match self {
            CtaType::None => 0,
            CtaType::Soft => 1,
            CtaType::Medium => 2,
            CtaType::Direct => 3,
        }
    }
}

/// Stage-4 pipeline output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cta {
    pub cta_level: i32,
    pub cta_type: CtaType,
}

/// Breakdown of the three weighted components summing to `cts_score`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CtsBreakdown {
    pub signal_component: f64,
    pub risk_component: f64,
    pub cta_component: f64,
}

/// Stage-5 pipeline output: the commitment-to-send decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cts {
    pub cts_score: f64,
    pub can_auto_post: bool,
    pub auto_post_reason: String,
    pub breakdown: CtsBreakdown,
    pub decision_factors: Vec<String>,
    pub recommended_action: String,
}

/// Status of a posting-queue item. Completed/failed/cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueItemStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    RetryPending,
    Cancelled,
    RateLimited,
}

/// Outcome of one attempt to post a response to a platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostResult {
    pub success: bool,
    pub external_id: Option<String>,
    pub external_url: Option<String>,
    pub error: Option<String>,
    pub error_code: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub retryable: bool,
    #[serde(default)]
    pub platform: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}
fn default_method() -> String {
    "api".to_string()
}

/// A priority posting-queue entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: uuid::Uuid,
    pub response_id: String,
    pub organization_id: String,
    pub platform: String,
    pub target_url: String,
    pub response_text: String,
    pub priority: i32,
    pub status: QueueItemStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub result: Option<PostResult>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Per-platform posting-etiquette limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformLimits {
    pub posts_per_hour: u32,
    pub posts_per_day: u32,
    pub min_gap_seconds: u64,
    pub subreddit_gap_seconds: u64,
    pub enabled: bool,
}

/// Per-organization posting policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgLimits {
    pub organization_id: String,
    pub max_daily_auto_posts: u32,
    pub max_hourly_auto_posts: u32,
    pub min_cts_score: f64,
    pub max_cta_level: i32,
    pub allowed_risk_levels: Vec<RiskLevel>,
    pub platform_limits: HashMap<String, PlatformLimits>,
    pub auto_post_enabled: bool,
    pub blacklisted_subreddits: Vec<String>,
}

/// Tenant context fed into response generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantContext {
    pub app_name: String,
    pub value_prop: String,
    #[serde(default)]
    pub target_audience: String,
    #[serde(default)]
    pub key_benefits: Vec<String>,
    #[serde(default)]
    pub website_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cta_level_bijection() {
        for level in 0..=3 {
            assert_eq!(CtaType::from_level(level).level(), level);
        }
    }

    #[test]
    fn cta_above_range_saturates_to_direct() {
        assert_eq!(CtaType::from_level(7), CtaType::Direct);
    }

    #[test]
    fn platform_roundtrips_through_str() {
        use std::str::FromStr;
        assert_eq!(Platform::from_str("Reddit").unwrap(), Platform::Reddit);
        assert_eq!(Platform::Twitter.as_str(), "twitter");
    }

    #[test]
    fn responses_select_by_risk_level() {
        let r = Responses::select_for_risk(
            RiskLevel::High,
            "vf".into(),
            "sc".into(),
            "ctx".into(),
        );
        assert_eq!(r.selected_type, ResponseType::ValueFirst);
        assert_eq!(r.selected_response, "vf");

        let r = Responses::select_for_risk(
            RiskLevel::Medium,
            "vf".into(),
            "sc".into(),
            "ctx".into(),
        );
        assert_eq!(r.selected_type, ResponseType::SoftCta);

        let r = Responses::select_for_risk(
            RiskLevel::Low,
            "vf".into(),
            "sc".into(),
            "ctx".into(),
        );
        assert_eq!(r.selected_type, ResponseType::Contextual);
    }
}
