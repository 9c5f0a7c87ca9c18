//! Rate-limit bookkeeping and default posting policy (§4.7).
//!
//! [`RateLimitManager`] tracks recent post history in memory, per
//! organization, and answers "is it safe to post now" against an
//! [`OrgLimits`] policy. It holds no opinion on response quality -- that's
//! [`super::eligibility`]'s job -- only on pacing and blacklists.

use crate::model::{OrgLimits, PlatformLimits, RiskLevel};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// One recorded post, kept only long enough to prune hourly/daily windows.
#[derive(Debug, Clone)]
struct PostRecord {
    at: DateTime<Utc>,
    platform: String,
    target: String,
}

/// Why a post was denied, in priority order matching the check sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitDenial {
    AutoPostDisabled,
    PlatformDisabled,
    OrgHourlyExceeded,
    OrgDailyExceeded,
    PlatformHourlyExceeded,
    PlatformDailyExceeded,
    MinGapNotElapsed,
    SubredditGapNotElapsed,
    Blacklisted,
}

impl LimitDenial {
    pub fn reason(&self) -> &'static str {
        match self {
            LimitDenial::AutoPostDisabled => "auto-posting is disabled for this organization",
            LimitDenial::PlatformDisabled => "platform is disabled for this organization",
            LimitDenial::OrgHourlyExceeded => "organization hourly post limit reached",
            LimitDenial::OrgDailyExceeded => "organization daily post limit reached",
            LimitDenial::PlatformHourlyExceeded => "platform hourly post limit reached",
            LimitDenial::PlatformDailyExceeded => "platform daily post limit reached",
            LimitDenial::MinGapNotElapsed => "minimum gap since last post on this platform has not elapsed",
            LimitDenial::SubredditGapNotElapsed => "minimum gap since last post to this subreddit has not elapsed",
            LimitDenial::Blacklisted => "target community is blacklisted",
        }
    }
}

/// Per-organization/per-platform usage snapshot.
#[derive(Debug, Clone, Default)]
pub struct LimitStats {
    pub org_hourly_count: usize,
    pub org_daily_count: usize,
    pub org_hourly_remaining: i64,
    pub org_daily_remaining: i64,
    pub platform_hourly_count: HashMap<String, usize>,
    pub platform_daily_count: HashMap<String, usize>,
}

fn default_platform_limits() -> HashMap<String, PlatformLimits> {
    let mut m = HashMap::new();
    m.insert(
        "reddit".to_string(),
        PlatformLimits {
            posts_per_hour: 10,
            posts_per_day: 50,
            min_gap_seconds: 60,
            subreddit_gap_seconds: 300,
            enabled: true,
        },
    );
    m.insert(
        "twitter".to_string(),
        PlatformLimits {
            posts_per_hour: 15,
            posts_per_day: 100,
            min_gap_seconds: 30,
            subreddit_gap_seconds: 0,
            enabled: true,
        },
    );
    m
}

/// Default posting policy for an organization that hasn't set its own.
pub fn default_org_limits(organization_id: &str) -> OrgLimits {
    OrgLimits {
        organization_id: organization_id.to_string(),
        max_daily_auto_posts: 50,
        max_hourly_auto_posts: 10,
        min_cts_score: 0.7,
        max_cta_level: 1,
        allowed_risk_levels: vec![RiskLevel::Low],
        platform_limits: default_platform_limits(),
        auto_post_enabled: true,
        blacklisted_subreddits: Vec::new(),
    }
}

/// Tracks post history and enforces pacing/blacklist limits per organization.
pub struct RateLimitManager {
    history: Mutex<HashMap<String, Vec<PostRecord>>>,
    limits: Mutex<HashMap<String, OrgLimits>>,
}

impl RateLimitManager {
    pub fn new() -> Self {
        Self {
            history: Mutex::new(HashMap::new()),
            limits: Mutex::new(HashMap::new()),
        }
    }

    /// Install a policy override for an organization.
    pub async fn set_org_limits(&self, limits: OrgLimits) {
        let mut guard = self.limits.lock().await;
        guard.insert(limits.organization_id.clone(), limits);
    }

    /// Fetch an organization's policy, falling back to the default policy.
    pub async fn get_org_limits(&self, organization_id: &str) -> OrgLimits {
        let guard = self.limits.lock().await;
        guard
            .get(organization_id)
            .cloned()
            .unwrap_or_else(|| default_org_limits(organization_id))
    }

    /// Record a successful post for rate-limit accounting, pruning entries
    /// older than 24 hours.
    pub async fn record_post(&self, organization_id: &str, platform: &str, target: &str) {
        let now = Utc::now();
        let mut guard = self.history.lock().await;
        let entries = guard.entry(organization_id.to_string()).or_default();
        entries.push(PostRecord {
            at: now,
            platform: platform.to_string(),
            target: target.to_string(),
        });
        entries.retain(|r| now.signed_duration_since(r.at).num_hours() < 24);
    }

    /// Check whether a post to `platform`/`target` is allowed right now.
    /// Returns `Ok(())` if allowed, or the first check that denied it.
    ///
    /// Checks run in order and all but the blacklist check are "has a
    /// budget/gap been exhausted", so the first exhausted check wins; there
    /// is no point accumulating past the first denial here the way
    /// eligibility accumulates across independent criteria.
    pub async fn check_limits(
        &self,
        organization_id: &str,
        platform: &str,
        target: Option<&str>,
    ) -> Result<(), LimitDenial> {
        let limits = self.get_org_limits(organization_id).await;

        if !limits.auto_post_enabled {
            return Err(LimitDenial::AutoPostDisabled);
        }

        let platform_limits = limits.platform_limits.get(platform).cloned();
        let Some(platform_limits) = platform_limits else {
            return Err(LimitDenial::PlatformDisabled);
        };
        if !platform_limits.enabled {
            return Err(LimitDenial::PlatformDisabled);
        }

        let now = Utc::now();
        let guard = self.history.lock().await;
        let entries = guard.get(organization_id).cloned().unwrap_or_default();
        drop(guard);

        let hourly: Vec<&PostRecord> = entries
            .iter()
            .filter(|r| now.signed_duration_since(r.at).num_seconds() < 3600)
            .collect();
        let daily: Vec<&PostRecord> = entries
            .iter()
            .filter(|r| now.signed_duration_since(r.at).num_hours() < 24)
            .collect();

        if hourly.len() as u32 >= limits.max_hourly_auto_posts {
            return Err(LimitDenial::OrgHourlyExceeded);
        }
        if daily.len() as u32 >= limits.max_daily_auto_posts {
            return Err(LimitDenial::OrgDailyExceeded);
        }

        let platform_hourly = hourly.iter().filter(|r| r.platform == platform).count();
        let platform_daily = daily.iter().filter(|r| r.platform == platform).count();

        if platform_hourly as u32 >= platform_limits.posts_per_hour {
            return Err(LimitDenial::PlatformHourlyExceeded);
        }
        if platform_daily as u32 >= platform_limits.posts_per_day {
            return Err(LimitDenial::PlatformDailyExceeded);
        }

        if let Some(last) = entries.iter().filter(|r| r.platform == platform).map(|r| r.at).max() {
            let gap = now.signed_duration_since(last).num_seconds();
            if (gap as u64) < platform_limits.min_gap_seconds {
                return Err(LimitDenial::MinGapNotElapsed);
            }
        }

        if platform == "reddit" {
            if let Some(target) = target {
                if platform_limits.subreddit_gap_seconds > 0 {
                    if let Some(last) = entries
                        .iter()
                        .filter(|r| r.platform == platform && r.target.eq_ignore_ascii_case(target))
                        .map(|r| r.at)
                        .max()
                    {
                        let gap = now.signed_duration_since(last).num_seconds();
                        if (gap as u64) < platform_limits.subreddit_gap_seconds {
                            return Err(LimitDenial::SubredditGapNotElapsed);
                        }
                    }
                }

                if limits
                    .blacklisted_subreddits
                    .iter()
                    .any(|b| b.eq_ignore_ascii_case(target))
                {
                    return Err(LimitDenial::Blacklisted);
                }
            }
        }

        Ok(())
    }

    /// Seconds until `check_limits` would pass for this platform/target,
    /// given only the gap-based checks (budget exhaustion has no fixed
    /// expiry this function can compute, so it reports 0 for those and lets
    /// the caller re-check later).
    pub async fn get_time_until_allowed(
        &self,
        organization_id: &str,
        platform: &str,
        target: Option<&str>,
    ) -> u64 {
        let limits = self.get_org_limits(organization_id).await;
        let Some(platform_limits) = limits.platform_limits.get(platform) else {
            return 0;
        };

        let now = Utc::now();
        let guard = self.history.lock().await;
        let entries = guard.get(organization_id).cloned().unwrap_or_default();
        drop(guard);

        let mut candidates = vec![0i64];

        if let Some(last) = entries.iter().filter(|r| r.platform == platform).map(|r| r.at).max() {
            let elapsed = now.signed_duration_since(last).num_seconds();
            candidates.push(platform_limits.min_gap_seconds as i64 - elapsed);
        }

        if platform == "reddit" {
            if let Some(target) = target {
                if platform_limits.subreddit_gap_seconds > 0 {
                    if let Some(last) = entries
                        .iter()
                        .filter(|r| r.platform == platform && r.target.eq_ignore_ascii_case(target))
                        .map(|r| r.at)
                        .max()
                    {
                        let elapsed = now.signed_duration_since(last).num_seconds();
                        candidates.push(platform_limits.subreddit_gap_seconds as i64 - elapsed);
                    }
                }
            }
        }

        let hourly_full = entries
            .iter()
            .filter(|r| r.platform == platform && now.signed_duration_since(r.at).num_seconds() < 3600)
            .count() as u32
            >= platform_limits.posts_per_hour;
        if hourly_full {
            if let Some(oldest) = entries
                .iter()
                .filter(|r| r.platform == platform && now.signed_duration_since(r.at).num_seconds() < 3600)
                .map(|r| r.at)
                .min()
            {
                let reset_in = 3600 - now.signed_duration_since(oldest).num_seconds();
                candidates.push(reset_in);
            }
        }

        candidates.into_iter().max().unwrap_or(0).max(0) as u64
    }

    /// Usage snapshot for one organization.
    pub async fn get_stats(&self, organization_id: &str) -> LimitStats {
        let limits = self.get_org_limits(organization_id).await;
        let now = Utc::now();
        let guard = self.history.lock().await;
        let entries = guard.get(organization_id).cloned().unwrap_or_default();
        drop(guard);

        let hourly: Vec<&PostRecord> = entries
            .iter()
            .filter(|r| now.signed_duration_since(r.at).num_seconds() < 3600)
            .collect();
        let daily: Vec<&PostRecord> = entries
            .iter()
            .filter(|r| now.signed_duration_since(r.at).num_hours() < 24)
            .collect();

        let mut platform_hourly_count = HashMap::new();
        let mut platform_daily_count = HashMap::new();
        for platform in limits.platform_limits.keys() {
            platform_hourly_count.insert(
                platform.clone(),
                hourly.iter().filter(|r| &r.platform == platform).count(),
            );
            platform_daily_count.insert(
                platform.clone(),
                daily.iter().filter(|r| &r.platform == platform).count(),
            );
        }

        LimitStats {
            org_hourly_count: hourly.len(),
            org_daily_count: daily.len(),
            org_hourly_remaining: limits.max_hourly_auto_posts as i64 - hourly.len() as i64,
            org_daily_remaining: limits.max_daily_auto_posts as i64 - daily.len() as i64,
            platform_hourly_count,
            platform_daily_count,
        }
    }
}

impl Default for RateLimitManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_limits_allow_first_post() {
        let mgr = RateLimitManager::new();
        let result = mgr.check_limits("org1", "reddit", Some("rust")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn disabled_auto_post_denies_immediately() {
        let mgr = RateLimitManager::new();
        let mut limits = default_org_limits("org1");
        limits.auto_post_enabled = false;
        mgr.set_org_limits(limits).await;

        let result = mgr.check_limits("org1", "reddit", None).await;
        assert_eq!(result, Err(LimitDenial::AutoPostDisabled));
    }

    #[tokio::test]
    async fn min_gap_denies_rapid_repost() {
        let mgr = RateLimitManager::new();
        mgr.record_post("org1", "twitter", "").await;

        let result = mgr.check_limits("org1", "twitter", None).await;
        assert_eq!(result, Err(LimitDenial::MinGapNotElapsed));
    }

    #[tokio::test]
    async fn subreddit_gap_denies_same_target_repost() {
        let mgr = RateLimitManager::new();
        mgr.record_post("org1", "reddit", "rust").await;

        let result = mgr.check_limits("org1", "reddit", Some("rust")).await;
        assert_eq!(result, Err(LimitDenial::SubredditGapNotElapsed));
    }

    #[tokio::test]
    async fn different_subreddit_is_not_gap_limited() {
        let mgr = RateLimitManager::new();
        mgr.record_post("org1", "reddit", "rust").await;

        let result = mgr.check_limits("org1", "reddit", Some("python")).await;
        // min_gap_seconds still applies across the whole platform.
        assert_eq!(result, Err(LimitDenial::MinGapNotElapsed));
    }

    #[tokio::test]
    async fn blacklisted_subreddit_denies() {
        let mgr = RateLimitManager::new();
        let mut limits = default_org_limits("org1");
        limits.blacklisted_subreddits = vec!["AskReddit".to_string()];
        mgr.set_org_limits(limits).await;

        let result = mgr.check_limits("org1", "reddit", Some("askreddit")).await;
        assert_eq!(result, Err(LimitDenial::Blacklisted));
    }

    #[tokio::test]
    async fn org_hourly_limit_denies_after_budget_exhausted() {
        let mgr = RateLimitManager::new();
        let mut limits = default_org_limits("org1");
        limits.max_hourly_auto_posts = 1;
        mgr.set_org_limits(limits).await;
        mgr.record_post("org1", "twitter", "").await;

        let result = mgr.check_limits("org1", "reddit", Some("rust")).await;
        assert_eq!(result, Err(LimitDenial::OrgHourlyExceeded));
    }

    #[tokio::test]
    async fn unknown_platform_is_denied() {
        let mgr = RateLimitManager::new();
        let result = mgr.check_limits("org1", "facebook", None).await;
        assert_eq!(result, Err(LimitDenial::PlatformDisabled));
    }

    #[tokio::test]
    async fn stats_reflect_recorded_posts() {
        let mgr = RateLimitManager::new();
        mgr.record_post("org1", "reddit", "rust").await;
        mgr.record_post("org1", "twitter", "").await;

        let stats = mgr.get_stats("org1").await;
        assert_eq!(stats.org_hourly_count, 2);
        assert_eq!(stats.platform_hourly_count.get("reddit"), Some(&1));
    }

    #[tokio::test]
    async fn time_until_allowed_is_zero_when_already_allowed() {
        let mgr = RateLimitManager::new();
        let wait = mgr.get_time_until_allowed("org1", "reddit", Some("rust")).await;
        assert_eq!(wait, 0);
    }

    #[tokio::test]
    async fn time_until_allowed_reflects_min_gap() {
        let mgr = RateLimitManager::new();
        mgr.record_post("org1", "twitter", "").await;
        let wait = mgr.get_time_until_allowed("org1", "twitter", None).await;
        assert!(wait > 0 && wait <= 30);
    }
}
