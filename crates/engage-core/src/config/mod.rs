//! Configuration management for the engagement automation platform.
//!
//! Supports three-layer configuration loading:
//! 1. Built-in defaults
//! 2. TOML config file (`~/.engage/config.toml`)
//! 3. Environment variable overrides (`ENGAGE_` prefix)
//!
//! CLI flag overrides are applied by the binary crates after loading.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

fn default_approval_mode() -> bool {
    true
}

/// Top-level configuration for the engagement automation agent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Organization identity and global posting limits.
    #[serde(default)]
    pub org: OrgConfig,

    /// Per-platform rate limits and posting etiquette.
    #[serde(default)]
    pub platforms: PlatformsConfig,

    /// Crawl sources, keywords, and scheduling.
    #[serde(default)]
    pub crawl: CrawlConfig,

    /// Analysis pipeline thresholds.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// LLM provider configuration.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Auto-post worker and posting-queue tuning.
    #[serde(default)]
    pub posting: PostingConfig,

    /// Data storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// When true, eligible responses are queued for auto-posting; when
    /// false, every eligible response is routed to human review instead.
    #[serde(default = "default_approval_mode")]
    pub auto_post_enabled: bool,
}

/// Organization identity and tenant context used by response generation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OrgConfig {
    /// Organization identifier (used as the rate-limit accounting key).
    #[serde(default)]
    pub organization_id: String,

    /// Product/application name surfaced in generated responses.
    #[serde(default)]
    pub app_name: String,

    /// One-line value proposition of the product.
    #[serde(default)]
    pub value_prop: String,

    /// Description of the target audience.
    #[serde(default)]
    pub target_audience: String,

    /// Key product benefits used when composing soft-CTA/contextual responses.
    #[serde(default)]
    pub key_benefits: Vec<String>,

    /// Product website URL, included in direct-CTA responses.
    #[serde(default)]
    pub website_url: String,

    /// Minimum `cts_score` required for a response to auto-post.
    #[serde(default = "default_min_cts_score")]
    pub min_cts_score: f64,

    /// Maximum CTA level still eligible for auto-posting.
    #[serde(default = "default_max_cta_for_auto_post")]
    pub max_cta_level_for_auto_post: i32,

    /// Subreddits/communities this org never engages with.
    #[serde(default)]
    pub blacklisted_communities: Vec<String>,

    /// Maximum auto-posts in a rolling day, across all platforms.
    #[serde(default = "default_max_daily_auto_posts")]
    pub max_daily_auto_posts: u32,

    /// Maximum auto-posts in a rolling hour, across all platforms.
    #[serde(default = "default_max_hourly_auto_posts")]
    pub max_hourly_auto_posts: u32,

    /// Risk levels eligible for auto-posting (§4.9). `blocked` is never
    /// valid here -- it always routes to human review.
    #[serde(default = "default_allowed_risk_levels")]
    pub allowed_risk_levels: Vec<crate::model::RiskLevel>,
}

fn default_min_cts_score() -> f64 {
    0.7
}
fn default_max_cta_for_auto_post() -> i32 {
    1
}
fn default_max_daily_auto_posts() -> u32 {
    50
}
fn default_max_hourly_auto_posts() -> u32 {
    10
}
fn default_allowed_risk_levels() -> Vec<crate::model::RiskLevel> {
    vec![crate::model::RiskLevel::Low]
}

/// Rate limits and posting-etiquette parameters for one platform.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlatformLimitsConfig {
    /// Maximum posts per rolling hour.
    #[serde(default = "default_max_per_hour")]
    pub max_per_hour: u32,

    /// Maximum posts per rolling day.
    #[serde(default = "default_max_per_day")]
    pub max_per_day: u32,

    /// Minimum seconds between any two posts on this platform.
    #[serde(default = "default_min_gap_seconds")]
    pub min_gap_seconds: u64,

    /// Minimum seconds between posts to the same community/subreddit (0 disables).
    #[serde(default)]
    pub min_community_gap_seconds: u64,
}

impl Default for PlatformLimitsConfig {
    fn default() -> Self {
        Self {
            max_per_hour: default_max_per_hour(),
            max_per_day: default_max_per_day(),
            min_gap_seconds: default_min_gap_seconds(),
            min_community_gap_seconds: 0,
        }
    }
}

impl PlatformLimitsConfig {
    /// Convert into the runtime [`crate::model::PlatformLimits`] shape
    /// consumed by [`crate::posting::org_limits::RateLimitManager`].
    pub fn to_platform_limits(&self) -> crate::model::PlatformLimits {
        crate::model::PlatformLimits {
            posts_per_hour: self.max_per_hour,
            posts_per_day: self.max_per_day,
            min_gap_seconds: self.min_gap_seconds,
            subreddit_gap_seconds: self.min_community_gap_seconds,
            enabled: true,
        }
    }
}

fn default_max_per_hour() -> u32 {
    10
}
fn default_max_per_day() -> u32 {
    50
}
fn default_min_gap_seconds() -> u64 {
    60
}

/// Per-platform posting limits, keyed by platform name.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlatformsConfig {
    /// Reddit posting limits.
    #[serde(default = "default_reddit_limits")]
    pub reddit: PlatformLimitsConfig,

    /// Twitter/X posting limits.
    #[serde(default = "default_twitter_limits")]
    pub twitter: PlatformLimitsConfig,

    /// Quora posting limits.
    #[serde(default)]
    pub quora: PlatformLimitsConfig,
}

impl Default for PlatformsConfig {
    fn default() -> Self {
        Self {
            reddit: default_reddit_limits(),
            twitter: default_twitter_limits(),
            quora: PlatformLimitsConfig::default(),
        }
    }
}

fn default_reddit_limits() -> PlatformLimitsConfig {
    PlatformLimitsConfig {
        max_per_hour: 10,
        max_per_day: 50,
        min_gap_seconds: 60,
        min_community_gap_seconds: 300,
    }
}

fn default_twitter_limits() -> PlatformLimitsConfig {
    PlatformLimitsConfig {
        max_per_hour: 15,
        max_per_day: 100,
        min_gap_seconds: 30,
        min_community_gap_seconds: 0,
    }
}

/// Crawl sources, search keywords, and scheduling frequency.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CrawlConfig {
    /// Keywords to search for across all enabled platforms.
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Subreddits to search/monitor (Reddit only).
    #[serde(default)]
    pub subreddits: Vec<String>,

    /// Crawl frequency: "hourly", "every_6_hours", "daily", "twice_daily",
    /// "four_times_daily", or "weekly".
    #[serde(default = "default_crawl_frequency")]
    pub frequency: String,

    /// Maximum results requested per crawl job.
    #[serde(default = "default_crawl_limit")]
    pub limit_per_job: u32,
}

fn default_crawl_frequency() -> String {
    "every_6_hours".to_string()
}
fn default_crawl_limit() -> u32 {
    100
}

/// Analysis pipeline thresholds and scoring weights.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Weight of the signal-confidence component in the CTS score.
    #[serde(default = "default_signal_weight")]
    pub signal_weight: f64,

    /// Weight of the inverse-risk component in the CTS score.
    #[serde(default = "default_risk_weight")]
    pub risk_weight: f64,

    /// Weight of the inverse-CTA component in the CTS score.
    #[serde(default = "default_cta_weight")]
    pub cta_weight: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            signal_weight: default_signal_weight(),
            risk_weight: default_risk_weight(),
            cta_weight: default_cta_weight(),
        }
    }
}

fn default_signal_weight() -> f64 {
    0.4
}
fn default_risk_weight() -> f64 {
    0.3
}
fn default_cta_weight() -> f64 {
    0.3
}

/// LLM provider configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Provider name: "openai", "anthropic", or any OpenAI-compatible endpoint.
    #[serde(default)]
    pub provider: String,

    /// API key for the LLM provider.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Provider-specific model name.
    #[serde(default)]
    pub model: String,

    /// Override URL for custom/self-hosted endpoints.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Sampling temperature used for skill completions.
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,

    /// Maximum tokens requested per completion.
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,
}

fn default_llm_temperature() -> f32 {
    0.3
}
fn default_llm_max_tokens() -> u32 {
    512
}

/// Auto-post worker and posting-queue tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostingConfig {
    /// Seconds between auto-post worker batch checks.
    #[serde(default = "default_check_interval_seconds")]
    pub check_interval_seconds: u64,

    /// Maximum eligible responses processed per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Maximum delivery attempts before a queue item is marked failed.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay (seconds) for the exponential retry backoff.
    #[serde(default = "default_base_retry_delay_seconds")]
    pub base_retry_delay_seconds: f64,

    /// Maximum delay (seconds) the retry backoff may reach.
    #[serde(default = "default_max_retry_delay_seconds")]
    pub max_retry_delay_seconds: f64,

    /// Maximum number of items the posting queue holds at once.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    /// Number of posting-queue workers draining `PostingQueue` concurrently (§5).
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

impl Default for PostingConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: default_check_interval_seconds(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            base_retry_delay_seconds: default_base_retry_delay_seconds(),
            max_retry_delay_seconds: default_max_retry_delay_seconds(),
            max_queue_size: default_max_queue_size(),
            worker_count: default_worker_count(),
        }
    }
}

fn default_check_interval_seconds() -> u64 {
    300
}
fn default_batch_size() -> u32 {
    10
}
fn default_max_retries() -> u32 {
    3
}
fn default_base_retry_delay_seconds() -> f64 {
    60.0
}
fn default_max_retry_delay_seconds() -> f64 {
    900.0
}
fn default_max_queue_size() -> usize {
    10_000
}
fn default_worker_count() -> usize {
    3
}

/// Data storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Number of days to retain crawled/processed data.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_db_path() -> String {
    "~/.engage/engage.db".to_string()
}
fn default_retention_days() -> u32 {
    90
}

/// Logging and observability settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Seconds between periodic status summaries (0 = disabled).
    #[serde(default)]
    pub status_interval_seconds: u64,
}

impl Config {
    /// Build the posting-policy [`crate::model::OrgLimits`] this
    /// configuration implies, for installing into a
    /// [`crate::posting::org_limits::RateLimitManager`] at startup.
    pub fn to_org_limits(&self) -> crate::model::OrgLimits {
        let mut platform_limits = std::collections::HashMap::new();
        platform_limits.insert(
            "reddit".to_string(),
            self.platforms.reddit.to_platform_limits(),
        );
        platform_limits.insert(
            "twitter".to_string(),
            self.platforms.twitter.to_platform_limits(),
        );
        platform_limits.insert(
            "quora".to_string(),
            self.platforms.quora.to_platform_limits(),
        );

        crate::model::OrgLimits {
            organization_id: self.org.organization_id.clone(),
            max_daily_auto_posts: self.org.max_daily_auto_posts,
            max_hourly_auto_posts: self.org.max_hourly_auto_posts,
            min_cts_score: self.org.min_cts_score,
            max_cta_level: self.org.max_cta_level_for_auto_post,
            allowed_risk_levels: self.org.allowed_risk_levels.clone(),
            platform_limits,
            auto_post_enabled: self.auto_post_enabled,
            blacklisted_subreddits: self.org.blacklisted_communities.clone(),
        }
    }

    /// Build the [`crate::posting::QueueConfig`] the posting queue and its
    /// worker pool should use, from this config's `[posting]` section.
    pub fn to_queue_config(&self) -> crate::posting::QueueConfig {
        crate::posting::QueueConfig {
            max_retries: self.posting.max_retries,
            base_retry_delay: std::time::Duration::from_secs_f64(self.posting.base_retry_delay_seconds),
            max_retry_delay: std::time::Duration::from_secs_f64(self.posting.max_retry_delay_seconds),
            max_queue_size: self.posting.max_queue_size,
        }
    }

    /// Load configuration from a TOML file with environment variable overrides.
    ///
    /// The loading sequence:
    /// 1. Determine config file path (argument > `ENGAGE_CONFIG` env var > default)
    /// 2. Parse TOML file (or use defaults if default path doesn't exist)
    /// 3. Apply environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Config, ConfigError> {
        let (path, explicit) = Self::resolve_config_path(config_path);

        let mut config = match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str::<Config>(&contents)
                .map_err(|e| ConfigError::ParseError { source: e })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if explicit {
                    return Err(ConfigError::FileNotFound {
                        path: path.display().to_string(),
                    });
                }
                Config::default()
            }
            Err(_) => {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
        };

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Load configuration and validate it, returning all validation errors at once.
    pub fn load_and_validate(config_path: Option<&str>) -> Result<Config, Vec<ConfigError>> {
        let config = Config::load(config_path).map_err(|e| vec![e])?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration, returning all errors found (not just the first).
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        if self.org.organization_id.is_empty() {
            errors.push(ConfigError::MissingField {
                field: "org.organization_id".to_string(),
            });
        }

        if self.crawl.keywords.is_empty() {
            errors.push(ConfigError::MissingField {
                field: "crawl.keywords".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.org.min_cts_score) {
            errors.push(ConfigError::InvalidValue {
                field: "org.min_cts_score".to_string(),
                message: "must be between 0.0 and 1.0".to_string(),
            });
        }

        if !self.llm.provider.is_empty() {
            if matches!(self.llm.provider.as_str(), "openai" | "anthropic") {
                match &self.llm.api_key {
                    Some(key) if !key.is_empty() => {}
                    _ => {
                        errors.push(ConfigError::MissingField {
                            field: format!(
                                "llm.api_key (required for {} provider)",
                                self.llm.provider
                            ),
                        });
                    }
                }
            }
        }

        let weight_sum =
            self.pipeline.signal_weight + self.pipeline.risk_weight + self.pipeline.cta_weight;
        if (weight_sum - 1.0).abs() > 0.01 {
            errors.push(ConfigError::InvalidValue {
                field: "pipeline".to_string(),
                message: format!(
                    "signal_weight + risk_weight + cta_weight must sum to 1.0, got {weight_sum}"
                ),
            });
        }

        if self.posting.base_retry_delay_seconds > self.posting.max_retry_delay_seconds {
            errors.push(ConfigError::InvalidValue {
                field: "posting.base_retry_delay_seconds".to_string(),
                message: "must be less than or equal to max_retry_delay_seconds".to_string(),
            });
        }

        let valid_frequencies = [
            "hourly",
            "every_6_hours",
            "daily",
            "twice_daily",
            "four_times_daily",
            "weekly",
        ];
        if !valid_frequencies.contains(&self.crawl.frequency.as_str()) {
            errors.push(ConfigError::InvalidValue {
                field: "crawl.frequency".to_string(),
                message: format!(
                    "must be one of {valid_frequencies:?}, got '{}'",
                    self.crawl.frequency
                ),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Resolve the config file path from arguments, env vars, or default.
    ///
    /// Returns `(path, explicit)` where `explicit` is true if the path was
    /// explicitly provided (via argument or env var) rather than using the default.
    fn resolve_config_path(config_path: Option<&str>) -> (PathBuf, bool) {
        if let Some(path) = config_path {
            return (expand_tilde(path), true);
        }

        if let Ok(env_path) = env::var("ENGAGE_CONFIG") {
            return (expand_tilde(&env_path), true);
        }

        (expand_tilde("~/.engage/config.toml"), false)
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables use the `ENGAGE_` prefix with double underscores
    /// separating nested keys (e.g., `ENGAGE_LLM__API_KEY`).
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = env::var("ENGAGE_ORG__ORGANIZATION_ID") {
            self.org.organization_id = val;
        }
        if let Ok(val) = env::var("ENGAGE_ORG__APP_NAME") {
            self.org.app_name = val;
        }
        if let Ok(val) = env::var("ENGAGE_ORG__VALUE_PROP") {
            self.org.value_prop = val;
        }
        if let Ok(val) = env::var("ENGAGE_ORG__TARGET_AUDIENCE") {
            self.org.target_audience = val;
        }
        if let Ok(val) = env::var("ENGAGE_ORG__KEY_BENEFITS") {
            self.org.key_benefits = split_csv(&val);
        }
        if let Ok(val) = env::var("ENGAGE_ORG__WEBSITE_URL") {
            self.org.website_url = val;
        }
        if let Ok(val) = env::var("ENGAGE_ORG__MIN_CTS_SCORE") {
            self.org.min_cts_score = parse_env_f64("ENGAGE_ORG__MIN_CTS_SCORE", &val)?;
        }
        if let Ok(val) = env::var("ENGAGE_ORG__MAX_CTA_LEVEL_FOR_AUTO_POST") {
            self.org.max_cta_level_for_auto_post =
                parse_env_i32("ENGAGE_ORG__MAX_CTA_LEVEL_FOR_AUTO_POST", &val)?;
        }
        if let Ok(val) = env::var("ENGAGE_ORG__BLACKLISTED_COMMUNITIES") {
            self.org.blacklisted_communities = split_csv(&val);
        }

        if let Ok(val) = env::var("ENGAGE_CRAWL__KEYWORDS") {
            self.crawl.keywords = split_csv(&val);
        }
        if let Ok(val) = env::var("ENGAGE_CRAWL__SUBREDDITS") {
            self.crawl.subreddits = split_csv(&val);
        }
        if let Ok(val) = env::var("ENGAGE_CRAWL__FREQUENCY") {
            self.crawl.frequency = val;
        }
        if let Ok(val) = env::var("ENGAGE_CRAWL__LIMIT_PER_JOB") {
            self.crawl.limit_per_job = parse_env_u32("ENGAGE_CRAWL__LIMIT_PER_JOB", &val)?;
        }

        if let Ok(val) = env::var("ENGAGE_LLM__PROVIDER") {
            self.llm.provider = val;
        }
        if let Ok(val) = env::var("ENGAGE_LLM__API_KEY") {
            self.llm.api_key = Some(val);
        }
        if let Ok(val) = env::var("ENGAGE_LLM__MODEL") {
            self.llm.model = val;
        }
        if let Ok(val) = env::var("ENGAGE_LLM__BASE_URL") {
            self.llm.base_url = Some(val);
        }

        if let Ok(val) = env::var("ENGAGE_POSTING__CHECK_INTERVAL_SECONDS") {
            self.posting.check_interval_seconds =
                parse_env_u64("ENGAGE_POSTING__CHECK_INTERVAL_SECONDS", &val)?;
        }
        if let Ok(val) = env::var("ENGAGE_POSTING__BATCH_SIZE") {
            self.posting.batch_size = parse_env_u32("ENGAGE_POSTING__BATCH_SIZE", &val)?;
        }
        if let Ok(val) = env::var("ENGAGE_POSTING__MAX_RETRIES") {
            self.posting.max_retries = parse_env_u32("ENGAGE_POSTING__MAX_RETRIES", &val)?;
        }

        if let Ok(val) = env::var("ENGAGE_STORAGE__DB_PATH") {
            self.storage.db_path = val;
        }
        if let Ok(val) = env::var("ENGAGE_STORAGE__RETENTION_DAYS") {
            self.storage.retention_days =
                parse_env_u32("ENGAGE_STORAGE__RETENTION_DAYS", &val)?;
        }

        if let Ok(val) = env::var("ENGAGE_LOGGING__STATUS_INTERVAL_SECONDS") {
            self.logging.status_interval_seconds =
                parse_env_u64("ENGAGE_LOGGING__STATUS_INTERVAL_SECONDS", &val)?;
        }

        if let Ok(val) = env::var("ENGAGE_AUTO_POST_ENABLED") {
            self.auto_post_enabled = parse_env_bool("ENGAGE_AUTO_POST_ENABLED", &val)?;
        }

        Ok(())
    }
}

/// Expand `~` at the start of a path to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Split a comma-separated string into trimmed, non-empty values.
fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn parse_env_u32(var_name: &str, val: &str) -> Result<u32, ConfigError> {
    val.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
        field: var_name.to_string(),
        message: format!("'{val}' is not a valid u32"),
    })
}

fn parse_env_i32(var_name: &str, val: &str) -> Result<i32, ConfigError> {
    val.parse::<i32>().map_err(|_| ConfigError::InvalidValue {
        field: var_name.to_string(),
        message: format!("'{val}' is not a valid i32"),
    })
}

fn parse_env_f64(var_name: &str, val: &str) -> Result<f64, ConfigError> {
    val.parse::<f64>().map_err(|_| ConfigError::InvalidValue {
        field: var_name.to_string(),
        message: format!("'{val}' is not a valid f64"),
    })
}

fn parse_env_u64(var_name: &str, val: &str) -> Result<u64, ConfigError> {
    val.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
        field: var_name.to_string(),
        message: format!("'{val}' is not a valid u64"),
    })
}

/// Parse an environment variable value as a boolean.
///
/// Accepts: `true`, `false`, `1`, `0`, `yes`, `no` (case-insensitive).
fn parse_env_bool(var_name: &str, val: &str) -> Result<bool, ConfigError> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: var_name.to_string(),
            message: format!("'{val}' is not a valid boolean (use true/false/1/0/yes/no)"),
        }),
    }
}
