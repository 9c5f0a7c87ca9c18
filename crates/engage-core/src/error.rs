//! Error types for the engage-core library.
//!
//! Each module has its own error enum to provide clear error boundaries.
//! The library uses `thiserror` for structured, typed errors.

/// Errors related to configuration loading, parsing, and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required configuration field is absent.
    #[error("missing required config field: {field}")]
    MissingField {
        /// The name of the missing field.
        field: String,
    },

    /// A configuration field has an unacceptable value.
    #[error("invalid value for config field '{field}': {message}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// A description of why the value is invalid.
        message: String,
    },

    /// The configuration file does not exist at the specified path.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// The path that was searched.
        path: String,
    },

    /// TOML deserialization failed.
    #[error("failed to parse config file: {source}")]
    ParseError {
        /// The underlying TOML parse error.
        #[source]
        source: toml::de::Error,
    },
}

/// Errors from interacting with a platform crawler (Reddit, Twitter, Quora, Google/SerpAPI).
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// The platform returned HTTP 429 (rate limited).
    #[error("platform rate limited{}", match .retry_after_secs {
        Some(secs) => format!(", retry after {secs}s"),
        None => String::new(),
    })]
    RateLimited {
        /// Seconds to wait before retrying, if provided by the platform.
        retry_after_secs: Option<u64>,
    },

    /// Credentials are missing, expired, or rejected.
    #[error("platform authentication failed: {message}")]
    AuthFailed {
        /// Details about the authentication failure.
        message: String,
    },

    /// Network-level failure communicating with the platform.
    #[error("platform network error: {source}")]
    Network {
        /// The underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The platform's response could not be parsed into a `CrawledPost`.
    #[error("failed to parse platform response: {0}")]
    Parse(String),

    /// Any other non-2xx response from the platform.
    #[error("platform error (HTTP {status}): {message}")]
    ApiError {
        /// The HTTP status code.
        status: u16,
        /// The error message from the platform.
        message: String,
    },
}

/// Errors from interacting with LLM and embedding providers.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// HTTP request to the LLM endpoint failed.
    #[error("LLM HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// LLM API returned an error response.
    #[error("LLM API error (status {status}): {message}")]
    Api {
        /// The HTTP status code.
        status: u16,
        /// The error message from the API.
        message: String,
    },

    /// LLM provider rate limit hit.
    #[error("LLM rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// LLM response could not be parsed as the expected structured JSON.
    #[error("failed to parse LLM response: {0}")]
    Parse(String),

    /// No LLM provider configured.
    #[error("no LLM provider configured")]
    NotConfigured,
}

/// Errors from SQLite storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to connect to the database.
    #[error("database connection error: {source}")]
    Connection {
        /// The underlying SQLx error.
        #[source]
        source: sqlx::Error,
    },

    /// Database migration failed.
    #[error("database migration error: {source}")]
    Migration {
        /// The underlying migration error.
        #[source]
        source: sqlx::migrate::MigrateError,
    },

    /// A database query failed.
    #[error("database query error: {source}")]
    Query {
        /// The underlying SQLx error.
        #[source]
        source: sqlx::Error,
    },
}

/// Errors surfaced by the five-stage analysis pipeline.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    /// The signal-detection node failed (LLM call error with no usable fallback).
    #[error("signal detection failed: {0}")]
    SignalDetection(String),

    /// The risk-scoring node failed even after falling back to the heuristic.
    #[error("risk scoring failed: {0}")]
    RiskScoring(String),

    /// The response-generation node failed.
    #[error("response generation failed: {0}")]
    ResponseGeneration(String),

    /// The CTA-classification node failed.
    #[error("cta classification failed: {0}")]
    CtaClassification(String),

    /// The CTS-decision node failed to combine the upstream scores.
    #[error("cts decision failed: {0}")]
    CtsDecision(String),
}

/// Errors from posting a response to an external platform.
///
/// Distinguishes retryable transport/ratelimit conditions from permanent
/// content/policy conditions, per the error classification in the platform
/// poster contract.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PostError {
    /// HTTP 429 or platform-equivalent throttling signal.
    #[error("post rate limited{}", match .wait_seconds {
        Some(s) => format!(", wait {s}s"),
        None => String::new(),
    })]
    RateLimit {
        /// Seconds to wait before retrying, when the platform provides one.
        wait_seconds: Option<u64>,
    },

    /// Target comment/post was deleted before the reply could be posted.
    #[error("target content was deleted")]
    DeletedContent,

    /// Target thread is locked and no longer accepts replies.
    #[error("target thread is locked")]
    ThreadLocked,

    /// Platform rejected the post as a duplicate of a recent post.
    #[error("duplicate post rejected by platform")]
    DuplicatePost,

    /// Credentials are missing for this poster.
    #[error("poster credentials missing")]
    MissingCredentials,

    /// Credentials were rejected by the platform.
    #[error("poster authentication failed")]
    AuthFailed,

    /// Target belongs to a blacklisted community (e.g. subreddit).
    #[error("target community is blacklisted: {name}")]
    BlacklistedCommunity {
        /// The blacklisted community name.
        name: String,
    },

    /// Transient network, timeout, or 5xx failure.
    #[error("transient posting error: {0}")]
    Transient(String),

    /// The posting-queue callback itself panicked or returned an unexpected error.
    #[error("worker error: {0}")]
    WorkerError(String),
}

impl PostError {
    /// Whether this failure is safe to retry under the posting queue's retry policy.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PostError::RateLimit { .. } | PostError::Transient(_) | PostError::WorkerError(_)
        )
    }

    /// The `wait_seconds` hint carried by a rate-limit failure, if any.
    pub fn wait_seconds(&self) -> Option<u64> {
        match self {
            PostError::RateLimit { wait_seconds } => *wait_seconds,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_missing_field_message() {
        let err = ConfigError::MissingField {
            field: "org.min_cts_score".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "missing required config field: org.min_cts_score"
        );
    }

    #[test]
    fn crawl_error_rate_limited_with_retry() {
        let err = CrawlError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert_eq!(err.to_string(), "platform rate limited, retry after 30s");
    }

    #[test]
    fn crawl_error_rate_limited_without_retry() {
        let err = CrawlError::RateLimited {
            retry_after_secs: None,
        };
        assert_eq!(err.to_string(), "platform rate limited");
    }

    #[test]
    fn llm_error_not_configured_message() {
        assert_eq!(LlmError::NotConfigured.to_string(), "no LLM provider configured");
    }

    #[test]
    fn post_error_retryable_classification() {
        assert!(PostError::RateLimit { wait_seconds: Some(5) }.is_retryable());
        assert!(PostError::Transient("timeout".into()).is_retryable());
        assert!(PostError::WorkerError("panic".into()).is_retryable());
        assert!(!PostError::DeletedContent.is_retryable());
        assert!(!PostError::ThreadLocked.is_retryable());
        assert!(!PostError::DuplicatePost.is_retryable());
        assert!(!PostError::AuthFailed.is_retryable());
        assert!(!PostError::MissingCredentials.is_retryable());
        assert!(!PostError::BlacklistedCommunity { name: "x".into() }.is_retryable());
    }

    #[test]
    fn post_error_wait_seconds_hint() {
        let err = PostError::RateLimit { wait_seconds: Some(42) };
        assert_eq!(err.wait_seconds(), Some(42));
        assert_eq!(PostError::DeletedContent.wait_seconds(), None);
    }
}
