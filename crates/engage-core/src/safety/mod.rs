//! Safety utilities shared across the crawl, pipeline, and posting layers.
//!
//! Content-level safety (crisis detection) lives in [`crate::crisis`]; rate
//! limiting lives in [`crate::ratelimit`] and [`crate::posting::org_limits`].
//! What remains here is the generic secret-redaction helper used whenever
//! config or error values that might carry API keys cross a logging or
//! display boundary.

pub mod redact;

pub use redact::{mask_optional_secret, mask_secret, redact_secrets, Redacted};
