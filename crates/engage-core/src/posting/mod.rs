//! Auto-posting: delay simulation, rate limits, eligibility checks, the
//! posting queue, platform posters, and the worker that drives them (§4.8).
//!
//! [`PlatformPoster`] mirrors [`crate::crawl::Crawler`]'s shape: a small
//! async-trait contract adapters implement so [`worker::AutoPostWorker`]
//! can hold them as `Arc<dyn PlatformPoster>` without knowing which
//! platform it's talking to.

pub mod delay;
pub mod eligibility;
pub mod org_limits;
pub mod pool;
pub mod posters;
pub mod queue;
pub mod worker;

pub use eligibility::{AutoPostEligibility, EligibilityResult, ResponseData};
pub use org_limits::{LimitDenial, LimitStats, RateLimitManager};
pub use pool::{PostCallback, WorkerPool};
pub use posters::{RedditPoster, TwitterPoster};
pub use queue::{PostingQueue, QueueConfig, QueueFullError, QueueStats};
pub use worker::{AutoPostWorker, ProcessingStats, WorkerStatus};

use crate::error::PostError;
use crate::model::PostResult;
use async_trait::async_trait;

/// Contract every platform poster implements.
///
/// Object-safe so posters are held as `Arc<dyn PlatformPoster>` in
/// [`worker::AutoPostWorker`]'s platform registry, one instance per
/// platform regardless of how many organizations share it.
#[async_trait]
pub trait PlatformPoster: Send + Sync {
    /// Stable identifier for this adapter, e.g. `"reddit"`.
    fn platform(&self) -> &str;

    /// Acquire credentials/tokens. Idempotent: calling twice is a no-op.
    async fn initialize(&self) -> Result<(), PostError>;

    /// Release any held session. Idempotent.
    async fn close(&self) -> Result<(), PostError>;

    /// Submit `response_text` as a reply to `target_url`.
    async fn post(&self, response_text: &str, target_url: &str) -> PostResult;

    /// Confirm a previously posted id is still live (not deleted/removed).
    async fn verify_posted(&self, external_id: &str) -> bool;
}
