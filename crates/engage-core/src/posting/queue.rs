//! In-memory priority queue feeding the posting worker pool (§4.8).
//!
//! Items are kept in a single map keyed by id rather than a true priority
//! heap: the queue is sized for a handful of organizations' pending posts,
//! not a high-throughput job system, so a linear scan to find the next
//! ready item is simpler than a heap and still far from a bottleneck.

use crate::model::{PostResult, QueueItem, QueueItemStatus};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

/// Bounds on retry/backoff behavior and queue capacity.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub max_retries: u32,
    pub base_retry_delay: Duration,
    pub max_retry_delay: Duration,
    pub max_queue_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_retry_delay: Duration::from_secs(60),
            max_retry_delay: Duration::from_secs(900),
            max_queue_size: 10_000,
        }
    }
}

/// Raised when [`PostingQueue::enqueue`] is called on a full queue.
#[derive(Debug, Clone, thiserror::Error)]
#[error("posting queue is full (max {max_size} items)")]
pub struct QueueFullError {
    pub max_size: usize,
}

/// Snapshot of queue occupancy and outcome breakdown.
#[derive(Debug, Clone, Default)]
pub struct QueueStats {
    pub total_items: usize,
    pub by_status: HashMap<String, usize>,
    pub by_platform: HashMap<String, usize>,
}

/// Holds queued posting work and the retry/backoff policy applied to it.
///
/// Cancelled items are retained with `status = Cancelled` rather than
/// removed outright, so `get_stats`/`list` can still account for them; a
/// cancelled item is simply never returned by [`dequeue`](Self::dequeue).
pub struct PostingQueue {
    items: Mutex<HashMap<uuid::Uuid, QueueItem>>,
    config: QueueConfig,
}

impl PostingQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Add a new item to the queue. Fails if the queue is at capacity.
    pub async fn enqueue(&self, item: QueueItem) -> Result<(), QueueFullError> {
        let mut guard = self.items.lock().await;
        if guard.len() >= self.config.max_queue_size {
            return Err(QueueFullError {
                max_size: self.config.max_queue_size,
            });
        }
        guard.insert(item.id, item);
        Ok(())
    }

    /// Take the highest-priority ready item (lowest `priority` number first,
    /// ties broken by earliest `created_at`), marking it `Processing`.
    ///
    /// An item is "ready" when queued or retry-pending and its
    /// `scheduled_for`, if any, has passed. Returns `None` if nothing is
    /// ready right now.
    pub async fn dequeue(&self) -> Option<QueueItem> {
        let now = chrono::Utc::now();
        let mut guard = self.items.lock().await;

        let next_id = guard
            .values()
            .filter(|item| {
                matches!(item.status, QueueItemStatus::Queued | QueueItemStatus::RetryPending)
                    && item.scheduled_for.map(|t| t <= now).unwrap_or(true)
            })
            .min_by(|a, b| a.priority.cmp(&b.priority).then(a.created_at.cmp(&b.created_at)))
            .map(|item| item.id)?;

        let item = guard.get_mut(&next_id)?;
        item.status = QueueItemStatus::Processing;
        item.started_at = Some(now);
        Some(item.clone())
    }

    /// Record the outcome of an attempt. On success, marks the item
    /// completed. On failure, either schedules a retry with exponential
    /// backoff or marks the item permanently failed, depending on
    /// `result.retryable` and the retry budget.
    pub async fn complete(&self, item_id: uuid::Uuid, result: PostResult) {
        let mut guard = self.items.lock().await;
        let Some(item) = guard.get_mut(&item_id) else {
            return;
        };

        let now = chrono::Utc::now();
        if result.success {
            item.status = QueueItemStatus::Completed;
            item.completed_at = Some(now);
            item.result = Some(result);
            return;
        }

        item.retry_count += 1;
        item.last_error = result.error.clone();

        if result.retryable && item.retry_count < item.max_retries.max(self.config.max_retries) {
            let exp = item.retry_count.saturating_sub(1);
            let mut delay = self.config.base_retry_delay * 2u32.saturating_pow(exp);
            if delay > self.config.max_retry_delay {
                delay = self.config.max_retry_delay;
            }

            if result.error_code.as_deref() == Some("RATELIMIT") {
                if let Some(wait_seconds) = result
                    .metadata
                    .get("wait_seconds")
                    .and_then(|v| v.as_u64())
                {
                    let wait = Duration::from_secs(wait_seconds);
                    if wait > delay {
                        delay = wait;
                    }
                }
            }

            item.status = QueueItemStatus::RetryPending;
            item.scheduled_for = Some(now + chrono::Duration::from_std(delay).unwrap_or_default());
            item.result = Some(result);
        } else {
            item.status = QueueItemStatus::Failed;
            item.completed_at = Some(now);
            item.result = Some(result);
        }
    }

    /// Cancel a queued or retry-pending item. Returns `false` if the item
    /// doesn't exist or is currently being processed.
    pub async fn cancel(&self, item_id: uuid::Uuid) -> bool {
        let mut guard = self.items.lock().await;
        let Some(item) = guard.get_mut(&item_id) else {
            return false;
        };
        if item.status == QueueItemStatus::Processing {
            return false;
        }
        item.status = QueueItemStatus::Cancelled;
        item.completed_at = Some(chrono::Utc::now());
        true
    }

    pub async fn get(&self, item_id: uuid::Uuid) -> Option<QueueItem> {
        self.items.lock().await.get(&item_id).cloned()
    }

    pub async fn get_stats(&self) -> QueueStats {
        let guard = self.items.lock().await;
        let mut by_status = HashMap::new();
        let mut by_platform = HashMap::new();
        for item in guard.values() {
            let status_key = format!("{:?}", item.status);
            *by_status.entry(status_key).or_insert(0) += 1;
            *by_platform.entry(item.platform.clone()).or_insert(0) += 1;
        }
        QueueStats {
            total_items: guard.len(),
            by_status,
            by_platform,
        }
    }
}
