//! N-worker pool draining the posting queue (§4.7, §5).
//!
//! Mirrors [`crate::crawl::scheduler::CrawlScheduler`]'s `Runtime`-backed
//! loop shape: one task per worker slot, each looping
//! `dequeue -> post_callback -> complete` until cancelled. A callback that
//! panics is isolated via `tokio::spawn` + `JoinHandle` rather than
//! `catch_unwind` across an `.await`, and becomes a synthetic `WORKER_ERROR`
//! failure instead of taking the worker down.

use super::queue::PostingQueue;
use crate::automation::Runtime;
use crate::model::{PostResult, QueueItem, QueueItemStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// `WORKER_ERROR` failures are capped independent of `max_retries` (DESIGN.md
/// Open Question 3) so a deterministic callback bug cannot cycle an item
/// forever.
const WORKER_ERROR_RETRY_CAP: u32 = 2;

/// Host-provided hook invoked once per dequeued item. Implemented by the
/// binary crate wiring a [`super::PlatformPoster`] registry to the queue.
#[async_trait]
pub trait PostCallback: Send + Sync {
    async fn post(&self, item: &QueueItem) -> PostResult;
}

/// Runs `worker_count` dequeue loops against a shared [`PostingQueue`].
pub struct WorkerPool {
    queue: Arc<PostingQueue>,
    runtime: Mutex<Runtime>,
    worker_error_counts: Arc<Mutex<HashMap<uuid::Uuid, u32>>>,
    idle_poll: Duration,
}

impl WorkerPool {
    pub fn new(queue: Arc<PostingQueue>) -> Self {
        Self {
            queue,
            runtime: Mutex::new(Runtime::new()),
            worker_error_counts: Arc::new(Mutex::new(HashMap::new())),
            idle_poll: Duration::from_millis(200),
        }
    }

    /// Spawn `worker_count` workers, each looping until [`stop`](Self::stop)
    /// is called. Safe to call once; calling again while already running is
    /// a no-op (matches [`super::worker::AutoPostWorker::start`]).
    pub async fn start(&self, worker_count: usize, callback: Arc<dyn PostCallback>) {
        let mut runtime = self.runtime.lock().await;
        if runtime.task_count() > 0 {
            return;
        }
        let cancel = runtime.cancel_token();

        for idx in 0..worker_count {
            let queue = self.queue.clone();
            let callback = callback.clone();
            let cancel = cancel.clone();
            let error_counts = self.worker_error_counts.clone();
            let idle_poll = self.idle_poll;

            runtime.spawn(format!("posting-worker-{idx}"), async move {
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }

                    let Some(item) = queue.dequeue().await else {
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(idle_poll) => {}
                        }
                        continue;
                    };

                    let item_id = item.id;
                    let result = run_callback(callback.clone(), item.clone()).await;
                    let result = apply_worker_error_cap(&error_counts, item_id, result).await;

                    queue.complete(item_id, result).await;
                }
            });
        }
    }

    /// Signal all workers to stop and wait up to 30s for in-flight items to
    /// finish their current `post_callback` call (see
    /// [`Runtime::shutdown`]).
    pub async fn stop(&self) {
        self.runtime.lock().await.shutdown().await;
    }

    /// Number of currently-processing items (best-effort, for `/posting/queue/stats`).
    pub async fn in_flight_count(&self) -> usize {
        let stats = self.queue.get_stats().await;
        stats
            .by_status
            .get(&format!("{:?}", QueueItemStatus::Processing))
            .copied()
            .unwrap_or(0)
    }
}

/// Run one callback in its own task so a panic surfaces as a `JoinError`
/// instead of taking the worker loop down with it, matching §4.7's "a
/// callback exception becomes a synthetic non-success `PostResult` with
/// `error_code=WORKER_ERROR`, retryable=true".
async fn run_callback(callback: Arc<dyn PostCallback>, item: QueueItem) -> PostResult {
    match tokio::spawn(async move { callback.post(&item).await }).await {
        Ok(result) => result,
        Err(join_err) => {
            tracing::error!(error = %join_err, "posting callback panicked");
            PostResult {
                success: false,
                retryable: true,
                error_code: Some("WORKER_ERROR".to_string()),
                error: Some(join_err.to_string()),
                ..Default::default()
            }
        }
    }
}

/// Classify a `WORKER_ERROR` failure against the per-item retry cap,
/// forcing it non-retryable once the cap is exceeded.
async fn apply_worker_error_cap(
    counts: &Mutex<HashMap<uuid::Uuid, u32>>,
    item_id: uuid::Uuid,
    mut result: PostResult,
) -> PostResult {
    if result.success || result.error_code.as_deref() != Some("WORKER_ERROR") {
        return result;
    }

    let mut guard = counts.lock().await;
    let count = guard.entry(item_id).or_insert(0);
    *count += 1;
    if *count > WORKER_ERROR_RETRY_CAP {
        result.retryable = false;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posting::queue::QueueConfig;
    use std::collections::HashMap as StdHashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_item() -> QueueItem {
        QueueItem {
            id: uuid::Uuid::new_v4(),
            response_id: "r1".to_string(),
            organization_id: "org1".to_string(),
            platform: "reddit".to_string(),
            target_url: "https://reddit.com/r/rust/x".to_string(),
            response_text: "hello".to_string(),
            priority: 1,
            status: QueueItemStatus::Queued,
            retry_count: 0,
            max_retries: 3,
            created_at: chrono::Utc::now(),
            scheduled_for: None,
            started_at: None,
            completed_at: None,
            last_error: None,
            result: None,
            metadata: StdHashMap::new(),
        }
    }

    struct CountingSuccess(Arc<AtomicUsize>);

    #[async_trait]
    impl PostCallback for CountingSuccess {
        async fn post(&self, _item: &QueueItem) -> PostResult {
            self.0.fetch_add(1, Ordering::SeqCst);
            PostResult {
                success: true,
                ..Default::default()
            }
        }
    }

    #[tokio::test]
    async fn worker_drains_queued_items() {
        let queue = Arc::new(PostingQueue::new(QueueConfig::default()));
        queue.enqueue(sample_item()).await.unwrap();
        let item2 = sample_item();
        let id2 = item2.id;
        queue.enqueue(item2).await.unwrap();

        let posted = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::new(queue.clone());
        pool.start(2, Arc::new(CountingSuccess(posted.clone())))
            .await;

        for _ in 0..50 {
            if posted.load(Ordering::SeqCst) >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        pool.stop().await;

        assert_eq!(posted.load(Ordering::SeqCst), 2);
        let stored = queue.get(id2).await.unwrap();
        assert_eq!(stored.status, QueueItemStatus::Completed);
    }

    struct AlwaysWorkerError;

    #[async_trait]
    impl PostCallback for AlwaysWorkerError {
        async fn post(&self, _item: &QueueItem) -> PostResult {
            PostResult {
                success: false,
                retryable: true,
                error_code: Some("WORKER_ERROR".to_string()),
                ..Default::default()
            }
        }
    }

    #[tokio::test]
    async fn worker_error_retry_is_capped() {
        let counts = Mutex::new(HashMap::new());
        let id = uuid::Uuid::new_v4();

        for _ in 0..WORKER_ERROR_RETRY_CAP {
            let result = PostResult {
                success: false,
                retryable: true,
                error_code: Some("WORKER_ERROR".to_string()),
                ..Default::default()
            };
            let result = apply_worker_error_cap(&counts, id, result).await;
            assert!(result.retryable);
        }

        let result = PostResult {
            success: false,
            retryable: true,
            error_code: Some("WORKER_ERROR".to_string()),
            ..Default::default()
        };
        let result = apply_worker_error_cap(&counts, id, result).await;
        assert!(!result.retryable, "cap should force non-retryable");
    }
}
