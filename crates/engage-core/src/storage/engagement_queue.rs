//! CRUD for the `engagement_queue` table: stage-5 commitment-to-send
//! decisions awaiting either auto-post or manual review.

use super::DbPool;
use crate::error::StorageError;
use chrono::{DateTime, Utc};

/// A queued engagement decision, joined to its post/response pair.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub id: String,
    pub organization_id: String,
    pub post_id: String,
    pub response_id: String,
    pub status: String,
    pub priority: i32,
    pub cts_score: f64,
    pub requires_review: bool,
    pub decision_factors: Vec<String>,
    pub retry_count: u32,
    pub scheduled_for: Option<DateTime<Utc>>,
}

/// Queue a post's response for posting, carrying the stage-5 decision forward.
pub async fn insert(
    pool: &DbPool,
    organization_id: &str,
    post_id: &str,
    response_id: &str,
    priority: i32,
    cts_score: f64,
    requires_review: bool,
    decision_factors: &[String],
) -> Result<String, StorageError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO engagement_queue (
            id, organization_id, post_id, response_id, status, priority,
            cts_score, requires_review, decision_factors, retry_count,
            scheduled_for, created_at, updated_at
        ) VALUES (?, ?, ?, ?, 'queued', ?, ?, ?, ?, 0, NULL, ?, ?)",
    )
    .bind(&id)
    .bind(organization_id)
    .bind(post_id)
    .bind(response_id)
    .bind(priority)
    .bind(cts_score)
    .bind(requires_review as i32)
    .bind(serde_json::to_string(decision_factors).unwrap_or_else(|_| "[]".to_string()))
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    Ok(id)
}

#[derive(sqlx::FromRow)]
struct QueueRow {
    id: String,
    organization_id: String,
    post_id: String,
    response_id: String,
    status: String,
    priority: i32,
    cts_score: f64,
    requires_review: i32,
    decision_factors: String,
    retry_count: i64,
    scheduled_for: Option<String>,
}

impl QueueRow {
    fn into_entry(self) -> QueueEntry {
        QueueEntry {
            id: self.id,
            organization_id: self.organization_id,
            post_id: self.post_id,
            response_id: self.response_id,
            status: self.status,
            priority: self.priority,
            cts_score: self.cts_score,
            requires_review: self.requires_review != 0,
            decision_factors: serde_json::from_str(&self.decision_factors).unwrap_or_default(),
            retry_count: self.retry_count.max(0) as u32,
            scheduled_for: self
                .scheduled_for
                .and_then(|t| DateTime::parse_from_rfc3339(&t).ok())
                .map(|t| t.with_timezone(&Utc)),
        }
    }
}

/// Fetch one queue entry by its storage id.
pub async fn get(pool: &DbPool, id: &str) -> Result<Option<QueueEntry>, StorageError> {
    let row: Option<QueueRow> = sqlx::query_as("SELECT * FROM engagement_queue WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(row.map(QueueRow::into_entry))
}

/// List queue entries for one organization in a given status, highest
/// priority (lowest number) and oldest first.
pub async fn list_by_status(
    pool: &DbPool,
    organization_id: &str,
    status: &str,
    limit: i64,
) -> Result<Vec<QueueEntry>, StorageError> {
    let rows: Vec<QueueRow> = sqlx::query_as(
        "SELECT * FROM engagement_queue WHERE organization_id = ? AND status = ?
         ORDER BY priority ASC, created_at ASC LIMIT ?",
    )
    .bind(organization_id)
    .bind(status)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(rows.into_iter().map(QueueRow::into_entry).collect())
}

/// Move an entry to a new status, optionally bumping its retry count (pass
/// `bump_retry = true` on a retry-pending transition).
pub async fn update_status(
    pool: &DbPool,
    id: &str,
    status: &str,
    bump_retry: bool,
) -> Result<(), StorageError> {
    if bump_retry {
        sqlx::query(
            "UPDATE engagement_queue SET status = ?, retry_count = retry_count + 1, updated_at = ? WHERE id = ?",
        )
        .bind(status)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    } else {
        sqlx::query("UPDATE engagement_queue SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| StorageError::Query { source: e })?;
    }
    Ok(())
}

/// Reschedule an entry to a future time, e.g. for exponential-backoff retries.
pub async fn reschedule(
    pool: &DbPool,
    id: &str,
    scheduled_for: DateTime<Utc>,
) -> Result<(), StorageError> {
    sqlx::query("UPDATE engagement_queue SET scheduled_for = ?, updated_at = ? WHERE id = ?")
        .bind(scheduled_for.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::init_test_db;
    use std::collections::HashMap;

    async fn seed_post_and_response(pool: &DbPool) -> (String, String) {
        let post = crate::model::CrawledPost {
            external_id: "x".to_string(),
            external_url: "https://reddit.com/x".to_string(),
            content: "text".to_string(),
            content_type: crate::model::ContentType::Post,
            author_handle: None,
            author_display_name: None,
            platform_metadata: HashMap::new(),
            external_created_at: None,
            crawled_at: Utc::now(),
            platform: "reddit".to_string(),
            keywords_matched: vec![],
            engagement_metrics: HashMap::new(),
            parent_id: None,
        };
        let post_id = crate::storage::posts::insert(pool, "org1", &post).await.unwrap();
        let responses = crate::model::Responses::select_for_risk(
            crate::model::RiskLevel::Medium,
            "vf".to_string(),
            "sc".to_string(),
            "ctx".to_string(),
        );
        let cta = crate::model::Cta { cta_level: 1, cta_type: crate::model::CtaType::Soft };
        let response_id =
            crate::storage::responses::insert(pool, &post_id, "org1", &responses, &cta)
                .await
                .unwrap();
        (post_id, response_id)
    }

    #[tokio::test]
    async fn insert_then_get_roundtrips() {
        let pool = init_test_db().await.unwrap();
        let (post_id, response_id) = seed_post_and_response(&pool).await;

        let id = insert(
            &pool,
            "org1",
            &post_id,
            &response_id,
            2,
            0.75,
            false,
            &["cts above threshold".to_string()],
        )
        .await
        .unwrap();

        let entry = get(&pool, &id).await.unwrap().unwrap();
        assert_eq!(entry.status, "queued");
        assert_eq!(entry.priority, 2);
        assert_eq!(entry.retry_count, 0);
        assert!(!entry.requires_review);
    }

    #[tokio::test]
    async fn list_by_status_orders_by_priority_then_age() {
        let pool = init_test_db().await.unwrap();
        let (post_id, response_id) = seed_post_and_response(&pool).await;
        insert(&pool, "org1", &post_id, &response_id, 3, 0.5, false, &[]).await.unwrap();
        insert(&pool, "org1", &post_id, &response_id, 1, 0.9, false, &[]).await.unwrap();

        let queued = list_by_status(&pool, "org1", "queued", 10).await.unwrap();
        assert_eq!(queued.len(), 2);
        assert_eq!(queued[0].priority, 1);
    }

    #[tokio::test]
    async fn update_status_with_bump_retry_increments_count() {
        let pool = init_test_db().await.unwrap();
        let (post_id, response_id) = seed_post_and_response(&pool).await;
        let id = insert(&pool, "org1", &post_id, &response_id, 1, 0.9, false, &[])
            .await
            .unwrap();

        update_status(&pool, &id, "retry_pending", true).await.unwrap();
        let entry = get(&pool, &id).await.unwrap().unwrap();
        assert_eq!(entry.status, "retry_pending");
        assert_eq!(entry.retry_count, 1);
    }
}
