//! CRUD for the `signals` table: stage-1 pipeline output per post.

use super::DbPool;
use crate::error::StorageError;
use crate::model::Signal;
use chrono::Utc;

/// Persist the signal-detection output for a post.
pub async fn insert(pool: &DbPool, post_id: &str, signal: &Signal) -> Result<String, StorageError> {
    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO signals (id, post_id, problem_category, emotional_intensity, keywords, confidence, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(post_id)
    .bind(&signal.problem_category)
    .bind(signal.emotional_intensity)
    .bind(serde_json::to_string(&signal.keywords).unwrap_or_else(|_| "[]".to_string()))
    .bind(signal.confidence)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(id)
}

#[derive(sqlx::FromRow)]
struct SignalRow {
    problem_category: String,
    emotional_intensity: f64,
    keywords: String,
    confidence: f64,
}

/// Fetch the signal recorded for a post, if any.
pub async fn get_for_post(pool: &DbPool, post_id: &str) -> Result<Option<Signal>, StorageError> {
    let row: Option<SignalRow> =
        sqlx::query_as("SELECT problem_category, emotional_intensity, keywords, confidence FROM signals WHERE post_id = ?")
            .bind(post_id)
            .fetch_optional(pool)
            .await
            .map_err(|e| StorageError::Query { source: e })?;

    Ok(row.map(|r| Signal {
        problem_category: r.problem_category,
        emotional_intensity: r.emotional_intensity,
        keywords: serde_json::from_str(&r.keywords).unwrap_or_default(),
        confidence: r.confidence,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{init_test_db, posts};
    use std::collections::HashMap;

    async fn seed_post(pool: &DbPool) -> String {
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
        posts::insert(pool, "org1", &post).await.unwrap()
    }

    #[tokio::test]
    async fn insert_then_get_roundtrips() {
        let pool = init_test_db().await.unwrap();
        let post_id = seed_post(&pool).await;
        let signal = Signal {
            problem_category: "financial_stress".to_string(),
            emotional_intensity: 0.6,
            keywords: vec!["budget".to_string()],
            confidence: 0.8,
        };
        insert(&pool, &post_id, &signal).await.unwrap();

        let fetched = get_for_post(&pool, &post_id).await.unwrap().unwrap();
        assert_eq!(fetched.problem_category, "financial_stress");
        assert_eq!(fetched.keywords, vec!["budget".to_string()]);
    }

    #[tokio::test]
    async fn get_for_post_returns_none_when_absent() {
        let pool = init_test_db().await.unwrap();
        let post_id = seed_post(&pool).await;
        assert!(get_for_post(&pool, &post_id).await.unwrap().is_none());
    }
}
