//! CRUD for the `risk_scores` table: stage-2 pipeline output per post.

use super::DbPool;
use crate::error::StorageError;
use crate::model::{Risk, RiskLevel};
use chrono::Utc;

/// Persist the risk-scoring output for a post.
pub async fn insert(pool: &DbPool, post_id: &str, risk: &Risk) -> Result<String, StorageError> {
    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO risk_scores (id, post_id, risk_level, risk_score, risk_factors, context_flags, recommended_action, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(post_id)
    .bind(risk.risk_level.as_str())
    .bind(risk.risk_score)
    .bind(serde_json::to_string(&risk.risk_factors).unwrap_or_else(|_| "[]".to_string()))
    .bind(serde_json::to_string(&risk.context_flags).unwrap_or_else(|_| "[]".to_string()))
    .bind(&risk.recommended_action)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(id)
}

#[derive(sqlx::FromRow)]
struct RiskRow {
    risk_level: String,
    risk_score: f64,
    risk_factors: String,
    context_flags: String,
    recommended_action: String,
}

/// Fetch the risk score recorded for a post, if any.
pub async fn get_for_post(pool: &DbPool, post_id: &str) -> Result<Option<Risk>, StorageError> {
    let row: Option<RiskRow> = sqlx::query_as(
        "SELECT risk_level, risk_score, risk_factors, context_flags, recommended_action FROM risk_scores WHERE post_id = ?",
    )
    .bind(post_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    Ok(row.map(|r| Risk {
        risk_level: match r.risk_level.as_str() {
            "low" => RiskLevel::Low,
            "medium" => RiskLevel::Medium,
            "high" => RiskLevel::High,
            _ => RiskLevel::Blocked,
        },
        risk_score: r.risk_score,
        risk_factors: serde_json::from_str(&r.risk_factors).unwrap_or_default(),
        context_flags: serde_json::from_str(&r.context_flags).unwrap_or_default(),
        recommended_action: r.recommended_action,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::init_test_db;
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
        crate::storage::posts::insert(pool, "org1", &post).await.unwrap()
    }

    #[tokio::test]
    async fn insert_then_get_roundtrips() {
        let pool = init_test_db().await.unwrap();
        let post_id = seed_post(&pool).await;
        let risk = Risk {
            risk_level: RiskLevel::Medium,
            risk_score: 0.5,
            risk_factors: vec!["mild distress".to_string()],
            context_flags: vec![],
            recommended_action: "engage with care".to_string(),
        };
        insert(&pool, &post_id, &risk).await.unwrap();

        let fetched = get_for_post(&pool, &post_id).await.unwrap().unwrap();
        assert_eq!(fetched.risk_level, RiskLevel::Medium);
        assert_eq!(fetched.risk_score, 0.5);
    }
}
