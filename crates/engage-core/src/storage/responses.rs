//! CRUD for the `responses` table: stage-3 generated drafts plus the
//! selected variant, stage-4 CTA classification, and lifecycle status.

use super::DbPool;
use crate::error::StorageError;
use crate::model::{Cta, CtaType, ResponseType, Responses};
use chrono::Utc;
use serde::Serialize;

/// A persisted response, with the storage-assigned id and post linkage attached.
#[derive(Debug, Clone, Serialize)]
pub struct StoredResponse {
    pub id: String,
    pub post_id: String,
    pub organization_id: String,
    pub responses: Responses,
    pub cta: Cta,
    pub status: String,
}

/// Persist the selected response and its CTA classification for a post.
///
/// `variants` stores all three generated drafts (not just the selected one)
/// so a reviewer can inspect what was discarded.
pub async fn insert(
    pool: &DbPool,
    post_id: &str,
    organization_id: &str,
    responses: &Responses,
    cta: &Cta,
) -> Result<String, StorageError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    let response_type = serde_json::to_value(responses.selected_type)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let cta_type = serde_json::to_value(cta.cta_type)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let variants = serde_json::json!({
        "value_first": responses.value_first_response,
        "soft_cta": responses.soft_cta_response,
        "contextual": responses.contextual_response,
    })
    .to_string();

    sqlx::query(
        "INSERT INTO responses (
            id, post_id, organization_id, response_type, content, variants,
            cta_level, cta_type, status, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)",
    )
    .bind(&id)
    .bind(post_id)
    .bind(organization_id)
    .bind(response_type)
    .bind(&responses.selected_response)
    .bind(variants)
    .bind(cta.cta_level)
    .bind(cta_type)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    Ok(id)
}

#[derive(sqlx::FromRow)]
struct ResponseRow {
    id: String,
    post_id: String,
    organization_id: String,
    variants: String,
    content: String,
    response_type: String,
    cta_level: i32,
    cta_type: String,
    status: String,
}

impl ResponseRow {
    fn into_stored(self) -> StoredResponse {
        let variants: serde_json::Value =
            serde_json::from_str(&self.variants).unwrap_or_default();
        let field = |key: &str| {
            variants
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        let selected_type: ResponseType =
            serde_json::from_value(serde_json::Value::String(self.response_type))
                .unwrap_or(ResponseType::Contextual);

        StoredResponse {
            id: self.id,
            post_id: self.post_id,
            organization_id: self.organization_id,
            responses: Responses {
                value_first_response: field("value_first"),
                soft_cta_response: field("soft_cta"),
                contextual_response: field("contextual"),
                selected_response: self.content,
                selected_type,
            },
            cta: Cta {
                cta_level: self.cta_level,
                cta_type: serde_json::from_value(serde_json::Value::String(self.cta_type))
                    .unwrap_or(CtaType::None),
            },
            status: self.status,
        }
    }
}

/// Fetch one response by its storage id.
pub async fn get(pool: &DbPool, id: &str) -> Result<Option<StoredResponse>, StorageError> {
    let row: Option<ResponseRow> = sqlx::query_as("SELECT * FROM responses WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(row.map(ResponseRow::into_stored))
}

/// Look up the response generated for a post, if any.
pub async fn get_for_post(
    pool: &DbPool,
    post_id: &str,
) -> Result<Option<StoredResponse>, StorageError> {
    let row: Option<ResponseRow> = sqlx::query_as("SELECT * FROM responses WHERE post_id = ?")
        .bind(post_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(row.map(ResponseRow::into_stored))
}

/// Advance a response's lifecycle status (`pending` -> `approved` / `rejected` / `posted`).
pub async fn update_status(pool: &DbPool, id: &str, status: &str) -> Result<(), StorageError> {
    sqlx::query("UPDATE responses SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
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

    fn sample_responses() -> Responses {
        Responses::select_for_risk(
            crate::model::RiskLevel::Medium,
            "value first draft".to_string(),
            "soft cta draft".to_string(),
            "contextual draft".to_string(),
        )
    }

    #[tokio::test]
    async fn insert_then_get_roundtrips() {
        let pool = init_test_db().await.unwrap();
        let post_id = seed_post(&pool).await;
        let responses = sample_responses();
        let cta = Cta { cta_level: 2, cta_type: CtaType::Medium };

        let id = insert(&pool, &post_id, "org1", &responses, &cta).await.unwrap();
        let stored = get(&pool, &id).await.unwrap().unwrap();

        assert_eq!(stored.post_id, post_id);
        assert_eq!(stored.status, "pending");
        assert_eq!(stored.cta.cta_level, 2);
        assert_eq!(stored.responses.selected_response, "soft cta draft");
        assert_eq!(stored.responses.value_first_response, "value first draft");
    }

    #[tokio::test]
    async fn get_for_post_finds_by_post_id() {
        let pool = init_test_db().await.unwrap();
        let post_id = seed_post(&pool).await;
        let responses = sample_responses();
        let cta = Cta { cta_level: 1, cta_type: CtaType::Soft };
        insert(&pool, &post_id, "org1", &responses, &cta).await.unwrap();

        let found = get_for_post(&pool, &post_id).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn update_status_changes_status() {
        let pool = init_test_db().await.unwrap();
        let post_id = seed_post(&pool).await;
        let responses = sample_responses();
        let cta = Cta { cta_level: 1, cta_type: CtaType::Soft };
        let id = insert(&pool, &post_id, "org1", &responses, &cta).await.unwrap();

        update_status(&pool, &id, "approved").await.unwrap();
        let stored = get(&pool, &id).await.unwrap().unwrap();
        assert_eq!(stored.status, "approved");
    }
}
