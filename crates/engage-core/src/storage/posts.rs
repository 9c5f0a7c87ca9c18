//! CRUD for the `posts` table: crawled content, deduped on `external_url`.

use super::DbPool;
use crate::error::StorageError;
use crate::model::{ContentType, CrawledPost};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A persisted post, with the storage-assigned id attached.
#[derive(Debug, Clone)]
pub struct StoredPost {
    pub id: String,
    pub organization_id: String,
    pub post: CrawledPost,
}

/// Insert a newly-crawled post, returning its generated id.
///
/// Callers should check [`find_by_external_url`] first; this does not dedupe
/// on its own (the `UNIQUE (platform, external_id)` constraint guards
/// against exact re-crawls, not the broader dedupe-by-url rule in §4.6).
pub async fn insert(
    pool: &DbPool,
    organization_id: &str,
    post: &CrawledPost,
) -> Result<String, StorageError> {
    let id = uuid::Uuid::new_v4().to_string();
    let content_type = serde_json::to_value(post.content_type)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();

    sqlx::query(
        "INSERT INTO posts (
            id, organization_id, platform, external_id, external_url, content,
            content_type, author_handle, author_display_name, platform_metadata,
            external_created_at, crawled_at, keywords_matched, engagement_metrics, parent_id
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(organization_id)
    .bind(&post.platform)
    .bind(&post.external_id)
    .bind(&post.external_url)
    .bind(&post.content)
    .bind(content_type)
    .bind(&post.author_handle)
    .bind(&post.author_display_name)
    .bind(serde_json::to_string(&post.platform_metadata).unwrap_or_else(|_| "{}".to_string()))
    .bind(post.external_created_at.map(|t| t.to_rfc3339()))
    .bind(post.crawled_at.to_rfc3339())
    .bind(serde_json::to_string(&post.keywords_matched).unwrap_or_else(|_| "[]".to_string()))
    .bind(serde_json::to_string(&post.engagement_metrics).unwrap_or_else(|_| "{}".to_string()))
    .bind(&post.parent_id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    Ok(id)
}

/// Look up a post by its external URL, the dedupe key used by the crawl
/// processor (§4.6: a post already seen at this URL is skipped, not
/// re-inserted).
pub async fn find_by_external_url(
    pool: &DbPool,
    external_url: &str,
) -> Result<Option<String>, StorageError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT id FROM posts WHERE external_url = ?")
        .bind(external_url)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(row.map(|(id,)| id))
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: String,
    organization_id: String,
    platform: String,
    external_id: String,
    external_url: String,
    content: String,
    content_type: String,
    author_handle: Option<String>,
    author_display_name: Option<String>,
    platform_metadata: String,
    external_created_at: Option<String>,
    crawled_at: String,
    keywords_matched: String,
    engagement_metrics: String,
    parent_id: Option<String>,
}

impl PostRow {
    fn into_stored(self) -> StoredPost {
        let content_type: ContentType =
            serde_json::from_value(serde_json::Value::String(self.content_type))
                .unwrap_or(ContentType::Post);

        StoredPost {
            id: self.id,
            organization_id: self.organization_id,
            post: CrawledPost {
                external_id: self.external_id,
                external_url: self.external_url,
                content: self.content,
                content_type,
                author_handle: self.author_handle,
                author_display_name: self.author_display_name,
                platform_metadata: serde_json::from_str(&self.platform_metadata)
                    .unwrap_or_default(),
                external_created_at: self
                    .external_created_at
                    .and_then(|t| DateTime::parse_from_rfc3339(&t).ok())
                    .map(|t| t.with_timezone(&Utc)),
                crawled_at: DateTime::parse_from_rfc3339(&self.crawled_at)
                    .map(|t| t.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
                platform: self.platform,
                keywords_matched: serde_json::from_str(&self.keywords_matched)
                    .unwrap_or_default(),
                engagement_metrics: serde_json::from_str(&self.engagement_metrics)
                    .unwrap_or_else(|_| HashMap::new()),
                parent_id: self.parent_id,
            },
        }
    }
}

/// Fetch one post by its storage id.
pub async fn get(pool: &DbPool, id: &str) -> Result<Option<StoredPost>, StorageError> {
    let row: Option<PostRow> = sqlx::query_as("SELECT * FROM posts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(row.map(PostRow::into_stored))
}

/// List the most recently crawled posts for one organization.
pub async fn list_recent(
    pool: &DbPool,
    organization_id: &str,
    limit: i64,
) -> Result<Vec<StoredPost>, StorageError> {
    let rows: Vec<PostRow> = sqlx::query_as(
        "SELECT * FROM posts WHERE organization_id = ? ORDER BY crawled_at DESC LIMIT ?",
    )
    .bind(organization_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(rows.into_iter().map(PostRow::into_stored).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::init_test_db;

    fn sample_post() -> CrawledPost {
        CrawledPost {
            external_id: "abc123".to_string(),
            external_url: "https://reddit.com/r/test/abc123".to_string(),
            content: "struggling with money as a couple".to_string(),
            content_type: ContentType::Post,
            author_handle: Some("someuser".to_string()),
            author_display_name: Some("someuser".to_string()),
            platform_metadata: HashMap::new(),
            external_created_at: Some(Utc::now()),
            crawled_at: Utc::now(),
            platform: "reddit".to_string(),
            keywords_matched: vec!["money".to_string()],
            engagement_metrics: HashMap::new(),
            parent_id: None,
        }
    }

    #[tokio::test]
    async fn insert_then_find_by_url_roundtrips() {
        let pool = init_test_db().await.unwrap();
        let post = sample_post();
        let id = insert(&pool, "org1", &post).await.unwrap();

        let found = find_by_external_url(&pool, &post.external_url).await.unwrap();
        assert_eq!(found, Some(id.clone()));

        let stored = get(&pool, &id).await.unwrap().unwrap();
        assert_eq!(stored.post.external_id, "abc123");
        assert_eq!(stored.organization_id, "org1");
        assert_eq!(stored.post.keywords_matched, vec!["money".to_string()]);
    }

    #[tokio::test]
    async fn find_by_url_returns_none_when_absent() {
        let pool = init_test_db().await.unwrap();
        let found = find_by_external_url(&pool, "https://nope").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn list_recent_orders_newest_first() {
        let pool = init_test_db().await.unwrap();
        let mut older = sample_post();
        older.external_url = "https://reddit.com/r/test/older".to_string();
        older.external_id = "older".to_string();
        older.crawled_at = Utc::now() - chrono::Duration::hours(1);
        insert(&pool, "org1", &older).await.unwrap();

        let newer = sample_post();
        insert(&pool, "org1", &newer).await.unwrap();

        let recent = list_recent(&pool, "org1", 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].post.external_id, "abc123");
    }
}
