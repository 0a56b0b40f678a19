//! Post row operations

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;

/// Stored post row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub department_id: String,
    pub admin_name: Option<String>,
    pub caption: String,
    pub image_url: Option<String>,
    pub created_at: String,
}

/// New post fields
#[derive(Debug, Clone)]
pub struct NewPost<'a> {
    pub department_id: &'a str,
    pub admin_name: Option<&'a str>,
    pub caption: &'a str,
    pub image_url: Option<&'a str>,
}

/// Post repository
pub struct PostRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PostRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, new: NewPost<'_>) -> Result<Post> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO posts (id, department_id, admin_name, caption, image_url, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(new.department_id)
        .bind(new.admin_name)
        .bind(new.caption)
        .bind(new.image_url)
        .bind(&created_at)
        .execute(self.pool)
        .await?;

        Ok(Post {
            id,
            department_id: new.department_id.to_string(),
            admin_name: new.admin_name.map(str::to_string),
            caption: new.caption.to_string(),
            image_url: new.image_url.map(str::to_string),
            created_at,
        })
    }

    /// Department feed, newest first.
    pub async fn list_department(
        &self,
        department_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, department_id, admin_name, caption, image_url, created_at
            FROM posts
            WHERE department_id = ?
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(department_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(posts)
    }

    /// Public feed across departments, optionally filtered to one.
    pub async fn list_public(
        &self,
        department_id: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, department_id, admin_name, caption, image_url, created_at
            FROM posts
            WHERE (? IS NULL OR department_id = ?)
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(department_id)
        .bind(department_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(posts)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, department_id, admin_name, caption, image_url, created_at
            FROM posts
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(post)
    }

    /// Delete a post, scoped to its owning department.
    pub async fn delete(&self, id: &str, department_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ? AND department_id = ?")
            .bind(id)
            .bind(department_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    async fn seed(pool: &SqlitePool, department: &str, caption: &str) -> Post {
        PostRepository::new(pool)
            .insert(NewPost {
                department_id: department,
                admin_name: Some("Dana"),
                caption,
                image_url: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_department_feed_is_scoped() {
        let pool = test_pool().await;
        seed(&pool, "ceit", "first").await;
        seed(&pool, "ceit", "second").await;
        seed(&pool, "math", "other").await;

        let repo = PostRepository::new(&pool);
        let posts = repo.list_department("ceit", 20, 0).await.unwrap();
        assert_eq!(posts.len(), 2);
        assert!(posts.iter().all(|p| p.department_id == "ceit"));
    }

    #[tokio::test]
    async fn test_public_feed_optionally_filters() {
        let pool = test_pool().await;
        seed(&pool, "ceit", "a").await;
        seed(&pool, "math", "b").await;

        let repo = PostRepository::new(&pool);
        assert_eq!(repo.list_public(None, 20, 0).await.unwrap().len(), 2);
        assert_eq!(repo.list_public(Some("math"), 20, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_limit_and_offset_bound_the_page() {
        let pool = test_pool().await;
        for i in 0..5 {
            seed(&pool, "ceit", &format!("post {}", i)).await;
        }

        let repo = PostRepository::new(&pool);
        let page = repo.list_department("ceit", 2, 0).await.unwrap();
        assert_eq!(page.len(), 2);
        let rest = repo.list_department("ceit", 30, 4).await.unwrap();
        assert_eq!(rest.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_requires_matching_department() {
        let pool = test_pool().await;
        let post = seed(&pool, "ceit", "mine").await;

        let repo = PostRepository::new(&pool);
        assert!(!repo.delete(&post.id, "math").await.unwrap());
        assert!(repo.delete(&post.id, "ceit").await.unwrap());
        assert!(repo.get(&post.id).await.unwrap().is_none());
    }
}
