use super::PostRepository;
use crate::error::Result;
use crate::models::{Creator, Post, PostDraft};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Post row joined with its creator's name
#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    title: String,
    content: String,
    image_url: String,
    creator_id: Uuid,
    creator_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            title: row.title,
            content: row.content,
            image_url: row.image_url,
            creator: Creator {
                id: row.creator_id,
                name: row.creator_name,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM posts")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get::<i64, _>("count"))
    }

    async fn list_page(&self, offset: i64, limit: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT p.id, p.title, p.content, p.image_url, p.creator_id,
                   u.name AS creator_name, p.created_at, p.updated_at
            FROM posts p
            JOIN users u ON u.id = p.creator_id
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn list_by_creator(&self, creator_id: Uuid) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT p.id, p.title, p.content, p.image_url, p.creator_id,
                   u.name AS creator_name, p.created_at, p.updated_at
            FROM posts p
            JOIN users u ON u.id = p.creator_id
            WHERE p.creator_id = $1
            ORDER BY p.created_at DESC, p.id DESC
            "#,
        )
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT p.id, p.title, p.content, p.image_url, p.creator_id,
                   u.name AS creator_name, p.created_at, p.updated_at
            FROM posts p
            JOIN users u ON u.id = p.creator_id
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Post::from))
    }

    async fn insert(&self, creator_id: Uuid, draft: &PostDraft) -> Result<Post> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            WITH inserted AS (
                INSERT INTO posts (id, title, content, image_url, creator_id)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, title, content, image_url, creator_id, created_at, updated_at
            )
            SELECT i.id, i.title, i.content, i.image_url, i.creator_id,
                   u.name AS creator_name, i.created_at, i.updated_at
            FROM inserted i
            JOIN users u ON u.id = i.creator_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(&draft.image_url)
        .bind(creator_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update(&self, id: Uuid, draft: &PostDraft) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            WITH updated AS (
                UPDATE posts
                SET title = $2, content = $3, image_url = $4, updated_at = NOW()
                WHERE id = $1
                RETURNING id, title, content, image_url, creator_id, created_at, updated_at
            )
            SELECT d.id, d.title, d.content, d.image_url, d.creator_id,
                   u.name AS creator_name, d.created_at, d.updated_at
            FROM updated d
            JOIN users u ON u.id = d.creator_id
            "#,
        )
        .bind(id)
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(&draft.image_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Post::from))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn image_creators(&self, image_url: &str) -> Result<Vec<Uuid>> {
        let creators = sqlx::query_scalar::<_, Uuid>(
            "SELECT DISTINCT creator_id FROM posts WHERE image_url = $1",
        )
        .bind(image_url)
        .fetch_all(&self.pool)
        .await?;

        Ok(creators)
    }
}
