/// Persistence layer
///
/// Handlers and services talk to the `UserRepository` / `PostRepository`
/// traits through a cloneable [`Store`]. `Store::postgres` is the PostgreSQL
/// implementation; `MemoryStore` keeps everything in process and backs tests
/// and database-less local runs.
pub mod memory;
pub mod post_repo;
pub mod user_repo;

use crate::error::Result;
use crate::models::{Post, PostDraft, User};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

pub use memory::MemoryStore;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user. A taken email yields `AppError::UserExists`.
    async fn insert(&self, user: &User) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Fetch several users at once; unknown ids are skipped
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Returns the updated user, or `None` if it does not exist
    async fn update_status(&self, id: Uuid, status: &str) -> Result<Option<User>>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn count(&self) -> Result<i64>;

    /// Newest first
    async fn list_page(&self, offset: i64, limit: i64) -> Result<Vec<Post>>;

    /// Newest first
    async fn list_by_creator(&self, creator_id: Uuid) -> Result<Vec<Post>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>>;

    async fn insert(&self, creator_id: Uuid, draft: &PostDraft) -> Result<Post>;

    /// Replace title, content and image; `None` if the post does not exist
    async fn update(&self, id: Uuid, draft: &PostDraft) -> Result<Option<Post>>;

    /// `true` if a post was removed
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Creators of the posts currently showing `image_url`
    async fn image_creators(&self, image_url: &str) -> Result<Vec<Uuid>>;
}

/// Handle to both repositories
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
}

impl Store {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(user_repo::PgUserRepository::new(pool.clone())),
            posts: Arc::new(post_repo::PgPostRepository::new(pool)),
        }
    }

    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::default());
        Self {
            users: store.clone(),
            posts: store,
        }
    }
}

/// Apply the bundled schema migrations
pub async fn run_migrations(pool: &PgPool) -> std::result::Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations completed successfully");
    Ok(())
}
