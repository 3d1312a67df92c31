/// User service - status line and profile
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{Post, User};
use uuid::Uuid;

#[derive(Clone)]
pub struct UserService {
    store: Store,
}

impl UserService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    async fn require_user(&self, user_id: Uuid) -> Result<User> {
        self.store
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))
    }

    pub async fn status(&self, user_id: Uuid) -> Result<String> {
        Ok(self.require_user(user_id).await?.status)
    }

    pub async fn update_status(&self, user_id: Uuid, status: &str) -> Result<User> {
        let status = status.trim();
        if status.is_empty() {
            return Err(AppError::invalid("No status to update with"));
        }

        self.store
            .users
            .update_status(user_id, status)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))
    }

    /// The user together with every post they created, newest first
    pub async fn profile(&self, user_id: Uuid) -> Result<(User, Vec<Post>)> {
        let user = self.require_user(user_id).await?;
        let posts = self.store.posts.list_by_creator(user.id).await?;
        Ok((user, posts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_STATUS;

    async fn seeded() -> (UserService, User) {
        let store = Store::memory();
        let user = User::new("ann@feed.dev".into(), "hash".into(), "Ann".into());
        store.users.insert(&user).await.unwrap();
        (UserService::new(store), user)
    }

    #[tokio::test]
    async fn test_status_roundtrip() {
        let (users, user) = seeded().await;
        assert_eq!(users.status(user.id).await.unwrap(), DEFAULT_STATUS);

        users.update_status(user.id, "  Writing  ").await.unwrap();
        assert_eq!(users.status(user.id).await.unwrap(), "Writing");
    }

    #[tokio::test]
    async fn test_empty_status_rejected() {
        let (users, user) = seeded().await;
        let err = users.update_status(user.id, "   ").await.unwrap_err();
        assert_eq!(err.to_string(), "No status to update with");
        assert_eq!(err.status().as_u16(), 422);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let (users, _) = seeded().await;
        let err = users.status(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.status().as_u16(), 404);
        assert!(users.profile(Uuid::new_v4()).await.is_err());
    }
}
