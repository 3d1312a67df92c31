//! DataLoader implementations for batching creator lookups
//!
//! A page of posts resolves every `creator` through one `find_by_ids` call
//! instead of one query per post.

use crate::db::UserRepository;
use crate::error::AppError;
use crate::models::User;
use async_graphql::dataloader::Loader;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Batches user lookups by id
#[derive(Clone)]
pub struct UserLoader {
    users: Arc<dyn UserRepository>,
}

impl UserLoader {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait::async_trait]
impl Loader<Uuid> for UserLoader {
    type Value = User;
    type Error = AppError;

    async fn load(&self, keys: &[Uuid]) -> Result<HashMap<Uuid, Self::Value>, Self::Error> {
        tracing::debug!(batch = keys.len(), "loading users");
        let users = self.users.find_by_ids(keys).await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;

    #[tokio::test]
    async fn test_loader_skips_unknown_ids() {
        let store = Store::memory();
        let ann = User::new("ann@feed.dev".into(), "hash".into(), "Ann".into());
        store.users.insert(&ann).await.unwrap();

        let loader = UserLoader::new(store.users.clone());
        let loaded = loader.load(&[ann.id, Uuid::new_v4()]).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[&ann.id].name, "Ann");
    }
}
