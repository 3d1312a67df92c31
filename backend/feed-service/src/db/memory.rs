use super::{PostRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::models::{Creator, Post, PostDraft, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct PostRecord {
    seq: u64,
    id: Uuid,
    title: String,
    content: String,
    image_url: String,
    creator_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, PostRecord>,
    next_seq: u64,
}

impl State {
    fn hydrate(&self, record: &PostRecord) -> Result<Post> {
        let creator = self
            .users
            .get(&record.creator_id)
            .ok_or_else(|| AppError::Internal(format!("post {} has no creator", record.id)))?;

        Ok(Post {
            id: record.id,
            title: record.title.clone(),
            content: record.content.clone(),
            image_url: record.image_url.clone(),
            creator: Creator {
                id: creator.id,
                name: creator.name.clone(),
            },
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    /// Newest first; insertion order breaks timestamp ties
    fn sorted_posts<'a>(&'a self, filter: impl Fn(&PostRecord) -> bool) -> Vec<&'a PostRecord> {
        let mut records: Vec<&PostRecord> = self.posts.values().filter(|r| filter(r)).collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });
        records
    }
}

/// In-process store with the same semantics as the PostgreSQL repositories
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert(&self, user: &User) -> Result<()> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(AppError::UserExists);
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id).cloned())
            .collect())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_status(&self, id: Uuid, status: &str) -> Result<Option<User>> {
        let mut state = self.state.write().await;
        Ok(state.users.get_mut(&id).map(|user| {
            user.status = status.to_string();
            user.updated_at = Utc::now();
            user.clone()
        }))
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn count(&self) -> Result<i64> {
        Ok(self.state.read().await.posts.len() as i64)
    }

    async fn list_page(&self, offset: i64, limit: i64) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        state
            .sorted_posts(|_| true)
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|r| state.hydrate(r))
            .collect()
    }

    async fn list_by_creator(&self, creator_id: Uuid) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        state
            .sorted_posts(|r| r.creator_id == creator_id)
            .into_iter()
            .map(|r| state.hydrate(r))
            .collect()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>> {
        let state = self.state.read().await;
        state.posts.get(&id).map(|r| state.hydrate(r)).transpose()
    }

    async fn insert(&self, creator_id: Uuid, draft: &PostDraft) -> Result<Post> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&creator_id) {
            return Err(AppError::Database(format!(
                "creator {} does not exist",
                creator_id
            )));
        }

        let now = Utc::now();
        state.next_seq += 1;
        let record = PostRecord {
            seq: state.next_seq,
            id: Uuid::new_v4(),
            title: draft.title.clone(),
            content: draft.content.clone(),
            image_url: draft.image_url.clone(),
            creator_id,
            created_at: now,
            updated_at: now,
        };
        let post = state.hydrate(&record)?;
        state.posts.insert(record.id, record);
        Ok(post)
    }

    async fn update(&self, id: Uuid, draft: &PostDraft) -> Result<Option<Post>> {
        let mut state = self.state.write().await;
        let record = match state.posts.get_mut(&id) {
            Some(record) => {
                record.title = draft.title.clone();
                record.content = draft.content.clone();
                record.image_url = draft.image_url.clone();
                record.updated_at = Utc::now();
                record.clone()
            }
            None => return Ok(None),
        };
        state.hydrate(&record).map(Some)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.write().await.posts.remove(&id).is_some())
    }

    async fn image_creators(&self, image_url: &str) -> Result<Vec<Uuid>> {
        let state = self.state.read().await;
        let mut creators: Vec<Uuid> = state
            .posts
            .values()
            .filter(|r| r.image_url == image_url)
            .map(|r| r.creator_id)
            .collect();
        creators.sort();
        creators.dedup();
        Ok(creators)
    }
}
