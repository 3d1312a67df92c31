/// Post service - handles post creation, retrieval, and management
///
/// Every successful write is published on the realtime broadcaster.
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::images::ImageStore;
use crate::models::{Creator, Post, PostDraft, PostPage};
use crate::realtime::{Broadcaster, PostEvent};
use crate::validators::{self, PostInput};
use uuid::Uuid;

#[derive(Clone)]
pub struct PostService {
    store: Store,
    images: ImageStore,
    broadcaster: Broadcaster,
    per_page: i64,
}

impl PostService {
    pub fn new(store: Store, images: ImageStore, broadcaster: Broadcaster, per_page: i64) -> Self {
        Self {
            store,
            images,
            broadcaster,
            per_page: per_page.max(1),
        }
    }

    /// One page of the feed, newest first. Pages below 1 read as page 1.
    pub async fn list(&self, page: Option<i64>) -> Result<PostPage> {
        let page = page.unwrap_or(1).max(1);
        let offset = (page - 1).saturating_mul(self.per_page);

        let total_items = self.store.posts.count().await?;
        let posts = self.store.posts.list_page(offset, self.per_page).await?;

        Ok(PostPage { posts, total_items })
    }

    pub async fn get(&self, post_id: Uuid) -> Result<Post> {
        self.store
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(AppError::post_not_found)
    }

    /// Create a post owned by `user_id`. `image_url` is the stored image path.
    pub async fn create(
        &self,
        user_id: Uuid,
        input: PostInput,
        image_url: Option<String>,
    ) -> Result<(Post, Creator)> {
        validators::check(&input)?;
        let image_url = image_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| AppError::invalid("No image provided."))?;
        let image_url = self.claim_image(user_id, &image_url).await?;

        let creator = self
            .store
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("Invalid user.".to_string()))?
            .as_creator();

        let draft = PostDraft {
            title: input.title,
            content: input.content,
            image_url,
        };
        let post = self.store.posts.insert(creator.id, &draft).await?;

        tracing::info!(post_id = %post.id, user_id = %creator.id, "post created");
        self.broadcaster.publish(PostEvent::created(post.clone()));
        Ok((post, creator))
    }

    /// Edit a post the caller created. `image_url` of `None` keeps the
    /// current image; a different path clears the previous file.
    pub async fn update(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        input: PostInput,
        image_url: Option<String>,
    ) -> Result<Post> {
        validators::check(&input)?;

        let existing = self.get(post_id).await?;
        if existing.creator.id != user_id {
            return Err(AppError::not_authorized());
        }

        let image_url = match image_url.filter(|url| !url.trim().is_empty()) {
            Some(url) if url != existing.image_url => self.claim_image(user_id, &url).await?,
            _ => existing.image_url.clone(),
        };

        let draft = PostDraft {
            title: input.title,
            content: input.content,
            image_url,
        };
        let post = self
            .store
            .posts
            .update(post_id, &draft)
            .await?
            .ok_or_else(AppError::post_not_found)?;

        if existing.image_url != post.image_url {
            self.release_image(&existing.image_url).await?;
        }

        tracing::info!(post_id = %post.id, "post updated");
        self.broadcaster.publish(PostEvent::updated(post.clone()));
        Ok(post)
    }

    pub async fn delete(&self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        let existing = self.get(post_id).await?;
        if existing.creator.id != user_id {
            return Err(AppError::not_authorized());
        }

        if !self.store.posts.delete(post_id).await? {
            return Err(AppError::post_not_found());
        }
        self.release_image(&existing.image_url).await?;

        tracing::info!(%post_id, "post deleted");
        self.broadcaster.publish(PostEvent::deleted(post_id));
        Ok(())
    }

    /// Every post `creator_id` wrote, newest first
    pub async fn by_creator(&self, creator_id: Uuid) -> Result<Vec<Post>> {
        self.store.posts.list_by_creator(creator_id).await
    }

    /// Clear an image replaced through `/post-image`. Files shown on another
    /// user's post are left alone.
    pub async fn discard_replaced_image(&self, user_id: Uuid, old_path: &str) -> Result<()> {
        let Some(path) = self.images.public_path(old_path) else {
            tracing::warn!(path = %old_path, "ignoring replaced image outside images directory");
            return Ok(());
        };
        if self.used_by_others(user_id, &path).await? {
            tracing::warn!(%user_id, %path, "refusing to clear an image another user's post shows");
            return Ok(());
        }

        self.images.clear_image(&path).await;
        Ok(())
    }

    /// Canonical path for an image `user_id` attaches to a post. A file shown
    /// on someone else's post is 403.
    async fn claim_image(&self, user_id: Uuid, raw: &str) -> Result<String> {
        let path = self
            .images
            .public_path(raw)
            .ok_or_else(|| AppError::invalid("Invalid image path."))?;
        if self.used_by_others(user_id, &path).await? {
            return Err(AppError::not_authorized());
        }
        Ok(path)
    }

    async fn used_by_others(&self, user_id: Uuid, path: &str) -> Result<bool> {
        let creators = self.store.posts.image_creators(path).await?;
        Ok(creators.iter().any(|id| *id != user_id))
    }

    /// Clear an image no post shows any more
    async fn release_image(&self, path: &str) -> Result<()> {
        if self.store.posts.image_creators(path).await?.is_empty() {
            self.images.clear_image(path).await;
        } else {
            tracing::debug!(%path, "image still in use, keeping file");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::realtime::PostAction;

    struct Fixture {
        posts: PostService,
        broadcaster: Broadcaster,
        owner: User,
        other: User,
        dir: tempfile::TempDir,
    }

    async fn fixture(per_page: i64) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::memory();
        let owner = User::new("ann@feed.dev".into(), "hash".into(), "Ann".into());
        let other = User::new("bob@feed.dev".into(), "hash".into(), "Bob".into());
        store.users.insert(&owner).await.unwrap();
        store.users.insert(&other).await.unwrap();

        let broadcaster = Broadcaster::new(16);
        let posts = PostService::new(
            store,
            ImageStore::new(dir.path(), 1024),
            broadcaster.clone(),
            per_page,
        );
        Fixture {
            posts,
            broadcaster,
            owner,
            other,
            dir,
        }
    }

    fn input(title: &str) -> PostInput {
        PostInput::new(title, "Some interesting content")
    }

    #[tokio::test]
    async fn test_create_broadcasts() {
        let f = fixture(2).await;
        let mut rx = f.broadcaster.subscribe();

        let (post, creator) = f
            .posts
            .create(f.owner.id, input("First post"), Some("images/a.png".into()))
            .await
            .unwrap();
        assert_eq!(creator.name, "Ann");
        assert_eq!(post.creator.id, f.owner.id);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.action, PostAction::Create);
        assert_eq!(event.post, Some(post));
    }

    #[tokio::test]
    async fn test_create_requires_image_and_user() {
        let f = fixture(2).await;

        let err = f
            .posts
            .create(f.owner.id, input("First post"), None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No image provided.");

        let err = f
            .posts
            .create(Uuid::new_v4(), input("First post"), Some("images/a.png".into()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid user.");
        assert_eq!(err.status().as_u16(), 401);
    }

    #[tokio::test]
    async fn test_create_validates_before_image_check() {
        let f = fixture(2).await;
        let err = f
            .posts
            .create(f.owner.id, PostInput::new("Hi", "Yo"), None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Validation failed.");
    }

    #[tokio::test]
    async fn test_pagination() {
        let f = fixture(2).await;
        for title in ["Post one", "Post two", "Post three"] {
            f.posts
                .create(f.owner.id, input(title), Some("images/a.png".into()))
                .await
                .unwrap();
        }

        let first = f.posts.list(Some(1)).await.unwrap();
        assert_eq!(first.total_items, 3);
        assert_eq!(first.posts.len(), 2);
        assert_eq!(first.posts[0].title, "Post three");

        let second = f.posts.list(Some(2)).await.unwrap();
        assert_eq!(second.posts.len(), 1);
        assert_eq!(second.posts[0].title, "Post one");

        let clamped = f.posts.list(Some(0)).await.unwrap();
        assert_eq!(clamped.posts[0].title, "Post three");
        assert!(f.posts.list(Some(9)).await.unwrap().posts.is_empty());
    }

    #[tokio::test]
    async fn test_update_only_by_creator() {
        let f = fixture(2).await;
        let (post, _) = f
            .posts
            .create(f.owner.id, input("Original"), Some("images/a.png".into()))
            .await
            .unwrap();

        let err = f
            .posts
            .update(f.other.id, post.id, input("Hijacked"), None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Not authorized!");
        assert_eq!(err.status().as_u16(), 403);

        let updated = f
            .posts
            .update(f.owner.id, post.id, input("Edited title"), None)
            .await
            .unwrap();
        assert_eq!(updated.title, "Edited title");
        assert_eq!(updated.image_url, "images/a.png");
    }

    #[tokio::test]
    async fn test_update_replaces_image_file() {
        let f = fixture(2).await;
        let old_file = f.dir.path().join("old.png");
        tokio::fs::write(&old_file, b"png").await.unwrap();

        let (post, _) = f
            .posts
            .create(f.owner.id, input("Original"), Some("images/old.png".into()))
            .await
            .unwrap();
        let mut rx = f.broadcaster.subscribe();

        let updated = f
            .posts
            .update(f.owner.id, post.id, input("Original"), Some("images/new.png".into()))
            .await
            .unwrap();
        assert_eq!(updated.image_url, "images/new.png");
        assert!(!old_file.exists());
        assert_eq!(rx.try_recv().unwrap().action, PostAction::Update);
    }

    #[tokio::test]
    async fn test_foreign_image_cannot_be_attached() {
        let f = fixture(2).await;
        let ann_file = f.dir.path().join("ann.png");
        tokio::fs::write(&ann_file, b"png").await.unwrap();
        let (ann_post, _) = f
            .posts
            .create(f.owner.id, input("Ann's post"), Some("images/ann.png".into()))
            .await
            .unwrap();

        // Bare file names resolve to the same stored image
        let err = f
            .posts
            .create(f.other.id, input("Bob's post"), Some("ann.png".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status().as_u16(), 403);

        let (bob_post, _) = f
            .posts
            .create(f.other.id, input("Bob's post"), Some("images/bob.png".into()))
            .await
            .unwrap();
        let err = f
            .posts
            .update(f.other.id, bob_post.id, input("Bob's post"), Some("images/ann.png".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status().as_u16(), 403);

        let err = f
            .posts
            .create(f.other.id, input("Bob's post"), Some("images/../etc".into()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid image path.");

        f.posts.delete(f.other.id, bob_post.id).await.unwrap();
        assert!(ann_file.exists());
        assert_eq!(f.posts.get(ann_post.id).await.unwrap().image_url, "images/ann.png");
    }

    #[tokio::test]
    async fn test_discard_replaced_image_respects_owner() {
        let f = fixture(2).await;
        let ann_file = f.dir.path().join("ann.png");
        tokio::fs::write(&ann_file, b"png").await.unwrap();
        f.posts
            .create(f.owner.id, input("Ann's post"), Some("images/ann.png".into()))
            .await
            .unwrap();

        f.posts
            .discard_replaced_image(f.other.id, "images/ann.png")
            .await
            .unwrap();
        assert!(ann_file.exists());

        f.posts
            .discard_replaced_image(f.owner.id, "images/ann.png")
            .await
            .unwrap();
        assert!(!ann_file.exists());
    }

    #[tokio::test]
    async fn test_shared_image_survives_until_last_post() {
        let f = fixture(2).await;
        let file = f.dir.path().join("shared.png");
        tokio::fs::write(&file, b"png").await.unwrap();

        let (first, _) = f
            .posts
            .create(f.owner.id, input("First post"), Some("images/shared.png".into()))
            .await
            .unwrap();
        let (second, _) = f
            .posts
            .create(f.owner.id, input("Second post"), Some("images/shared.png".into()))
            .await
            .unwrap();

        f.posts.delete(f.owner.id, first.id).await.unwrap();
        assert!(file.exists());
        f.posts.delete(f.owner.id, second.id).await.unwrap();
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn test_delete() {
        let f = fixture(2).await;
        let (post, _) = f
            .posts
            .create(f.owner.id, input("Doomed post"), Some("images/a.png".into()))
            .await
            .unwrap();

        let err = f.posts.delete(f.other.id, post.id).await.unwrap_err();
        assert_eq!(err.status().as_u16(), 403);

        let mut rx = f.broadcaster.subscribe();
        f.posts.delete(f.owner.id, post.id).await.unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.action, PostAction::Delete);
        assert_eq!(event.post_id, post.id);
        assert!(event.post.is_none());

        let err = f.posts.get(post.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Could not find post.");
        assert!(f.posts.by_creator(f.owner.id).await.unwrap().is_empty());
    }
}
