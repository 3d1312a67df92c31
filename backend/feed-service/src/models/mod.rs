/// Data models for feed-service
///
/// - User: account with hashed credentials and a free-form status line
/// - Post: titled entry with an image, owned by a user
/// - Creator: the `{ _id, name }` summary embedded in post payloads
///
/// JSON keys follow the public API: camelCase with `_id` for identifiers.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_STATUS: &str = "I am new!";

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, password_hash: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            name,
            status: DEFAULT_STATUS.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn as_creator(&self) -> Creator {
        Creator {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub creator: Creator,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a caller supplies when creating or editing a post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub image_url: String,
}

/// One page of the feed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub total_items: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_defaults() {
        let user = User::new("a@b.io".into(), "hash".into(), "Ann".into());
        assert_eq!(user.status, DEFAULT_STATUS);
        assert_eq!(user.created_at, user.updated_at);
        assert_eq!(user.as_creator().name, "Ann");
    }

    #[test]
    fn test_post_json_shape() {
        let user = User::new("a@b.io".into(), "hash".into(), "Ann".into());
        let post = Post {
            id: Uuid::new_v4(),
            title: "First post".into(),
            content: "Hello there".into(),
            image_url: "images/cat.png".into(),
            creator: user.as_creator(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["_id"], post.id.to_string());
        assert_eq!(json["imageUrl"], "images/cat.png");
        assert_eq!(json["creator"]["_id"], user.id.to_string());
        assert_eq!(json["creator"]["name"], "Ann");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("image_url").is_none());
    }
}
