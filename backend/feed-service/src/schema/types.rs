//! GraphQL object and input types

use super::loaders::UserLoader;
use super::services;
use crate::error::AppError;
use crate::models::{Post, User};
use crate::realtime::{PostAction, PostEvent};
use async_graphql::dataloader::DataLoader;
use async_graphql::{
    Context, Enum, ErrorExtensions, InputObject, Object, Result as GraphQLResult, SimpleObject, ID,
};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

fn iso(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an `ID` argument; anything that is not a UUID cannot name a post
pub fn parse_post_id(id: &ID) -> GraphQLResult<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|_| AppError::post_not_found().extend())
}

pub struct UserObject(pub User);

#[Object(name = "User")]
impl UserObject {
    #[graphql(name = "_id")]
    async fn id(&self) -> ID {
        ID(self.0.id.to_string())
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn email(&self) -> &str {
        &self.0.email
    }

    async fn status(&self) -> &str {
        &self.0.status
    }

    /// Posts this user created, newest first
    async fn posts(&self, ctx: &Context<'_>) -> GraphQLResult<Vec<PostObject>> {
        let posts = services(ctx)?
            .posts
            .by_creator(self.0.id)
            .await
            .map_err(|e| e.extend())?;
        Ok(posts.into_iter().map(PostObject).collect())
    }
}

pub struct PostObject(pub Post);

#[Object(name = "Post")]
impl PostObject {
    #[graphql(name = "_id")]
    async fn id(&self) -> ID {
        ID(self.0.id.to_string())
    }

    async fn title(&self) -> &str {
        &self.0.title
    }

    async fn content(&self) -> &str {
        &self.0.content
    }

    async fn image_url(&self) -> &str {
        &self.0.image_url
    }

    async fn creator(&self, ctx: &Context<'_>) -> GraphQLResult<UserObject> {
        let loader = ctx.data::<DataLoader<UserLoader>>()?;
        let creator_id = self.0.creator.id;
        loader
            .load_one(creator_id)
            .await
            .map_err(|e| e.extend())?
            .map(UserObject)
            .ok_or_else(|| AppError::NotFound("Could not find user.".to_string()).extend())
    }

    async fn created_at(&self) -> String {
        iso(&self.0.created_at)
    }

    async fn updated_at(&self) -> String {
        iso(&self.0.updated_at)
    }
}

#[derive(SimpleObject)]
pub struct AuthData {
    pub token: String,
    pub user_id: String,
}

#[derive(SimpleObject)]
pub struct PostData {
    pub posts: Vec<PostObject>,
    pub total_posts: i64,
}

#[derive(InputObject)]
pub struct UserInputData {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(InputObject)]
pub struct PostInputData {
    pub title: String,
    pub content: String,
    pub image_url: String,
}

#[derive(Enum, Clone, Copy, PartialEq, Eq)]
#[graphql(name = "PostAction")]
pub enum PostActionKind {
    Create,
    Update,
    Delete,
}

impl From<PostAction> for PostActionKind {
    fn from(action: PostAction) -> Self {
        match action {
            PostAction::Create => PostActionKind::Create,
            PostAction::Update => PostActionKind::Update,
            PostAction::Delete => PostActionKind::Delete,
        }
    }
}

pub struct PostEventObject(pub PostEvent);

#[Object(name = "PostEvent")]
impl PostEventObject {
    async fn action(&self) -> PostActionKind {
        self.0.action.into()
    }

    async fn post_id(&self) -> ID {
        ID(self.0.post_id.to_string())
    }

    /// Absent for deletions
    async fn post(&self) -> Option<PostObject> {
        self.0.post.clone().map(PostObject)
    }
}
