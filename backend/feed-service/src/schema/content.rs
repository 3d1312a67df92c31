//! Post queries and mutations

use super::types::{parse_post_id, PostData, PostInputData, PostObject};
use super::{current_user, services};
use crate::validators::PostInput;
use async_graphql::{Context, ErrorExtensions, Object, Result as GraphQLResult, ID};

/// GraphQL clients send this when they keep the current image
const UNCHANGED_IMAGE: &str = "undefined";

#[derive(Default)]
pub struct ContentQuery;

#[Object]
impl ContentQuery {
    /// One page of the feed, newest first
    async fn posts(&self, ctx: &Context<'_>, page: Option<i32>) -> GraphQLResult<PostData> {
        current_user(ctx)?;
        let page = services(ctx)?
            .posts
            .list(page.map(i64::from))
            .await
            .map_err(|e| e.extend())?;

        Ok(PostData {
            posts: page.posts.into_iter().map(PostObject).collect(),
            total_posts: page.total_items,
        })
    }

    async fn post(&self, ctx: &Context<'_>, id: ID) -> GraphQLResult<PostObject> {
        current_user(ctx)?;
        let post_id = parse_post_id(&id)?;
        let post = services(ctx)?
            .posts
            .get(post_id)
            .await
            .map_err(|e| e.extend())?;

        Ok(PostObject(post))
    }
}

#[derive(Default)]
pub struct ContentMutation;

#[Object]
impl ContentMutation {
    async fn create_post(
        &self,
        ctx: &Context<'_>,
        post_input: PostInputData,
    ) -> GraphQLResult<PostObject> {
        let user_id = current_user(ctx)?;
        let input = PostInput::new(&post_input.title, &post_input.content);
        let (post, _) = services(ctx)?
            .posts
            .create(user_id, input, Some(post_input.image_url))
            .await
            .map_err(|e| e.extend())?;

        Ok(PostObject(post))
    }

    async fn update_post(
        &self,
        ctx: &Context<'_>,
        id: ID,
        post_input: PostInputData,
    ) -> GraphQLResult<PostObject> {
        let user_id = current_user(ctx)?;
        let post_id = parse_post_id(&id)?;
        let input = PostInput::new(&post_input.title, &post_input.content);

        let image_url = Some(post_input.image_url)
            .filter(|url| !url.trim().is_empty() && url != UNCHANGED_IMAGE);

        let post = services(ctx)?
            .posts
            .update(user_id, post_id, input, image_url)
            .await
            .map_err(|e| e.extend())?;

        Ok(PostObject(post))
    }

    async fn delete_post(&self, ctx: &Context<'_>, id: ID) -> GraphQLResult<bool> {
        let user_id = current_user(ctx)?;
        let post_id = parse_post_id(&id)?;
        services(ctx)?
            .posts
            .delete(user_id, post_id)
            .await
            .map_err(|e| e.extend())?;

        Ok(true)
    }
}
