//! The signed-in user's profile and status

use super::types::UserObject;
use super::{current_user, services};
use async_graphql::{Context, ErrorExtensions, Object, Result as GraphQLResult};

#[derive(Default)]
pub struct UserQuery;

#[Object]
impl UserQuery {
    async fn user(&self, ctx: &Context<'_>) -> GraphQLResult<UserObject> {
        let user_id = current_user(ctx)?;
        let (user, _) = services(ctx)?
            .users
            .profile(user_id)
            .await
            .map_err(|e| e.extend())?;

        Ok(UserObject(user))
    }
}

#[derive(Default)]
pub struct UserMutation;

#[Object]
impl UserMutation {
    /// Returns the stored status
    async fn update_status(&self, ctx: &Context<'_>, status: String) -> GraphQLResult<String> {
        let user_id = current_user(ctx)?;
        let user = services(ctx)?
            .users
            .update_status(user_id, &status)
            .await
            .map_err(|e| e.extend())?;

        Ok(user.status)
    }
}
