//! Authentication schema and resolvers

use super::services;
use super::types::{AuthData, UserInputData, UserObject};
use async_graphql::{Context, ErrorExtensions, Object, Result as GraphQLResult};

#[derive(Default)]
pub struct AuthQuery;

#[Object]
impl AuthQuery {
    async fn login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> GraphQLResult<AuthData> {
        let data = services(ctx)?
            .auth
            .login(&email, &password)
            .await
            .map_err(|e| e.extend())?;

        Ok(AuthData {
            token: data.token,
            user_id: data.user_id.to_string(),
        })
    }
}

#[derive(Default)]
pub struct AuthMutation;

#[Object]
impl AuthMutation {
    async fn create_user(
        &self,
        ctx: &Context<'_>,
        user_input: UserInputData,
    ) -> GraphQLResult<UserObject> {
        let user = services(ctx)?
            .auth
            .signup(&user_input.email, &user_input.name, &user_input.password)
            .await
            .map_err(|e| e.extend())?;

        Ok(UserObject(user))
    }
}
