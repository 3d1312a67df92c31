//! GraphQL schema
//!
//! Resolvers call the same services as the REST handlers. The caller's
//! `AuthState` is attached to each request (or WebSocket connection) by the
//! transport handlers below.

pub mod auth;
pub mod content;
pub mod loaders;
pub mod subscription;
pub mod types;
pub mod user;

use crate::middleware::AuthState;
use crate::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use async_graphql::dataloader::DataLoader;
use async_graphql::http::GraphiQLSource;
use async_graphql::{Context, Data, ErrorExtensions, MergedObject, Result as GraphQLResult, Schema};
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse, GraphQLSubscription};
use uuid::Uuid;

/// Root query object
#[derive(MergedObject, Default)]
pub struct QueryRoot(auth::AuthQuery, content::ContentQuery, user::UserQuery);

/// Root mutation object
#[derive(MergedObject, Default)]
pub struct MutationRoot(auth::AuthMutation, content::ContentMutation, user::UserMutation);

pub type AppSchema = Schema<QueryRoot, MutationRoot, subscription::SubscriptionRoot>;

pub fn build_schema(state: AppState) -> AppSchema {
    let users = state.store.users.clone();
    Schema::build(
        QueryRoot::default(),
        MutationRoot::default(),
        subscription::SubscriptionRoot,
    )
    .data(DataLoader::new(loaders::UserLoader::new(users), tokio::spawn))
    .data(state)
    .finish()
}

pub(crate) fn services<'a>(ctx: &Context<'a>) -> GraphQLResult<&'a AppState> {
    ctx.data::<AppState>()
}

/// The caller's id, or a 401 error
pub(crate) fn current_user(ctx: &Context<'_>) -> GraphQLResult<Uuid> {
    ctx.data_opt::<AuthState>()
        .copied()
        .unwrap_or_default()
        .require()
        .map_err(|e| e.extend())
}

/// POST /graphql
pub async fn graphql_handler(
    schema: web::Data<AppSchema>,
    auth: AuthState,
    req: GraphQLRequest,
) -> GraphQLResponse {
    schema.execute(req.into_inner().data(auth)).await.into()
}

/// GET /graphql - WebSocket upgrade for subscriptions, GraphiQL otherwise
pub async fn graphql_get(
    schema: web::Data<AppSchema>,
    state: web::Data<AppState>,
    auth: AuthState,
    req: HttpRequest,
    payload: web::Payload,
) -> actix_web::Result<HttpResponse> {
    let is_upgrade = req
        .headers()
        .get("upgrade")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);

    if !is_upgrade {
        return Ok(HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(
                GraphiQLSource::build()
                    .endpoint("/graphql")
                    .subscription_endpoint("/graphql")
                    .finish(),
            ));
    }

    // Browsers cannot set headers on a WebSocket; accept the token in the
    // connection_init payload as well.
    let keys = state.auth.keys().clone();
    GraphQLSubscription::new(schema.as_ref().clone())
        .on_connection_init(move |value| {
            async move {
                let header = value
                    .get("Authorization")
                    .or_else(|| value.get("authorization"))
                    .and_then(|v| v.as_str())
                    .map(str::to_owned);
                let resolved = match header {
                    Some(h) => AuthState::from_header(Some(&h), &keys),
                    None => auth,
                };
                let mut data = Data::default();
                data.insert(resolved);
                Ok(data)
            }
        })
        .start(&req, payload)
}
