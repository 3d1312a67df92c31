/// Feed Service Library
///
/// Blog/feed backend: signup and login, post CRUD with image uploads, a
/// per-user status line, and realtime post events. The same service layer is
/// exposed over REST and GraphQL.
///
/// # Modules
///
/// - `config`: environment configuration
/// - `db`: repository traits with PostgreSQL and in-memory stores
/// - `services`: business logic shared by both APIs
/// - `handlers`: REST endpoints
/// - `schema`: GraphQL schema and transport handlers
/// - `realtime`: post event broadcaster and `/socket` WebSocket
/// - `images`: upload storage and serving
/// - `middleware`: Bearer token resolution
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod images;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod realtime;
pub mod schema;
pub mod services;
pub mod validators;

pub use config::Config;
pub use error::{AppError, Result};

use actix_web::web;
use crypto_core::JwtKeys;
use db::Store;
use images::ImageStore;
use realtime::Broadcaster;
use services::{AuthService, PostService, UserService};

/// Shared application state handed to every handler and resolver
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub images: ImageStore,
    pub broadcaster: Broadcaster,
    pub auth: AuthService,
    pub posts: PostService,
    pub users: UserService,
}

impl AppState {
    pub fn new(
        store: Store,
        keys: JwtKeys,
        images: ImageStore,
        broadcaster: Broadcaster,
        posts_per_page: i64,
    ) -> Self {
        Self {
            auth: AuthService::new(store.users.clone(), keys),
            posts: PostService::new(
                store.clone(),
                images.clone(),
                broadcaster.clone(),
                posts_per_page,
            ),
            users: UserService::new(store.clone()),
            store,
            images,
            broadcaster,
        }
    }
}

/// Register every route. The caller supplies `web::Data<AppState>` and
/// `web::Data<schema::AppSchema>` and wraps the app in `AuthMiddleware`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::invalid(format!("Invalid JSON payload: {}", err)).into()
    }))
    .configure(handlers::configure)
    .route("/graphql", web::post().to(schema::graphql_handler))
    .route("/graphql", web::get().to(schema::graphql_get))
    .route("/socket", web::get().to(realtime::ws::socket_route))
    .route("/images/{file}", web::get().to(images::serve_image))
    .route("/metrics", web::get().to(metrics::serve_metrics));
}
