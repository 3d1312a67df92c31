/// Business logic shared by the REST handlers and GraphQL resolvers
pub mod auth;
pub mod posts;
pub mod users;

pub use auth::{AuthData, AuthService};
pub use posts::PostService;
pub use users::UserService;
