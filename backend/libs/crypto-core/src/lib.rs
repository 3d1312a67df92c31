//! Shared credential helpers: password hashing and signed access tokens.

pub mod jwt;
pub mod password;

pub use jwt::{Claims, JwtKeys};
pub use password::{hash_password, verify_password, PasswordError};
