/// Auth service - signup and login
use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::metrics::record_auth;
use crate::models::User;
use crate::validators::{self, normalize_email, SignupInput};
use crypto_core::{hash_password, verify_password, JwtKeys};
use std::sync::Arc;
use uuid::Uuid;

/// Token handed out by a successful login
#[derive(Debug, Clone)]
pub struct AuthData {
    pub token: String,
    pub user_id: Uuid,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, keys: JwtKeys) -> Self {
        Self { users, keys }
    }

    /// Register a new account and return it
    pub async fn signup(&self, email: &str, name: &str, password: &str) -> Result<User> {
        let input = SignupInput::new(email, password, name);
        validators::check(&input)?;

        if self.users.find_by_email(&input.email).await?.is_some() {
            record_auth("signup", false);
            return Err(AppError::UserExists);
        }

        let password_hash = hash_password(&input.password)?;
        let user = User::new(input.email, password_hash, input.name);
        if let Err(e) = self.users.insert(&user).await {
            record_auth("signup", false);
            return Err(e);
        }

        record_auth("signup", true);
        tracing::info!(user_id = %user.id, "user signed up");
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthData> {
        let email = normalize_email(email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            record_auth("login", false);
            return Err(AppError::InvalidCredentials(
                "A user with this email could not be found.".to_string(),
            ));
        };

        if !verify_password(password, &user.password_hash)? {
            record_auth("login", false);
            tracing::debug!(user_id = %user.id, "login rejected: wrong password");
            return Err(AppError::InvalidCredentials("Wrong password!".to_string()));
        }

        let token = self
            .keys
            .issue_token(user.id, &user.email)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))?;

        record_auth("login", true);
        Ok(AuthData {
            token,
            user_id: user.id,
        })
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }
}
