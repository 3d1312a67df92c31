/// HTTP middleware for feed-service
///
/// `AuthMiddleware` decodes an optional Bearer token and records the outcome
/// as an [`AuthState`] request extension. It never rejects a request; routes
/// that need a user ask for [`AuthenticatedUser`], GraphQL resolvers check the
/// `AuthState` handed to the schema.
use crate::error::AppError;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use crypto_core::JwtKeys;
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use uuid::Uuid;

/// Who is calling, as far as the Authorization header tells
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user_id: Option<Uuid>,
}

impl AuthState {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn is_auth(&self) -> bool {
        self.user_id.is_some()
    }

    /// The caller's id, or 401 "Not authenticated."
    pub fn require(&self) -> Result<Uuid, AppError> {
        self.user_id.ok_or_else(AppError::not_authenticated)
    }

    /// Decode an `Authorization` header value
    pub fn from_header(header: Option<&str>, keys: &JwtKeys) -> Self {
        let Some(token) = header.and_then(|h| h.strip_prefix("Bearer ")) else {
            return Self::anonymous();
        };

        match keys.validate_token(token.trim()).and_then(|c| c.user_id()) {
            Ok(user_id) => Self::user(user_id),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring invalid bearer token");
                Self::anonymous()
            }
        }
    }
}

/// Actix middleware that resolves the Bearer token into an [`AuthState`].
pub struct AuthMiddleware {
    keys: JwtKeys,
}

impl AuthMiddleware {
    pub fn new(keys: JwtKeys) -> Self {
        Self { keys }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            keys: self.keys.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    keys: JwtKeys,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok());
        let state = AuthState::from_header(header, &self.keys);
        req.extensions_mut().insert(state);

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}

impl FromRequest for AuthState {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(Ok(req
            .extensions()
            .get::<AuthState>()
            .copied()
            .unwrap_or_default()))
    }
}

/// Extractor for routes that need a signed-in user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Uuid);

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let state = req
            .extensions()
            .get::<AuthState>()
            .copied()
            .unwrap_or_default();
        ready(state.require().map(AuthenticatedUser).map_err(Error::from))
    }
}
