/// Auth handlers - signup, login and the caller's status line
use crate::error::Result;
use crate::middleware::AuthenticatedUser;
use crate::AppState;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Missing fields deserialize as empty strings so they surface as validation errors
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub message: &'static str,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
}

/// PUT /auth/signup
pub async fn signup(
    state: web::Data<AppState>,
    req: web::Json<SignupRequest>,
) -> Result<HttpResponse> {
    let user = state
        .auth
        .signup(&req.email, &req.name, &req.password)
        .await?;

    Ok(HttpResponse::Created().json(SignupResponse {
        message: "User created!",
        user_id: user.id,
    }))
}

/// POST /auth/login
pub async fn login(
    state: web::Data<AppState>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let data = state.auth.login(&req.email, &req.password).await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        token: data.token,
        user_id: data.user_id,
    }))
}

/// GET /auth/status
pub async fn get_status(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let status = state.users.status(user.0).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "User status fetched",
        "status": status,
    })))
}

/// PATCH /auth/status
pub async fn update_status(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<StatusRequest>,
) -> Result<HttpResponse> {
    state.users.update_status(user.0, &req.status).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Status updated successfully",
    })))
}
