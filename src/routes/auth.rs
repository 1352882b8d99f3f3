use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use validator::Validate;

use crate::dto::auth_dto::{AuthStatus, LoginRequest, LoginResponse, RegisterRequest};
use crate::dto::ApiResponse;
use crate::middleware::auth::Claims;
use crate::models::user::User;
use crate::AppState;

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> crate::error::Result<ApiResponse<User>> {
    let Json(req) = payload?;
    req.validate()?;
    let user = state
        .user_service
        .register(&req.username, &req.email, &req.password, req.role.as_deref())
        .await?;
    Ok(ApiResponse::with_message(user, "User registered"))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> crate::error::Result<ApiResponse<LoginResponse>> {
    let Json(req) = payload?;
    req.validate()?;
    let session = state.user_service.login(&req.username, &req.password).await?;
    Ok(ApiResponse::ok(LoginResponse {
        access_token: session.access_token,
        token_type: "bearer".to_string(),
        expires_in: session.expires_in_seconds,
        user: session.user,
    }))
}

#[axum::debug_handler]
pub async fn check_auth(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> crate::error::Result<ApiResponse<AuthStatus>> {
    let user = state.user_service.get_user(claims.sub).await?;
    Ok(ApiResponse::ok(AuthStatus {
        authenticated: true,
        user_id: user.id,
        username: user.username,
        role: user.role,
    }))
}
