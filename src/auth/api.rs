//! Authentication API Endpoints
//! Mission: Register, log in and describe the caller

use crate::{
    api::AppState,
    auth::models::{Identity, LoginRequest, RegisterRequest, TokenResponse, UserResponse},
    error::ApiError,
};
use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

/// Register endpoint - POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    info!(username = %payload.username, "registration attempt");
    let token = state.auth.register(payload).await?;
    Ok((StatusCode::CREATED, Json(token)))
}

/// Login endpoint - POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state.auth.login(payload).await?;
    Ok(Json(token))
}

/// Current user endpoint - GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.auth.current_user(&identity.user_id).await?;
    Ok(Json(UserResponse::from(&user)))
}
