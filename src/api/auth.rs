use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, SessionResponse};
use crate::services::{
    AuthContext, ForgotPasswordInput, LoginInput, ResetPasswordInput, SignupInput,
};

/// Sent for every well-formed forgot-password request, registered or not.
pub const RESET_REQUESTED_MESSAGE: &str =
    "If an account exists for that email, a password reset code has been sent.";

/// POST /signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SignupInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<SessionResponse>>), ApiError> {
    let Json(input) = payload?;
    let session = state.auth_service().signup(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(SessionResponse::from(session)).with_message("Registered")),
    ))
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    let Json(input) = payload?;
    let session = state.auth_service().login(input).await?;

    Ok(Json(
        ApiResponse::success(SessionResponse::from(session)).with_message("Logged in"),
    ))
}

/// POST /forgot-password
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ForgotPasswordInput>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let Json(input) = payload?;
    state.auth_service().forgot_password(input).await?;

    Ok(Json(ApiResponse::ack(RESET_REQUESTED_MESSAGE)))
}

/// POST /reset-password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ResetPasswordInput>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let Json(input) = payload?;
    state.auth_service().reset_password(input).await?;

    Ok(Json(ApiResponse::ack(
        "Password has been reset. Please log in again.",
    )))
}

/// POST /logout
/// Revokes only the token this request carried.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.auth_service().logout(&ctx).await?;

    Ok(Json(ApiResponse::ack("Logged out")))
}
