use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, UserResponse};
use crate::services::{AuthContext, UpdateProfileInput};

/// GET /profile
pub async fn show(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = state.auth_service().get_profile(&ctx).await?;

    Ok(Json(ApiResponse::success(UserResponse { user })))
}

/// PUT /profile
/// Only `firstName` and `lastName` are read from the body.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    payload: Result<Json<UpdateProfileInput>, JsonRejection>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let Json(input) = payload?;
    let user = state.auth_service().update_profile(&ctx, input).await?;

    Ok(Json(
        ApiResponse::success(UserResponse { user }).with_message("Profile updated"),
    ))
}
