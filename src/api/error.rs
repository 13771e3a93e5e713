use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use std::fmt;

use super::ApiResponse;
use crate::services::{AuthError, FieldErrors};

#[derive(Debug)]
pub enum ApiError {
    Validation(FieldErrors),

    /// Body could not be read as JSON of the expected shape.
    MalformedBody(String),

    InvalidCredentials,

    MissingCredentials,

    MalformedCredentials,

    InvalidToken,

    ExpiredToken { expires_at: DateTime<Utc> },

    OtpExpiredOrMissing,

    InvalidOtp,

    NotFound(String),

    MethodNotSupported,

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(errors) => write!(
                f,
                "Validation error: {}",
                errors.first_message().unwrap_or("invalid input")
            ),
            Self::MalformedBody(msg) => write!(f, "Malformed body: {msg}"),
            Self::InvalidCredentials => write!(f, "Invalid credentials"),
            Self::MissingCredentials => write!(f, "Missing credentials"),
            Self::MalformedCredentials => write!(f, "Malformed credentials"),
            Self::InvalidToken => write!(f, "Invalid token"),
            Self::ExpiredToken { expires_at } => write!(f, "Token expired at {expires_at}"),
            Self::OtpExpiredOrMissing => write!(f, "Reset code expired or missing"),
            Self::InvalidOtp => write!(f, "Invalid reset code"),
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::MethodNotSupported => write!(f, "Method not supported"),
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::MalformedBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidCredentials
            | Self::MissingCredentials
            | Self::MalformedCredentials
            | Self::InvalidToken
            | Self::ExpiredToken { .. } => StatusCode::UNAUTHORIZED,
            Self::OtpExpiredOrMissing | Self::InvalidOtp => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotSupported => StatusCode::METHOD_NOT_ALLOWED,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::MalformedBody(_) => "validation_error",
            Self::InvalidCredentials => "invalid_credentials",
            Self::MissingCredentials => "missing_credentials",
            Self::MalformedCredentials => "malformed_credentials",
            Self::InvalidToken => "invalid_token",
            Self::ExpiredToken { .. } => "expired_token",
            Self::OtpExpiredOrMissing => "otp_expired",
            Self::InvalidOtp => "invalid_otp",
            Self::NotFound(_) => "not_found",
            Self::MethodNotSupported => "method_not_supported",
            Self::InternalError(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Validation(errors) => errors
                .first_message()
                .unwrap_or("The given data was invalid.")
                .to_string(),
            Self::MalformedBody(msg) => msg.clone(),
            Self::InvalidCredentials => "Invalid email or password.".to_string(),
            Self::MissingCredentials => "Authentication required.".to_string(),
            Self::MalformedCredentials => {
                "Authorization header must be of the form 'Bearer <token>'.".to_string()
            }
            Self::InvalidToken => "Invalid or revoked token.".to_string(),
            Self::ExpiredToken { .. } => "Token has expired.".to_string(),
            Self::OtpExpiredOrMissing => {
                "The reset code has expired or was never requested.".to_string()
            }
            Self::InvalidOtp => "The reset code is invalid.".to_string(),
            Self::NotFound(msg) => msg.clone(),
            Self::MethodNotSupported => "Method not supported for this route.".to_string(),
            Self::InternalError(_) => "An internal error occurred".to_string(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::InternalError(msg) = &self {
            tracing::error!("Internal error: {}", msg);
        }

        let status = self.status();
        let mut body = ApiResponse::<()>::error(self.code(), self.client_message());

        match self {
            Self::Validation(errors) => body.errors = Some(errors),
            Self::ExpiredToken { expires_at } => body.expired_at = Some(expires_at),
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(errors) => Self::Validation(errors),
            AuthError::DuplicateEmail => Self::Validation(FieldErrors::single(
                "email",
                "The email has already been taken.",
            )),
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::MissingCredentials => Self::MissingCredentials,
            AuthError::MalformedCredentials => Self::MalformedCredentials,
            AuthError::InvalidToken => Self::InvalidToken,
            AuthError::ExpiredToken { expires_at } => Self::ExpiredToken { expires_at },
            AuthError::OtpExpiredOrMissing => Self::OtpExpiredOrMissing,
            AuthError::InvalidOtp => Self::InvalidOtp,
            AuthError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::MalformedBody(rejection.body_text())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_duplicate_email_maps_to_field_error() {
        let (status, body) = body_json(AuthError::DuplicateEmail.into()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["errors"]["email"][0], "The email has already been taken.");
    }

    #[tokio::test]
    async fn test_expired_token_carries_timestamp() {
        let expires_at = Utc::now();
        let (status, body) = body_json(ApiError::ExpiredToken { expires_at }).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "expired_token");
        assert!(body["expiredAt"].is_string());
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let (status, body) = body_json(ApiError::internal("disk on fire at /var/db")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal_error");
        assert!(!body.to_string().contains("disk on fire"));
    }

    #[test]
    fn test_otp_errors_are_bad_request() {
        assert_eq!(ApiError::InvalidOtp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::OtpExpiredOrMissing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::OtpExpiredOrMissing.code(), "otp_expired");
    }
}
