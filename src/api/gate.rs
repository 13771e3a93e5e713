//! Route table and the bearer token gate in front of protected routes.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
    routing::MethodFilter,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{ApiError, AppState};
use crate::constants::auth::TOKEN_TYPE;
use crate::crypto;
use crate::services::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected,
}

/// Every route the service answers. The router is built from this table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Signup,
    Login,
    ForgotPassword,
    ResetPassword,
    Health,
    ShowProfile,
    UpdateProfile,
    Logout,
    Metrics,
}

impl Route {
    pub const ALL: [Self; 9] = [
        Self::Signup,
        Self::Login,
        Self::ForgotPassword,
        Self::ResetPassword,
        Self::Health,
        Self::ShowProfile,
        Self::UpdateProfile,
        Self::Logout,
        Self::Metrics,
    ];

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Signup => "/signup",
            Self::Login => "/login",
            Self::ForgotPassword => "/forgot-password",
            Self::ResetPassword => "/reset-password",
            Self::Health => "/health",
            Self::ShowProfile | Self::UpdateProfile => "/profile",
            Self::Logout => "/logout",
            Self::Metrics => "/metrics",
        }
    }

    #[must_use]
    pub const fn method(self) -> MethodFilter {
        match self {
            Self::Health | Self::ShowProfile | Self::Metrics => MethodFilter::GET,
            Self::UpdateProfile => MethodFilter::PUT,
            Self::Signup | Self::Login | Self::ForgotPassword | Self::ResetPassword | Self::Logout => {
                MethodFilter::POST
            }
        }
    }

    #[must_use]
    pub const fn access(self) -> Access {
        match self {
            Self::Signup | Self::Login | Self::ForgotPassword | Self::ResetPassword | Self::Health => {
                Access::Public
            }
            Self::ShowProfile | Self::UpdateProfile | Self::Logout | Self::Metrics => {
                Access::Protected
            }
        }
    }

    pub fn with_access(access: Access) -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(move |r| r.access() == access)
    }
}

/// Extract the token from an `Authorization` header value. The scheme is
/// matched case-insensitively; the token must be one non-empty word.
pub fn parse_bearer(header: Option<&HeaderValue>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingCredentials)?;
    let value = header
        .to_str()
        .map_err(|_| AuthError::MalformedCredentials)?
        .trim();

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthError::MalformedCredentials)?;
    let token = token.trim_start();

    if !scheme.eq_ignore_ascii_case(TOKEN_TYPE)
        || token.is_empty()
        || token.chars().any(char::is_whitespace)
    {
        return Err(AuthError::MalformedCredentials);
    }

    Ok(token)
}

pub async fn gate_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = match parse_bearer(request.headers().get(AUTHORIZATION)) {
        Ok(token) => token.to_string(),
        Err(err) => {
            debug!(reason = %err, "Rejected request without usable credentials");
            return Err(err.into());
        }
    };

    let ctx = match state.auth_service().authenticate(&token).await {
        Ok(ctx) => ctx,
        Err(AuthError::InvalidToken) => {
            warn!(token = %crypto::redact_token(&token), "Rejected unknown or revoked token");
            return Err(ApiError::InvalidToken);
        }
        Err(AuthError::ExpiredToken { expires_at }) => {
            info!(
                token = %crypto::redact_token(&token),
                %expires_at,
                "Rejected expired token"
            );
            return Err(ApiError::ExpiredToken { expires_at });
        }
        Err(err) => return Err(err.into()),
    };

    tracing::Span::current().record("user_id", ctx.user.id);
    request.extensions_mut().insert(ctx);

    Ok(next.run(request).await)
}
