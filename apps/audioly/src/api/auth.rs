//! # Authentication Module
//!
//! Bearer token extractors for the Audioly HTTP API.
//!
//! ```text
//! Authorization: Bearer <token>
//! ```
//!
//! - `AuthUser`: a verified identity is required; 401 otherwise.
//! - `MaybeUser`: no header means an anonymous viewer. A header that is
//!   present but does not verify is still rejected with 401 so clients can
//!   detect a stale session.

use super::AppState;
use super::error::ApiError;
use audioly_core::{SocialError, UserId};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

/// A request with a verified identity.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserId);

/// A request with an optional identity.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<UserId>);

impl MaybeUser {
    pub fn id(&self) -> Option<&UserId> {
        self.0.as_ref()
    }
}

/// Verify the Authorization header, if any.
///
/// `Ok(None)` when the header is absent.
fn identify(parts: &Parts, state: &AppState) -> Result<Option<UserId>, ApiError> {
    let Some(raw) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let Ok(value) = raw.to_str() else {
        tracing::warn!(
            event = "auth_failure",
            reason = "non_ascii_header",
            "Authentication failed: malformed Authorization header"
        );
        return Err(ApiError(SocialError::Unauthorized));
    };

    // Support both "Bearer <token>" and raw "<token>" formats
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();

    match state.identity.verify(token) {
        Ok(user) => Ok(Some(user)),
        Err(e) => {
            tracing::warn!(
                event = "auth_failure",
                reason = "invalid_token",
                "Authentication failed: invalid token"
            );
            Err(ApiError(e))
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match identify(parts, state)? {
            Some(user) => Ok(Self(user)),
            None => {
                tracing::warn!(
                    event = "auth_failure",
                    reason = "missing_authorization_header",
                    "Missing Authorization header"
                );
                Err(ApiError(SocialError::Unauthorized))
            }
        }
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        identify(parts, state).map(Self)
    }
}
