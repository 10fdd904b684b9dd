//! Bearer-token authentication.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use storerate_core::error::DomainError;
use storerate_core::identity::Principal;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

/// The caller, resolved from an `Authorization: Bearer <token>` header.
///
/// Rejects with `401 unauthenticated` when the header is missing or the
/// identity provider refuses the token.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Principal);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            warn!(path = %parts.uri.path(), "request without bearer token");
            return Err(DomainError::Unauthenticated("not authorized, no token".to_owned()).into());
        };

        match state.identity.authenticate(token).await {
            Ok(principal) => Ok(Self(principal)),
            Err(err) => {
                if matches!(err, DomainError::Unauthenticated(_)) {
                    warn!(path = %parts.uri.path(), "bearer token rejected");
                }
                Err(err.into())
            }
        }
    }
}
