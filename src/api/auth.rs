//! Admin authorization extractor.
//!
//! Every mutating route requires a bearer token from the configured
//! admin set. The console UI's session flag is a display affordance
//! only; this extractor is the authorization boundary.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::error::ConsoleError;

/// Proof that the request carried a valid admin bearer token.
///
/// Rejects with [`ConsoleError::Forbidden`] when the `Authorization`
/// header is missing, malformed, or carries an unknown token. An empty
/// configured token set rejects everything.
#[derive(Debug, Clone, Copy)]
pub struct AdminAuth;

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = ConsoleError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        match token {
            Some(token) if state.config.admin_tokens.iter().any(|t| t == token) => Ok(Self),
            _ => {
                tracing::warn!("rejected request without valid admin token");
                Err(ConsoleError::Forbidden)
            }
        }
    }
}
