//! Principal extraction.
//!
//! The upstream authentication gateway verifies credentials and forwards
//! the user id in the [`USER_HEADER`] header. The [`Caller`] extractor
//! resolves it against the user store; handlers then pass the principal
//! explicitly to every capability check.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use biosurvey_core::Principal;
use biosurvey_types::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the authenticated user id.
pub const USER_HEADER: &str = "x-user-id";

/// The authenticated, active caller of a request.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Principal);

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let user_id = match parts.headers.get(USER_HEADER) {
            None => None,
            Some(value) => {
                let raw = value
                    .to_str()
                    .map_err(|e| ApiError::Unauthenticated(format!("{USER_HEADER} is not valid text: {e}")))?;
                Some(
                    raw.trim()
                        .parse::<UserId>()
                        .map_err(|e| ApiError::Unauthenticated(format!("{USER_HEADER} is not a user id: {e}")))?,
                )
            }
        };
        let principal = state.service.authenticate(user_id).await?;
        Ok(Self(principal))
    }
}
