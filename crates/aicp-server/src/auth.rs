//! Bearer-token session extraction.

use aicp_runtime::{Session, SessionError};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::state::AppState;

/// A live session, resolved from `Authorization: Bearer <token>` or a
/// `token` query parameter. Resolving it refreshes the session's activity.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Session);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = request_token(parts)?
            .ok_or_else(|| ApiError::Unauthorized("Authentication token is missing".into()))?;
        let session = state.sessions().touch(&token).map_err(|err| match err {
            SessionError::Unknown => {
                ApiError::Unauthorized("Session not found. Please login again.".into())
            }
            SessionError::Expired => ApiError::Unauthorized("Invalid or expired token".into()),
        })?;
        Ok(Self(session))
    }
}

fn request_token(parts: &Parts) -> Result<Option<String>, ApiError> {
    if let Some(header) = parts.headers.get(AUTHORIZATION) {
        let value = header
            .to_str()
            .map_err(|_| ApiError::Unauthorized("Invalid authorization header format".into()))?;
        return match value.split_once(' ') {
            Some((scheme, token))
                if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() =>
            {
                Ok(Some(token.trim().to_string()))
            }
            _ => Err(ApiError::Unauthorized(
                "Invalid authorization header format".into(),
            )),
        };
    }

    Ok(parts.uri.query().and_then(|query| {
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "token")
            .map(|(_, value)| value.to_string())
            .filter(|value| !value.is_empty())
    }))
}
