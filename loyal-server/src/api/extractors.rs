//! Custom Axum extractors for request authentication.
//!
//! Provides `AuthenticatedUser`, which accepts a session token from either
//! the `session` cookie or an `Authorization: Bearer` header. Token
//! verification is delegated to [`loyal_sdk::session`].

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use loyal_sdk::session::{self, SESSION_COOKIE, SessionError};

use crate::state::AppState;

/// The user a request was authenticated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
}

/// Errors returned by the [`AuthenticatedUser`] extractor.
#[derive(Debug, thiserror::Error)]
pub enum AuthRejection {
    #[error("missing session token")]
    MissingToken,
    #[error("invalid session token: {0}")]
    InvalidToken(#[from] SessionError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let message = match self {
            AuthRejection::MissingToken => "missing session token",
            AuthRejection::InvalidToken(SessionError::Expired) => "session expired",
            AuthRejection::InvalidToken(_) => "invalid session token",
        };
        (StatusCode::UNAUTHORIZED, message).into_response()
    }
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .or_else(|| session_cookie(&parts.headers))
            .ok_or(AuthRejection::MissingToken)?;

        let claims = session::verify(token, state.auth.key())?;
        Ok(AuthenticatedUser {
            user_id: claims.user_id,
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_session_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; session=1.2.sig"));
        assert_eq!(session_cookie(&headers), Some("1.2.sig"));

        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("sessionid=x"));
        assert_eq!(session_cookie(&headers), None);
    }
}
