use axum::{Json, extract::State, extract::rejection::JsonRejection, response::Response};
use loyal_sdk::objects::Credentials;

use super::{UserApiError, password, session_response};
use crate::state::AppState;

/// `POST /login`: check credentials and start a session.
pub(super) async fn login(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, UserApiError> {
    let Json(credentials) = body.map_err(|_| UserApiError::InvalidBody)?;
    if !credentials.is_complete() {
        return Err(UserApiError::EmptyCredentials);
    }

    let user = state
        .accounts
        .find_user(&credentials.login)
        .await?
        .ok_or(UserApiError::BadCredentials)?;

    if !password::verify(credentials.password, user.password_hash).await? {
        return Err(UserApiError::BadCredentials);
    }

    session_response(&state, user.id)
}
