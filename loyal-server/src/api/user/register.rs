use axum::{Json, extract::State, extract::rejection::JsonRejection, response::Response};
use loyal_sdk::objects::Credentials;

use super::{UserApiError, password, session_response};
use crate::state::AppState;

/// `POST /register`: create an account and log it in.
pub(super) async fn register(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, UserApiError> {
    let Json(credentials) = body.map_err(|_| UserApiError::InvalidBody)?;
    if !credentials.is_complete() {
        return Err(UserApiError::EmptyCredentials);
    }

    let password_hash = password::hash(credentials.password).await?;
    let user_id = state
        .accounts
        .create_user(&credentials.login, &password_hash)
        .await?;

    tracing::info!(user_id, "User registered");
    session_response(&state, user_id)
}
