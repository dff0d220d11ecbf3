use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::{UserApiError, to_withdrawal_response};
use crate::api::extractors::AuthenticatedUser;
use crate::state::AppState;

/// `GET /withdrawals`: newest first; `204` if there are none.
pub(super) async fn list_withdrawals(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Response, UserApiError> {
    let withdrawals = state.ledger.user_withdrawals(user.user_id).await?;
    if withdrawals.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    let withdrawals: Vec<_> = withdrawals
        .into_iter()
        .map(to_withdrawal_response)
        .collect();
    Ok(Json(withdrawals).into_response())
}
