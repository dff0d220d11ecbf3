use axum::{extract::State, http::StatusCode};
use loyal_core::ledger::IntakeOutcome;
use loyal_sdk::order_number;

use super::UserApiError;
use crate::api::extractors::AuthenticatedUser;
use crate::state::AppState;

/// `POST /orders`: upload an order number for accrual.
///
/// `202` for a new order, `200` if the caller already uploaded it.
pub(super) async fn upload_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    body: String,
) -> Result<StatusCode, UserApiError> {
    let number = body.trim();
    if number.is_empty() {
        return Err(UserApiError::InvalidBody);
    }
    if !order_number::is_valid(number) {
        return Err(UserApiError::InvalidOrderNumber);
    }

    match state.ledger.insert_order(number, user.user_id).await? {
        IntakeOutcome::Accepted => {
            tracing::info!(user_id = user.user_id, order_number = number, "Order accepted");
            Ok(StatusCode::ACCEPTED)
        }
        IntakeOutcome::AlreadyUploaded => Ok(StatusCode::OK),
    }
}
