use axum::{Json, extract::State, extract::rejection::JsonRejection, http::StatusCode};
use loyal_sdk::objects::WithdrawRequest;
use loyal_sdk::order_number;

use super::UserApiError;
use crate::api::extractors::AuthenticatedUser;
use crate::state::AppState;

/// `POST /balance/withdraw`: spend points on an order.
///
/// An unparseable body, a bad order number and a bad amount are all `422`;
/// a balance that does not cover the sum is `402`.
pub(super) async fn withdraw(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    body: Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<StatusCode, UserApiError> {
    let Json(request) = body.map_err(|_| UserApiError::InvalidAmount)?;
    if !order_number::is_valid(&request.order) {
        return Err(UserApiError::InvalidOrderNumber);
    }

    let withdrawal = state
        .ledger
        .withdraw(user.user_id, &request.order, request.sum)
        .await?;

    tracing::info!(
        user_id = user.user_id,
        order_number = %withdrawal.order_number,
        sum = %withdrawal.amount,
        "Withdrawal recorded"
    );
    Ok(StatusCode::OK)
}
