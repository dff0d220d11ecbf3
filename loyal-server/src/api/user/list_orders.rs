use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::{UserApiError, to_order_response};
use crate::api::extractors::AuthenticatedUser;
use crate::state::AppState;

/// `GET /orders`: the caller's orders, newest first; `204` if there are none.
pub(super) async fn list_orders(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Response, UserApiError> {
    let orders = state.ledger.user_orders(user.user_id).await?;
    if orders.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    let orders: Vec<_> = orders.into_iter().map(to_order_response).collect();
    Ok(Json(orders).into_response())
}
