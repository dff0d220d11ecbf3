use axum::{Json, extract::State};
use loyal_sdk::objects::BalanceResponse;

use super::UserApiError;
use crate::api::extractors::AuthenticatedUser;
use crate::state::AppState;

pub(super) async fn get_balance(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<BalanceResponse>, UserApiError> {
    let balance = state.ledger.balance(user.user_id).await?;
    Ok(Json(BalanceResponse {
        current: balance.current,
        withdrawn: balance.withdrawn,
    }))
}
