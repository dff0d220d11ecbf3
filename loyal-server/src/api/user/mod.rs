//! User API handlers.
//!
//! Registration and login are public; every other endpoint requires a
//! session token (see [`AuthenticatedUser`](crate::api::extractors::AuthenticatedUser)).
//!
//! # Endpoints
//!
//! - `POST /register`         – create an account and start a session
//! - `POST /login`            – start a session
//! - `POST /orders`           – upload an order number (plain text body)
//! - `GET  /orders`           – list uploaded orders, newest first
//! - `GET  /balance`          – current and withdrawn points
//! - `POST /balance/withdraw` – spend points on an order
//! - `GET  /withdrawals`      – list withdrawals, newest first

use axum::{
    Router,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use loyal_core::ledger::{
    IntakeError, LedgerError, OrderRecord, RegisterError, WithdrawError, Withdrawal,
};
use loyal_sdk::objects::{OrderResponse, WithdrawalResponse};
use loyal_sdk::session::{self, SESSION_COOKIE};

use crate::state::AppState;

mod balance;
mod list_orders;
mod list_withdrawals;
mod login;
mod password;
mod register;
mod upload_order;
mod withdraw;

/// Build the User API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register::register))
        .route("/login", post(login::login))
        .route(
            "/orders",
            post(upload_order::upload_order).get(list_orders::list_orders),
        )
        .route("/balance", get(balance::get_balance))
        .route("/balance/withdraw", post(withdraw::withdraw))
        .route("/withdrawals", get(list_withdrawals::list_withdrawals))
}

/// Convert an `OrderRecord` (DB model) into an `OrderResponse` (API model).
fn to_order_response(record: OrderRecord) -> OrderResponse {
    OrderResponse {
        number: record.number,
        status: record.status.into(),
        accrual: record.accrual,
        uploaded_at: record.uploaded_at,
    }
}

fn to_withdrawal_response(withdrawal: Withdrawal) -> WithdrawalResponse {
    WithdrawalResponse {
        order: withdrawal.order_number,
        sum: withdrawal.amount,
        processed_at: withdrawal.processed_at,
    }
}

/// `200 OK` that starts a session for `user_id`: the token goes into an
/// `HttpOnly` cookie and the `Authorization` header.
fn session_response(state: &AppState, user_id: i64) -> Result<Response, UserApiError> {
    let ttl = state.auth.session_ttl_secs;
    let token = session::issue(user_id, ttl, state.auth.key());

    let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl}");
    let cookie = HeaderValue::from_str(&cookie).map_err(|_| UserApiError::SessionHeader)?;
    let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| UserApiError::SessionHeader)?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie), (header::AUTHORIZATION, bearer)],
        "success",
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

/// Errors that can occur in User API handlers.
#[derive(Debug, thiserror::Error)]
pub enum UserApiError {
    #[error("could not parse request body")]
    InvalidBody,
    #[error("login and password must not be empty")]
    EmptyCredentials,
    #[error("login already taken")]
    LoginTaken,
    #[error("wrong login or password")]
    BadCredentials,
    #[error("invalid order number")]
    InvalidOrderNumber,
    #[error("order number already uploaded by another user")]
    ClaimedByAnotherUser,
    #[error("invalid withdrawal amount")]
    InvalidAmount,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("password hashing error: {0}")]
    PasswordHash(String),
    #[error("blocking task failed: {0}")]
    Blocking(#[from] tokio::task::JoinError),
    #[error("session token is not a valid header value")]
    SessionHeader,
}

impl From<IntakeError> for UserApiError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::ClaimedByAnotherUser => Self::ClaimedByAnotherUser,
            IntakeError::Ledger(e) => Self::Ledger(e),
        }
    }
}

impl From<WithdrawError> for UserApiError {
    fn from(err: WithdrawError) -> Self {
        match err {
            WithdrawError::InvalidAmount => Self::InvalidAmount,
            WithdrawError::InsufficientFunds => Self::InsufficientFunds,
            WithdrawError::Ledger(e) => Self::Ledger(e),
        }
    }
}

impl From<RegisterError> for UserApiError {
    fn from(err: RegisterError) -> Self {
        match err {
            RegisterError::LoginTaken => Self::LoginTaken,
            RegisterError::Ledger(e) => Self::Ledger(e),
        }
    }
}

impl IntoResponse for UserApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            UserApiError::InvalidBody | UserApiError::EmptyCredentials => StatusCode::BAD_REQUEST,
            UserApiError::BadCredentials => StatusCode::UNAUTHORIZED,
            UserApiError::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
            UserApiError::LoginTaken | UserApiError::ClaimedByAnotherUser => StatusCode::CONFLICT,
            UserApiError::InvalidOrderNumber | UserApiError::InvalidAmount => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            UserApiError::Ledger(_)
            | UserApiError::PasswordHash(_)
            | UserApiError::Blocking(_)
            | UserApiError::SessionHeader => {
                tracing::error!(error = %self, "User API internal error");
                return (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
                    .into_response();
            }
        };
        (status, self.to_string()).into_response()
    }
}
