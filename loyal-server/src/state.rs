//! Application state shared across all request handlers.

use crate::config::runtime::AuthConfig;
use loyal_core::ledger::{Accounts, Ledger};
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Orders, balances and withdrawals.
    pub ledger: Arc<dyn Ledger>,
    /// Registered users.
    pub accounts: Arc<dyn Accounts>,
    /// Session token signing settings.
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(ledger: Arc<dyn Ledger>, accounts: Arc<dyn Accounts>, auth: AuthConfig) -> Self {
        Self {
            ledger,
            accounts,
            auth: Arc::new(auth),
        }
    }
}
