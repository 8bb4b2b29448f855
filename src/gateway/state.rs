use std::sync::Arc;

use crate::accounts::AccountService;
use crate::auth::JwtAuth;
use crate::exchange::ExchangeService;
use crate::ledger::Ledger;
use crate::offers::OfferStore;

/// Shared gateway state
#[derive(Clone)]
pub struct AppState {
    /// Bearer token verification
    pub jwt: Arc<JwtAuth>,
    pub accounts: Arc<AccountService>,
    pub exchange: Arc<ExchangeService>,
    /// Pinged by `/health`
    pub ledger: Arc<dyn Ledger>,
    /// Pinged by `/health`
    pub offers: Arc<dyn OfferStore>,
}

impl AppState {
    pub fn new(
        jwt: Arc<JwtAuth>,
        accounts: Arc<AccountService>,
        exchange: Arc<ExchangeService>,
        ledger: Arc<dyn Ledger>,
        offers: Arc<dyn OfferStore>,
    ) -> Self {
        Self {
            jwt,
            accounts,
            exchange,
            ledger,
            offers,
        }
    }
}
