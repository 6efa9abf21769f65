use std::sync::Arc;

use crate::ledger::LedgerApi;

/// Gateway application state (shared)
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn LedgerApi>,
}

impl AppState {
    pub fn new(ledger: Arc<dyn LedgerApi>) -> Self {
        Self { ledger }
    }
}
