//! Shared application state.

use std::sync::Arc;

use gstbill_db::BillingService;

use crate::auth::JwtManager;

/// Cloned into every handler; everything inside is shared.
#[derive(Clone)]
pub struct AppState {
    pub service: BillingService,
    pub jwt: Arc<JwtManager>,
    pub allow_unapproved: bool,
}

impl AppState {
    pub fn new(service: BillingService, jwt: JwtManager, allow_unapproved: bool) -> Self {
        AppState {
            service,
            jwt: Arc::new(jwt),
            allow_unapproved,
        }
    }
}
