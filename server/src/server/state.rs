//! Application state for the printshop HTTP server.

use crate::auth::AuthStore;
use crate::cart::CartStore;
use crate::catalog::{CategoryStore, ProductStore};
use crate::complaints::ComplaintStore;
use crate::config::Config;
use crate::orders::OrderStore;
use crate::wallet::WalletLedger;
use chrono::Duration;
use sqlx::PgPool;

/// Application state shared across all HTTP handlers.
///
/// Repositories all clone the same connection pool; cloning the state per
/// request is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Connection pool, used directly by the order placement workflow.
    pub pool: PgPool,
    /// Users and sessions.
    pub auth: AuthStore,
    /// Category repository.
    pub categories: CategoryStore,
    /// Product repository.
    pub products: ProductStore,
    /// Cart repository.
    pub cart: CartStore,
    /// Order reads and status transitions.
    pub orders: OrderStore,
    /// Wallets and their ledger.
    pub wallet: WalletLedger,
    /// Complaint repository.
    pub complaints: ComplaintStore,
}

impl AppState {
    /// Assemble the state from a connected pool and the loaded config.
    #[must_use]
    pub fn new(pool: PgPool, config: &Config) -> Self {
        let session_ttl = Duration::seconds(
            i64::try_from(config.auth.session_ttl).unwrap_or(604_800),
        );

        Self {
            auth: AuthStore::new(pool.clone(), session_ttl),
            categories: CategoryStore::new(pool.clone()),
            products: ProductStore::new(pool.clone()),
            cart: CartStore::new(pool.clone()),
            orders: OrderStore::new(pool.clone()),
            wallet: WalletLedger::new(pool.clone()),
            complaints: ComplaintStore::new(pool.clone()),
            pool,
        }
    }
}
