//! Router configuration.
//!
//! Builds the complete Axum router: health checks outside authentication,
//! everything else under `/api` with the correlation-id layer on top.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{cart, categories, complaints, orders, products, transactions, wallet};
use crate::auth::handlers as auth_handlers;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use printshop_web::propagate_correlation_id;

/// Build the complete Axum router.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Authentication
        .route("/auth/register", post(auth_handlers::register))
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/logout", post(auth_handlers::logout))
        .route("/auth/me", get(auth_handlers::me))
        // Catalog
        .route("/categories", get(categories::list_categories))
        .route("/categories", post(categories::create_category))
        .route("/categories/:id", get(categories::get_category))
        .route("/categories/:id", put(categories::update_category))
        .route("/categories/:id", delete(categories::delete_category))
        .route("/products", get(products::list_products))
        .route("/products", post(products::create_product))
        .route("/products/:id", get(products::get_product))
        .route("/products/:id", put(products::update_product))
        .route("/products/:id", delete(products::delete_product))
        // Cart
        .route("/cart", get(cart::get_cart))
        .route("/cart", post(cart::add_to_cart))
        .route("/cart", delete(cart::clear_cart))
        .route("/cart/:id", put(cart::update_cart_item))
        .route("/cart/:id", delete(cart::remove_cart_item))
        // Orders
        .route("/orders", post(orders::create_order))
        .route("/orders", get(orders::list_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/status", put(orders::update_order_status))
        // Wallet
        .route("/wallet", get(wallet::get_wallet))
        .route("/wallet/add-money", post(wallet::add_money))
        .route("/wallet/transactions", get(wallet::list_transactions))
        // Ledger (admin) and per-order settlement trail
        .route("/transactions", get(transactions::list_transactions))
        .route(
            "/transactions/order/:order_id",
            get(transactions::transactions_for_order),
        )
        // Complaints
        .route("/complaints", get(complaints::list_complaints))
        .route("/complaints", post(complaints::create_complaint))
        .route("/complaints/:id", get(complaints::get_complaint))
        .route(
            "/complaints/:id/status",
            put(complaints::update_complaint_status),
        );

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .layer(axum::middleware::from_fn(propagate_correlation_id))
        .with_state(state)
}
