//! Business metrics for the printshop service.
//!
//! # Exported metrics
//!
//! - `printshop_orders_placed_total` - orders placed successfully
//! - `printshop_order_payment_failures_total` - wallet payments declined
//!   for insufficient balance
//! - `printshop_wallet_topups_total` - wallet top-ups
//! - `printshop_complaints_filed_total` - complaints filed

use metrics::describe_counter;

/// Register descriptions for all business metrics.
///
/// Call once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "printshop_orders_placed_total",
        "Total number of orders placed successfully"
    );
    describe_counter!(
        "printshop_order_payment_failures_total",
        "Total number of wallet payments declined for insufficient balance"
    );
    describe_counter!(
        "printshop_wallet_topups_total",
        "Total number of wallet top-ups"
    );
    describe_counter!(
        "printshop_complaints_filed_total",
        "Total number of complaints filed"
    );

    tracing::info!("Business metrics registered");
}
