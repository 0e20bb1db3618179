//! Order placement integration tests.
//!
//! Exercise the full placement transaction against a real `PostgreSQL`
//! database: cart resolution, pricing, wallet settlement, the
//! failed-payment record, and the status state machine.
//!
//! # Requirements
//!
//! Docker must be running; each test starts a `PostgreSQL` 16 container.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

mod common;

use common::{
    add_cart_item, cart_count, create_category, create_product, create_user, ledger_sum, setup,
    wallet_balance,
};
use printshop_server::orders::{
    place_order, NewOrder, OrderError, OrderStore, PricingError, RequestedLine,
};
use printshop_server::types::{OrderStatus, PaymentStatus, ProductId, UserId};
use printshop_server::wallet::WalletLedger;
use rust_decimal::Decimal;
use sqlx::PgPool;

fn line(product_id: ProductId, quantity: i32) -> RequestedLine {
    RequestedLine {
        product_id,
        quantity,
        specifications: serde_json::json!({}),
    }
}

fn wallet_order() -> NewOrder {
    NewOrder {
        items: None,
        payment_method: "wallet".to_string(),
        notes: None,
        shipping_address: None,
    }
}

async fn top_up(pool: &PgPool, user: UserId, amount: &str) {
    WalletLedger::new(pool.clone())
        .add_money(user, amount.parse().unwrap(), "upi")
        .await
        .expect("top-up failed");
}

#[tokio::test]
async fn test_empty_cart_is_rejected() {
    let (_container, pool) = setup().await;
    let user = create_user(&pool, "empty@example.com").await;

    let err = place_order(&pool, user, &wallet_order()).await.unwrap_err();
    assert!(matches!(err, OrderError::EmptyCart));
    assert_eq!(err.to_string(), "Cart is empty");
}

#[tokio::test]
async fn test_unknown_product_fails_the_whole_order() {
    let (_container, pool) = setup().await;
    let user = create_user(&pool, "ghost@example.com").await;
    let category = create_category(&pool).await;
    let real = create_product(&pool, category, "100.00").await;
    let ghost = ProductId::new();

    let request = NewOrder {
        items: Some(vec![line(real, 1), line(ghost, 2)]),
        payment_method: "wallet".to_string(),
        notes: None,
        shipping_address: None,
    };

    let err = place_order(&pool, user, &request).await.unwrap_err();
    match err {
        OrderError::Pricing(PricingError::UnknownProducts(ids)) => {
            assert_eq!(ids, vec![ghost]);
        }
        other => panic!("expected unknown-products error, got {other:?}"),
    }

    // Nothing was persisted.
    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(orders, 0);
}

#[tokio::test]
async fn test_insufficient_balance_keeps_order_as_failed_payment_record() {
    let (_container, pool) = setup().await;
    let user = create_user(&pool, "broke@example.com").await;
    let category = create_category(&pool).await;
    let product = create_product(&pool, category, "150.00").await;
    add_cart_item(&pool, user, product, 1).await;
    top_up(&pool, user, "100.00").await;

    let err = place_order(&pool, user, &wallet_order()).await.unwrap_err();
    assert!(matches!(err, OrderError::InsufficientBalance));
    assert_eq!(err.to_string(), "Insufficient wallet balance");

    // The order survives as a failed-payment record.
    let (status, payment_status): (OrderStatus, PaymentStatus) = sqlx::query_as(
        "SELECT status, payment_status FROM orders WHERE user_id = $1",
    )
    .bind(user)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(status, OrderStatus::Pending);
    assert_eq!(payment_status, PaymentStatus::Failed);

    // Wallet and cart are untouched.
    assert_eq!(wallet_balance(&pool, user).await, Some("100.00".parse().unwrap()));
    assert_eq!(cart_count(&pool, user).await, 1);
    assert_eq!(ledger_sum(&pool, user).await, "100.00".parse::<Decimal>().unwrap());
}

#[tokio::test]
async fn test_wallet_payment_without_a_wallet_creates_one_and_declines() {
    let (_container, pool) = setup().await;
    let user = create_user(&pool, "nowallet@example.com").await;
    let category = create_category(&pool).await;
    let product = create_product(&pool, category, "25.00").await;
    add_cart_item(&pool, user, product, 1).await;

    let err = place_order(&pool, user, &wallet_order()).await.unwrap_err();
    assert!(matches!(err, OrderError::InsufficientBalance));

    // The wallet was lazily created at zero balance.
    assert_eq!(wallet_balance(&pool, user).await, Some(Decimal::ZERO));
}

#[tokio::test]
async fn test_successful_wallet_order_debits_and_clears_cart() {
    let (_container, pool) = setup().await;
    let user = create_user(&pool, "flush@example.com").await;
    let category = create_category(&pool).await;
    let cards = create_product(&pool, category, "100.00").await;
    let flyers = create_product(&pool, category, "50.00").await;
    add_cart_item(&pool, user, cards, 2).await;
    add_cart_item(&pool, user, flyers, 1).await;
    top_up(&pool, user, "500.00").await;

    let placed = place_order(&pool, user, &wallet_order()).await.expect("order failed");

    assert_eq!(placed.order.total_amount, "250.00".parse::<Decimal>().unwrap());
    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert_eq!(placed.order.payment_status, PaymentStatus::Paid);
    assert_eq!(placed.items.len(), 2);
    assert!(placed.order.order_number.starts_with("ORD-"));

    // Wallet debited, exactly one debit entry referencing the order.
    assert_eq!(wallet_balance(&pool, user).await, Some("250.00".parse().unwrap()));
    let debits: Vec<(Decimal,)> = sqlx::query_as(
        "SELECT amount FROM transactions WHERE user_id = $1 AND type = 'debit' AND order_id = $2",
    )
    .bind(user)
    .bind(placed.order.id)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(debits.len(), 1);
    assert_eq!(debits[0].0, "250.00".parse::<Decimal>().unwrap());

    // Cart cleared, ledger consistent.
    assert_eq!(cart_count(&pool, user).await, 0);
    assert_eq!(
        wallet_balance(&pool, user).await.unwrap(),
        ledger_sum(&pool, user).await
    );
}

#[tokio::test]
async fn test_non_wallet_order_leaves_payment_pending() {
    let (_container, pool) = setup().await;
    let user = create_user(&pool, "cod@example.com").await;
    let category = create_category(&pool).await;
    let product = create_product(&pool, category, "75.50").await;
    add_cart_item(&pool, user, product, 2).await;

    let request = NewOrder {
        items: None,
        payment_method: "cash_on_delivery".to_string(),
        notes: Some("Ring the bell".to_string()),
        shipping_address: Some("12 Print Lane".to_string()),
    };

    let placed = place_order(&pool, user, &request).await.expect("order failed");
    assert_eq!(placed.order.payment_status, PaymentStatus::Pending);
    assert_eq!(placed.order.total_amount, "151.00".parse::<Decimal>().unwrap());

    // No wallet was touched; the cart still clears.
    assert_eq!(wallet_balance(&pool, user).await, None);
    assert_eq!(cart_count(&pool, user).await, 0);
}

#[tokio::test]
async fn test_explicit_items_ignore_cart_but_still_clear_it() {
    let (_container, pool) = setup().await;
    let user = create_user(&pool, "explicit@example.com").await;
    let category = create_category(&pool).await;
    let staged = create_product(&pool, category, "10.00").await;
    let wanted = create_product(&pool, category, "20.00").await;
    add_cart_item(&pool, user, staged, 5).await;
    top_up(&pool, user, "100.00").await;

    let request = NewOrder {
        items: Some(vec![line(wanted, 1)]),
        payment_method: "wallet".to_string(),
        notes: None,
        shipping_address: None,
    };

    let placed = place_order(&pool, user, &request).await.expect("order failed");
    assert_eq!(placed.order.total_amount, "20.00".parse::<Decimal>().unwrap());
    assert_eq!(placed.items.len(), 1);
    assert_eq!(placed.items[0].product_id, wanted);
    assert_eq!(cart_count(&pool, user).await, 0);
}

#[tokio::test]
async fn test_concurrent_wallet_orders_cannot_overdraw() {
    let (_container, pool) = setup().await;
    let user = create_user(&pool, "racer@example.com").await;
    let category = create_category(&pool).await;
    let product = create_product(&pool, category, "100.00").await;
    top_up(&pool, user, "150.00").await;

    let request = NewOrder {
        items: Some(vec![line(product, 1)]),
        payment_method: "wallet".to_string(),
        notes: None,
        shipping_address: None,
    };

    // Two orders of 100 against a balance of 150: exactly one must win.
    let (first, second) = tokio::join!(
        place_order(&pool, user, &request),
        place_order(&pool, user, &request),
    );

    let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one racing order may settle");

    let failure = if first.is_err() { first } else { second };
    assert!(matches!(failure.unwrap_err(), OrderError::InsufficientBalance));

    let balance = wallet_balance(&pool, user).await.unwrap();
    assert_eq!(balance, "50.00".parse::<Decimal>().unwrap());
    assert!(balance >= Decimal::ZERO);
    assert_eq!(balance, ledger_sum(&pool, user).await);
}

#[tokio::test]
async fn test_status_transition_table() {
    let (_container, pool) = setup().await;
    let user = create_user(&pool, "status@example.com").await;
    let category = create_category(&pool).await;
    let product = create_product(&pool, category, "30.00").await;
    add_cart_item(&pool, user, product, 1).await;

    let request = NewOrder {
        items: None,
        payment_method: "cash_on_delivery".to_string(),
        notes: None,
        shipping_address: None,
    };
    let placed = place_order(&pool, user, &request).await.expect("order failed");
    let store = OrderStore::new(pool.clone());

    // Skipping ahead is rejected and changes nothing.
    let err = store
        .update_status(placed.order.id, OrderStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Completed,
        }
    ));
    let unchanged = store.get(placed.order.id, None).await.unwrap();
    assert_eq!(unchanged.order.status, OrderStatus::Pending);

    // Cancellation from pending is allowed and touches only the status.
    let cancelled = store
        .update_status(placed.order.id, OrderStatus::Cancelled)
        .await
        .expect("cancel failed");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.total_amount, placed.order.total_amount);

    // Terminal: no way out of cancelled.
    let err = store
        .update_status(placed.order.id, OrderStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_forward_walk_through_the_lifecycle() {
    let (_container, pool) = setup().await;
    let user = create_user(&pool, "lifecycle@example.com").await;
    let category = create_category(&pool).await;
    let product = create_product(&pool, category, "45.00").await;
    add_cart_item(&pool, user, product, 1).await;

    let request = NewOrder {
        items: None,
        payment_method: "cash_on_delivery".to_string(),
        notes: None,
        shipping_address: None,
    };
    let placed = place_order(&pool, user, &request).await.expect("order failed");
    let store = OrderStore::new(pool.clone());

    for next in [
        OrderStatus::Confirmed,
        OrderStatus::InProduction,
        OrderStatus::Completed,
    ] {
        let updated = store.update_status(placed.order.id, next).await.expect("step failed");
        assert_eq!(updated.status, next);
    }
}
