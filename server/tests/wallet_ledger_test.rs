//! Wallet ledger integration tests.
//!
//! Lazy creation, top-ups, and the balance/ledger consistency invariant
//! against a real `PostgreSQL` database.
//!
//! # Requirements
//!
//! Docker must be running; each test starts a `PostgreSQL` 16 container.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

mod common;

use common::{create_user, ledger_sum, setup, wallet_balance};
use printshop_server::types::TransactionType;
use printshop_server::wallet::{WalletError, WalletLedger};
use rust_decimal::Decimal;

#[tokio::test]
async fn test_first_access_creates_empty_wallet() {
    let (_container, pool) = setup().await;
    let user = create_user(&pool, "fresh@example.com").await;
    let ledger = WalletLedger::new(pool.clone());

    let wallet = ledger.get_or_create(user).await.expect("get_or_create failed");
    assert_eq!(wallet.user_id, user);
    assert_eq!(wallet.balance, Decimal::ZERO);

    // A second fetch returns the same wallet, not a new one.
    let again = ledger.get_or_create(user).await.expect("second fetch failed");
    assert_eq!(again.id, wallet.id);
}

#[tokio::test]
async fn test_concurrent_first_access_creates_one_wallet() {
    let (_container, pool) = setup().await;
    let user = create_user(&pool, "stampede@example.com").await;

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..10 {
        let ledger = WalletLedger::new(pool.clone());
        tasks.spawn(async move { ledger.get_or_create(user).await });
    }
    while let Some(result) = tasks.join_next().await {
        result.expect("task panicked").expect("get_or_create failed");
    }

    let wallets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM wallets WHERE user_id = $1")
        .bind(user)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(wallets, 1);
    assert_eq!(wallet_balance(&pool, user).await, Some(Decimal::ZERO));
}

#[tokio::test]
async fn test_top_up_appends_credit_entry() {
    let (_container, pool) = setup().await;
    let user = create_user(&pool, "topup@example.com").await;
    let ledger = WalletLedger::new(pool.clone());

    let transaction = ledger
        .add_money(user, "200.00".parse().unwrap(), "upi")
        .await
        .expect("top-up failed");

    assert_eq!(transaction.kind, TransactionType::Credit);
    assert_eq!(transaction.amount, "200.00".parse::<Decimal>().unwrap());
    assert_eq!(transaction.payment_method.as_deref(), Some("upi"));
    assert_eq!(transaction.description, "Wallet top-up via upi");
    assert!(transaction.order_id.is_none());

    assert_eq!(wallet_balance(&pool, user).await, Some("200.00".parse().unwrap()));
}

#[tokio::test]
async fn test_amounts_below_one_are_rejected() {
    let (_container, pool) = setup().await;
    let user = create_user(&pool, "pennies@example.com").await;
    let ledger = WalletLedger::new(pool.clone());

    for bad in ["0.99", "0", "-5.00"] {
        let err = ledger
            .add_money(user, bad.parse().unwrap(), "card")
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidAmount));
    }

    // Sub-cent precision is rejected as well.
    let err = ledger
        .add_money(user, "10.001".parse().unwrap(), "card")
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InvalidAmount));

    // No ledger rows were written.
    assert_eq!(ledger_sum(&pool, user).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_balance_always_equals_signed_ledger_sum() {
    let (_container, pool) = setup().await;
    let user = create_user(&pool, "invariant@example.com").await;
    let ledger = WalletLedger::new(pool.clone());

    for amount in ["10.00", "2.50", "37.25", "1.00"] {
        ledger
            .add_money(user, amount.parse().unwrap(), "card")
            .await
            .expect("top-up failed");
        assert_eq!(
            wallet_balance(&pool, user).await.unwrap(),
            ledger_sum(&pool, user).await
        );
    }

    assert_eq!(
        wallet_balance(&pool, user).await,
        Some("50.75".parse().unwrap())
    );
}

#[tokio::test]
async fn test_transaction_history_is_newest_first_and_capped() {
    let (_container, pool) = setup().await;
    let user = create_user(&pool, "history@example.com").await;
    let ledger = WalletLedger::new(pool.clone());

    for _ in 0..55 {
        ledger
            .add_money(user, "1.00".parse().unwrap(), "card")
            .await
            .expect("top-up failed");
    }

    let history = ledger
        .transactions_for_user(user)
        .await
        .expect("history failed");
    assert_eq!(history.len(), 50);
    for window in history.windows(2) {
        assert!(window[0].created_at >= window[1].created_at);
    }
}
