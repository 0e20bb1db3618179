//! Domain types for the printshop service.
//!
//! Identifier newtypes and the status enums shared across modules. Enums
//! are stored as `snake_case` text columns; parsing a caller-supplied
//! status string goes through [`std::str::FromStr`] so handlers can map
//! bad values to a 400 instead of a serde rejection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
        )]
        #[sqlx(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random id.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing `Uuid`.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

id_type!(
    /// Unique identifier for a user account.
    UserId
);
id_type!(
    /// Unique identifier for a catalog category.
    CategoryId
);
id_type!(
    /// Unique identifier for a product.
    ProductId
);
id_type!(
    /// Unique identifier for a cart line.
    CartItemId
);
id_type!(
    /// Unique identifier for an order.
    OrderId
);
id_type!(
    /// Unique identifier for an order line.
    OrderItemId
);
id_type!(
    /// Unique identifier for a wallet.
    WalletId
);
id_type!(
    /// Unique identifier for a wallet ledger entry.
    TransactionId
);
id_type!(
    /// Unique identifier for a complaint.
    ComplaintId
);

// ============================================================================
// Roles
// ============================================================================

/// Account role, gating the admin surface.
///
/// Stored as the `user_role` enum type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum Role {
    /// Regular customer: catalog, cart, own orders, wallet, complaints.
    Customer,
    /// Administrator: catalog management, order status, transaction listing.
    Admin,
}

impl Role {
    /// Text form as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Order status
// ============================================================================

/// Lifecycle status of an order.
///
/// Transitions run `pending → confirmed → in_production → completed`;
/// `cancelled` is reachable from any non-terminal state. Anything else is
/// rejected (see [`OrderStatus::can_transition_to`]).
///
/// Stored as the `order_status` enum type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, awaiting confirmation.
    Pending,
    /// Accepted by staff.
    Confirmed,
    /// Being printed.
    InProduction,
    /// Finished and handed over. Terminal.
    Completed,
    /// Abandoned before completion. Terminal.
    Cancelled,
}

impl OrderStatus {
    /// Text form as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::InProduction => "in_production",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further transitions are allowed out of this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether an administrator may move an order from `self` to `next`.
    ///
    /// Single forward steps only, plus cancellation from any non-terminal
    /// state. Re-asserting the current status is not a transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed)
                | (Self::Confirmed, Self::InProduction)
                | (Self::InProduction, Self::Completed)
        ) || matches!(next, Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "in_production" => Ok(Self::InProduction),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(()),
        }
    }
}

// ============================================================================
// Payment status
// ============================================================================

/// Settlement state of an order's payment.
///
/// Stored as the `payment_status` enum type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting settlement (non-wallet payment methods).
    Pending,
    /// Settled from the wallet.
    Paid,
    /// Wallet settlement was attempted and declined.
    Failed,
}

impl PaymentStatus {
    /// Text form as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Ledger entry type
// ============================================================================

/// Direction of a wallet ledger entry.
///
/// Stored as the `transaction_type` enum type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "transaction_type", rename_all = "snake_case")]
pub enum TransactionType {
    /// Money added to the wallet.
    Credit,
    /// Money taken out of the wallet.
    Debit,
}

impl TransactionType {
    /// Text form as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            _ => Err(()),
        }
    }
}

// ============================================================================
// Complaint status
// ============================================================================

/// Lifecycle status of a complaint.
///
/// Deliberately permissive: any enum value may be written by staff.
///
/// Stored as the `complaint_status` enum type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "complaint_status", rename_all = "snake_case")]
pub enum ComplaintStatus {
    /// Newly filed.
    Open,
    /// Staff is looking at it.
    InProgress,
    /// Addressed to the customer's satisfaction.
    Resolved,
    /// Closed without resolution.
    Closed,
}

impl ComplaintStatus {
    /// Text form as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::InProduction,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::InProduction));
        assert!(OrderStatus::InProduction.can_transition_to(OrderStatus::Completed));
    }

    #[test]
    fn test_cancellation_from_non_terminal_states() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::InProduction.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_skipping_states_rejected() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Completed));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::InProduction));
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Completed));
    }

    #[test]
    fn test_no_backward_or_self_transitions() {
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_terminal_states() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
    }

    #[test]
    fn test_id_display_is_uuid() {
        let id = OrderId::new();
        assert_eq!(id.to_string(), id.as_uuid().to_string());
    }
}
