//! Order status state machine.
//!
//! # Design
//!
//! An order moves through a fixed lifecycle. The transition table is a static
//! lookup ([`OrderStatus::allowed_transitions`]); it is not configurable at
//! runtime and there is exactly one copy of it. Every status mutation in the
//! system routes through [`OrderStatus::is_valid_transition`], which enforces:
//!
//! 1. **Legal transitions only.** An illegal next-status produces
//!    [`TransitionError`]; the stored record must be left untouched.
//! 2. **Terminal closure.** `delivered` and `cancelled` map to the empty set;
//!    nothing ever leaves them.
//!
//! # State diagram
//!
//! ```text
//!   create()
//!   ───────► pending ──► confirmed ──► preparing ──► out_for_delivery ──► delivered (term.)
//!               │             │             │                │
//!               └─────────────┴─────────────┴────────────────┴──► cancelled (term.)
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

/// All valid statuses an order can occupy. Stored as TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Just created; awaiting kitchen confirmation.
    Pending,
    /// Accepted by the kitchen.
    Confirmed,
    /// Being prepared.
    Preparing,
    /// Handed to the courier.
    OutForDelivery,
    /// Delivered to the customer. **Terminal.**
    Delivered,
    /// Cancelled by the customer or the kitchen. **Terminal.**
    Cancelled,
}

/// Unknown status string from the wire or the database.
///
/// The parse fails closed: an unrecognized status never silently maps to a
/// default, it is rejected before it can reach the transition table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown order status: {0:?}")]
pub struct UnknownStatus(pub String);

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Result<Self, UnknownStatus> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "preparing" => Ok(OrderStatus::Preparing),
            "out_for_delivery" => Ok(OrderStatus::OutForDelivery),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }

    /// The set of statuses this status may legally move to.
    pub fn allowed_transitions(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Confirmed, OrderStatus::Cancelled],
            OrderStatus::Confirmed => &[OrderStatus::Preparing, OrderStatus::Cancelled],
            OrderStatus::Preparing => &[OrderStatus::OutForDelivery, OrderStatus::Cancelled],
            OrderStatus::OutForDelivery => &[OrderStatus::Delivered, OrderStatus::Cancelled],
            OrderStatus::Delivered => &[],
            OrderStatus::Cancelled => &[],
        }
    }

    /// True iff `next` is a member of this status's allowed set.
    pub fn is_valid_transition(&self, next: OrderStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Returns `true` if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// True while the order header may still be edited (address, contact,
    /// payment fields). Once preparation starts the record is frozen except
    /// for status transitions.
    pub fn is_modifiable(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Check a transition, producing the typed error for the illegal case.
    pub fn transition_to(&self, next: OrderStatus) -> Result<OrderStatus, TransitionError> {
        if self.is_valid_transition(next) {
            Ok(next)
        } else {
            Err(TransitionError { from: *self, to: next })
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TransitionError
// ---------------------------------------------------------------------------

/// Returned when a status change is not in the transition table.
///
/// Callers map this to a conflict response and MUST leave the stored order
/// unchanged. A rejected transition is an expected condition (stale courier
/// callbacks, duplicate webhooks), not a system fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid status transition: {from} -> {to}")]
pub struct TransitionError {
    /// The status the order was in when the illegal change arrived.
    pub from: OrderStatus,
    /// The status that was refused.
    pub to: OrderStatus,
}

// ---------------------------------------------------------------------------
// PaymentStatus
// ---------------------------------------------------------------------------

/// Payment lifecycle, tracked independently of the delivery lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Result<Self, UnknownStatus> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
