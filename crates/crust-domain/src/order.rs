//! Order entity: header plus line items.
//!
//! # Invariants
//!
//! 1. **Snapshot pricing.** A line item's `name` and `unit_price` are copied
//!    from the pizza at order time. Later catalog edits never reach back into
//!    existing orders.
//! 2. **Total integrity.** `total_amount` equals the sum of line totals at
//!    creation; [`NewOrder::validate`] refuses a declared total that does not
//!    match the computed sum.
//! 3. **Status discipline.** `status` only changes through the transition
//!    table in [`crate::status`]; orders are never deleted, cancellation is
//!    a status, not a row removal.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::status::{OrderStatus, PaymentStatus};

/// Largest quantity accepted for a single line item.
pub const MAX_ITEM_QUANTITY: i32 = 100;
/// Longest accepted delivery address.
pub const MAX_ADDRESS_LEN: usize = 500;

/// Normalize a decimal to currency scale (two fractional digits).
pub fn money(value: Decimal) -> Decimal {
    let mut m = value.round_dp(2);
    m.rescale(2);
    m
}

// ---------------------------------------------------------------------------
// Line items
// ---------------------------------------------------------------------------

/// One pizza entry within a stored order. Price and name are snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: i64,
    /// The catalog pizza this item was created from, if it still had an id
    /// at order time. Informational only; never re-read after creation.
    pub pizza_id: Option<i64>,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub special_instructions: Option<String>,
}

/// Canonical input for one line item, normalized at the API boundary.
///
/// Inbound payloads are loosely shaped (`id` vs `pizzaId`, `price` vs
/// `unitPrice`, quantity sometimes absent); the HTTP layer folds those into
/// this one record before anything else sees them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLineItem {
    pub pizza_id: Option<i64>,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub special_instructions: Option<String>,
}

impl NewLineItem {
    /// `unit_price × quantity`, at currency scale.
    pub fn line_total(&self) -> Decimal {
        money(self.unit_price * Decimal::from(self.quantity))
    }
}

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

/// A stored order, fully hydrated (header + items).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub items: Vec<LineItem>,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub total_amount: Decimal,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub payment_method: Option<String>,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    /// Refreshed whenever a status event is applied, including idempotent
    /// replays that change nothing else.
    pub status_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Header fields may be edited only before preparation starts.
    pub fn can_modify(&self) -> bool {
        self.status.is_modifiable()
    }

    /// Units across all line items.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i64::from(i.quantity)).sum()
    }

    /// Naive kitchen estimate: 20 minutes base plus 5 minutes per unit.
    pub fn estimated_delivery_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::minutes(20 + 5 * self.total_quantity())
    }
}

/// Input for order creation. Validated before any write happens.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: i64,
    pub items: Vec<NewLineItem>,
    pub delivery_address: String,
    pub total_amount: Decimal,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

impl NewOrder {
    /// Sum of line totals, at currency scale.
    pub fn computed_total(&self) -> Decimal {
        money(self.items.iter().map(NewLineItem::line_total).sum())
    }

    /// Field-level validation. The first failing field is reported; callers
    /// surface the message as a client error.
    pub fn validate(&self) -> Result<(), OrderValidationError> {
        if self.items.is_empty() {
            return Err(OrderValidationError::EmptyItems);
        }
        for (index, item) in self.items.iter().enumerate() {
            if item.name.trim().is_empty() {
                return Err(OrderValidationError::MissingItemName { index });
            }
            if item.quantity < 1 {
                return Err(OrderValidationError::QuantityTooSmall { index });
            }
            if item.quantity > MAX_ITEM_QUANTITY {
                return Err(OrderValidationError::QuantityTooLarge {
                    index,
                    quantity: item.quantity,
                });
            }
            if item.unit_price < Decimal::ZERO {
                return Err(OrderValidationError::NegativePrice { index });
            }
        }
        if self.delivery_address.trim().is_empty() {
            return Err(OrderValidationError::MissingAddress);
        }
        if self.delivery_address.len() > MAX_ADDRESS_LEN {
            return Err(OrderValidationError::AddressTooLong);
        }
        let computed = self.computed_total();
        if money(self.total_amount) != computed {
            return Err(OrderValidationError::TotalMismatch {
                declared: money(self.total_amount),
                computed,
            });
        }
        Ok(())
    }
}

/// A creation input the caller got wrong. Always a client error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderValidationError {
    #[error("order must contain at least one item")]
    EmptyItems,
    #[error("item {index}: name is required")]
    MissingItemName { index: usize },
    #[error("item {index}: quantity must be at least 1")]
    QuantityTooSmall { index: usize },
    #[error("item {index}: quantity {quantity} exceeds the maximum of {max}", max = MAX_ITEM_QUANTITY)]
    QuantityTooLarge { index: usize, quantity: i32 },
    #[error("item {index}: unit price must not be negative")]
    NegativePrice { index: usize },
    #[error("delivery address is required")]
    MissingAddress,
    #[error("delivery address exceeds {max} characters", max = MAX_ADDRESS_LEN)]
    AddressTooLong,
    #[error("total amount {declared} does not match the sum of line totals {computed}")]
    TotalMismatch { declared: Decimal, computed: Decimal },
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Filter for order listings. All fields are conjunctive.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrderFilter {
    pub user_id: Option<i64>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

impl OrderFilter {
    /// One place defines the filter semantics; both store backends follow it.
    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.map_or(true, |u| order.user_id == u)
            && self.status.map_or(true, |s| order.status == s)
            && self.payment_status.map_or(true, |p| order.payment_status == p)
    }
}

/// Sort orders for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderSort {
    /// Most recent first (customer views).
    #[default]
    NewestFirst,
    OldestFirst,
    /// Group by status (alphabetical), newest first within a group
    /// (the admin dashboard layout).
    StatusThenNewest,
}

impl OrderSort {
    pub fn cmp(&self, a: &Order, b: &Order) -> std::cmp::Ordering {
        match self {
            OrderSort::NewestFirst => b.created_at.cmp(&a.created_at),
            OrderSort::OldestFirst => a.created_at.cmp(&b.created_at),
            OrderSort::StatusThenNewest => a
                .status
                .as_str()
                .cmp(b.status.as_str())
                .then(b.created_at.cmp(&a.created_at)),
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
