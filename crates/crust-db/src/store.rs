//! The persistence seam: trait family implemented by both backends.
//!
//! # Design
//!
//! Request handlers hold an `Arc<dyn Store>` and never know which backend is
//! behind it. [`crate::pg::PgStore`] is the real one; [`crate::memory::MemStore`]
//! backs the no-database dev mode and the in-process router tests. Both follow
//! the same contract:
//!
//! - Creation is all-or-nothing: either the order header and every line item
//!   exist afterwards, or none of them do.
//! - Status changes go through the transition table; an illegal change leaves
//!   the stored record untouched and surfaces [`StoreError::InvalidTransition`].
//! - Absence is data (`Ok(None)`), not an error.

use async_trait::async_trait;
use crust_domain::{
    NewOrder, NewPizza, NewUser, Order, OrderFilter, OrderSort, OrderStatus,
    OrderValidationError, PageOptions, Pizza, PizzaFilter, PizzaSort, TransitionError, User,
};
use thiserror::Error;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced row does not exist. Only returned by operations that
    /// require the row (lookups return `Ok(None)` instead).
    #[error("not found")]
    NotFound,

    /// The requested status change is not in the transition table.
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// Creation input failed field validation.
    #[error(transparent)]
    Validation(#[from] OrderValidationError),

    /// Unique-email constraint hit during account creation.
    #[error("email already in use")]
    DuplicateEmail,

    /// Unique-name constraint hit during catalog creation (seeding goes
    /// through the upsert instead).
    #[error("pizza name already in use")]
    DuplicateName,

    /// Whole-record save refused because the order left its modifiable window.
    #[error("order can no longer be modified")]
    NotModifiable,

    /// A concurrent writer kept changing the row while a conditional status
    /// update was retrying.
    #[error("order was modified concurrently")]
    Conflict,

    /// A stored value failed to parse back into its domain type. Indicates
    /// schema drift or an out-of-band writer.
    #[error("corrupt stored record: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ---------------------------------------------------------------------------
// Store traits
// ---------------------------------------------------------------------------

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Validate and create an order with all its line items, atomically.
    async fn create_order(&self, new: NewOrder) -> Result<Order, StoreError>;

    /// Hydrated lookup (header + items). Absent orders are `Ok(None)`.
    async fn order_by_id(&self, id: i64) -> Result<Option<Order>, StoreError>;

    /// Filtered, sorted, paginated listing of hydrated orders.
    async fn find_orders(
        &self,
        filter: &OrderFilter,
        sort: OrderSort,
        page: PageOptions,
    ) -> Result<Vec<Order>, StoreError>;

    /// Count matching the same filter semantics as [`Self::find_orders`].
    async fn count_orders(&self, filter: &OrderFilter) -> Result<u64, StoreError>;

    /// Transition-checked status change. Refreshes `updated_at` and
    /// `status_updated_at` on success; the row is untouched on refusal.
    async fn update_order_status(&self, id: i64, next: OrderStatus)
        -> Result<Order, StoreError>;

    /// Idempotent-replay bookkeeping: refresh only `status_updated_at`.
    async fn touch_order_status(&self, id: i64) -> Result<Order, StoreError>;

    /// Whole-record update of mutable header fields. Does not re-check
    /// transition legality (status changes belong in
    /// [`Self::update_order_status`]), but refuses once the stored order has
    /// left its modifiable window.
    async fn save_order(&self, order: &Order) -> Result<Order, StoreError>;
}

#[async_trait]
pub trait PizzaStore: Send + Sync {
    async fn create_pizza(&self, new: NewPizza) -> Result<Pizza, StoreError>;

    async fn pizza_by_id(&self, id: i64) -> Result<Option<Pizza>, StoreError>;

    async fn find_pizzas(
        &self,
        filter: &PizzaFilter,
        sort: PizzaSort,
        page: PageOptions,
    ) -> Result<Vec<Pizza>, StoreError>;

    async fn count_pizzas(&self, filter: &PizzaFilter) -> Result<u64, StoreError>;

    /// Insert, or update every field of the row with the same unique name.
    /// Seeding runs this repeatedly and must converge, not duplicate.
    async fn upsert_pizza(&self, new: NewPizza) -> Result<Pizza, StoreError>;

    /// Whole-record update by id. Catalog edits never touch order snapshots.
    async fn save_pizza(&self, pizza: &Pizza) -> Result<Pizza, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create an account. A taken email maps to [`StoreError::DuplicateEmail`].
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError>;

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

/// The full persistence surface the server wires in as one trait object.
pub trait Store: OrderStore + PizzaStore + UserStore {}

impl<T: OrderStore + PizzaStore + UserStore> Store for T {}
