//! Domain types for the pizza-ordering backend: orders and their line items,
//! the order status state machine, the pizza catalog, and user accounts.
//!
//! This crate owns no I/O. Persistence lives behind the store traits in
//! `crust-db`; HTTP shapes live in `crust-server`.

pub mod order;
pub mod page;
pub mod pizza;
pub mod status;
pub mod user;

pub use order::{
    LineItem, NewLineItem, NewOrder, Order, OrderFilter, OrderSort, OrderValidationError,
};
pub use page::PageOptions;
pub use pizza::{NewPizza, Pizza, PizzaFilter, PizzaSort, PizzaSortField, SortDir};
pub use status::{OrderStatus, PaymentStatus, TransitionError, UnknownStatus};
pub use user::{NewUser, Role, UnknownRole, User};
