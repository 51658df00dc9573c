//! crust-server library target.
//!
//! Exposes the router, state, and config so the scenario tests in `tests/`
//! can compose an in-process server. The binary `main.rs` depends on this
//! library target.

pub mod api_types;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;
