//! Shared runtime state for crust-server.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum; this module owns
//! nothing async itself. The store and the delivery simulator are injected
//! at construction, never reached through globals, so tests can swap in the
//! in-memory backend and a recording sink.

use std::sync::Arc;

use crust_auth::TokenKeys;
use crust_db::Store;
use crust_delivery::DeliverySimulator;

/// Handle shared across all Axum handlers, always wrapped in an `Arc`.
pub struct AppState {
    /// Persistence seam: Postgres in production, in-memory in tests/dev.
    pub store: Arc<dyn Store>,
    /// Token issue/verify keys derived from the configured secret.
    pub tokens: TokenKeys,
    /// Fire-and-forget courier stand-in; scheduled on order creation.
    pub delivery: DeliverySimulator,
    /// Reported by GET /health.
    pub environment: String,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        tokens: TokenKeys,
        delivery: DeliverySimulator,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            store,
            tokens,
            delivery,
            environment: environment.into(),
        }
    }
}

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}
