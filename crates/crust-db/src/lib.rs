//! Persistence for the pizza-ordering backend.
//!
//! Pool construction and embedded migrations live here; the entity
//! operations live behind the trait family in [`store`], with the Postgres
//! implementation in [`pg`] and the in-memory one in [`memory`].

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub mod memory;
pub mod pg;
pub mod store;

pub use memory::MemStore;
pub use pg::PgStore;
pub use store::{OrderStore, PizzaStore, Store, StoreError, UserStore};

pub const ENV_DB_URL: &str = "CRUST_DATABASE_URL";

/// Connect to Postgres using CRUST_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL)
        .with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url).await
}

/// Connect to Postgres at `url` with the standard pool sizing.
pub async fn connect(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema = 'public' and table_name = 'orders'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus { ok, has_orders_table: exists })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_orders_table: bool,
}

/// Count orders still in flight (non-terminal status). CLI guardrails use
/// this to refuse schema changes under a kitchen that is mid-service.
pub async fn count_open_orders(pool: &PgPool) -> Result<i64> {
    // If the schema doesn't exist yet, treat as 0 (safe) rather than failing.
    let st = status(pool).await?;
    if !st.has_orders_table {
        return Ok(0);
    }

    let (n,): (i64,) = sqlx::query_as::<_, (i64,)>(
        r#"
        select count(*)::bigint
        from orders
        where status not in ('delivered', 'cancelled')
        "#,
    )
    .fetch_one(pool)
    .await
    .context("count_open_orders failed")?;

    Ok(n)
}

/// Convenience boolean.
pub async fn has_open_orders(pool: &PgPool) -> Result<bool> {
    Ok(count_open_orders(pool).await? > 0)
}
