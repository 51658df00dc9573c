//! crust-server entry point.
//!
//! This file is intentionally thin: it sets up tracing, resolves config,
//! builds the store and shared state, wires middleware, and starts the HTTP
//! server. All route handlers live in `routes.rs`; shared state lives in
//! `state.rs`.

use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

use crust_auth::TokenKeys;
use crust_db::{MemStore, PgStore, Store};
use crust_delivery::{DeliverySimulator, SimulatorConfig, WebhookClient};
use crust_server::config::{ServerConfig, StoreBackend};
use crust_server::{routes, state};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Dev convenience; silent if the file does not exist. Production injects
    // env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let config = ServerConfig::from_env()?;

    let store: Arc<dyn Store> = match config.backend {
        StoreBackend::Postgres => {
            let pool = crust_db::connect_from_env().await?;
            crust_db::migrate(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            warn!("in-memory store selected; all data is lost on shutdown");
            Arc::new(MemStore::new())
        }
    };

    let tokens = TokenKeys::from_secret(config.jwt_secret.as_bytes());

    // The simulator reports back through the public webhook, exactly like an
    // external courier integration would.
    let webhook_endpoint = format!("http://{}/api/webhook/delivery-update", config.addr);
    let delivery = DeliverySimulator::new(
        SimulatorConfig::default(),
        Arc::new(WebhookClient::new(webhook_endpoint)),
    );

    let shared = Arc::new(state::AppState::new(
        store,
        tokens,
        delivery,
        config.environment.clone(),
    ));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    info!(environment = %config.environment, "crust-server listening on http://{}", config.addr);

    axum::serve(tokio::net::TcpListener::bind(config.addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("CRUST_LOG")
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// CORS: allow only localhost development origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
}
