//! Simulated courier for the ordering backend.
//!
//! Real deployments would receive delivery progress from a courier
//! integration. This crate stands in for that integration: once an order
//! leaves the kitchen, [`DeliverySimulator`] waits a few jittered seconds
//! and then reports the terminal `delivered` status through a
//! [`StatusSink`].
//!
//! # Design
//!
//! The simulator never touches storage. It only speaks the public status
//! webhook, exactly like an external courier would, so every update it
//! produces goes through the same transition checks as a real one. The
//! sink is a trait so tests can swap the HTTP client for a recorder and
//! drive the clock virtually.
//!
//! Delivery reports are fire-and-forget: a sink failure is logged and
//! dropped, never retried. An order cancelled while the timer is pending
//! simply causes the webhook to refuse the late `delivered` update.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crust_domain::OrderStatus;

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// Payload posted to the status webhook. Field names follow the public
/// HTTP surface, not the internal snake_case convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryUpdate {
    pub order_id: i64,
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
}

impl DeliveryUpdate {
    pub fn delivered(order_id: i64) -> Self {
        Self {
            order_id,
            status: OrderStatus::Delivered,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sink seam
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook endpoint answered {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Destination for simulated delivery reports.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn deliver(&self, update: &DeliveryUpdate) -> Result<(), SinkError>;
}

/// Production sink: POSTs updates to the order status webhook over HTTP.
pub struct WebhookClient {
    http: reqwest::Client,
    endpoint: String,
}

impl WebhookClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl StatusSink for WebhookClient {
    async fn deliver(&self, update: &DeliveryUpdate) -> Result<(), SinkError> {
        let resp = self.http.post(&self.endpoint).json(update).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(11),
        }
    }
}

/// Schedules one deferred `delivered` report per dispatched order.
pub struct DeliverySimulator {
    config: SimulatorConfig,
    sink: Arc<dyn StatusSink>,
}

impl DeliverySimulator {
    pub fn new(config: SimulatorConfig, sink: Arc<dyn StatusSink>) -> Self {
        Self { config, sink }
    }

    /// Queues a single delivery report for `order_id` after a jittered
    /// delay. Returns the task handle; callers are free to drop it, the
    /// task keeps running detached.
    pub fn schedule(&self, order_id: i64) -> tokio::task::JoinHandle<()> {
        let delay = self.jitter();
        let sink = Arc::clone(&self.sink);
        let sim_id = Uuid::new_v4();
        tracing::info!(
            %sim_id,
            order_id,
            delay_ms = delay.as_millis() as u64,
            "delivery simulation scheduled"
        );
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let update = DeliveryUpdate::delivered(order_id);
            match sink.deliver(&update).await {
                Ok(()) => {
                    tracing::info!(%sim_id, order_id, "delivery report accepted");
                }
                Err(err) => {
                    // No retry. The webhook refusing a late report (order
                    // already cancelled) is the expected path here.
                    tracing::warn!(%sim_id, order_id, error = %err, "delivery report dropped");
                }
            }
        })
    }

    fn jitter(&self) -> Duration {
        let min = self.config.min_delay;
        let max = self.config.max_delay.max(min);
        if max == min {
            return min;
        }
        let span_ms = (max - min).as_millis() as u64;
        min + Duration::from_millis(rand::thread_rng().gen_range(0..=span_ms))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
