//! Request and response types for all crust-server HTTP endpoints.
//!
//! The wire format is camelCase (the documented public surface); domain and
//! storage types stay snake_case. Inbound shapes are loose on purpose:
//! optional fields and legacy aliases (`pizzaId` for `id`, `unitPrice` for
//! `price`) are folded into the canonical domain types by the handlers. No
//! business logic lives here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crust_domain::{LineItem, Order, OrderStatus, PaymentStatus, Pizza, Role, User};

// ---------------------------------------------------------------------------
// /api/auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub message: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: UserJson,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserJson {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserJson {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            address: u.address,
            role: u.role,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// /api/pizzas
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PizzaListQuery {
    pub veg: Option<bool>,
    pub category: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PizzaJson {
    pub id: i64,
    pub name: String,
    pub ingredients: Vec<String>,
    pub price: Decimal,
    pub available: bool,
    pub image: Option<String>,
    pub veg: bool,
    pub category: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Pizza> for PizzaJson {
    fn from(p: Pizza) -> Self {
        Self {
            id: p.id,
            name: p.name,
            ingredients: p.ingredients,
            price: p.price,
            available: p.available,
            image: p.image,
            veg: p.veg,
            category: p.category,
            description: p.description,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePizzaRequest {
    pub name: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub price: Option<Decimal>,
    pub available: Option<bool>,
    pub image: Option<String>,
    pub veg: Option<bool>,
    pub category: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub total_count: u64,
    pub current_page: u32,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PizzaListResponse {
    pub pizzas: Vec<PizzaJson>,
    pub pagination: PaginationMeta,
}

// ---------------------------------------------------------------------------
// /api/orders
// ---------------------------------------------------------------------------

/// One inbound line item. Historical clients disagree on field names, so
/// both spellings of the pizza reference and the price are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemBody {
    #[serde(alias = "pizzaId")]
    pub id: Option<i64>,
    pub name: Option<String>,
    #[serde(alias = "unitPrice")]
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Option<Vec<OrderItemBody>>,
    pub delivery_address: Option<String>,
    pub total_amount: Option<Decimal>,
    pub customer_phone: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemJson {
    pub id: i64,
    pub pizza_id: Option<i64>,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub special_instructions: Option<String>,
}

impl From<LineItem> for OrderItemJson {
    fn from(i: LineItem) -> Self {
        Self {
            id: i.id,
            pizza_id: i.pizza_id,
            name: i.name,
            quantity: i.quantity,
            unit_price: i.unit_price,
            total_price: i.total_price,
            special_instructions: i.special_instructions,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderJson {
    pub id: i64,
    pub user_id: i64,
    pub items: Vec<OrderItemJson>,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub total_amount: Decimal,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub payment_method: Option<String>,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub status_updated_at: Option<DateTime<Utc>>,
    pub estimated_delivery_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderJson {
    fn from(o: Order) -> Self {
        let estimated_delivery_at = o.estimated_delivery_at();
        Self {
            id: o.id,
            user_id: o.user_id,
            items: o.items.into_iter().map(OrderItemJson::from).collect(),
            status: o.status,
            delivery_address: o.delivery_address,
            total_amount: o.total_amount,
            customer_name: o.customer_name,
            customer_email: o.customer_email,
            customer_phone: o.customer_phone,
            payment_method: o.payment_method,
            payment_status: o.payment_status,
            notes: o.notes,
            status_updated_at: o.status_updated_at,
            estimated_delivery_at,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

/// Admin listing entry: the order plus the account it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminOrderJson {
    #[serde(flatten)]
    pub order: OrderJson,
    pub user: Option<UserJson>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

// ---------------------------------------------------------------------------
// /api/webhook/delivery-update
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub message: String,
    pub order_id: i64,
    pub new_status: OrderStatus,
}

// ---------------------------------------------------------------------------
// /health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: u64,
    pub environment: String,
}
