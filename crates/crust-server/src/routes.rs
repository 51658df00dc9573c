//! Axum router and all HTTP handlers for crust-server.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly. Handlers translate between the
//! camelCase wire shapes in [`crate::api_types`] and the domain types, and
//! map every failure through [`crate::error::ApiError`].

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crust_auth::{hash_password, verify_password};
use crust_db::{OrderStore, PizzaStore, StoreError, UserStore};
use crust_domain::{
    NewLineItem, NewOrder, NewPizza, NewUser, OrderFilter, OrderSort, OrderStatus, PageOptions,
    PizzaFilter, PizzaSort, PizzaSortField, Role, SortDir,
};

use crate::api_types::{
    AdminOrderJson, CreateOrderRequest, CreatePizzaRequest, HealthResponse, LoginRequest,
    LoginResponse, OrderJson, OrderListQuery, PaginationMeta, PizzaJson, PizzaListQuery,
    PizzaListResponse, SignupRequest, SignupResponse, UserJson, WebhookResponse,
};
use crate::error::ApiError;
use crate::extract::{AdminUser, AuthUser};
use crate::state::{uptime_secs, AppState};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/pizzas", get(list_pizzas).post(create_pizza))
        .route("/api/orders", post(create_order))
        .route("/api/orders/mine", get(my_orders))
        .route("/api/orders/:order_id", get(order_by_id))
        .route("/api/admin/orders", get(admin_orders))
        .route("/api/webhook/delivery-update", post(delivery_update))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now(),
        uptime: uptime_secs(),
        environment: st.environment.clone(),
    })
}

// ---------------------------------------------------------------------------
// POST /api/auth/signup
// ---------------------------------------------------------------------------

pub(crate) async fn signup(
    State(st): State<Arc<AppState>>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let (Some(name), Some(email), Some(password)) = (body.name, body.email, body.password) else {
        return Err(ApiError::Validation(
            "name, email and password are required".to_string(),
        ));
    };
    if name.trim().is_empty() || email.trim().is_empty() {
        return Err(ApiError::Validation(
            "name, email and password are required".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(ApiError::Validation("Invalid email address".to_string()));
    }
    if password.chars().count() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    // Unknown role strings fall back to the plain user role.
    let role = body
        .role
        .as_deref()
        .and_then(|s| Role::parse(s).ok())
        .unwrap_or_default();

    let password_hash = hash_password(&password).map_err(ApiError::internal)?;
    let user = st
        .store
        .create_user(NewUser {
            name,
            email,
            address: body.address,
            password_hash,
            role,
        })
        .await?;

    info!(user_id = user.id, role = %user.role, "account created");
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created successfully".to_string(),
            role: user.role,
        }),
    ))
}

// ---------------------------------------------------------------------------
// POST /api/auth/login
// ---------------------------------------------------------------------------

pub(crate) async fn login(
    State(st): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (Some(email), Some(password)) = (body.email, body.password) else {
        return Err(ApiError::Validation(
            "email and password are required".to_string(),
        ));
    };

    // One message for unknown email and wrong password: no account oracle.
    let Some(user) = st.store.user_by_email(&email).await? else {
        return Err(ApiError::Validation("Invalid credentials".to_string()));
    };
    if !verify_password(&password, &user.password_hash) {
        return Err(ApiError::Validation("Invalid credentials".to_string()));
    }

    let token = st.tokens.issue(user.id).map_err(ApiError::internal)?;
    Ok(Json(LoginResponse {
        token,
        user: UserJson::from(user),
    }))
}

// ---------------------------------------------------------------------------
// GET /api/pizzas
// ---------------------------------------------------------------------------

pub(crate) async fn list_pizzas(
    State(st): State<Arc<AppState>>,
    Query(q): Query<PizzaListQuery>,
) -> Result<Json<PizzaListResponse>, ApiError> {
    let filter = PizzaFilter {
        veg: q.veg,
        category: q.category,
        ..Default::default()
    };
    // Unknown sort spellings fall back to defaults instead of erroring.
    let sort = PizzaSort {
        field: q
            .sort_by
            .as_deref()
            .and_then(PizzaSortField::parse)
            .unwrap_or_default(),
        dir: q
            .sort_order
            .as_deref()
            .and_then(SortDir::parse)
            .unwrap_or_default(),
    };
    let page = PageOptions::new(q.page, q.limit);

    let pizzas = st.store.find_pizzas(&filter, sort, page).await?;
    let total = st.store.count_pizzas(&filter).await?;

    Ok(Json(PizzaListResponse {
        pizzas: pizzas.into_iter().map(PizzaJson::from).collect(),
        pagination: pagination_meta(total, page),
    }))
}

fn pagination_meta(total: u64, page: PageOptions) -> PaginationMeta {
    let total_pages = page.total_pages(total);
    PaginationMeta {
        total_count: total,
        current_page: page.page,
        total_pages,
        has_next_page: u64::from(page.page) < total_pages,
        has_previous_page: page.page > 1,
    }
}

// ---------------------------------------------------------------------------
// POST /api/pizzas  (admin)
// ---------------------------------------------------------------------------

pub(crate) async fn create_pizza(
    State(st): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Json(body): Json<CreatePizzaRequest>,
) -> Result<(StatusCode, Json<PizzaJson>), ApiError> {
    let (Some(name), Some(price)) = (body.name, body.price) else {
        return Err(ApiError::Validation("name and price are required".to_string()));
    };
    if name.trim().is_empty() {
        return Err(ApiError::Validation("name and price are required".to_string()));
    }
    if price < Decimal::ZERO {
        return Err(ApiError::Validation("price must not be negative".to_string()));
    }

    let pizza = st
        .store
        .create_pizza(
            NewPizza {
                name,
                ingredients: body.ingredients.unwrap_or_default(),
                price,
                available: body.available.unwrap_or(true),
                image: body.image,
                veg: body.veg.unwrap_or(false),
                category: body.category,
                description: body.description,
            }
            .normalized(),
        )
        .await?;

    info!(pizza_id = pizza.id, name = %pizza.name, "pizza created");
    Ok((StatusCode::CREATED, Json(PizzaJson::from(pizza))))
}

// ---------------------------------------------------------------------------
// POST /api/orders
// ---------------------------------------------------------------------------

pub(crate) async fn create_order(
    State(st): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderJson>), ApiError> {
    let (Some(items), Some(delivery_address), Some(total_amount)) =
        (body.items, body.delivery_address, body.total_amount)
    else {
        return Err(ApiError::Validation(
            "items, deliveryAddress and totalAmount are required".to_string(),
        ));
    };

    // Normalize the loose wire items into canonical line items once, here.
    let mut line_items = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let Some(unit_price) = item.price else {
            return Err(ApiError::Validation(format!(
                "item {index}: price is required"
            )));
        };
        line_items.push(NewLineItem {
            pizza_id: item.id,
            name: item.name.unwrap_or_default(),
            quantity: item.quantity.unwrap_or(1),
            unit_price,
            special_instructions: item.special_instructions,
        });
    }

    let order = st
        .store
        .create_order(NewOrder {
            user_id: user.id,
            items: line_items,
            delivery_address,
            total_amount,
            customer_name: Some(user.name),
            customer_email: Some(user.email),
            customer_phone: body.customer_phone,
            payment_method: body.payment_method,
            notes: body.notes,
        })
        .await?;

    // Courier stand-in: one deferred delivered event per order.
    st.delivery.schedule(order.id);

    info!(order_id = order.id, total = %order.total_amount, "order created");
    Ok((StatusCode::CREATED, Json(OrderJson::from(order))))
}

// ---------------------------------------------------------------------------
// GET /api/orders/mine
// ---------------------------------------------------------------------------

pub(crate) async fn my_orders(
    State(st): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(q): Query<OrderListQuery>,
) -> Result<Json<Vec<OrderJson>>, ApiError> {
    let filter = OrderFilter {
        user_id: Some(user.id),
        status: parse_status_filter(q.status.as_deref())?,
        ..Default::default()
    };
    let page = PageOptions::new(q.page, q.limit);

    let orders = st
        .store
        .find_orders(&filter, OrderSort::NewestFirst, page)
        .await?;
    Ok(Json(orders.into_iter().map(OrderJson::from).collect()))
}

fn parse_status_filter(raw: Option<&str>) -> Result<Option<OrderStatus>, ApiError> {
    match raw {
        None => Ok(None),
        Some(s) => OrderStatus::parse(s)
            .map(Some)
            .map_err(|_| ApiError::Validation(format!("Invalid status: {s}"))),
    }
}

// ---------------------------------------------------------------------------
// GET /api/orders/:order_id
// ---------------------------------------------------------------------------

pub(crate) async fn order_by_id(
    State(st): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(order_id): Path<i64>,
) -> Result<Json<OrderJson>, ApiError> {
    let order = st
        .store
        .order_by_id(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    if order.user_id != user.id && !user.is_admin() {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }
    Ok(Json(OrderJson::from(order)))
}

// ---------------------------------------------------------------------------
// GET /api/admin/orders
// ---------------------------------------------------------------------------

pub(crate) async fn admin_orders(
    State(st): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Query(q): Query<OrderListQuery>,
) -> Result<Json<Vec<AdminOrderJson>>, ApiError> {
    let filter = OrderFilter {
        status: parse_status_filter(q.status.as_deref())?,
        ..Default::default()
    };
    let page = PageOptions::new(q.page, q.limit);

    let orders = st
        .store
        .find_orders(&filter, OrderSort::StatusThenNewest, page)
        .await?;

    let mut out = Vec::with_capacity(orders.len());
    for order in orders {
        let user = st
            .store
            .user_by_id(order.user_id)
            .await?
            .map(UserJson::from);
        out.push(AdminOrderJson {
            order: OrderJson::from(order),
            user,
        });
    }
    Ok(Json(out))
}

// ---------------------------------------------------------------------------
// POST /api/webhook/delivery-update
// ---------------------------------------------------------------------------

/// Inbound courier event. The payload is handled as loose JSON so every
/// malformed shape gets the documented 400 with a `message` body instead of
/// a framework rejection.
pub(crate) async fn delivery_update(
    State(st): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let missing = |v: Option<&serde_json::Value>| v.map_or(true, serde_json::Value::is_null);
    if missing(body.get("orderId")) || missing(body.get("status")) || missing(body.get("timestamp"))
    {
        return Err(ApiError::Validation(
            "orderId, status and timestamp are required".to_string(),
        ));
    }

    let order_id = parse_order_id(&body["orderId"])
        .ok_or_else(|| ApiError::Validation("Invalid orderId".to_string()))?;

    let next = body["status"]
        .as_str()
        .and_then(|s| OrderStatus::parse(s).ok())
        .ok_or_else(|| ApiError::Validation(format!("Invalid status: {}", body["status"])))?;

    if !timestamp_is_valid(&body["timestamp"]) {
        return Err(ApiError::Validation("Invalid timestamp".to_string()));
    }

    let order = st
        .store
        .order_by_id(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    if order.status == next {
        // Idempotent replay: acknowledge, refresh the status timestamp only.
        let order = st.store.touch_order_status(order_id).await?;
        info!(order_id, status = %order.status, "delivery update replayed");
        return Ok(Json(WebhookResponse {
            message: "Order status already set".to_string(),
            order_id,
            new_status: order.status,
        }));
    }

    let order = match st.store.update_order_status(order_id, next).await {
        Ok(order) => order,
        Err(err) => {
            if let StoreError::InvalidTransition(ref t) = err {
                warn!(order_id, from = %t.from, to = %t.to, "refused status transition");
            }
            return Err(err.into());
        }
    };

    info!(order_id, status = %order.status, "delivery update applied");
    Ok(Json(WebhookResponse {
        message: "Order status updated".to_string(),
        order_id,
        new_status: order.status,
    }))
}

fn parse_order_id(v: &serde_json::Value) -> Option<i64> {
    match v {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// RFC 3339 strings and epoch numbers both count; the server clock is
/// authoritative for what gets stored either way.
fn timestamp_is_valid(v: &serde_json::Value) -> bool {
    match v {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s).is_ok(),
        serde_json::Value::Number(_) => true,
        _ => false,
    }
}
