//! Postgres implementation of the store traits.
//!
//! # Design
//!
//! - Order creation runs in one transaction: header insert, then one insert
//!   per line item. Any failure drops the transaction and rolls everything
//!   back; readers never observe a header without its items.
//! - Status changes are conditional single-row writes
//!   (`UPDATE … WHERE id = $1 AND status = $2`). A miss means another writer
//!   got there first; the loop re-reads and re-checks the transition against
//!   the fresh status, so racing updates resolve to one winner and one
//!   properly refused loser.
//! - Rows are mapped by hand (`try_get`), with stored enums re-parsed through
//!   the domain types so an out-of-band writer cannot smuggle an unknown
//!   status into the process.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crust_domain::order::money;
use crust_domain::{
    LineItem, NewOrder, NewPizza, NewUser, Order, OrderFilter, OrderSort, OrderStatus,
    PageOptions, PaymentStatus, Pizza, PizzaFilter, PizzaSort, PizzaSortField, Role, SortDir,
    User,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::store::{OrderStore, PizzaStore, StoreError, UserStore};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Fetch line items for a set of orders in one round trip, grouped by
    /// order id.
    async fn items_for_orders(
        &self,
        ids: &[i64],
    ) -> Result<HashMap<i64, Vec<LineItem>>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query(
            r#"
            select id, order_id, pizza_id, pizza_name, quantity, unit_price,
                   total_price, special_instructions
            from order_items
            where order_id = any($1)
            order by order_id, id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<i64, Vec<LineItem>> = HashMap::new();
        for row in rows {
            let order_id: i64 = row.try_get("order_id")?;
            grouped.entry(order_id).or_default().push(LineItem {
                id: row.try_get("id")?,
                pizza_id: row.try_get("pizza_id")?,
                name: row.try_get("pizza_name")?,
                quantity: row.try_get("quantity")?,
                unit_price: row.try_get("unit_price")?,
                total_price: row.try_get("total_price")?,
                special_instructions: row.try_get("special_instructions")?,
            });
        }
        Ok(grouped)
    }

    async fn fetch_status(&self, id: i64) -> Result<Option<OrderStatus>, StoreError> {
        let row = sqlx::query("select status from orders where id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let s: String = row.try_get("status")?;
                Ok(Some(parse_status(&s)?))
            }
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn parse_status(s: &str) -> Result<OrderStatus, StoreError> {
    OrderStatus::parse(s).map_err(|e| StoreError::Corrupt(format!("orders.status: {e}")))
}

fn order_from_row(row: &PgRow) -> Result<Order, StoreError> {
    let status: String = row.try_get("status")?;
    let payment: String = row.try_get("payment_status")?;
    Ok(Order {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        items: Vec::new(),
        status: parse_status(&status)?,
        delivery_address: row.try_get("delivery_address")?,
        total_amount: row.try_get("total_amount")?,
        customer_name: row.try_get("customer_name")?,
        customer_email: row.try_get("customer_email")?,
        customer_phone: row.try_get("customer_phone")?,
        payment_method: row.try_get("payment_method")?,
        payment_status: PaymentStatus::parse(&payment)
            .map_err(|e| StoreError::Corrupt(format!("orders.payment_status: {e}")))?,
        notes: row.try_get("notes")?,
        status_updated_at: row.try_get::<Option<DateTime<Utc>>, _>("status_updated_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn pizza_from_row(row: &PgRow) -> Result<Pizza, StoreError> {
    let raw_ingredients: String = row.try_get("ingredients")?;
    let ingredients: Vec<String> = serde_json::from_str(&raw_ingredients)
        .map_err(|e| StoreError::Corrupt(format!("pizzas.ingredients: {e}")))?;
    Ok(Pizza {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        ingredients,
        price: row.try_get("price")?,
        available: row.try_get("available")?,
        image: row.try_get("image")?,
        veg: row.try_get("veg")?,
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        address: row.try_get("address")?,
        password_hash: row.try_get("password_hash")?,
        role: Role::parse(&role).map_err(|e| StoreError::Corrupt(format!("users.role: {e}")))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Detect a Postgres unique constraint violation by name (class 23505).
fn is_unique_constraint_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505")
                && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Filter fragments
// ---------------------------------------------------------------------------

fn push_order_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    if let Some(user_id) = filter.user_id {
        qb.push(" and user_id = ");
        qb.push_bind(user_id);
    }
    if let Some(status) = filter.status {
        qb.push(" and status = ");
        qb.push_bind(status.as_str());
    }
    if let Some(payment) = filter.payment_status {
        qb.push(" and payment_status = ");
        qb.push_bind(payment.as_str());
    }
}

fn push_pizza_filter<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a PizzaFilter) {
    if let Some(veg) = filter.veg {
        qb.push(" and veg = ");
        qb.push_bind(veg);
    }
    if let Some(category) = filter.category.as_deref() {
        qb.push(" and category = ");
        qb.push_bind(category);
    }
    if let Some(available) = filter.available {
        qb.push(" and available = ");
        qb.push_bind(available);
    }
}

fn order_sort_sql(sort: OrderSort) -> &'static str {
    match sort {
        OrderSort::NewestFirst => " order by created_at desc, id desc",
        OrderSort::OldestFirst => " order by created_at asc, id asc",
        OrderSort::StatusThenNewest => " order by status asc, created_at desc, id desc",
    }
}

fn pizza_sort_sql(sort: PizzaSort) -> &'static str {
    match (sort.field, sort.dir) {
        (PizzaSortField::Name, SortDir::Asc) => " order by name asc, id asc",
        (PizzaSortField::Name, SortDir::Desc) => " order by name desc, id desc",
        (PizzaSortField::Price, SortDir::Asc) => " order by price asc, id asc",
        (PizzaSortField::Price, SortDir::Desc) => " order by price desc, id desc",
        (PizzaSortField::CreatedAt, SortDir::Asc) => " order by created_at asc, id asc",
        (PizzaSortField::CreatedAt, SortDir::Desc) => " order by created_at desc, id desc",
    }
}

// ---------------------------------------------------------------------------
// OrderStore
// ---------------------------------------------------------------------------

#[async_trait]
impl OrderStore for PgStore {
    async fn create_order(&self, new: NewOrder) -> Result<Order, StoreError> {
        new.validate()?;

        let mut tx = self.pool.begin().await?;

        // Status and payment_status take their schema defaults ('pending').
        let row = sqlx::query(
            r#"
            insert into orders (
              user_id, customer_name, customer_email, customer_phone,
              delivery_address, total_amount, payment_method, notes
            ) values ($1, $2, $3, $4, $5, $6, $7, $8)
            returning id
            "#,
        )
        .bind(new.user_id)
        .bind(&new.customer_name)
        .bind(&new.customer_email)
        .bind(&new.customer_phone)
        .bind(&new.delivery_address)
        .bind(money(new.total_amount))
        .bind(&new.payment_method)
        .bind(&new.notes)
        .fetch_one(&mut *tx)
        .await?;
        let order_id: i64 = row.try_get("id")?;

        for item in &new.items {
            sqlx::query(
                r#"
                insert into order_items (
                  order_id, pizza_id, pizza_name, quantity, unit_price,
                  total_price, special_instructions
                ) values ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(order_id)
            .bind(item.pizza_id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(money(item.unit_price))
            .bind(item.line_total())
            .bind(&item.special_instructions)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.order_by_id(order_id).await?.ok_or(StoreError::NotFound)
    }

    async fn order_by_id(&self, id: i64) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query("select * from orders where id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(None) };

        let mut order = order_from_row(&row)?;
        let mut items = self.items_for_orders(&[order.id]).await?;
        order.items = items.remove(&order.id).unwrap_or_default();
        Ok(Some(order))
    }

    async fn find_orders(
        &self,
        filter: &OrderFilter,
        sort: OrderSort,
        page: PageOptions,
    ) -> Result<Vec<Order>, StoreError> {
        let mut qb = QueryBuilder::new("select * from orders where 1=1");
        push_order_filter(&mut qb, filter);
        qb.push(order_sort_sql(sort));
        qb.push(" limit ");
        qb.push_bind(i64::from(page.limit));
        qb.push(" offset ");
        qb.push_bind(page.offset() as i64);

        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut orders = rows
            .iter()
            .map(order_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        let mut items = self.items_for_orders(&ids).await?;
        for order in &mut orders {
            order.items = items.remove(&order.id).unwrap_or_default();
        }
        Ok(orders)
    }

    async fn count_orders(&self, filter: &OrderFilter) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::new("select count(*)::bigint from orders where 1=1");
        push_order_filter(&mut qb, filter);
        let row = qb.build().fetch_one(&self.pool).await?;
        let n: i64 = row.try_get(0)?;
        Ok(n as u64)
    }

    async fn update_order_status(
        &self,
        id: i64,
        next: OrderStatus,
    ) -> Result<Order, StoreError> {
        // Compare-and-swap: the write only lands if the status is still the
        // one the transition was checked against. A miss means we raced;
        // re-read and re-check, so the loser of a race is refused by the
        // table rather than blindly overwriting the winner.
        for _ in 0..3 {
            let current = self
                .fetch_status(id)
                .await?
                .ok_or(StoreError::NotFound)?;
            current.transition_to(next)?;

            let res = sqlx::query(
                r#"
                update orders
                set status = $1, updated_at = now(), status_updated_at = now()
                where id = $2 and status = $3
                "#,
            )
            .bind(next.as_str())
            .bind(id)
            .bind(current.as_str())
            .execute(&self.pool)
            .await?;

            if res.rows_affected() == 1 {
                return self.order_by_id(id).await?.ok_or(StoreError::NotFound);
            }
        }
        Err(StoreError::Conflict)
    }

    async fn touch_order_status(&self, id: i64) -> Result<Order, StoreError> {
        let res = sqlx::query("update orders set status_updated_at = now() where id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.order_by_id(id).await?.ok_or(StoreError::NotFound)
    }

    async fn save_order(&self, order: &Order) -> Result<Order, StoreError> {
        let stored = self
            .order_by_id(order.id)
            .await?
            .ok_or(StoreError::NotFound)?;
        if !stored.can_modify() {
            return Err(StoreError::NotModifiable);
        }

        sqlx::query(
            r#"
            update orders
            set customer_name = $1, customer_email = $2, customer_phone = $3,
                delivery_address = $4, total_amount = $5, status = $6,
                payment_method = $7, payment_status = $8, notes = $9,
                updated_at = now()
            where id = $10
            "#,
        )
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(&order.customer_phone)
        .bind(&order.delivery_address)
        .bind(money(order.total_amount))
        .bind(order.status.as_str())
        .bind(&order.payment_method)
        .bind(order.payment_status.as_str())
        .bind(&order.notes)
        .bind(order.id)
        .execute(&self.pool)
        .await?;

        self.order_by_id(order.id).await?.ok_or(StoreError::NotFound)
    }
}

// ---------------------------------------------------------------------------
// PizzaStore
// ---------------------------------------------------------------------------

#[async_trait]
impl PizzaStore for PgStore {
    async fn create_pizza(&self, new: NewPizza) -> Result<Pizza, StoreError> {
        let new = new.normalized();
        let ingredients = serde_json::to_string(&new.ingredients)
            .map_err(|e| StoreError::Corrupt(format!("ingredients encode: {e}")))?;
        let res = sqlx::query(
            r#"
            insert into pizzas (
              name, ingredients, price, available, image, veg, category, description
            ) values ($1, $2, $3, $4, $5, $6, $7, $8)
            returning *
            "#,
        )
        .bind(&new.name)
        .bind(&ingredients)
        .bind(new.price)
        .bind(new.available)
        .bind(&new.image)
        .bind(new.veg)
        .bind(&new.category)
        .bind(&new.description)
        .fetch_one(&self.pool)
        .await;

        match res {
            Ok(row) => pizza_from_row(&row),
            Err(e) if is_unique_constraint_violation(&e, "pizzas_name_key") => {
                Err(StoreError::DuplicateName)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn pizza_by_id(&self, id: i64) -> Result<Option<Pizza>, StoreError> {
        let row = sqlx::query("select * from pizzas where id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(pizza_from_row).transpose()
    }

    async fn find_pizzas(
        &self,
        filter: &PizzaFilter,
        sort: PizzaSort,
        page: PageOptions,
    ) -> Result<Vec<Pizza>, StoreError> {
        let mut qb = QueryBuilder::new("select * from pizzas where 1=1");
        push_pizza_filter(&mut qb, filter);
        qb.push(pizza_sort_sql(sort));
        qb.push(" limit ");
        qb.push_bind(i64::from(page.limit));
        qb.push(" offset ");
        qb.push_bind(page.offset() as i64);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(pizza_from_row).collect()
    }

    async fn count_pizzas(&self, filter: &PizzaFilter) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::new("select count(*)::bigint from pizzas where 1=1");
        push_pizza_filter(&mut qb, filter);
        let row = qb.build().fetch_one(&self.pool).await?;
        let n: i64 = row.try_get(0)?;
        Ok(n as u64)
    }

    async fn upsert_pizza(&self, new: NewPizza) -> Result<Pizza, StoreError> {
        let new = new.normalized();
        let ingredients = serde_json::to_string(&new.ingredients)
            .map_err(|e| StoreError::Corrupt(format!("ingredients encode: {e}")))?;
        let row = sqlx::query(
            r#"
            insert into pizzas (
              name, ingredients, price, available, image, veg, category, description
            ) values ($1, $2, $3, $4, $5, $6, $7, $8)
            on conflict (name) do update
            set ingredients = excluded.ingredients,
                price = excluded.price,
                available = excluded.available,
                image = excluded.image,
                veg = excluded.veg,
                category = excluded.category,
                description = excluded.description,
                updated_at = now()
            returning *
            "#,
        )
        .bind(&new.name)
        .bind(&ingredients)
        .bind(new.price)
        .bind(new.available)
        .bind(&new.image)
        .bind(new.veg)
        .bind(&new.category)
        .bind(&new.description)
        .fetch_one(&self.pool)
        .await?;
        pizza_from_row(&row)
    }

    async fn save_pizza(&self, pizza: &Pizza) -> Result<Pizza, StoreError> {
        let ingredients = serde_json::to_string(&pizza.ingredients)
            .map_err(|e| StoreError::Corrupt(format!("ingredients encode: {e}")))?;
        let res = sqlx::query(
            r#"
            update pizzas
            set name = $1, ingredients = $2, price = $3, available = $4,
                image = $5, veg = $6, category = $7, description = $8,
                updated_at = now()
            where id = $9
            "#,
        )
        .bind(&pizza.name)
        .bind(&ingredients)
        .bind(money(pizza.price))
        .bind(pizza.available)
        .bind(&pizza.image)
        .bind(pizza.veg)
        .bind(&pizza.category)
        .bind(&pizza.description)
        .bind(pizza.id)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.pizza_by_id(pizza.id).await?.ok_or(StoreError::NotFound)
    }
}

// ---------------------------------------------------------------------------
// UserStore
// ---------------------------------------------------------------------------

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let res = sqlx::query(
            r#"
            insert into users (name, email, address, password_hash, role)
            values ($1, $2, $3, $4, $5)
            returning *
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.address)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .fetch_one(&self.pool)
        .await;

        match res {
            Ok(row) => user_from_row(&row),
            Err(e) if is_unique_constraint_violation(&e, "users_email_key") => {
                Err(StoreError::DuplicateEmail)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("select * from users where id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("select * from users where email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }
}
