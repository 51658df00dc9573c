//! In-memory implementation of the store traits.
//!
//! Backs the no-database dev mode (`CRUST_STORE=memory`) and the in-process
//! router tests. Semantics mirror [`crate::pg::PgStore`] exactly (validation,
//! transition discipline, filter/sort/pagination), with one mutex standing in
//! for the database's row-level atomicity. Nothing survives a restart.

use async_trait::async_trait;
use chrono::Utc;
use crust_domain::order::money;
use crust_domain::{
    LineItem, NewOrder, NewPizza, NewUser, Order, OrderFilter, OrderSort, OrderStatus,
    PageOptions, PaymentStatus, Pizza, PizzaFilter, PizzaSort, SortDir, User,
};
use tokio::sync::Mutex;

use crate::store::{OrderStore, PizzaStore, StoreError, UserStore};

#[derive(Default)]
struct Inner {
    orders: Vec<Order>,
    pizzas: Vec<Pizza>,
    users: Vec<User>,
    last_order_id: i64,
    last_item_id: i64,
    last_pizza_id: i64,
    last_user_id: i64,
}

#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn bump(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

// ---------------------------------------------------------------------------
// OrderStore
// ---------------------------------------------------------------------------

#[async_trait]
impl OrderStore for MemStore {
    async fn create_order(&self, new: NewOrder) -> Result<Order, StoreError> {
        // Validation happens before any state is touched, which is what makes
        // creation all-or-nothing here.
        new.validate()?;

        let mut g = self.inner.lock().await;
        let now = Utc::now();
        let id = bump(&mut g.last_order_id);

        let mut items = Vec::with_capacity(new.items.len());
        for item in &new.items {
            items.push(LineItem {
                id: bump(&mut g.last_item_id),
                pizza_id: item.pizza_id,
                name: item.name.clone(),
                quantity: item.quantity,
                unit_price: money(item.unit_price),
                total_price: item.line_total(),
                special_instructions: item.special_instructions.clone(),
            });
        }

        let order = Order {
            id,
            user_id: new.user_id,
            items,
            status: OrderStatus::Pending,
            delivery_address: new.delivery_address.clone(),
            total_amount: money(new.total_amount),
            customer_name: new.customer_name.clone(),
            customer_email: new.customer_email.clone(),
            customer_phone: new.customer_phone.clone(),
            payment_method: new.payment_method.clone(),
            payment_status: PaymentStatus::Pending,
            notes: new.notes.clone(),
            status_updated_at: None,
            created_at: now,
            updated_at: now,
        };
        g.orders.push(order.clone());
        Ok(order)
    }

    async fn order_by_id(&self, id: i64) -> Result<Option<Order>, StoreError> {
        let g = self.inner.lock().await;
        Ok(g.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn find_orders(
        &self,
        filter: &OrderFilter,
        sort: OrderSort,
        page: PageOptions,
    ) -> Result<Vec<Order>, StoreError> {
        let g = self.inner.lock().await;
        let mut matched: Vec<Order> =
            g.orders.iter().filter(|o| filter.matches(o)).cloned().collect();
        matched.sort_by(|a, b| {
            sort.cmp(a, b).then_with(|| match sort {
                OrderSort::OldestFirst => a.id.cmp(&b.id),
                _ => b.id.cmp(&a.id),
            })
        });
        Ok(matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn count_orders(&self, filter: &OrderFilter) -> Result<u64, StoreError> {
        let g = self.inner.lock().await;
        Ok(g.orders.iter().filter(|o| filter.matches(o)).count() as u64)
    }

    async fn update_order_status(
        &self,
        id: i64,
        next: OrderStatus,
    ) -> Result<Order, StoreError> {
        let mut g = self.inner.lock().await;
        let order = g
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(StoreError::NotFound)?;
        // The whole check-and-set runs under the lock, so there is no window
        // for a second writer between the transition check and the write.
        order.status.transition_to(next)?;
        let now = Utc::now();
        order.status = next;
        order.updated_at = now;
        order.status_updated_at = Some(now);
        Ok(order.clone())
    }

    async fn touch_order_status(&self, id: i64) -> Result<Order, StoreError> {
        let mut g = self.inner.lock().await;
        let order = g
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(StoreError::NotFound)?;
        order.status_updated_at = Some(Utc::now());
        Ok(order.clone())
    }

    async fn save_order(&self, order: &Order) -> Result<Order, StoreError> {
        let mut g = self.inner.lock().await;
        let stored = g
            .orders
            .iter_mut()
            .find(|o| o.id == order.id)
            .ok_or(StoreError::NotFound)?;
        if !stored.can_modify() {
            return Err(StoreError::NotModifiable);
        }
        stored.customer_name = order.customer_name.clone();
        stored.customer_email = order.customer_email.clone();
        stored.customer_phone = order.customer_phone.clone();
        stored.delivery_address = order.delivery_address.clone();
        stored.total_amount = money(order.total_amount);
        stored.status = order.status;
        stored.payment_method = order.payment_method.clone();
        stored.payment_status = order.payment_status;
        stored.notes = order.notes.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }
}

// ---------------------------------------------------------------------------
// PizzaStore
// ---------------------------------------------------------------------------

#[async_trait]
impl PizzaStore for MemStore {
    async fn create_pizza(&self, new: NewPizza) -> Result<Pizza, StoreError> {
        let new = new.normalized();
        let mut g = self.inner.lock().await;
        if g.pizzas.iter().any(|p| p.name == new.name) {
            return Err(StoreError::DuplicateName);
        }
        let now = Utc::now();
        let pizza = Pizza {
            id: bump(&mut g.last_pizza_id),
            name: new.name,
            ingredients: new.ingredients,
            price: new.price,
            available: new.available,
            image: new.image,
            veg: new.veg,
            category: new.category,
            description: new.description,
            created_at: now,
            updated_at: now,
        };
        g.pizzas.push(pizza.clone());
        Ok(pizza)
    }

    async fn pizza_by_id(&self, id: i64) -> Result<Option<Pizza>, StoreError> {
        let g = self.inner.lock().await;
        Ok(g.pizzas.iter().find(|p| p.id == id).cloned())
    }

    async fn find_pizzas(
        &self,
        filter: &PizzaFilter,
        sort: PizzaSort,
        page: PageOptions,
    ) -> Result<Vec<Pizza>, StoreError> {
        let g = self.inner.lock().await;
        let mut matched: Vec<Pizza> =
            g.pizzas.iter().filter(|p| filter.matches(p)).cloned().collect();
        matched.sort_by(|a, b| {
            sort.cmp(a, b).then_with(|| match sort.dir {
                SortDir::Asc => a.id.cmp(&b.id),
                SortDir::Desc => b.id.cmp(&a.id),
            })
        });
        Ok(matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn count_pizzas(&self, filter: &PizzaFilter) -> Result<u64, StoreError> {
        let g = self.inner.lock().await;
        Ok(g.pizzas.iter().filter(|p| filter.matches(p)).count() as u64)
    }

    async fn upsert_pizza(&self, new: NewPizza) -> Result<Pizza, StoreError> {
        let new = new.normalized();
        let mut g = self.inner.lock().await;
        let now = Utc::now();
        if let Some(existing) = g.pizzas.iter_mut().find(|p| p.name == new.name) {
            existing.ingredients = new.ingredients;
            existing.price = new.price;
            existing.available = new.available;
            existing.image = new.image;
            existing.veg = new.veg;
            existing.category = new.category;
            existing.description = new.description;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let pizza = Pizza {
            id: bump(&mut g.last_pizza_id),
            name: new.name,
            ingredients: new.ingredients,
            price: new.price,
            available: new.available,
            image: new.image,
            veg: new.veg,
            category: new.category,
            description: new.description,
            created_at: now,
            updated_at: now,
        };
        g.pizzas.push(pizza.clone());
        Ok(pizza)
    }

    async fn save_pizza(&self, pizza: &Pizza) -> Result<Pizza, StoreError> {
        let mut g = self.inner.lock().await;
        let stored = g
            .pizzas
            .iter_mut()
            .find(|p| p.id == pizza.id)
            .ok_or(StoreError::NotFound)?;
        stored.name = pizza.name.clone();
        stored.ingredients = pizza.ingredients.clone();
        stored.price = money(pizza.price);
        stored.available = pizza.available;
        stored.image = pizza.image.clone();
        stored.veg = pizza.veg;
        stored.category = pizza.category.clone();
        stored.description = pizza.description.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }
}

// ---------------------------------------------------------------------------
// UserStore
// ---------------------------------------------------------------------------

#[async_trait]
impl UserStore for MemStore {
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut g = self.inner.lock().await;
        if g.users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let now = Utc::now();
        let user = User {
            id: bump(&mut g.last_user_id),
            name: new.name,
            email: new.email,
            address: new.address,
            password_hash: new.password_hash,
            role: new.role,
            created_at: now,
            updated_at: now,
        };
        g.users.push(user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let g = self.inner.lock().await;
        Ok(g.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let g = self.inner.lock().await;
        Ok(g.users.iter().find(|u| u.email == email).cloned())
    }
}
