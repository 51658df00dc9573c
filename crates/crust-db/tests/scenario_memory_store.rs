//! Scenario: store contract, exercised against the in-memory backend.
//!
//! # Properties under test
//! - Every pair in the transition table succeeds and persists; every pair
//!   outside it fails and leaves the stored status unchanged.
//! - Creation is all-or-nothing.
//! - Line-item snapshots survive later catalog edits.
//! - Filtered pagination returns disjoint pages and a count that matches.
//!
//! The same contract runs against Postgres in `scenario_postgres_store.rs`;
//! this file needs no environment and always runs.

use crust_db::{MemStore, OrderStore, PizzaStore, StoreError, UserStore};
use crust_domain::{
    NewLineItem, NewOrder, NewPizza, NewUser, OrderFilter, OrderSort, OrderStatus, PageOptions,
    PizzaFilter, PizzaSort, Role,
};
use rust_decimal::Decimal;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn item(name: &str, price: &str, quantity: i32) -> NewLineItem {
    NewLineItem {
        pizza_id: None,
        name: name.to_string(),
        quantity,
        unit_price: dec(price),
        special_instructions: None,
    }
}

fn new_order(user_id: i64, items: Vec<NewLineItem>) -> NewOrder {
    let total = items.iter().map(NewLineItem::line_total).sum();
    NewOrder {
        user_id,
        items,
        delivery_address: "1 Main St".to_string(),
        total_amount: total,
        customer_name: None,
        customer_email: None,
        customer_phone: None,
        payment_method: None,
        notes: None,
    }
}

/// Walk an order along the canonical chain until it reaches `target`.
async fn advance_to(store: &MemStore, id: i64, target: OrderStatus) {
    let chain = [
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
    ];
    if target == OrderStatus::Pending {
        return;
    }
    if target == OrderStatus::Cancelled {
        store.update_order_status(id, OrderStatus::Cancelled).await.unwrap();
        return;
    }
    for step in chain {
        store.update_order_status(id, step).await.unwrap();
        if step == target {
            return;
        }
    }
}

// ---------------------------------------------------------------------------
// Transition matrix
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_table_pair_succeeds_every_other_pair_is_refused() {
    let store = MemStore::new();
    for from in OrderStatus::ALL {
        for to in OrderStatus::ALL {
            let order = store
                .create_order(new_order(1, vec![item("Margherita", "12.99", 1)]))
                .await
                .unwrap();
            advance_to(&store, order.id, from).await;

            let result = store.update_order_status(order.id, to).await;
            let stored = store.order_by_id(order.id).await.unwrap().unwrap();

            if from.is_valid_transition(to) {
                let updated = result.unwrap_or_else(|e| panic!("{from} -> {to}: {e}"));
                assert_eq!(updated.status, to);
                assert_eq!(stored.status, to);
                assert!(stored.status_updated_at.is_some());
            } else {
                match result {
                    Err(StoreError::InvalidTransition(t)) => {
                        assert_eq!(t.from, from);
                        assert_eq!(t.to, to);
                    }
                    other => panic!("{from} -> {to}: expected refusal, got {other:?}"),
                }
                assert_eq!(stored.status, from, "{from} -> {to} must not change the row");
            }
        }
    }
}

#[tokio::test]
async fn terminal_orders_refuse_everything() {
    let store = MemStore::new();
    for terminal in [OrderStatus::Delivered, OrderStatus::Cancelled] {
        let order = store
            .create_order(new_order(1, vec![item("Margherita", "12.99", 1)]))
            .await
            .unwrap();
        advance_to(&store, order.id, terminal).await;
        for to in OrderStatus::ALL {
            assert!(
                store.update_order_status(order.id, to).await.is_err(),
                "{terminal} -> {to} must be refused"
            );
        }
        let stored = store.order_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, terminal);
    }
}

#[tokio::test]
async fn missing_order_reports_not_found_before_transition_check() {
    let store = MemStore::new();
    match store.update_order_status(999, OrderStatus::Confirmed).await {
        Err(StoreError::NotFound) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_is_all_or_nothing() {
    let store = MemStore::new();
    // Second of three items is invalid; nothing may be stored.
    let bad = new_order(
        1,
        vec![
            item("Margherita", "12.99", 1),
            item("Pepperoni", "14.99", 0),
            item("Funghi", "11.50", 2),
        ],
    );
    assert!(matches!(
        store.create_order(bad).await,
        Err(StoreError::Validation(_))
    ));
    assert_eq!(store.count_orders(&OrderFilter::default()).await.unwrap(), 0);
}

#[tokio::test]
async fn create_computes_line_totals_and_defaults() {
    let store = MemStore::new();
    let order = store
        .create_order(new_order(7, vec![item("Margherita", "12.99", 2)]))
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_amount, dec("25.98"));
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].total_price, dec("25.98"));
    assert_eq!(order.items[0].unit_price, dec("12.99"));
    assert!(order.status_updated_at.is_none());
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[tokio::test]
async fn line_item_price_survives_catalog_edit() {
    let store = MemStore::new();
    let pizza = store
        .create_pizza(NewPizza {
            name: "Margherita".to_string(),
            ingredients: vec!["tomato".to_string(), "mozzarella".to_string()],
            price: dec("12.99"),
            available: true,
            image: None,
            veg: true,
            category: None,
            description: None,
        })
        .await
        .unwrap();

    let order = store
        .create_order(new_order(
            1,
            vec![NewLineItem {
                pizza_id: Some(pizza.id),
                name: pizza.name.clone(),
                quantity: 1,
                unit_price: pizza.price,
                special_instructions: None,
            }],
        ))
        .await
        .unwrap();

    let mut edited = pizza.clone();
    edited.price = dec("15.99");
    store.save_pizza(&edited).await.unwrap();

    let stored = store.order_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(stored.items[0].unit_price, dec("12.99"), "snapshot must not move");
    let catalog = store.pizza_by_id(pizza.id).await.unwrap().unwrap();
    assert_eq!(catalog.price, dec("15.99"));
}

// ---------------------------------------------------------------------------
// save_order and the modifiable window
// ---------------------------------------------------------------------------

#[tokio::test]
async fn save_updates_header_while_modifiable_then_freezes() {
    let store = MemStore::new();
    let mut order = store
        .create_order(new_order(1, vec![item("Margherita", "12.99", 1)]))
        .await
        .unwrap();

    order.delivery_address = "2 Side St".to_string();
    order.notes = Some("ring twice".to_string());
    let saved = store.save_order(&order).await.unwrap();
    assert_eq!(saved.delivery_address, "2 Side St");
    assert_eq!(saved.notes.as_deref(), Some("ring twice"));

    advance_to(&store, order.id, OrderStatus::Delivered).await;
    let frozen = store.order_by_id(order.id).await.unwrap().unwrap();
    assert!(matches!(
        store.save_order(&frozen).await,
        Err(StoreError::NotModifiable)
    ));
}

#[tokio::test]
async fn touch_refreshes_only_the_status_timestamp() {
    let store = MemStore::new();
    let order = store
        .create_order(new_order(1, vec![item("Margherita", "12.99", 1)]))
        .await
        .unwrap();
    assert!(order.status_updated_at.is_none());

    let touched = store.touch_order_status(order.id).await.unwrap();
    assert!(touched.status_updated_at.is_some());
    assert_eq!(touched.status, OrderStatus::Pending);
    assert_eq!(touched.updated_at, order.updated_at, "touch must not bump updated_at");
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pagination_pages_are_disjoint_and_count_matches() {
    let store = MemStore::new();
    for i in 0..9 {
        store
            .create_order(new_order(1, vec![item("Margherita", "12.99", 1 + i)]))
            .await
            .unwrap();
    }
    let filter = OrderFilter { status: Some(OrderStatus::Pending), ..Default::default() };

    assert_eq!(store.count_orders(&filter).await.unwrap(), 9);

    let page1 = store
        .find_orders(&filter, OrderSort::NewestFirst, PageOptions::new(Some(1), Some(3)))
        .await
        .unwrap();
    let page2 = store
        .find_orders(&filter, OrderSort::NewestFirst, PageOptions::new(Some(2), Some(3)))
        .await
        .unwrap();
    assert_eq!(page1.len(), 3);
    assert_eq!(page2.len(), 3);
    for o in &page2 {
        assert!(page1.iter().all(|p| p.id != o.id), "pages must not overlap");
    }
}

#[tokio::test]
async fn filters_compose_and_sort_orders_newest_first() {
    let store = MemStore::new();
    let a = store
        .create_order(new_order(1, vec![item("Margherita", "12.99", 1)]))
        .await
        .unwrap();
    let b = store
        .create_order(new_order(2, vec![item("Pepperoni", "14.99", 1)]))
        .await
        .unwrap();
    store.update_order_status(b.id, OrderStatus::Confirmed).await.unwrap();

    let mine = store
        .find_orders(
            &OrderFilter { user_id: Some(1), ..Default::default() },
            OrderSort::NewestFirst,
            PageOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, a.id);

    let confirmed = store
        .find_orders(
            &OrderFilter { status: Some(OrderStatus::Confirmed), ..Default::default() },
            OrderSort::NewestFirst,
            PageOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].id, b.id);

    let all = store
        .find_orders(&OrderFilter::default(), OrderSort::NewestFirst, PageOptions::default())
        .await
        .unwrap();
    assert_eq!(all[0].id, b.id, "newest first");
    assert_eq!(all[1].id, a.id);
}

// ---------------------------------------------------------------------------
// Catalog and accounts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pizza_upsert_converges_instead_of_duplicating() {
    let store = MemStore::new();
    let seed = NewPizza {
        name: "Margherita".to_string(),
        ingredients: vec!["tomato".to_string()],
        price: dec("12.99"),
        available: true,
        image: None,
        veg: true,
        category: Some("classic".to_string()),
        description: None,
    };
    let first = store.upsert_pizza(seed.clone()).await.unwrap();
    let second = store
        .upsert_pizza(NewPizza { price: dec("13.49"), ..seed })
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.price, dec("13.49"));
    assert_eq!(
        store.count_pizzas(&PizzaFilter::default()).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn pizza_listing_hides_unavailable_by_default() {
    let store = MemStore::new();
    for (name, available) in [("Margherita", true), ("Pepperoni", true), ("Tartufo", false)] {
        store
            .create_pizza(NewPizza {
                name: name.to_string(),
                ingredients: vec![],
                price: dec("12.99"),
                available,
                image: None,
                veg: false,
                category: None,
                description: None,
            })
            .await
            .unwrap();
    }
    let listed = store
        .find_pizzas(&PizzaFilter::default(), PizzaSort::default(), PageOptions::default())
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|p| p.available));
}

#[tokio::test]
async fn duplicate_email_is_refused() {
    let store = MemStore::new();
    let new = NewUser {
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        address: None,
        password_hash: "hash-a".to_string(),
        role: Role::User,
    };
    store.create_user(new.clone()).await.unwrap();
    assert!(matches!(
        store.create_user(new).await,
        Err(StoreError::DuplicateEmail)
    ));
}
