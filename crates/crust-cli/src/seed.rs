//! Demo fixture: the standard catalog and the demo admin account.
//!
//! Seeding is idempotent by name. Without `--force` existing rows are left
//! untouched, so operator edits survive a re-seed; with `--force` the
//! fixture overwrites prices and flags. The admin account is only ever
//! created, never updated, so a changed admin password is not silently
//! reverted.

use anyhow::Result;
use rand::distributions::Alphanumeric;
use rand::Rng;
use rust_decimal::Decimal;

use crust_auth::hash_password;
use crust_db::{PizzaStore, StoreError, UserStore};
use crust_domain::{NewPizza, NewUser, Role};

pub(crate) const ADMIN_EMAIL: &str = "admin@admin.com";

// ---------------------------------------------------------------------------
// Catalog fixture
// ---------------------------------------------------------------------------

/// The demo menu. Veg flags are curated per pizza; a ham pizza is not
/// vegetarian no matter what its name suggests.
pub(crate) fn demo_catalog() -> Vec<NewPizza> {
    // (name, price in cents, veg, category, ingredients)
    let rows: [(&str, i64, bool, &str, [&str; 3]); 20] = [
        ("Margherita", 11_99, true, "classic", ["Cheese", "Tomato", "Capsicum"]),
        ("Pepperoni", 13_99, false, "classic", ["Pepperoni", "Cheese", "Tomato"]),
        ("Hawaiian", 13_49, false, "classic", ["Ham", "Pineapple", "Cheese"]),
        ("Veggie Delight", 11_49, true, "garden", ["Mushroom", "Corn", "Olives"]),
        ("BBQ Chicken", 14_99, false, "bbq", ["BBQ Chicken", "Onion", "Cheese"]),
        ("Spicy Paneer", 12_49, true, "spicy", ["Paneer", "Onion", "Peppers"]),
        ("Cheese Burst", 12_99, true, "cheese", ["Cheese", "Jalapeno", "Onion"]),
        ("Mushroom Magic", 11_99, true, "garden", ["Mushroom", "Corn", "Olives"]),
        ("Tandoori Chicken", 15_49, false, "spicy", ["Chicken", "Cheese", "Onion"]),
        ("Farmhouse", 12_49, true, "garden", ["Spinach", "Tomato", "Cheese"]),
        ("Mexican Green Wave", 12_99, true, "spicy", ["Jalapeno", "Cheese", "Onion"]),
        ("Double Cheese", 13_49, true, "cheese", ["Cheese", "Tomato", "Capsicum"]),
        ("Chicken Sausage", 14_49, false, "classic", ["Chicken Sausage", "Peppers", "Cheese"]),
        ("Peppy Paneer", 12_49, true, "spicy", ["Paneer", "Onion", "Peppers"]),
        ("Deluxe Veggie", 13_49, true, "garden", ["Mushroom", "Corn", "Olives"]),
        ("Peri Peri Chicken", 15_49, false, "spicy", ["Chicken", "Cheese", "Onion"]),
        ("Corn & Cheese", 11_49, true, "cheese", ["Corn", "Cheese", "Jalapeno"]),
        ("Italian Supreme", 16_49, false, "classic", ["Pepperoni", "Ham", "Cheese"]),
        ("Classic Tomato", 10_49, true, "classic", ["Tomato", "Cheese", "Capsicum"]),
        ("Smoky BBQ Veg", 12_49, true, "bbq", ["Corn", "Onion", "Cheese"]),
    ];

    rows.iter()
        .enumerate()
        .map(|(i, (name, cents, veg, category, ingredients))| NewPizza {
            name: (*name).to_string(),
            ingredients: ingredients.iter().map(|s| (*s).to_string()).collect(),
            price: Decimal::new(*cents, 2),
            available: true,
            image: Some(format!("pizza{}.jpeg", i % 4 + 1)),
            veg: *veg,
            category: Some((*category).to_string()),
            description: None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

pub(crate) struct SeedReport {
    pub seeded: usize,
    pub skipped: usize,
}

pub(crate) async fn seed_catalog(store: &dyn PizzaStore, force: bool) -> Result<SeedReport> {
    let mut seeded = 0;
    let mut skipped = 0;
    for pizza in demo_catalog() {
        if force {
            store.upsert_pizza(pizza).await?;
            seeded += 1;
            continue;
        }
        match store.create_pizza(pizza).await {
            Ok(_) => seeded += 1,
            Err(StoreError::DuplicateName) => skipped += 1,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(SeedReport { seeded, skipped })
}

/// Create the demo admin if absent. Returns whether it was created.
pub(crate) async fn ensure_admin(store: &dyn UserStore, password: &str) -> Result<bool> {
    if store.user_by_email(ADMIN_EMAIL).await?.is_some() {
        return Ok(false);
    }
    let password_hash = hash_password(password)?;
    store
        .create_user(NewUser {
            name: "Admin".to_string(),
            email: ADMIN_EMAIL.to_string(),
            address: Some("123 Main St".to_string()),
            password_hash,
            role: Role::Admin,
        })
        .await?;
    Ok(true)
}

pub(crate) fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
