//! Pizza catalog types.
//!
//! A pizza has an independent lifecycle from orders: its name and price are
//! snapshotted into line items at order time, so catalog edits (price bumps,
//! delisting) never rewrite history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::order::money;

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pizza {
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

/// Input for catalog creation/seeding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPizza {
    pub name: String,
    pub ingredients: Vec<String>,
    pub price: Decimal,
    pub available: bool,
    pub image: Option<String>,
    pub veg: bool,
    pub category: Option<String>,
    pub description: Option<String>,
}

impl NewPizza {
    /// Price normalized to currency scale; the one write-side adjustment.
    pub fn normalized(mut self) -> Self {
        self.price = money(self.price);
        self
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Conjunctive catalog filter. `available` defaults to `Some(true)` because
/// the public listing never shows delisted pizzas.
#[derive(Debug, Clone, PartialEq)]
pub struct PizzaFilter {
    pub veg: Option<bool>,
    pub category: Option<String>,
    pub available: Option<bool>,
}

impl Default for PizzaFilter {
    fn default() -> Self {
        Self { veg: None, category: None, available: Some(true) }
    }
}

impl PizzaFilter {
    pub fn matches(&self, pizza: &Pizza) -> bool {
        self.veg.map_or(true, |v| pizza.veg == v)
            && self
                .category
                .as_deref()
                .map_or(true, |c| pizza.category.as_deref() == Some(c))
            && self.available.map_or(true, |a| pizza.available == a)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PizzaSortField {
    Name,
    Price,
    #[default]
    CreatedAt,
}

impl PizzaSortField {
    /// Parse the query-string spelling. Unknown values return `None`; the
    /// caller falls back to the default instead of erroring.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(PizzaSortField::Name),
            "price" => Some(PizzaSortField::Price),
            "createdAt" | "created_at" => Some(PizzaSortField::CreatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(SortDir::Asc),
            "desc" => Some(SortDir::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PizzaSort {
    pub field: PizzaSortField,
    pub dir: SortDir,
}

impl PizzaSort {
    pub fn cmp(&self, a: &Pizza, b: &Pizza) -> std::cmp::Ordering {
        let forward = match self.field {
            PizzaSortField::Name => a.name.cmp(&b.name),
            PizzaSortField::Price => a.price.cmp(&b.price),
            PizzaSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        match self.dir {
            SortDir::Asc => forward,
            SortDir::Desc => forward.reverse(),
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
