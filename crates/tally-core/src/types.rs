//! # Domain Types
//!
//! Core domain types used throughout Tally.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Customer     │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name           │   │  name           │   │  customer_*     │       │
//! │  │  price_cents    │   │  email (unique) │   │  items[]        │       │
//! │  │  stock (>= 0)   │   │  phone          │   │  total, date    │       │
//! │  └─────────────────┘   └─────────────────┘   └────────┬────────┘       │
//! │                                                        │                │
//! │                                               ┌────────▼────────┐       │
//! │                                               │    LineItem     │       │
//! │                                               │  product_id     │       │
//! │                                               │  name snapshot  │       │
//! │                                               │  price snapshot │       │
//! │                                               │  quantity       │       │
//! │                                               └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A sale copies the customer's contact fields and each product's name and
//! unit price at commit time. Later edits to the catalog never rewrite history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::LOW_STOCK_THRESHOLD;

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, also the grouping key for demand statistics.
    pub name: String,

    /// Unit price in minor units.
    pub price_cents: i64,

    /// Units on hand. Never negative.
    pub stock: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Stock strictly below [`LOW_STOCK_THRESHOLD`].
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock < LOW_STOCK_THRESHOLD
    }

    #[inline]
    pub fn is_out_of_stock(&self) -> bool {
        self.stock == 0
    }

    /// Whether `quantity` units can be taken. `stock == quantity` is allowed.
    #[inline]
    pub fn can_fulfil(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub price_cents: i64,
    pub stock: i64,
}

/// Partial update for a product. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub stock: Option<i64>,
}

impl ProductPatch {
    /// Returns the product with this patch applied.
    pub fn apply_to(&self, product: &Product) -> Product {
        Product {
            name: self
                .name
                .as_ref()
                .map(|n| n.trim().to_string())
                .unwrap_or_else(|| product.name.clone()),
            price_cents: self.price_cents.unwrap_or(product.price_cents),
            stock: self.stock.unwrap_or(product.stock),
            ..product.clone()
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer, unique by email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// Stored trimmed and lower-cased; the upsert key.
    pub email: String,
    pub phone: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Contact details submitted for a new customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerProfile {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl CustomerProfile {
    /// Returns a copy with trimmed fields and a lower-cased email.
    pub fn normalized(&self) -> CustomerProfile {
        CustomerProfile {
            name: self.name.trim().to_string(),
            email: normalize_email(&self.email),
            phone: self.phone.trim().to_string(),
        }
    }
}

/// Partial update for a customer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl CustomerPatch {
    pub fn apply_to(&self, customer: &Customer) -> Customer {
        Customer {
            name: self
                .name
                .as_ref()
                .map(|n| n.trim().to_string())
                .unwrap_or_else(|| customer.name.clone()),
            email: self
                .email
                .as_deref()
                .map(normalize_email)
                .unwrap_or_else(|| customer.email.clone()),
            phone: self
                .phone
                .as_ref()
                .map(|p| p.trim().to_string())
                .unwrap_or_else(|| customer.phone.clone()),
            ..customer.clone()
        }
    }
}

/// Canonical form of an email address for uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// =============================================================================
// Sale
// =============================================================================

/// A line in a committed sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LineItem {
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    /// Unit price at time of sale (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
}

impl LineItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

/// A committed sale with its customer snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    /// Lines in the order they were submitted.
    pub items: Vec<LineItem>,
    /// Authoritative total as accepted at commit time.
    pub total_amount_cents: i64,
    /// Calendar date of the sale, `YYYY-MM-DD` on the wire.
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    /// Sum of line totals from the frozen prices.
    pub fn items_total(&self) -> Money {
        self.items.iter().map(LineItem::line_total).sum()
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// Administrative correction of a committed sale.
///
/// Items are deliberately absent: stock is only ever moved by a commit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleEdit {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub total_amount_cents: Option<i64>,
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
}

impl SaleEdit {
    pub fn apply_to(&self, sale: &Sale) -> Sale {
        Sale {
            customer_name: self
                .customer_name
                .as_ref()
                .map(|n| n.trim().to_string())
                .unwrap_or_else(|| sale.customer_name.clone()),
            customer_email: self
                .customer_email
                .as_deref()
                .map(normalize_email)
                .unwrap_or_else(|| sale.customer_email.clone()),
            customer_phone: self
                .customer_phone
                .as_ref()
                .map(|p| p.trim().to_string())
                .unwrap_or_else(|| sale.customer_phone.clone()),
            total_amount_cents: self.total_amount_cents.unwrap_or(sale.total_amount_cents),
            date: self.date.unwrap_or(sale.date),
            ..sale.clone()
        }
    }
}

/// A sale with its resolved customer, handed to the invoice renderer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleDetail {
    pub sale: Sale,
    /// `None` when the customer record was deleted after the sale.
    pub customer: Option<Customer>,
    /// True when the commit created the customer record.
    pub customer_created: bool,
}

/// Inclusive date range filter for sales history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
