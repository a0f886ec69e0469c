//! # Dashboard Analytics
//!
//! Aggregates the full sale history and product catalog into the numbers
//! shown on the dashboard.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   &[Sale] ──────┐                                                       │
//! │                 ├──► compute_dashboard(.., granularity, today)          │
//! │   &[Product] ───┘                │                                      │
//! │                                  ▼                                      │
//! │   Dashboard { revenue, period_series, top_products, repeat_buyers, .. } │
//! │                                                                         │
//! │   Pure: no clock, no cache. The caller passes `today` and recomputes    │
//! │   on every request.                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Period Keys
//! | Granularity | Key             | Example     |
//! |-------------|-----------------|-------------|
//! | yearly      | `YYYY`          | `2024`      |
//! | monthly     | `YYYY-MM`       | `2024-01`   |
//! | weekly      | `YYYY-W<n>`     | `2024-W3`   |
//!
//! The weekly index is `ceil(day_of_month / 7)`, counted within the month.
//! It is not an ISO-8601 week.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Product, Sale};

// =============================================================================
// Granularity
// =============================================================================

/// Bucket size for the revenue series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Granularity {
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl Granularity {
    /// Bucket key for a sale date.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::NaiveDate;
    /// use tally_core::Granularity;
    ///
    /// let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    /// assert_eq!(Granularity::Weekly.period_key(date), "2024-W3");
    /// assert_eq!(Granularity::Monthly.period_key(date), "2024-03");
    /// assert_eq!(Granularity::Yearly.period_key(date), "2024");
    /// ```
    pub fn period_key(&self, date: NaiveDate) -> String {
        match self {
            Granularity::Weekly => format!("{}-W{}", date.year(), (date.day() + 6) / 7),
            Granularity::Monthly => format!("{}-{:02}", date.year(), date.month()),
            Granularity::Yearly => format!("{}", date.year()),
        }
    }
}

impl FromStr for Granularity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Granularity::Weekly),
            "monthly" => Ok(Granularity::Monthly),
            "yearly" => Ok(Granularity::Yearly),
            _ => Err(ValidationError::NotAllowed {
                field: "granularity".to_string(),
                allowed: vec![
                    "weekly".to_string(),
                    "monthly".to_string(),
                    "yearly".to_string(),
                ],
            }),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
            Granularity::Yearly => "yearly",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Dashboard Bundle
// =============================================================================

/// Revenue for one period bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PeriodTotal {
    pub period: String,
    pub total_cents: i64,
}

/// Units sold for one product name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductDemand {
    pub name: String,
    pub quantity: i64,
}

/// Total spend for one customer name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerSpend {
    pub name: String,
    pub total_cents: i64,
}

/// Everything the dashboard renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Dashboard {
    pub granularity: Granularity,
    pub total_products: i64,
    pub total_sales: i64,
    pub total_revenue_cents: i64,
    pub revenue_today_cents: i64,
    pub low_stock_count: i64,
    pub low_stock_items: Vec<Product>,
    pub out_of_stock_count: i64,
    /// Ascending by period key.
    pub period_series: Vec<PeriodTotal>,
    /// Descending by quantity; ties keep first-seen order.
    pub top_products: Vec<ProductDemand>,
    pub bestseller: Option<String>,
    pub low_demand_item: Option<String>,
    /// Distinct customers with two or more sales.
    pub repeat_buyers: i64,
    pub top_customer: Option<CustomerSpend>,
}

// =============================================================================
// Aggregation
// =============================================================================

/// Computes the dashboard bundle.
///
/// Demand is grouped by product name. A line whose product still exists is
/// counted under the current catalog name, otherwise under the name frozen
/// on the line.
pub fn compute_dashboard(
    sales: &[Sale],
    products: &[Product],
    granularity: Granularity,
    today: NaiveDate,
) -> Dashboard {
    let total_revenue: Money = sales.iter().map(Sale::total_amount).sum();
    let revenue_today: Money = sales
        .iter()
        .filter(|s| s.date == today)
        .map(Sale::total_amount)
        .sum();

    let low_stock_items: Vec<Product> = products.iter().filter(|p| p.is_low_stock()).cloned().collect();
    let out_of_stock_count = products.iter().filter(|p| p.is_out_of_stock()).count();

    let top_products = product_demand(sales, products);
    let bestseller = top_products.first().map(|d| d.name.clone());
    let low_demand_item = lowest_demand(&top_products);

    Dashboard {
        granularity,
        total_products: products.len() as i64,
        total_sales: sales.len() as i64,
        total_revenue_cents: total_revenue.cents(),
        revenue_today_cents: revenue_today.cents(),
        low_stock_count: low_stock_items.len() as i64,
        low_stock_items,
        out_of_stock_count: out_of_stock_count as i64,
        period_series: period_series(sales, granularity),
        top_products,
        bestseller,
        low_demand_item,
        repeat_buyers: repeat_buyers(sales),
        top_customer: top_customer(sales),
    }
}

fn period_series(sales: &[Sale], granularity: Granularity) -> Vec<PeriodTotal> {
    let mut buckets: HashMap<String, i64> = HashMap::new();
    for sale in sales {
        *buckets.entry(granularity.period_key(sale.date)).or_insert(0) += sale.total_amount_cents;
    }

    let mut series: Vec<PeriodTotal> = buckets
        .into_iter()
        .map(|(period, total_cents)| PeriodTotal { period, total_cents })
        .collect();
    series.sort_by(|a, b| a.period.cmp(&b.period));
    series
}

fn product_demand(sales: &[Sale], products: &[Product]) -> Vec<ProductDemand> {
    let current_names: HashMap<&str, &str> = products
        .iter()
        .map(|p| (p.id.as_str(), p.name.as_str()))
        .collect();

    let mut demand: Vec<ProductDemand> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in sales.iter().flat_map(|s| s.items.iter()) {
        let name = current_names
            .get(item.product_id.as_str())
            .copied()
            .unwrap_or(item.product_name.as_str());

        match index.get(name) {
            Some(&i) => demand[i].quantity += item.quantity,
            None => {
                index.insert(name.to_string(), demand.len());
                demand.push(ProductDemand {
                    name: name.to_string(),
                    quantity: item.quantity,
                });
            }
        }
    }

    // stable: equal quantities stay in first-seen order
    demand.sort_by(|a, b| b.quantity.cmp(&a.quantity));
    demand
}

/// Smallest quantity, first-seen on ties.
fn lowest_demand(demand: &[ProductDemand]) -> Option<String> {
    demand.iter().min_by_key(|d| d.quantity).map(|d| d.name.clone())
}

fn repeat_buyers(sales: &[Sale]) -> i64 {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for sale in sales {
        *counts.entry(sale.customer_id.as_str()).or_insert(0) += 1;
    }
    counts.values().filter(|&&n| n >= 2).count() as i64
}

fn top_customer(sales: &[Sale]) -> Option<CustomerSpend> {
    let mut spend: Vec<CustomerSpend> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for sale in sales {
        match index.get(sale.customer_name.as_str()) {
            Some(&i) => spend[i].total_cents += sale.total_amount_cents,
            None => {
                index.insert(sale.customer_name.as_str(), spend.len());
                spend.push(CustomerSpend {
                    name: sale.customer_name.clone(),
                    total_cents: sale.total_amount_cents,
                });
            }
        }
    }

    spend
        .into_iter()
        .fold(None, |best: Option<CustomerSpend>, candidate| match best {
            Some(b) if b.total_cents >= candidate.total_cents => Some(b),
            _ => Some(candidate),
        })
}

// =============================================================================
// Unit Tests
// =============================================================================
