//! # Sale Requests
//!
//! The pure half of recording a sale: request shape, validation, the
//! cumulative stock check and the decrement plan. The storage half lives in
//! `tally-db::repository::sale`.
//!
//! ## Commit Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Recording a Sale                                  │
//! │                                                                         │
//! │  NewSale ──► validate() ──────────────────────── (no store access)      │
//! │                 │                                                       │
//! │                 ▼            ┌──────────── inside one transaction ────┐ │
//! │           resolve customer   │                                        │ │
//! │                 │            │                                        │ │
//! │                 ▼            │                                        │ │
//! │           resolve_lines() ◄──┤ products loaded in the transaction     │ │
//! │           (cumulative check) │                                        │ │
//! │                 │            │                                        │ │
//! │                 ▼            │                                        │ │
//! │           plan_decrements()  │ ascending product id                   │ │
//! │                 │            │                                        │ │
//! │                 ▼            │                                        │ │
//! │           check_total()      │                                        │ │
//! │                 │            │                                        │ │
//! │                 ▼            │                                        │ │
//! │           insert sale ──────►│ COMMIT                                 │ │
//! │                              └────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CustomerProfile, LineItem, Product};
use crate::validation::{
    validate_customer_profile, validate_id, validate_item_count, validate_quantity,
    validate_total_cents,
};

// =============================================================================
// Request Types
// =============================================================================

/// One requested line: which product, how many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewLineItem {
    pub product_id: String,
    pub quantity: i64,
}

/// Who is buying.
///
/// Either the id of a customer that already exists, or a contact profile
/// that is upserted by email during the commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum CustomerRef {
    Existing {
        #[serde(rename = "customerId")]
        customer_id: String,
    },
    Profile(CustomerProfile),
}

/// A proposed sale as submitted by the client.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewSale {
    pub customer: CustomerRef,
    /// Lines in submission order. Duplicate products stay separate lines.
    pub items: Vec<NewLineItem>,
    /// Client-computed total; see [`TotalPolicy`].
    pub total_amount_cents: i64,
    /// Calendar date of the sale. Defaults to today when absent.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
}

impl NewSale {
    /// Checks every precondition that needs no stored data.
    ///
    /// Runs before the transaction opens, so a rejected request never
    /// touches the database.
    pub fn validate(&self) -> CoreResult<()> {
        validate_item_count(self.items.len())?;

        for item in &self.items {
            validate_id("productId", &item.product_id)?;
            validate_quantity(item.quantity)?;
        }

        match &self.customer {
            CustomerRef::Existing { customer_id } => validate_id("customerId", customer_id)?,
            CustomerRef::Profile(profile) => validate_customer_profile(profile)?,
        }

        validate_total_cents(self.total_amount_cents)?;
        Ok(())
    }

    /// Distinct product ids referenced by the request, ascending.
    pub fn product_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.items.iter().map(|i| i.product_id.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }
}

// =============================================================================
// Stock Check
// =============================================================================

/// Resolves each requested line against the loaded products.
///
/// Lines are walked in submission order with a running per-product total,
/// so `[P1 ×3, P1 ×2]` against stock 4 fails on the second line. The first
/// failing line decides the error.
///
/// Returns line items carrying the product name and unit price snapshots.
pub fn resolve_lines(
    items: &[NewLineItem],
    products: &HashMap<String, Product>,
) -> CoreResult<Vec<LineItem>> {
    let mut requested: HashMap<&str, i64> = HashMap::new();
    let mut lines = Vec::with_capacity(items.len());

    for item in items {
        let product = products
            .get(&item.product_id)
            .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;

        let cumulative = requested.entry(item.product_id.as_str()).or_insert(0);
        *cumulative += item.quantity;

        if !product.can_fulfil(*cumulative) {
            return Err(CoreError::InsufficientStock {
                product: product.name.clone(),
                available: product.stock,
                requested: *cumulative,
            });
        }

        lines.push(LineItem {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity: item.quantity,
        });
    }

    Ok(lines)
}

/// A single conditional stock decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDecrement {
    pub product_id: String,
    pub quantity: i64,
}

/// Collapses lines into one decrement per product, ordered by product id.
///
/// ## Example
/// ```rust
/// use tally_core::sale::{plan_decrements, NewLineItem};
///
/// let items = vec![
///     NewLineItem { product_id: "b".into(), quantity: 1 },
///     NewLineItem { product_id: "a".into(), quantity: 2 },
///     NewLineItem { product_id: "b".into(), quantity: 3 },
/// ];
/// let plan = plan_decrements(&items);
/// assert_eq!(plan[0].product_id, "a");
/// assert_eq!(plan[1].quantity, 4);
/// ```
pub fn plan_decrements(items: &[NewLineItem]) -> Vec<StockDecrement> {
    let mut totals: BTreeMap<&str, i64> = BTreeMap::new();
    for item in items {
        *totals.entry(item.product_id.as_str()).or_insert(0) += item.quantity;
    }

    totals
        .into_iter()
        .map(|(product_id, quantity)| StockDecrement {
            product_id: product_id.to_string(),
            quantity,
        })
        .collect()
}

// =============================================================================
// Total Policy
// =============================================================================

/// How the client-computed total is treated at commit time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TotalPolicy {
    /// Store the submitted total as-is; a mismatch is reported, not rejected.
    #[default]
    Trust,
    /// Reject the sale when the submitted total differs from the resolved prices.
    Enforce,
}

impl FromStr for TotalPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trust" => Ok(TotalPolicy::Trust),
            "enforce" => Ok(TotalPolicy::Enforce),
            _ => Err(ValidationError::NotAllowed {
                field: "total policy".to_string(),
                allowed: vec!["trust".to_string(), "enforce".to_string()],
            }),
        }
    }
}

impl fmt::Display for TotalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TotalPolicy::Trust => write!(f, "trust"),
            TotalPolicy::Enforce => write!(f, "enforce"),
        }
    }
}

/// Outcome of comparing the submitted total with the resolved lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalCheck {
    Matches,
    /// Accepted under [`TotalPolicy::Trust`] despite the difference.
    Mismatch { expected: i64 },
}

/// Compares the submitted total against Σ unit price × quantity.
pub fn check_total(policy: TotalPolicy, submitted: i64, lines: &[LineItem]) -> CoreResult<TotalCheck> {
    let expected: Money = lines.iter().map(LineItem::line_total).sum();

    if expected.cents() == submitted {
        return Ok(TotalCheck::Matches);
    }

    match policy {
        TotalPolicy::Trust => Ok(TotalCheck::Mismatch {
            expected: expected.cents(),
        }),
        TotalPolicy::Enforce => Err(CoreError::TotalMismatch {
            submitted,
            expected: expected.cents(),
        }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: &str, name: &str, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: name.to_string(),
            price_cents,
            stock,
            created_at: now,
            updated_at: now,
        }
    }

    fn catalog(products: Vec<Product>) -> HashMap<String, Product> {
        products.into_iter().map(|p| (p.id.clone(), p)).collect()
    }

    fn line(product_id: &str, quantity: i64) -> NewLineItem {
        NewLineItem {
            product_id: product_id.to_string(),
            quantity,
        }
    }

    fn profile() -> CustomerRef {
        CustomerRef::Profile(CustomerProfile {
            name: "Asha Rao".to_string(),
            email: "asha@example.com".to_string(),
            phone: "+91 98765 43210".to_string(),
        })
    }

    #[test]
    fn test_validate_rejects_empty_cart() {
        let sale = NewSale {
            customer: profile(),
            items: vec![],
            total_amount_cents: 0,
            date: None,
        };
        assert!(matches!(
            sale.validate(),
            Err(CoreError::Validation(ValidationError::Empty { .. }))
        ));
    }

    #[test]
    fn test_validate_rejects_non_positive_quantity() {
        let sale = NewSale {
            customer: profile(),
            items: vec![line("p1", 1), line("p2", 0)],
            total_amount_cents: 100,
            date: None,
        };
        assert!(matches!(
            sale.validate(),
            Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));
    }

    #[test]
    fn test_validate_rejects_missing_customer_fields() {
        let sale = NewSale {
            customer: CustomerRef::Profile(CustomerProfile {
                name: "Asha".to_string(),
                email: String::new(),
                phone: "555 0100".to_string(),
            }),
            items: vec![line("p1", 1)],
            total_amount_cents: 100,
            date: None,
        };
        assert!(sale.validate().is_err());
    }

    #[test]
    fn test_stock_equal_to_quantity_is_allowed() {
        let products = catalog(vec![product("p1", "Notebook", 4500, 3)]);
        let lines = resolve_lines(&[line("p1", 3)], &products).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_name, "Notebook");
        assert_eq!(lines[0].unit_price_cents, 4500);
    }

    #[test]
    fn test_duplicate_lines_are_checked_cumulatively() {
        let products = catalog(vec![product("p1", "Notebook", 4500, 4)]);
        let err = resolve_lines(&[line("p1", 3), line("p1", 2)], &products).unwrap_err();

        match err {
            CoreError::InsufficientStock {
                product,
                available,
                requested,
            } => {
                assert_eq!(product, "Notebook");
                assert_eq!(available, 4);
                assert_eq!(requested, 5);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn test_first_failing_line_decides_error() {
        let products = catalog(vec![
            product("p1", "Notebook", 4500, 1),
            product("p2", "Pen", 1000, 10),
        ]);
        let err = resolve_lines(&[line("missing", 1), line("p1", 5)], &products).unwrap_err();
        assert!(matches!(err, CoreError::ProductNotFound(id) if id == "missing"));
    }

    #[test]
    fn test_plan_decrements_sums_and_orders() {
        let plan = plan_decrements(&[line("p2", 1), line("p1", 3), line("p2", 2)]);
        assert_eq!(
            plan,
            vec![
                StockDecrement {
                    product_id: "p1".to_string(),
                    quantity: 3
                },
                StockDecrement {
                    product_id: "p2".to_string(),
                    quantity: 3
                },
            ]
        );
    }

    #[test]
    fn test_check_total() {
        let lines = vec![LineItem {
            product_id: "p1".to_string(),
            product_name: "Notebook".to_string(),
            unit_price_cents: 4500,
            quantity: 2,
        }];

        assert_eq!(
            check_total(TotalPolicy::Enforce, 9000, &lines).unwrap(),
            TotalCheck::Matches
        );
        assert_eq!(
            check_total(TotalPolicy::Trust, 8000, &lines).unwrap(),
            TotalCheck::Mismatch { expected: 9000 }
        );
        assert!(matches!(
            check_total(TotalPolicy::Enforce, 8000, &lines),
            Err(CoreError::TotalMismatch {
                submitted: 8000,
                expected: 9000
            })
        ));
    }

    #[test]
    fn test_total_policy_from_str() {
        assert_eq!("Enforce".parse::<TotalPolicy>().unwrap(), TotalPolicy::Enforce);
        assert_eq!("trust".parse::<TotalPolicy>().unwrap(), TotalPolicy::Trust);
        assert!("strict".parse::<TotalPolicy>().is_err());
    }

    #[test]
    fn test_customer_ref_accepts_both_shapes() {
        let existing: CustomerRef = serde_json::from_str(r#"{"customerId":"c-1"}"#).unwrap();
        assert_eq!(
            existing,
            CustomerRef::Existing {
                customer_id: "c-1".to_string()
            }
        );

        let profile: CustomerRef = serde_json::from_str(
            r#"{"name":"Asha","email":"asha@example.com","phone":"555 0100"}"#,
        )
        .unwrap();
        assert!(matches!(profile, CustomerRef::Profile(_)));
    }
}
