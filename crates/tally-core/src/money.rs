//! # Money
//!
//! Amounts are integer minor units end to end: product prices, frozen line
//! prices, sale totals and every dashboard sum.
//!
//! ```text
//! Product.price_cents ──► LineItem.unit_price_cents × quantity ──► line_total
//!                                                                     │
//!                             Sale.total_amount_cents ◄── check_total ┘
//!                                        │
//!                 Dashboard.total_revenue_cents, period_series, top_customer
//! ```
//!
//! Arithmetic saturates at the `i64` bounds instead of wrapping or
//! panicking, so a pathological price × quantity in a stored row can skew
//! a dashboard figure but cannot take the aggregator down.
//!
//! ```rust
//! use tally_core::money::Money;
//!
//! let price = Money::from_cents(1099);
//! let total: Money = [price, price].into_iter().sum();
//! assert_eq!(total.cents(), 2198);
//! assert_eq!(Money::from_cents(i64::MAX).multiply_quantity(2).cents(), i64::MAX);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use ts_rs::TS;

/// A monetary value in the smallest currency unit.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Unit price × quantity, saturating.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

/// Plain decimal rendering (`1234.50`); currency symbols belong to the client.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}
