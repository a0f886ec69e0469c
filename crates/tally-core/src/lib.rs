//! # tally-core: Pure Business Logic for Tally
//!
//! This crate holds the sales-management rules as pure functions with zero
//! I/O dependencies. Storage lives in `tally-db`, HTTP in the server app.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web Client (out of scope)                    │   │
//! │  │   Record Sale ──► Sales History ──► Dashboard ──► Invoice       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ REST + Bearer token                    │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/server (axum)                           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   sale    │  │ analytics │  │ validation│  │   │
//! │  │   │  Product  │  │  NewSale  │  │ Dashboard │  │   rules   │  │   │
//! │  │   │   Sale    │  │ stock plan│  │  series   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │        SQLite queries, migrations, transactional sale commit    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, Sale, LineItem)
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Field-level validation rules
//! - [`sale`] - Sale requests, cumulative stock checks, decrement planning
//! - [`analytics`] - Dashboard aggregation
//! - [`session`] - Explicit caller session context
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::money::Money;
//!
//! let unit = Money::from_cents(12_50);
//! let line = unit.multiply_quantity(3);
//! assert_eq!(line.cents(), 37_50);
//! assert_eq!(line.to_string(), "37.50");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod analytics;
pub mod error;
pub mod money;
pub mod sale;
pub mod session;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use analytics::{compute_dashboard, Dashboard, Granularity};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use sale::{CustomerRef, NewLineItem, NewSale, StockDecrement, TotalPolicy};
pub use session::SessionContext;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Products with stock strictly below this value count as low stock.
pub const LOW_STOCK_THRESHOLD: i64 = 5;

/// Maximum line items allowed in a single sale.
pub const MAX_SALE_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// ## Business Reason
/// Catches fat-finger entries (1000 instead of 10) before they hit stock.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;
