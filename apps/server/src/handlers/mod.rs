//! # HTTP Handlers
//!
//! One module per resource. Every handler is thin: the [`Session`]
//! extractor has already authenticated the caller, the body is decoded,
//! and the work is delegated to a tally-db repository or a tally-core
//! function.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Route                  Handler                 Delegate     │
//! │  ─────                  ───────                 ────────     │
//! │  /health                health::check           Database     │
//! │  /api/products          products::*             Products     │
//! │  /api/customers         customers::*            Customers    │
//! │  /api/sales             sales::*                Sales        │
//! │  /api/dashboard         dashboard::get          analytics    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`Session`]: crate::auth::Session

pub mod customers;
pub mod dashboard;
pub mod health;
pub mod products;
pub mod sales;
