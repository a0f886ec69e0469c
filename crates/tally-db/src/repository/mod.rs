//! # Repository Module
//!
//! Database repository implementations for Tally.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.sales().commit_sale(&request, policy)                      │
//! │       ▼                                                                 │
//! │  SaleRepository                                                        │
//! │  ├── commit_sale(&self, request, policy)   one transaction             │
//! │  ├── list(&self, range)                                                │
//! │  ├── get_detail(&self, id)                                             │
//! │  └── update_details(&self, id, edit)                                   │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product CRUD
//! - [`CustomerRepository`](customer::CustomerRepository) - Customer CRUD and upsert by email
//! - [`SaleRepository`](sale::SaleRepository) - Sale commit, history and edits

pub mod customer;
pub mod product;
pub mod sale;

/// Generates a new entity ID.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
