//! # Seed Data Generator
//!
//! Populates the database with demo products, customers and sales for
//! development.
//!
//! ## Usage
//! ```bash
//! # Catalog plus 40 sales (default)
//! cargo run -p tally-db --bin seed
//!
//! # More sales
//! cargo run -p tally-db --bin seed -- --sales 200
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```
//!
//! Sales go through the normal commit path, so stock levels, customer
//! upserts and snapshots end up exactly as they would in production.
//! Dates are spread over the last 90 days so every dashboard granularity
//! has something to show.

use chrono::{Duration, Local};
use std::env;
use tally_core::{
    CoreError, CustomerProfile, CustomerRef, NewLineItem, NewProduct, NewSale, TotalPolicy,
};
use tally_db::{Database, DbConfig, DbError};

/// (name, price in cents, opening stock)
const PRODUCTS: &[(&str, i64, i64)] = &[
    ("A5 Notebook", 4500, 120),
    ("A4 Notebook", 6500, 80),
    ("Ballpoint Pen (Blue)", 1000, 400),
    ("Ballpoint Pen (Black)", 1000, 350),
    ("Gel Pen Set", 12000, 40),
    ("Highlighter Pack", 8500, 60),
    ("Stapler", 22000, 15),
    ("Staples (1000)", 3500, 90),
    ("Sticky Notes", 4000, 150),
    ("Desk Organizer", 45000, 4),
    ("Whiteboard Marker", 3000, 3),
    ("Printer Paper (500)", 39900, 0),
];

/// (name, email, phone)
const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("Asha Rao", "asha@example.com", "+91 98765 43210"),
    ("Ben Okafor", "ben@example.com", "+44 20 7946 0958"),
    ("Chen Wei", "chen@example.com", "+86 10 5555 0100"),
    ("Dana Levi", "dana@example.com", "+972 3 555 0199"),
    ("Emil Novak", "emil@example.com", "+420 555 010 203"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut sales: usize = 40;
    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--sales" | "-s" => {
                if i + 1 < args.len() {
                    sales = args[i + 1].parse().unwrap_or(40);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --sales <N>    Number of sales to record (default: 40)");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tally Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Sales:    {}", sales);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Catalog
    let mut product_ids = Vec::with_capacity(PRODUCTS.len());
    for (name, price_cents, stock) in PRODUCTS {
        let product = db
            .products()
            .insert(&NewProduct {
                name: name.to_string(),
                price_cents: *price_cents,
                stock: *stock,
            })
            .await?;
        product_ids.push((product.id, *price_cents));
    }
    println!("✓ Inserted {} products", product_ids.len());

    for (name, email, phone) in CUSTOMERS {
        db.customers()
            .create_or_fetch(&CustomerProfile {
                name: name.to_string(),
                email: email.to_string(),
                phone: phone.to_string(),
            })
            .await?;
    }
    println!("✓ Inserted {} customers", CUSTOMERS.len());

    // Sales
    let today = Local::now().date_naive();
    let mut recorded = 0;
    let mut skipped = 0;

    for n in 0..sales {
        let (name, email, phone) = CUSTOMERS[(n * 7) % CUSTOMERS.len()];

        let lines = 1 + n % 3;
        let items: Vec<NewLineItem> = (0..lines)
            .map(|k| {
                let (id, _) = &product_ids[(n * 5 + k * 3) % product_ids.len()];
                NewLineItem {
                    product_id: id.clone(),
                    quantity: 1 + ((n + k) % 4) as i64,
                }
            })
            .collect();

        let total_amount_cents = items
            .iter()
            .map(|item| {
                let price = product_ids
                    .iter()
                    .find(|(id, _)| *id == item.product_id)
                    .map(|(_, price)| *price)
                    .unwrap_or(0);
                price * item.quantity
            })
            .sum();

        let request = NewSale {
            customer: CustomerRef::Profile(CustomerProfile {
                name: name.to_string(),
                email: email.to_string(),
                phone: phone.to_string(),
            }),
            items,
            total_amount_cents,
            date: Some(today - Duration::days(((n * 11) % 90) as i64)),
        };

        match db.sales().commit_sale(&request, TotalPolicy::Enforce).await {
            Ok(_) => recorded += 1,
            // low-stock demo products run out; that is expected
            Err(DbError::Domain(CoreError::InsufficientStock { .. })) => skipped += 1,
            Err(e) => return Err(e.into()),
        }
    }

    println!("✓ Recorded {} sales ({} skipped for stock)", recorded, skipped);
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
