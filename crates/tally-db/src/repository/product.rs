//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! Stock is only lowered by [`SaleRepository::commit_sale`]; this repository
//! sets it to an absolute value when a product is created or edited.
//!
//! [`SaleRepository::commit_sale`]: crate::repository::sale::SaleRepository::commit_sale

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use tally_core::validation::{validate_new_product, validate_product_patch};
use tally_core::{NewProduct, Product, ProductPatch};

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let product = repo.insert(&NewProduct { name: "Stapler".into(), price_cents: 899, stock: 12 }).await?;
/// let all = repo.list().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists every product, ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price_cents, stock, created_at, updated_at
            FROM products
            ORDER BY name COLLATE NOCASE, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price_cents, stock, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product.
    pub async fn insert(&self, new: &NewProduct) -> DbResult<Product> {
        validate_new_product(new)?;

        let now = Utc::now();
        let product = Product {
            id: generate_id(),
            name: new.name.trim().to_string(),
            price_cents: new.price_cents,
            stock: new.stock,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, stock, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Applies a partial update and returns the stored product.
    pub async fn update(&self, id: &str, patch: &ProductPatch) -> DbResult<Product> {
        validate_product_patch(patch)?;

        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        let mut product = patch.apply_to(&existing);
        product.updated_at = Utc::now();

        debug!(id = %id, stock = product.stock, price_cents = product.price_cents, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = ?2, price_cents = ?3, stock = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(product)
    }

    /// Deletes a product.
    ///
    /// Past sales keep their name and price snapshots.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
