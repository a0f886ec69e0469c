//! # Customer Repository
//!
//! Database operations for customers.
//!
//! ## Create-or-Fetch by Email
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two requests submit asha@example.com at the same moment                │
//! │                                                                         │
//! │  A: INSERT .. ON CONFLICT(email) DO NOTHING   → 1 row  (created)        │
//! │  B: INSERT .. ON CONFLICT(email) DO NOTHING   → 0 rows (already there)  │
//! │  A: SELECT .. WHERE email = ?                 → customer #1             │
//! │  B: SELECT .. WHERE email = ?                 → customer #1             │
//! │                                                                         │
//! │  The UNIQUE index decides the race; both callers see the same record,   │
//! │  and an existing record is never modified.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use tally_core::validation::{validate_customer_patch, validate_customer_profile};
use tally_core::{normalize_email, Customer, CustomerPatch, CustomerProfile};

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Lists every customer, ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, email, phone, created_at, updated_at
            FROM customers
            ORDER BY name COLLATE NOCASE, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = customers.len(), "Listed customers");
        Ok(customers)
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_id(&mut conn, id).await
    }

    /// Gets a customer by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_email(&mut conn, &normalize_email(email)).await
    }

    /// Returns the customer with this email, creating it if absent.
    ///
    /// ## Returns
    /// `(customer, created)`. When the email is already on file the stored
    /// record is returned unchanged and `created` is false.
    pub async fn create_or_fetch(&self, profile: &CustomerProfile) -> DbResult<(Customer, bool)> {
        validate_customer_profile(profile)?;

        let mut conn = self.pool.acquire().await?;
        upsert_by_email(&mut conn, &profile.normalized()).await
    }

    /// Applies a partial update.
    ///
    /// Moving to an email that another customer holds fails with
    /// [`DbError::UniqueViolation`]. Past sales keep their snapshot.
    pub async fn update(&self, id: &str, patch: &CustomerPatch) -> DbResult<Customer> {
        validate_customer_patch(patch)?;

        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))?;

        let mut customer = patch.apply_to(&existing);
        customer.updated_at = Utc::now();

        debug!(id = %id, email = %customer.email, "Updating customer");

        let result = sqlx::query(
            r#"
            UPDATE customers
            SET name = ?2, email = ?3, phone = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("email", customer.email.clone()),
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(customer)
    }

    /// Deletes a customer. Past sales keep their snapshot.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting customer");

        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    /// Counts customers.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level helpers (shared with the sale commit transaction)
// =============================================================================

pub(crate) async fn fetch_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(
        r#"
        SELECT id, name, email, phone, created_at, updated_at
        FROM customers
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(customer)
}

async fn fetch_by_email(conn: &mut SqliteConnection, email: &str) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(
        r#"
        SELECT id, name, email, phone, created_at, updated_at
        FROM customers
        WHERE email = ?1
        "#,
    )
    .bind(email)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(customer)
}

/// Insert-or-ignore, then select. `profile` must already be normalized.
pub(crate) async fn upsert_by_email(
    conn: &mut SqliteConnection,
    profile: &CustomerProfile,
) -> DbResult<(Customer, bool)> {
    let now = Utc::now();

    let inserted = sqlx::query(
        r#"
        INSERT INTO customers (id, name, email, phone, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?5)
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(generate_id())
    .bind(&profile.name)
    .bind(&profile.email)
    .bind(&profile.phone)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .rows_affected()
        == 1;

    let customer = fetch_by_email(conn, &profile.email)
        .await?
        .ok_or_else(|| DbError::Internal(format!("customer {} vanished after upsert", profile.email)))?;

    debug!(id = %customer.id, created = inserted, "Resolved customer by email");
    Ok((customer, inserted))
}
