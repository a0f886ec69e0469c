//! Embedded schema migrations.
//!
//! Files live in the workspace `migrations/sqlite/` directory and are
//! compiled into the binary. `_sqlx_migrations` records what has been
//! applied along with a checksum, so an edited migration fails loudly at
//! startup. Schema changes go in a new `NNN_description.sql` file.
//!
//! ```text
//! 001_initial_schema.sql
//!   products     id, name, price_cents ≥ 0, stock ≥ 0
//!   customers    id, name, email UNIQUE, phone
//!   sales        customer snapshot, total_amount_cents, date (YYYY-MM-DD)
//!   sale_items   (sale_id, position) → frozen product_name, unit_price_cents
//! ```

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies pending migrations in filename order.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;

    info!(embedded = MIGRATOR.migrations.len(), "Schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await?;

    Ok((MIGRATOR.migrations.len(), applied as usize))
}
