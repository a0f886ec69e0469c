//! # Database Handle
//!
//! Opens the SQLite pool, applies migrations and hands out repositories.
//!
//! ## Readers and the single writer
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  SqlitePool (WAL, max_connections)                      │
//! │                                                                         │
//! │  GET  /api/dashboard ──► conn A   reads a snapshot, never blocks        │
//! │  GET  /api/sales     ──► conn B   reads a snapshot, never blocks        │
//! │  POST /api/sales     ──► conn C   BEGIN IMMEDIATE takes the lock        │
//! │  POST /api/sales     ──► conn D   waits up to busy_timeout for the lock │
//! │                                   then re-reads stock inside its own tx │
//! │                                                                         │
//! │  Lock still held after busy_timeout ──► DbError::Busy (503, retry)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::customer::CustomerRepository;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Pool settings for [`Database::new`].
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/tally/tally.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first open. `:memory:` for tests.
    pub database_path: PathBuf,

    /// Upper bound on pooled connections (readers plus the one writer). Default 5.
    pub max_connections: u32,

    /// Connections opened eagerly at startup. Default 1.
    pub min_connections: u32,

    /// How long a request waits for a free pooled connection. Default 30s.
    pub acquire_timeout: Duration,

    /// Pooled connections idle this long are closed. Default 10 minutes.
    pub idle_timeout: Duration,

    /// How long a sale commit waits for the SQLite write lock. Default 5s.
    pub busy_timeout: Duration,

    /// Apply pending migrations on open. Default true.
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            ..DbConfig::default()
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Private in-memory database for tests.
    ///
    /// Every connection to `:memory:` would see its own empty database, so
    /// the pool is pinned to one connection that never idles out. That also
    /// serializes transactions, so lock contention needs a file-backed pool.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(3600),
            ..DbConfig::default()
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            database_path: PathBuf::from("./tally.db"),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared database handle.
///
/// Clones share one pool. The server keeps a handle in its router state and
/// builds a repository per request:
///
/// ```rust,ignore
/// let products = state.db.products().list().await?;
/// let detail = state.db.sales().commit_sale(&request, TotalPolicy::Trust).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database and applies migrations.
    ///
    /// Every connection runs with WAL journaling, `synchronous = NORMAL`,
    /// foreign keys on (sale items cascade with their sale) and the
    /// configured busy timeout.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening database");

        let url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        debug!(busy_timeout_ms = config.busy_timeout.as_millis() as u64, "Connect options ready");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections.min(config.max_connections))
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(max_connections = config.max_connections, "Database pool ready");

        let db = Database { pool };

        if config.run_migrations {
            migrations::run_migrations(&db.pool).await?;
        }

        Ok(db)
    }

    /// Raw pool, for diagnostics such as [`migrations::migration_status`].
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    /// Closes the pool. Later repository calls fail with `ConnectionFailed`.
    pub async fn close(&self) {
        info!("Closing database pool");
        self.pool.close().await;
    }

    /// `SELECT 1` round trip, used by `GET /health`.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);

        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
        assert!(total >= 1);
    }

    #[tokio::test]
    async fn test_in_memory_databases_are_isolated() {
        let a = Database::new(DbConfig::in_memory()).await.unwrap();
        let b = Database::new(DbConfig::in_memory()).await.unwrap();

        a.products()
            .insert(&tally_core::NewProduct {
                name: "Pen".to_string(),
                price_cents: 100,
                stock: 1,
            })
            .await
            .unwrap();

        assert_eq!(a.products().count().await.unwrap(), 1);
        assert_eq!(b.products().count().await.unwrap(), 0);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/tally-test.db")
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(2))
            .busy_timeout(Duration::from_secs(1))
            .run_migrations(false);

        assert_eq!(config.database_path, PathBuf::from("/tmp/tally-test.db"));
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout, Duration::from_secs(2));
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert!(!config.run_migrations);
    }

    #[tokio::test]
    async fn test_closed_pool_is_unhealthy() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        assert!(!db.health_check().await);
    }
}
