//! # Store Handle & Pool Management
//!
//! Connection pool creation and configuration for the SQLite store.
//!
//! ## Ownership Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  App startup                                                        │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  DbConfig::new(path)  ←  explicit configuration                     │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  Database::new(config).await  ←  pool + migrations, fails fatally   │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  handle cloned into every component that needs it                   │
//! │  (cheap clone: Arc'd pool + Arc'd change hub)                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no lazily-initialized global: the handle is constructed once,
//! explicitly, and passed into consumers. Lifecycle belongs to whoever
//! built it. Tests build an isolated in-memory store per test.
//!
//! ## WAL Mode
//! WAL journaling is enabled so readers don't block writers and vice
//! versa; foreign keys are always ON (SQLite defaults them off).

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::live::ChangeHub;
use crate::migrations;
use crate::repository::order::OrderRepository;
use crate::repository::returns::ReturnRepository;
use crate::repository::settings::SettingsRepository;
use crate::repository::store::StoreRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Store configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/data/freshcart.db").max_connections(5);
/// let db = Database::new(config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5 (sufficient for a local client app)
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    pub min_connections: u32,

    /// Connection acquire timeout.
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect. Default: true.
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a configuration with the given database path. The file is
    /// created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// In-memory store configuration, isolated and disposable (for tests).
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            // In-memory databases live per-connection; the pool must hold
            // exactly one or each acquire would see a different database.
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// The process-wide store handle: owns the connection pool and the change
/// hub that live queries subscribe to.
///
/// Cloning is cheap and every clone shares the same pool and hub. One
/// handle per store file; constructing two handles over the same file
/// would split the change notifications.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    hub: Arc<ChangeHub>,
}

impl Database {
    /// Opens the store and brings the schema up to date.
    ///
    /// ## What This Does
    /// 1. Creates the database file if missing
    /// 2. Configures SQLite: WAL mode, NORMAL synchronous, foreign keys ON
    /// 3. Builds the connection pool
    /// 4. Runs pending migrations (if enabled)
    ///
    /// ## Errors
    /// [`StoreError::Unavailable`] if the file cannot be opened or a
    /// migration fails — callers should abort startup rather than operate
    /// on a partial store.
    pub async fn new(config: DbConfig) -> StoreResult<Self> {
        info!(
            path = %config.database_path.display(),
            "opening local store"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // Cascade deletes depend on this; SQLite defaults it off.
            .foreign_keys(true)
            .create_if_missing(true);

        debug!("connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        info!(max_connections = config.max_connections, "store pool created");

        let db = Database {
            pool,
            hub: ChangeHub::new(),
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs pending migrations. Called by [`Database::new`] unless
    /// disabled in the config.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Raw pool access, for queries not covered by the repositories.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Order repository: orders, cart items, tracking, delivery people.
    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone(), Arc::clone(&self.hub))
    }

    /// Store directory repository.
    pub fn stores(&self) -> StoreRepository {
        StoreRepository::new(self.pool.clone(), Arc::clone(&self.hub))
    }

    /// Return/refund workflow repository.
    pub fn returns(&self) -> ReturnRepository {
        ReturnRepository::new(self.pool.clone(), Arc::clone(&self.hub))
    }

    /// Configuration singletons repository.
    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.pool.clone(), Arc::clone(&self.hub))
    }

    /// Closes the pool. Subsequent operations fail.
    pub async fn close(&self) {
        info!("closing store pool");
        self.pool.close().await;
    }

    /// Checks the store can execute queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

/// Generates a fresh UUID v4 row id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_opens_and_migrates() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn migration_status_errors_when_never_migrated() {
        let config = DbConfig::in_memory().run_migrations(false);
        let db = Database::new(config).await.unwrap();
        // No _sqlx_migrations table yet; the failure must surface, not
        // read as "0 applied"
        assert!(migrations::migration_status(db.pool()).await.is_err());
    }

    #[tokio::test]
    async fn config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
    }

    #[tokio::test]
    async fn unopenable_path_is_unavailable() {
        let config = DbConfig::new("/nonexistent-dir/noperm/x.db");
        let err = Database::new(config).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
