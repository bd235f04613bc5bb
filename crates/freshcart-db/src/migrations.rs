//! # Database Migrations
//!
//! Embedded SQL migrations for the FreshCart local store.
//!
//! ## How Migrations Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Store construction                                                 │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  Compare embedded migrations vs _sqlx_migrations table              │
//! │       │                                                             │
//! │       ├── 001_initial_schema.sql ✓ (applied)                        │
//! │       └── 002_indexes.sql        ⬜ (pending - runs now)            │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  Record checksum + timestamp, continue startup                      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Schema changes get a new numbered file with a real upgrade script.
//! There is deliberately no destructive fallback: a version mismatch that
//! cannot be migrated forward fails construction with
//! [`crate::StoreError::Unavailable`] instead of dropping user data.
//!
//! ## Adding New Migrations
//! 1. Create the next `NNN_description.sql` in `migrations/sqlite/`
//! 2. Write idempotent SQL (`IF NOT EXISTS` where possible)
//! 3. **NEVER** modify an already-applied migration

use sqlx::SqlitePool;
use tracing::info;

use crate::error::StoreResult;

/// Embedded migrations from `migrations/sqlite/`, compiled into the
/// binary by `sqlx::migrate!`. No runtime file access.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending migrations.
///
/// Idempotent and ordered; each migration runs in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> StoreResult<()> {
    info!("checking for pending migrations");
    MIGRATOR.run(pool).await?;
    info!("all migrations applied");
    Ok(())
}

/// Returns `(embedded, applied)` migration counts, for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> StoreResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;
    Ok((total, applied as usize))
}
