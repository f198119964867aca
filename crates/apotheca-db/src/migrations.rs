//! # Database Migrations
//!
//! Embedded SQL migrations for the ledger schema.
//!
//! The `sqlx::migrate!()` macro embeds every SQL file from the migrations
//! directory into the binary at compile time; applied migrations are
//! tracked in `_sqlx_migrations`, so running them is idempotent.
//!
//! ## Adding New Migrations
//! 1. Create a new file in `migrations/sqlite/` with the next number
//! 2. Name format: `NNN_description.sql`
//! 3. Write idempotent SQL (use `IF NOT EXISTS` where possible)
//! 4. **NEVER** modify existing migrations - always add new ones

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Embedded migrations from `migrations/sqlite` at the workspace root.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations, in filename order, each in its
/// own transaction. Safe to call on every startup.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns (total embedded, applied) migration counts, for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}
