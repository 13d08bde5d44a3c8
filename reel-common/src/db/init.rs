//! Database initialization
//!
//! Opens (or creates) the SQLite database holding the review relation and the
//! role relation. Schema creation is idempotent and runs on every startup.

use crate::models::RoleAssignment;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Applied to every pooled connection, not just the first
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        // WAL lets the live feed keep reading while reviews are written
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// Limited to one connection: every SQLite `:memory:` connection is a
/// separate database.
pub async fn init_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_reviews_table(pool).await?;
    create_role_assignments_table(pool).await?;
    Ok(())
}

async fn create_reviews_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id TEXT PRIMARY KEY,
            subject_id INTEGER NOT NULL,
            author_id TEXT NOT NULL,
            text TEXT NOT NULL,
            rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
            created_at INTEGER NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reviews_subject ON reviews (subject_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reviews_author ON reviews (author_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_role_assignments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS role_assignments (
            user_id TEXT PRIMARY KEY,
            is_admin INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Write a role assignment
///
/// Roles are provisioned outside the review flows; this is the provisioning
/// entry point (operators, fixtures). Review code only reads roles.
pub async fn upsert_role_assignment(pool: &SqlitePool, assignment: &RoleAssignment) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO role_assignments (user_id, is_admin) VALUES (?, ?)
        ON CONFLICT(user_id) DO UPDATE SET is_admin = excluded.is_admin
        "#,
    )
    .bind(assignment.user_id.as_str())
    .bind(assignment.is_admin)
    .execute(pool)
    .await?;

    info!(
        user_id = %assignment.user_id,
        is_admin = assignment.is_admin,
        "Role assignment provisioned"
    );

    Ok(())
}
