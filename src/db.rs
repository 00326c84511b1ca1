//! SQLite bootstrap: pool creation and the embedded schema migration.

use anyhow::{Context, Result};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;

const MIGRATION_SQL: &str = include_str!("../migrations/0001_init.sql");

/// Local file SQLite will use for `database_url`, or `None` for in-memory
/// databases.
fn database_file(database_url: &str) -> Option<&Path> {
    let db_path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    let db_path = db_path.split('?').next().unwrap_or_default();

    if db_path.is_empty() || db_path == ":memory:" || database_url.contains("mode=memory") {
        return None;
    }
    Some(Path::new(db_path))
}

/// Open a pool for `database_url`, creating the database file's parent
/// directory and the file itself when they do not exist yet.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    if let Some(db_path) = database_file(database_url) {
        tracing::debug!("Interpreted SQLite path => {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating database directory {}", parent.display()))?;
                tracing::info!("Created missing directory {:?}", parent);
            }
        }

        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(db_path)
        {
            Ok(_) => tracing::debug!("Database file can be created/opened."),
            Err(e) => tracing::warn!("Failed to open database file manually: {}", e),
        }
    }

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .with_context(|| format!("connecting to {}", database_url))
}

/// Single-connection in-memory database with the schema applied.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .context("opening in-memory SQLite")?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Run the embedded schema statements one by one. Every statement is
/// `IF NOT EXISTS`, so this is safe to call on every start.
pub async fn run_migrations(db: &SqlitePool) -> Result<()> {
    let statements = MIGRATION_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt)
            .execute(db)
            .await
            .with_context(|| format!("executing migration statement `{}`", stmt))?;
    }

    Ok(())
}
