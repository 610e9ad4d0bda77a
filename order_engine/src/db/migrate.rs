//! set up migrations

use anyhow::anyhow;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::db::connection::connect_sqlite;

/// Embedded Diesel migrations bundled with this crate.
///
/// These are applied by `run_sqlite` to bring the database schema up to date.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Runs pending Diesel migrations on a SQLite database at the given URL.
///
/// This applies the connection PRAGMAs (WAL, FKs, busy_timeout) and then all
/// embedded migrations, returning an error on failure. Bare file paths like
/// `"orders.db"` are accepted.
pub fn run_sqlite(database_url: &str) -> anyhow::Result<()> {
    let mut conn = connect_sqlite(database_url)?;

    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow!(e))?;

    Ok(())
}
