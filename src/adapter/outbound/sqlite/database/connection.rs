//! Database connection management using Diesel ORM.
//!
//! Provides connection pooling, migration support, and connection
//! configuration for SQLite databases.

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::{Error, Result};

/// Embedded database migrations compiled from the migrations/ directory.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Type alias for a SQLite connection pool.
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

const IN_MEMORY: &str = ":memory:";

/// Applies pragmas to every connection the pool hands out.
#[derive(Debug, Clone, Copy)]
struct Pragmas {
    wal: bool,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for Pragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        configure_sqlite_connection(conn, self.wal)
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Create a connection pool for the given database URL.
///
/// Each `:memory:` connection is its own database, so an in-memory pool is
/// capped at a single connection.
///
/// # Errors
/// Returns an error if the pool cannot be created.
pub fn create_pool(database_url: &str, max_size: u32) -> Result<DbPool> {
    let in_memory = database_url == IN_MEMORY;
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Pool::builder()
        .max_size(if in_memory { 1 } else { max_size.max(1) })
        .connection_customizer(Box::new(Pragmas { wal: !in_memory }))
        .build(manager)
        .map_err(|e| Error::Connection(e.to_string()))
}

/// Run all pending database migrations.
///
/// # Errors
/// Returns an error if migrations fail.
pub fn run_migrations(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get().map_err(|e| Error::Connection(e.to_string()))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::Database(e.to_string()))?;
    Ok(())
}

/// Configure SQLite connection pragmas.
fn configure_sqlite_connection(
    conn: &mut SqliteConnection,
    wal: bool,
) -> std::result::Result<(), diesel::result::Error> {
    diesel::sql_query("PRAGMA busy_timeout=5000").execute(conn)?;
    diesel::sql_query("PRAGMA foreign_keys=ON").execute(conn)?;
    if wal {
        diesel::sql_query("PRAGMA journal_mode=WAL").execute(conn)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(diesel::QueryableByName)]
    struct TableName {
        #[diesel(sql_type = diesel::sql_types::Text)]
        name: String,
    }

    fn table_names(pool: &DbPool) -> Vec<String> {
        let mut conn = pool.get().unwrap();
        diesel::sql_query(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '__diesel_schema_migrations' ORDER BY name",
        )
        .load::<TableName>(&mut conn)
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect()
    }

    #[test]
    fn memory_pool_is_single_connection() {
        let pool = create_pool(IN_MEMORY, 8).unwrap();
        assert_eq!(pool.max_size(), 1);
    }

    #[test]
    fn run_migrations_creates_ledger_tables() {
        let pool = create_pool(IN_MEMORY, 1).unwrap();
        run_migrations(&pool).unwrap();

        let tables = table_names(&pool);
        for expected in [
            "bets",
            "markets",
            "models",
            "monitoring_receipts",
            "positions",
            "transactions",
            "user_balances",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn run_migrations_is_idempotent() {
        let pool = create_pool(IN_MEMORY, 1).unwrap();
        run_migrations(&pool).unwrap();
        run_migrations(&pool).unwrap();
        assert_eq!(table_names(&pool).len(), 7);
    }

    #[test]
    fn file_pool_shares_schema_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let pool = create_pool(path.to_str().unwrap(), 4).unwrap();
        run_migrations(&pool).unwrap();

        let first = pool.get().unwrap();
        let tables = table_names(&pool);
        drop(first);
        assert_eq!(tables.len(), 7);
    }
}
