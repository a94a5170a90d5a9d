//! Connection pool management for SQLite via r2d2.

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rk_core::{Error, Result};
use rusqlite::{Connection, OpenFlags};

use crate::migrations;

/// Type alias for the database connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled database connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Default number of pooled connections.
const DEFAULT_MAX_SIZE: u32 = 4;

/// Initialize a database pool backed by a file on disk.
///
/// Creates the SQLite file if it does not exist, enables foreign keys and
/// WAL journal mode on every new connection, and runs pending migrations.
pub fn init_pool(db_path: &Path) -> Result<DbPool> {
    init_pool_with_size(db_path, DEFAULT_MAX_SIZE)
}

/// Like [`init_pool`] with an explicit connection limit.
pub fn init_pool_with_size(db_path: &Path, max_size: u32) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = Pool::builder()
        .max_size(max_size.max(1))
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create connection pool: {e}")))?;

    let conn = pool
        .get()
        .map_err(|e| Error::database(format!("Failed to get connection for migrations: {e}")))?;

    migrations::run_migrations(&conn)?;

    tracing::debug!(path = %db_path.display(), "Database pool ready");

    Ok(pool)
}

/// Open a pool over an existing database without creating the file or
/// running migrations.
///
/// Returns [`Error::NotFound`] when nothing exists at `db_path`.
pub fn open_pool_with_size(db_path: &Path, max_size: u32) -> Result<DbPool> {
    if !db_path.is_file() {
        return Err(Error::not_found("database", db_path.display()));
    }

    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(flags)
        .with_init(|conn| {
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )
        });

    let pool = Pool::builder()
        .max_size(max_size.max(1))
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to open connection pool: {e}")))?;

    tracing::debug!(path = %db_path.display(), "Opened existing database");
    Ok(pool)
}

/// Initialize an in-memory database pool (useful for tests).
///
/// Each call creates a uniquely-named shared-cache in-memory database so
/// that parallel tests do not interfere with each other, while all
/// connections *within* a single pool still share state.
pub fn init_memory_pool() -> Result<DbPool> {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let uri = format!("file:rk_memdb_{n}?mode=memory&cache=shared");

    let manager = SqliteConnectionManager::file(uri)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

    let pool = Pool::builder()
        .max_size(DEFAULT_MAX_SIZE)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create in-memory pool: {e}")))?;

    let conn = pool
        .get()
        .map_err(|e| Error::database(format!("Failed to get connection for migrations: {e}")))?;

    migrations::run_migrations(&conn)?;

    Ok(pool)
}

/// Convenience helper to get a connection from the pool.
pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("Failed to get connection from pool: {e}")))
}

/// Drop every table and rebuild the schema from scratch.
pub fn reset_database(conn: &Connection) -> Result<()> {
    let tables: Vec<String> = {
        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
            )
            .map_err(|e| Error::database(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| Error::database(e.to_string()))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::database(e.to_string()))?;
        rows
    };

    // foreign_keys cannot be toggled inside a transaction.
    conn.execute_batch("PRAGMA foreign_keys = OFF;")
        .map_err(|e| Error::database(e.to_string()))?;

    let dropped = (|| {
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;
        for table in &tables {
            tx.execute_batch(&format!("DROP TABLE IF EXISTS \"{table}\""))
                .map_err(|e| Error::database(format!("Failed to drop {table}: {e}")))?;
        }
        tx.commit().map_err(|e| Error::database(e.to_string()))
    })();

    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|e| Error::database(e.to_string()))?;
    dropped?;

    tracing::info!(tables = tables.len(), "Database reset; re-running migrations");
    migrations::run_migrations(conn)
}
