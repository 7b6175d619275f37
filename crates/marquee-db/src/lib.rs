//! # marquee-db
//!
//! Document store for the Marquee daemon.
//! Manages the single SQLite database at `$MARQUEE_DATA_DIR/marquee.db`.
//!
//! The revenue core only reads from the store, with one exception: the
//! promo-code usage counter, which is bumped by a single atomic statement
//! (see [`queries::promos::increment_usage`]).
//!
//! ## Schema
//!
//! - WAL mode mandatory
//! - Foreign keys enforced
//! - All timestamps are Unix epoch seconds
//! - All amounts are integer minor units
//! - Schema version stored in `PRAGMA user_version`

pub mod migrations;
pub mod queries;
pub mod schema;

use rusqlite::Connection;
use std::path::Path;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the Marquee database at the given path.
///
/// Configures WAL mode, foreign keys, and runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -8000;",
    )?;
    Ok(())
}

/// Convert a stored INTEGER amount to minor units, rejecting negatives.
pub(crate) fn to_amount(value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| DbError::Serialization(format!("negative amount in store: {value}")))
}
