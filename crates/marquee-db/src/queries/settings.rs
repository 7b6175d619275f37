//! Settings query functions.
//!
//! Holds values the admin console edits at runtime, such as sector split
//! overrides (`split.pass_bps`, `split.block_bps`, `split.party_bps`).

use rusqlite::Connection;

use crate::{DbError, Result};

/// Setting key for the pass-sector partner share override.
pub const SPLIT_PASS_BPS: &str = "split.pass_bps";
/// Setting key for the block-sector partner share override.
pub const SPLIT_BLOCK_BPS: &str = "split.block_bps";
/// Setting key for the watch-party sector partner share override.
pub const SPLIT_PARTY_BPS: &str = "split.party_bps";

/// Get a setting value by key.
pub fn get(conn: &Connection, key: &str) -> Result<String> {
    conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            DbError::NotFound(format!("setting '{key}'"))
        }
        other => DbError::Sqlite(other),
    })
}

/// Set a setting value.
pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

/// Get a setting as u64, or `None` if it is not set.
pub fn get_opt_u64(conn: &Connection, key: &str) -> Result<Option<u64>> {
    match get(conn, key) {
        Ok(v) => v
            .parse()
            .map(Some)
            .map_err(|e: std::num::ParseIntError| DbError::Serialization(format!("{key}: {e}"))),
        Err(DbError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
