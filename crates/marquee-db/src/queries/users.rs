//! User record query functions.

use marquee_types::catalog::User;
use rusqlite::Connection;

use crate::Result;

/// Insert a user record.
pub fn insert(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![user.id, user.email, user.created_at as i64],
    )?;
    Ok(())
}

/// Number of registered users.
pub fn count(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    Ok(count as u64)
}
