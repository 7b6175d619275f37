//! Payout history query functions.
//!
//! Payout records are written by the payout-approval collaborator and are
//! append-only; the revenue core only reads them.

use marquee_types::payout::{PayoutRecord, PayoutStatus};
use rusqlite::Connection;

use crate::{to_amount, DbError, Result};

/// Append a payout record.
pub fn insert(conn: &Connection, record: &PayoutRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO payout_records (recipient, amount, timestamp, status)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            record.recipient,
            record.amount as i64,
            record.timestamp as i64,
            record.status.as_str(),
        ],
    )?;
    Ok(())
}

/// List payout records, oldest first.
///
/// `recipient` is an exact, case-sensitive match; `None` matches everyone.
/// `status` restricts to one status; `None` returns all.
pub fn list(
    conn: &Connection,
    recipient: Option<&str>,
    status: Option<PayoutStatus>,
) -> Result<Vec<PayoutRecord>> {
    let mut stmt = conn.prepare(
        "SELECT recipient, amount, timestamp, status FROM payout_records
         WHERE (?1 IS NULL OR recipient = ?1) AND (?2 IS NULL OR status = ?2)
         ORDER BY timestamp, id",
    )?;

    let raw = stmt
        .query_map(
            rusqlite::params![recipient, status.map(PayoutStatus::as_str)],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(|(recipient, amount, timestamp, status)| {
            Ok(PayoutRecord {
                recipient,
                amount: to_amount(amount)?,
                timestamp: timestamp as u64,
                status: status
                    .parse()
                    .map_err(|e: marquee_types::ParseError| DbError::Serialization(e.to_string()))?,
            })
        })
        .collect()
}
