//! Promo code query functions.
//!
//! Codes are keyed case-insensitively (`COLLATE NOCASE` on the column).

use marquee_types::promo::{PromoCode, PromoType};
use rusqlite::{Connection, OptionalExtension};

use crate::{DbError, Result};

/// Result of an attempted usage increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageIncrement {
    /// The counter was bumped; carries the new `used_count`.
    Recorded(u32),
    /// The code was already at `max_uses`; nothing was written.
    Exhausted,
}

/// Insert a promo code (admin collaborator path, used by tests and seeding).
pub fn insert(conn: &Connection, promo: &PromoCode, created_at: u64) -> Result<()> {
    conn.execute(
        "INSERT INTO promo_codes (code, promo_type, discount_value, max_uses, used_count, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            promo.code,
            promo.promo_type.as_str(),
            promo.discount_value,
            promo.max_uses,
            promo.used_count,
            created_at as i64,
        ],
    )?;
    Ok(())
}

/// Look up a promo code, ignoring case.
pub fn get(conn: &Connection, code: &str) -> Result<Option<PromoCode>> {
    let raw = conn
        .query_row(
            "SELECT code, promo_type, discount_value, max_uses, used_count
             FROM promo_codes WHERE code = ?1",
            [code],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<u32>>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, u32>(4)?,
                ))
            },
        )
        .optional()?;

    raw.map(|(code, promo_type, discount_value, max_uses, used_count)| {
        let promo_type: PromoType = promo_type
            .parse()
            .map_err(|e: marquee_types::ParseError| DbError::Serialization(e.to_string()))?;
        Ok(PromoCode {
            code,
            promo_type,
            discount_value,
            max_uses,
            used_count,
        })
    })
    .transpose()
}

/// Atomically record one use of a code.
///
/// A single `UPDATE ... WHERE used_count < max_uses` statement, so the
/// counter can never pass `max_uses` even when two purchasers race for the
/// last use. The loser sees [`UsageIncrement::Exhausted`].
///
/// # Errors
///
/// - [`DbError::NotFound`] if no such code exists
pub fn increment_usage(conn: &Connection, code: &str) -> Result<UsageIncrement> {
    let updated: Option<u32> = conn
        .query_row(
            "UPDATE promo_codes SET used_count = used_count + 1
             WHERE code = ?1 AND used_count < max_uses
             RETURNING used_count",
            [code],
            |row| row.get(0),
        )
        .optional()?;

    match updated {
        Some(count) => Ok(UsageIncrement::Recorded(count)),
        None if get(conn, code)?.is_some() => Ok(UsageIncrement::Exhausted),
        None => Err(DbError::NotFound(format!("promo code '{code}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    fn promo(code: &str, max_uses: u32, used_count: u32) -> PromoCode {
        PromoCode {
            code: code.to_string(),
            promo_type: PromoType::Discount,
            discount_value: Some(25),
            max_uses,
            used_count,
        }
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let conn = test_db();
        insert(&conn, &promo("FestFriend", 3, 0), 100).expect("insert");

        let found = get(&conn, "festfriend").expect("get").expect("present");
        assert_eq!(found.code, "FestFriend");
        assert_eq!(found.discount_value, Some(25));
        assert!(get(&conn, "nope").expect("get").is_none());
    }

    #[test]
    fn test_duplicate_code_differing_case_rejected() {
        let conn = test_db();
        insert(&conn, &promo("SPRING", 1, 0), 100).expect("insert");
        assert!(insert(&conn, &promo("spring", 1, 0), 100).is_err());
    }

    #[test]
    fn test_increment_until_exhausted() {
        let conn = test_db();
        insert(&conn, &promo("TWICE", 2, 0), 100).expect("insert");

        assert_eq!(increment_usage(&conn, "twice").expect("first"), UsageIncrement::Recorded(1));
        assert_eq!(increment_usage(&conn, "TWICE").expect("second"), UsageIncrement::Recorded(2));
        assert_eq!(increment_usage(&conn, "TWICE").expect("third"), UsageIncrement::Exhausted);

        let stored = get(&conn, "TWICE").expect("get").expect("present");
        assert_eq!(stored.used_count, 2, "counter never passes max_uses");
    }

    #[test]
    fn test_increment_unknown_code() {
        let conn = test_db();
        assert!(matches!(increment_usage(&conn, "GHOST"), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_over_quota_row_rejected_by_schema() {
        let conn = test_db();
        assert!(insert(&conn, &promo("BROKEN", 1, 2), 100).is_err());
    }
}
