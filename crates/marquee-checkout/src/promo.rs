//! Promo codes.
//!
//! A purchase with a code goes through three steps: [`check_quota`] before
//! charging, [`apply_discount`] to compute the payable amount, and
//! [`commit_usage`] once the charge succeeded (or was waived). Usage is
//! never rolled back.
//!
//! The check and the commit are separate statements. Two purchasers can
//! both pass the check for the last use; the store's guarded increment then
//! lets exactly one of them commit. The other has already been charged and
//! gets [`CheckoutError::QuotaExceeded`] from the commit.

use marquee_db::queries::promos::{self, UsageIncrement};
use marquee_db::DbError;
use marquee_types::promo::{PromoCode, PromoState, PromoType};
use marquee_types::MinorUnits;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::{CheckoutError, Result};

/// Look up a code, ignoring case.
pub fn lookup(conn: &Connection, code: &str) -> Result<PromoCode> {
    promos::get(conn, code)?.ok_or_else(|| CheckoutError::PromoNotFound(code.to_string()))
}

/// Fail with [`CheckoutError::QuotaExceeded`] if the code has no uses left.
pub fn check_quota(conn: &Connection, code: &str) -> Result<PromoCode> {
    let promo = lookup(conn, code)?;
    match promo.state() {
        PromoState::Exhausted => {
            debug!(code = %promo.code, used = promo.used_count, max = promo.max_uses, "promo exhausted");
            Err(CheckoutError::QuotaExceeded(promo.code))
        }
        PromoState::Unused | PromoState::Active => Ok(promo),
    }
}

/// Payable amount after the code is applied.
///
/// `one_time_access` waives the whole amount. `discount` takes a percentage
/// off, rounding the discount down: `amount - floor(amount * pct / 100)`.
pub fn apply_discount(promo: &PromoCode, amount: MinorUnits) -> Result<MinorUnits> {
    match promo.promo_type {
        PromoType::OneTimeAccess => Ok(0),
        PromoType::Discount => {
            let pct = match promo.discount_value {
                Some(pct @ 1..=100) => pct,
                value => {
                    return Err(CheckoutError::InvalidDiscount {
                        code: promo.code.clone(),
                        value,
                    })
                }
            };
            let discount = u128::from(amount) * u128::from(pct) / 100;
            // discount <= amount, so the narrowing is lossless.
            Ok(amount - discount as u64)
        }
    }
}

/// Record one use of a code. Returns the new usage count.
pub fn commit_usage(conn: &Connection, code: &str) -> Result<u32> {
    match promos::increment_usage(conn, code) {
        Ok(UsageIncrement::Recorded(count)) => {
            info!(code, used = count, "promo use recorded");
            Ok(count)
        }
        Ok(UsageIncrement::Exhausted) => Err(CheckoutError::QuotaExceeded(code.to_string())),
        Err(DbError::NotFound(_)) => Err(CheckoutError::PromoNotFound(code.to_string())),
        Err(e) => Err(e.into()),
    }
}
