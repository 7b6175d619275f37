//! # marquee-types
//!
//! Shared domain types used across the Marquee workspace: gateway payments,
//! revenue categories, promo codes, payout records, catalog items and the
//! analytics report returned to the console.
//!
//! All money is carried as integer minor units (cents). There is no
//! floating-point currency anywhere in the workspace.

pub mod access;
pub mod catalog;
pub mod payment;
pub mod payout;
pub mod promo;
pub mod report;
pub mod revenue;

pub use access::AccessType;
pub use payment::RawPayment;
pub use payout::{PayoutRecord, PayoutStatus};
pub use promo::{PromoCode, PromoType};
pub use revenue::{Category, ClassifiedTransaction};

/// Amount in minor currency units (cents).
pub type MinorUnits = u64;

/// Minor units per major unit (1 USD = 100 cents).
pub const MINOR_UNITS_PER_MAJOR: MinorUnits = 100;

/// Smallest amount accepted for open-amount purchases ($1.00).
pub const MIN_OPEN_AMOUNT: MinorUnits = 100;

/// Basis points in a whole (100%).
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Default partner share of gross revenue, in basis points (70%).
pub const DEFAULT_PARTNER_SHARE_BPS: u16 = 7_000;

/// Ledger epoch: transactions before this instant are excluded from the ledger.
pub const DEFAULT_LEDGER_EPOCH: &str = "2024-09-01T00:00:00Z";

/// The only currency the platform charges in.
pub const CURRENCY: &str = "USD";

/// Error returned when a wire name does not map to a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseError {
    /// What was being parsed ("access type", "payout status", ...).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl ParseError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
