//! # marquee-revenue
//!
//! Revenue reconciliation: turns the gateway's payment feed into per-film,
//! per-block and per-sector revenue, applies partner splits and joins the
//! result with payout history.
//!
//! Everything here is pure and synchronous. Callers fetch the feed and the
//! store snapshot, then hand both to [`report::build_report`].
//!
//! ## Modules
//!
//! - [`classify`] — Memo classification into revenue categories
//! - [`aggregate`] — Per-entity and per-sector revenue buckets
//! - [`splits`] — Partner/platform splits in basis points
//! - [`ledger`] — Earnings, payouts and outstanding balances
//! - [`report`] — Analytics report assembly with per-source failures

pub mod aggregate;
pub mod classify;
pub mod ledger;
pub mod report;
pub mod splits;

/// Error types for revenue operations.
#[derive(Debug, thiserror::Error)]
pub enum RevenueError {
    /// Share ratio above 100%.
    #[error("share ratio must be at most 10000 bps, got {bps}")]
    InvalidRatio {
        /// The rejected ratio.
        bps: u32,
    },

    /// Arithmetic overflow.
    #[error("arithmetic overflow in revenue calculation")]
    Overflow,
}

/// Convenience result type for revenue operations.
pub type Result<T> = std::result::Result<T, RevenueError>;

/// Checked addition mapping overflow to [`RevenueError::Overflow`].
pub(crate) fn add(a: u64, b: u64) -> Result<u64> {
    a.checked_add(b).ok_or(RevenueError::Overflow)
}
