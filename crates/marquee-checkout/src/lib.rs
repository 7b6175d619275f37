//! # marquee-checkout
//!
//! Authoritative pricing, promo codes and the purchase flow.
//!
//! Prices never come from the client except for open-amount purchases
//! (donations, savings deposits), which are checked against a minimum.
//!
//! ## Modules
//!
//! - [`pricing`] — Access type to price and charge memo
//! - [`promo`] — Quota check, discount and usage commit
//! - [`purchase`] — Price, discount, charge, commit

pub mod pricing;
pub mod promo;
pub mod purchase;

use marquee_db::DbError;
use marquee_gateway::GatewayError;
use marquee_types::{AccessType, MinorUnits};

/// Error types for checkout operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// The access type is not sold.
    #[error("unknown access type: {0}")]
    UnknownAccessType(String),

    /// Open amount under the minimum.
    #[error("amount {amount} is below minimum {minimum}")]
    AmountTooLow {
        /// The amount provided.
        amount: MinorUnits,
        /// The minimum accepted amount.
        minimum: MinorUnits,
    },

    /// A catalog-priced access type was requested without an item.
    #[error("{0} requires an item id")]
    ItemRequired(AccessType),

    /// An open-amount access type was requested without an amount.
    #[error("{0} requires an amount")]
    AmountRequired(AccessType),

    #[error("{access_type} item not found: {item_id}")]
    ItemNotFound {
        access_type: AccessType,
        item_id: String,
    },

    /// The item exists but has no price for this access type.
    #[error("{access_type} item {item_id} has no price")]
    PriceUnavailable {
        access_type: AccessType,
        item_id: String,
    },

    #[error("promo code not found: {0}")]
    PromoNotFound(String),

    /// The code has no uses left.
    #[error("promo code exhausted: {0}")]
    QuotaExceeded(String),

    /// A discount code without a percentage in 1..=100.
    #[error("promo code {code} has invalid discount {value:?}")]
    InvalidDiscount { code: String, value: Option<u32> },

    #[error("store error: {0}")]
    Store(#[from] DbError),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Convenience result type for checkout operations.
pub type Result<T> = std::result::Result<T, CheckoutError>;
