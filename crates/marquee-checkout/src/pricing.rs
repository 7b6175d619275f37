//! Price resolution.
//!
//! Each access type has exactly one price source:
//!
//! - **Static**: fixed table ([`PricingTable`])
//! - **Catalog**: the item's price read from the store at request time
//! - **Open amount**: client-chosen, at least [`PricingTable::min_open_amount`]
//!
//! The resolver also produces the memo the charge is submitted with. The
//! memo is the only purchase record the gateway keeps, so it is written in
//! the shape the revenue classifier recognises.

use marquee_db::queries::catalog;
use marquee_types::access::PriceSource;
use marquee_types::catalog::{FestivalBlock, Movie};
use marquee_types::{AccessType, MinorUnits, MIN_OPEN_AMOUNT};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{CheckoutError, Result};

/// Read access to catalog prices.
pub trait PriceCatalog {
    fn movie(&self, id: &str) -> marquee_db::Result<Option<Movie>>;
    fn block(&self, id: &str) -> marquee_db::Result<Option<FestivalBlock>>;
}

impl PriceCatalog for Connection {
    fn movie(&self, id: &str) -> marquee_db::Result<Option<Movie>> {
        catalog::get_movie(self, id)
    }

    fn block(&self, id: &str) -> marquee_db::Result<Option<FestivalBlock>> {
        catalog::get_block(self, id)
    }
}

/// Static prices and the open-amount minimum, in minor units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTable {
    pub festival_pass: MinorUnits,
    pub all_access_pass: MinorUnits,
    pub subscription: MinorUnits,
    pub min_open_amount: MinorUnits,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self {
            festival_pass: 2500,
            all_access_pass: 5000,
            subscription: 999,
            min_open_amount: MIN_OPEN_AMOUNT,
        }
    }
}

/// A resolved price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
    pub access_type: AccessType,
    pub item_id: Option<String>,
    pub amount: MinorUnits,
    /// Memo to submit with the charge.
    pub memo: String,
}

pub struct PricingResolver {
    table: PricingTable,
}

impl PricingResolver {
    pub fn new(table: PricingTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PricingTable {
        &self.table
    }

    /// Resolve by wire name.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::UnknownAccessType`] if `access_type` is not sold
    /// - everything [`PricingResolver::resolve`] returns
    pub fn resolve_named(
        &self,
        catalog: &dyn PriceCatalog,
        access_type: &str,
        item_id: Option<&str>,
        client_amount: Option<MinorUnits>,
    ) -> Result<PriceQuote> {
        let access_type: AccessType = access_type
            .parse()
            .map_err(|_| CheckoutError::UnknownAccessType(access_type.to_string()))?;
        self.resolve(catalog, access_type, item_id, client_amount)
    }

    /// Resolve the authoritative price of one purchase.
    ///
    /// `client_amount` is only read for open-amount types.
    pub fn resolve(
        &self,
        catalog: &dyn PriceCatalog,
        access_type: AccessType,
        item_id: Option<&str>,
        client_amount: Option<MinorUnits>,
    ) -> Result<PriceQuote> {
        let (amount, memo) = match access_type.price_source() {
            PriceSource::Static => self.static_price(access_type)?,
            PriceSource::Catalog => {
                let id = item_id.ok_or(CheckoutError::ItemRequired(access_type))?;
                catalog_price(catalog, access_type, id)?
            }
            PriceSource::OpenAmount => {
                let amount = client_amount.ok_or(CheckoutError::AmountRequired(access_type))?;
                if amount < self.table.min_open_amount {
                    return Err(CheckoutError::AmountTooLow {
                        amount,
                        minimum: self.table.min_open_amount,
                    });
                }
                (amount, open_amount_memo(catalog, access_type, item_id)?)
            }
        };

        debug!(%access_type, item_id, amount, "price resolved");
        Ok(PriceQuote {
            access_type,
            item_id: item_id.map(str::to_string),
            amount,
            memo,
        })
    }

    fn static_price(&self, access_type: AccessType) -> Result<(MinorUnits, String)> {
        let t = &self.table;
        match access_type {
            AccessType::FestivalPass => Ok((t.festival_pass, "Festival Pass".to_string())),
            AccessType::AllAccessPass => Ok((t.all_access_pass, "All-Access Pass".to_string())),
            AccessType::Subscription => Ok((t.subscription, "Subscription".to_string())),
            other => Err(CheckoutError::UnknownAccessType(other.to_string())),
        }
    }
}

fn catalog_price(
    catalog: &dyn PriceCatalog,
    access_type: AccessType,
    id: &str,
) -> Result<(MinorUnits, String)> {
    let not_found = || CheckoutError::ItemNotFound {
        access_type,
        item_id: id.to_string(),
    };
    let unpriced = || CheckoutError::PriceUnavailable {
        access_type,
        item_id: id.to_string(),
    };

    match access_type {
        AccessType::BlockUnlock => {
            let block = catalog.block(id)?.ok_or_else(not_found)?;
            let price = block.price.ok_or_else(unpriced)?;
            Ok((price, format!("Unlock Block: \"{}\"", block.title)))
        }
        AccessType::MoviePurchase | AccessType::Rental | AccessType::WatchPartyTicket => {
            let movie = catalog.movie(id)?.ok_or_else(not_found)?;
            let (price, memo) = match access_type {
                AccessType::WatchPartyTicket => (
                    movie.watch_party_price,
                    format!("Watch Party Ticket: {}", movie.title),
                ),
                AccessType::Rental => (movie.sale_price, format!("Rental: {}", movie.title)),
                _ => (movie.sale_price, format!("Movie Purchase: {}", movie.title)),
            };
            Ok((price.ok_or_else(unpriced)?, memo))
        }
        other => Err(CheckoutError::UnknownAccessType(other.to_string())),
    }
}

fn open_amount_memo(
    catalog: &dyn PriceCatalog,
    access_type: AccessType,
    item_id: Option<&str>,
) -> Result<String> {
    match (access_type, item_id) {
        (AccessType::Donation, Some(id)) => {
            let movie = catalog.movie(id)?.ok_or_else(|| CheckoutError::ItemNotFound {
                access_type,
                item_id: id.to_string(),
            })?;
            Ok(format!("Support for film: \"{}\"", movie.title))
        }
        (AccessType::Donation, None) => Ok("Platform Donation".to_string()),
        _ => Ok("Savings Deposit".to_string()),
    }
}
