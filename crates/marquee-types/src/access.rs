//! Purchasable access types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ParseError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    FestivalPass,
    AllAccessPass,
    Subscription,
    MoviePurchase,
    Rental,
    WatchPartyTicket,
    BlockUnlock,
    Donation,
    SavingsDeposit,
}

/// Where the authoritative price of an access type comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceSource {
    /// Fixed price table.
    Static,
    /// Per-item price read from the content catalog at request time.
    Catalog,
    /// Client-chosen amount subject to a minimum.
    OpenAmount,
}

impl AccessType {
    pub const ALL: [AccessType; 9] = [
        AccessType::FestivalPass,
        AccessType::AllAccessPass,
        AccessType::Subscription,
        AccessType::MoviePurchase,
        AccessType::Rental,
        AccessType::WatchPartyTicket,
        AccessType::BlockUnlock,
        AccessType::Donation,
        AccessType::SavingsDeposit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AccessType::FestivalPass => "festival_pass",
            AccessType::AllAccessPass => "all_access_pass",
            AccessType::Subscription => "subscription",
            AccessType::MoviePurchase => "movie_purchase",
            AccessType::Rental => "rental",
            AccessType::WatchPartyTicket => "watch_party_ticket",
            AccessType::BlockUnlock => "block_unlock",
            AccessType::Donation => "donation",
            AccessType::SavingsDeposit => "savings_deposit",
        }
    }

    pub fn price_source(self) -> PriceSource {
        match self {
            AccessType::FestivalPass | AccessType::AllAccessPass | AccessType::Subscription => {
                PriceSource::Static
            }
            AccessType::MoviePurchase
            | AccessType::Rental
            | AccessType::WatchPartyTicket
            | AccessType::BlockUnlock => PriceSource::Catalog,
            AccessType::Donation | AccessType::SavingsDeposit => PriceSource::OpenAmount,
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccessType::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ParseError::new("access type", s))
    }
}
