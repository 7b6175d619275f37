//! Content catalog and user records read from the document store.

use serde::{Deserialize, Serialize};

use crate::MinorUnits;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub id: String,
    pub title: String,
    /// Payout recipient for this film's partner share.
    pub filmmaker: Option<String>,
    pub sale_price: Option<MinorUnits>,
    pub watch_party_price: Option<MinorUnits>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FestivalBlock {
    pub id: String,
    pub title: String,
    pub price: Option<MinorUnits>,
    pub film_ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    /// Unix epoch seconds.
    pub created_at: u64,
}
