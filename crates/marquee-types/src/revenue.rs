//! Revenue categories and classified transactions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{MinorUnits, ParseError};

/// Revenue category inferred from a payment memo.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ts_rs::TS,
)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Donation,
    Ticket,
    Pass,
    Block,
    FestivalPass,
    Movie,
    /// Memo present but not recognised.
    Other,
    /// Memo empty.
    Unknown,
}

/// Festival-wide revenue sector, not tied to one film.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ts_rs::TS,
)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    /// All-access, subscription and festival passes.
    Pass,
    /// Per-block unlocks.
    Block,
    /// Watch-party tickets.
    Party,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Donation,
        Category::Ticket,
        Category::Pass,
        Category::Block,
        Category::FestivalPass,
        Category::Movie,
        Category::Other,
        Category::Unknown,
    ];

    /// Wire name, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Donation => "donation",
            Category::Ticket => "ticket",
            Category::Pass => "pass",
            Category::Block => "block",
            Category::FestivalPass => "festivalPass",
            Category::Movie => "movie",
            Category::Other => "other",
            Category::Unknown => "unknown",
        }
    }

    /// The festival sector this category rolls up into, if any.
    pub fn sector(self) -> Option<Sector> {
        match self {
            Category::Pass | Category::FestivalPass => Some(Sector::Pass),
            Category::Block => Some(Sector::Block),
            Category::Ticket => Some(Sector::Party),
            _ => None,
        }
    }

    /// Whether revenue in this category is attributed to a single film.
    pub fn is_film_scoped(self) -> bool {
        matches!(self, Category::Donation | Category::Ticket | Category::Movie)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ParseError::new("category", s))
    }
}

impl Sector {
    pub fn as_str(self) -> &'static str {
        match self {
            Sector::Pass => "pass",
            Sector::Block => "block",
            Sector::Party => "party",
        }
    }
}

/// A payment after memo classification. Derived per request, never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedTransaction {
    pub category: Category,
    /// Film or block title, trimmed. Compared by exact string equality.
    pub entity_key: Option<String>,
    pub amount: MinorUnits,
}
