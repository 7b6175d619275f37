//! Promo codes and their usage quota.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ParseError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoType {
    /// Waives the whole price; no gateway charge is made.
    OneTimeAccess,
    /// Percentage off the resolved price.
    Discount,
}

impl PromoType {
    pub fn as_str(self) -> &'static str {
        match self {
            PromoType::OneTimeAccess => "one_time_access",
            PromoType::Discount => "discount",
        }
    }
}

impl FromStr for PromoType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one_time_access" => Ok(PromoType::OneTimeAccess),
            "discount" => Ok(PromoType::Discount),
            other => Err(ParseError::new("promo type", other)),
        }
    }
}

/// A persisted promo code. `code` is a case-insensitive key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoCode {
    pub code: String,
    pub promo_type: PromoType,
    /// Percentage off for [`PromoType::Discount`] codes.
    pub discount_value: Option<u32>,
    pub max_uses: u32,
    pub used_count: u32,
}

/// Lifecycle of a code. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoState {
    Unused,
    Active,
    Exhausted,
}

impl PromoCode {
    /// Uses left before the code is exhausted.
    pub fn remaining_uses(&self) -> u32 {
        self.max_uses.saturating_sub(self.used_count)
    }

    pub fn state(&self) -> PromoState {
        PromoState::of(self)
    }
}

impl PromoState {
    pub fn of(code: &PromoCode) -> Self {
        if code.used_count >= code.max_uses {
            PromoState::Exhausted
        } else if code.used_count == 0 {
            PromoState::Unused
        } else {
            PromoState::Active
        }
    }
}
