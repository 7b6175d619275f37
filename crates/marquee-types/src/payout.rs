//! Payout history records.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{MinorUnits, ParseError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    /// Finalized. The only status that counts against a balance.
    Completed,
    Failed,
}

impl PayoutStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Completed => "completed",
            PayoutStatus::Failed => "failed",
        }
    }
}

impl FromStr for PayoutStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PayoutStatus::Pending),
            "completed" => Ok(PayoutStatus::Completed),
            "failed" => Ok(PayoutStatus::Failed),
            other => Err(ParseError::new("payout status", other)),
        }
    }
}

/// An append-only payout record written by the payout-approval collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub recipient: String,
    pub amount: MinorUnits,
    /// Unix epoch seconds.
    pub timestamp: u64,
    pub status: PayoutStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip_names() {
        for status in [PayoutStatus::Pending, PayoutStatus::Completed, PayoutStatus::Failed] {
            assert_eq!(status.as_str().parse::<PayoutStatus>().expect("parse"), status);
        }
        assert!("COMPLETED".parse::<PayoutStatus>().is_err());
    }
}
