//! Gateway payment records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::MinorUnits;

/// A payment as reported by the gateway feed. Never mutated by this system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPayment {
    /// Gateway payment id.
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub amount: MinorUnits,
    /// Free-text memo attached at charge time. Empty when absent.
    pub memo: String,
    pub location_id: Option<String>,
    /// Gateway status string (`COMPLETED`, `FAILED`, ...). `None` when the
    /// gateway omitted it.
    pub status: Option<String>,
}

impl RawPayment {
    /// Whether the payment represents captured money.
    ///
    /// Payments without a status are treated as settled.
    pub fn is_settled(&self) -> bool {
        match self.status.as_deref() {
            None => true,
            Some(s) => s.eq_ignore_ascii_case("COMPLETED"),
        }
    }
}
