//! Response shapes returned to the admin console.
//!
//! The analytics report is an explicit record with optional sections. A
//! section is `None` when the data source it depends on failed; `errors`
//! then carries one descriptor per failed source.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AccessType, Category, MinorUnits};

/// Gross amount with its partner/platform split applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
pub struct SplitFigures {
    pub gross: MinorUnits,
    /// Partner (content owner) share.
    pub net: MinorUnits,
    pub platform_cut: MinorUnits,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
pub struct FilmRow {
    pub title: String,
    pub filmmaker: Option<String>,
    pub gross_by_category: BTreeMap<Category, MinorUnits>,
    #[serde(flatten)]
    pub figures: SplitFigures,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
pub struct BlockRow {
    pub title: String,
    /// Titles of the films the block unlocks, from the catalog.
    #[serde(default)]
    pub films: Vec<String>,
    #[serde(flatten)]
    pub figures: SplitFigures,
}

/// Festival-wide sectors.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
pub struct SectorRows {
    pub pass: SplitFigures,
    pub block: SplitFigures,
    pub party: SplitFigures,
}

/// Top-level running totals. The first five fields partition `grand_total`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
pub struct CategoryTotals {
    pub donations: MinorUnits,
    pub tickets: MinorUnits,
    /// Passes, festival passes and block unlocks.
    pub festival: MinorUnits,
    /// Direct movie purchases and rentals.
    pub direct_sales: MinorUnits,
    /// `other` and `unknown` transactions.
    pub unattributed: MinorUnits,
    pub grand_total: MinorUnits,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
pub struct LedgerEntry {
    pub recipient: String,
    /// `None` when the payment feed was unavailable.
    pub earned: Option<MinorUnits>,
    pub paid_out: MinorUnits,
    /// Sum of payouts not yet finalized. Informational only.
    pub pending: MinorUnits,
    /// `None` when the payment feed was unavailable.
    pub balance: Option<MinorUnits>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
pub struct LedgerSection {
    pub recipient: Option<String>,
    pub entries: Vec<LedgerEntry>,
    /// `None` when the payment feed was unavailable.
    pub outstanding_balance: Option<MinorUnits>,
}

/// Which data source a failure came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Gateway,
    Store,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
pub struct SourceError {
    pub source: DataSource,
    /// Machine-readable kind (`unreachable`, `truncated`, `unavailable`, ...).
    pub kind: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
pub struct AnalyticsReport {
    /// Unix epoch seconds.
    pub generated_at: i64,
    /// Ledger epoch the feed was read from, Unix epoch seconds.
    pub since: i64,
    pub films: Option<Vec<FilmRow>>,
    pub blocks: Option<Vec<BlockRow>>,
    pub sectors: Option<SectorRows>,
    pub totals: Option<CategoryTotals>,
    pub ledger: Option<LedgerSection>,
    pub user_count: Option<u64>,
    pub transaction_count: Option<u64>,
    /// False when any source failed or the feed was truncated.
    pub complete: bool,
    pub errors: Vec<SourceError>,
}

/// Result of the charge step of a purchase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChargeOutcome {
    Charged { payment_id: String },
    /// Nothing to charge; the gateway was not called.
    Waived,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
pub struct PurchaseReceipt {
    pub access_type: AccessType,
    pub item_id: Option<String>,
    pub list_price: MinorUnits,
    pub charged: MinorUnits,
    pub promo_code: Option<String>,
    pub outcome: ChargeOutcome,
    pub idempotency_key: String,
    /// True once a promo use was recorded. False without a code, or when the
    /// commit failed after the charge went through.
    pub promo_committed: bool,
}
