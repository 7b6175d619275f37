//! Revenue aggregation.
//!
//! Classified transactions are folded into per-film buckets, per-block
//! buckets, festival sectors and top-level totals. Every map is a
//! `BTreeMap`, and addition is the only operation, so the result does not
//! depend on transaction order and two partial summaries can be merged.

use std::collections::BTreeMap;

use marquee_types::report::CategoryTotals;
use marquee_types::revenue::Sector;
use marquee_types::{Category, ClassifiedTransaction, MinorUnits, RawPayment};
use serde::Serialize;
use tracing::{debug, warn};

use crate::classify::NoteClassifier;
use crate::{add, Result};

/// Gross revenue of one entity, by category.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RevenueBucket {
    pub gross_by_category: BTreeMap<Category, MinorUnits>,
}

impl RevenueBucket {
    fn credit(&mut self, category: Category, amount: MinorUnits) -> Result<()> {
        let slot = self.gross_by_category.entry(category).or_insert(0);
        *slot = add(*slot, amount)?;
        Ok(())
    }

    pub fn gross(&self) -> Result<MinorUnits> {
        self.gross_by_category
            .values()
            .try_fold(0, |acc, v| add(acc, *v))
    }

    fn merge(&mut self, other: RevenueBucket) -> Result<()> {
        for (category, amount) in other.gross_by_category {
            self.credit(category, amount)?;
        }
        Ok(())
    }
}

/// Aggregated revenue for one feed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RevenueSummary {
    /// Keyed by film title.
    pub films: BTreeMap<String, RevenueBucket>,
    /// Keyed by block title.
    pub blocks: BTreeMap<String, RevenueBucket>,
    pub sectors: BTreeMap<Sector, MinorUnits>,
    pub totals: CategoryTotals,
    pub by_category: BTreeMap<Category, MinorUnits>,
    pub transaction_count: u64,
}

impl RevenueSummary {
    /// Gross revenue of one sector.
    pub fn sector(&self, sector: Sector) -> MinorUnits {
        self.sectors.get(&sector).copied().unwrap_or(0)
    }

    fn credit(&mut self, tx: &ClassifiedTransaction) -> Result<()> {
        let amount = tx.amount;

        if let Some(key) = &tx.entity_key {
            if tx.category.is_film_scoped() {
                self.films
                    .entry(key.clone())
                    .or_default()
                    .credit(tx.category, amount)?;
            } else if tx.category == Category::Block {
                self.blocks
                    .entry(key.clone())
                    .or_default()
                    .credit(tx.category, amount)?;
            }
        }

        if let Some(sector) = tx.category.sector() {
            let slot = self.sectors.entry(sector).or_insert(0);
            *slot = add(*slot, amount)?;
        }

        let slot = self.by_category.entry(tx.category).or_insert(0);
        *slot = add(*slot, amount)?;

        let totals = &mut self.totals;
        match tx.category {
            Category::Donation => totals.donations = add(totals.donations, amount)?,
            Category::Ticket => totals.tickets = add(totals.tickets, amount)?,
            Category::Pass | Category::FestivalPass | Category::Block => {
                totals.festival = add(totals.festival, amount)?
            }
            Category::Movie => totals.direct_sales = add(totals.direct_sales, amount)?,
            Category::Other | Category::Unknown => {
                totals.unattributed = add(totals.unattributed, amount)?
            }
        }
        totals.grand_total = add(totals.grand_total, amount)?;

        self.transaction_count += 1;
        Ok(())
    }

    /// Combine two partial summaries.
    pub fn merge(mut self, other: RevenueSummary) -> Result<RevenueSummary> {
        for (title, bucket) in other.films {
            self.films.entry(title).or_default().merge(bucket)?;
        }
        for (title, bucket) in other.blocks {
            self.blocks.entry(title).or_default().merge(bucket)?;
        }
        for (sector, amount) in other.sectors {
            let slot = self.sectors.entry(sector).or_insert(0);
            *slot = add(*slot, amount)?;
        }
        for (category, amount) in other.by_category {
            let slot = self.by_category.entry(category).or_insert(0);
            *slot = add(*slot, amount)?;
        }

        let a = &mut self.totals;
        let b = other.totals;
        a.donations = add(a.donations, b.donations)?;
        a.tickets = add(a.tickets, b.tickets)?;
        a.festival = add(a.festival, b.festival)?;
        a.direct_sales = add(a.direct_sales, b.direct_sales)?;
        a.unattributed = add(a.unattributed, b.unattributed)?;
        a.grand_total = add(a.grand_total, b.grand_total)?;

        self.transaction_count = self
            .transaction_count
            .checked_add(other.transaction_count)
            .ok_or(crate::RevenueError::Overflow)?;
        Ok(self)
    }
}

/// Incremental folder over classified transactions.
#[derive(Debug, Default)]
pub struct Aggregator {
    summary: RevenueSummary,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tx: &ClassifiedTransaction) -> Result<()> {
        self.summary.credit(tx)
    }

    pub fn finish(self) -> RevenueSummary {
        self.summary
    }
}

/// Aggregate a set of classified transactions.
pub fn aggregate<'a, I>(transactions: I) -> Result<RevenueSummary>
where
    I: IntoIterator<Item = &'a ClassifiedTransaction>,
{
    let mut aggregator = Aggregator::new();
    for tx in transactions {
        aggregator.push(tx)?;
    }
    Ok(aggregator.finish())
}

/// Classify and aggregate gateway payments, skipping unsettled ones.
pub fn aggregate_payments(
    classifier: &NoteClassifier,
    payments: &[RawPayment],
) -> Result<RevenueSummary> {
    let mut aggregator = Aggregator::new();
    let mut skipped = 0usize;
    for payment in payments {
        if !payment.is_settled() {
            warn!(payment_id = %payment.id, status = ?payment.status, "skipping unsettled payment");
            skipped += 1;
            continue;
        }
        aggregator.push(&classifier.classify_payment(payment))?;
    }
    let summary = aggregator.finish();
    debug!(
        transactions = summary.transaction_count,
        skipped,
        grand_total = summary.totals.grand_total,
        "payments aggregated"
    );
    Ok(summary)
}
