//! Analytics report assembly.
//!
//! The report joins two independent sources: the gateway feed and a store
//! snapshot. Either may fail. Sections that depend on a failed source are
//! `None` and the failure is described in `errors`; the rest of the report
//! is still populated. The ledger only needs the feed for earnings: with
//! the feed down it still reports paid and pending amounts.

use std::collections::HashMap;

use marquee_types::catalog::{FestivalBlock, Movie};
use marquee_types::report::{AnalyticsReport, BlockRow, DataSource, SourceError};
use marquee_types::{PayoutRecord, RawPayment};
use tracing::info;

use crate::aggregate::aggregate_payments;
use crate::classify::NoteClassifier;
use crate::ledger::{ledger_section, payout_ledger};
use crate::splits::{net_report, SplitConfig};
use crate::Result;

/// Payments read from the gateway.
#[derive(Clone, Debug, Default)]
pub struct FeedSnapshot {
    pub payments: Vec<RawPayment>,
    /// Set when pagination stopped early.
    pub truncation: Option<String>,
    /// Malformed records the gateway sent and the feed skipped.
    pub rejected: usize,
}

/// Persisted state read for one report.
#[derive(Clone, Debug, Default)]
pub struct StoreSnapshot {
    pub movies: Vec<Movie>,
    pub blocks: Vec<FestivalBlock>,
    pub payouts: Vec<PayoutRecord>,
    pub user_count: u64,
}

impl StoreSnapshot {
    /// Film title to filmmaker.
    fn filmmakers(&self) -> HashMap<String, String> {
        self.movies
            .iter()
            .filter_map(|m| m.filmmaker.clone().map(|f| (m.title.clone(), f)))
            .collect()
    }

    fn known_recipients(&self) -> impl Iterator<Item = &str> {
        self.movies.iter().filter_map(|m| m.filmmaker.as_deref())
    }

    /// Attach catalog film lists to block rows, adding a zero row for every
    /// catalog block without sales.
    fn annotate_blocks(&self, rows: &mut Vec<BlockRow>) {
        let titles: HashMap<&str, &str> = self
            .movies
            .iter()
            .map(|m| (m.id.as_str(), m.title.as_str()))
            .collect();
        for block in &self.blocks {
            let films = block
                .film_ids
                .iter()
                .filter_map(|id| titles.get(id.as_str()).map(|t| t.to_string()))
                .collect();
            match rows.iter_mut().find(|row| row.title == block.title) {
                Some(row) => row.films = films,
                None => rows.push(BlockRow {
                    title: block.title.clone(),
                    films,
                    figures: Default::default(),
                }),
            }
        }
        rows.sort_by(|a, b| a.title.cmp(&b.title));
    }
}

/// Inputs of one report.
pub struct ReportRequest<'a> {
    /// Unix epoch seconds.
    pub generated_at: i64,
    /// Ledger epoch, Unix epoch seconds.
    pub since: i64,
    pub recipient: Option<&'a str>,
    pub splits: SplitConfig,
}

pub fn source_error(source: DataSource, kind: &str, message: impl Into<String>) -> SourceError {
    SourceError {
        source,
        kind: kind.to_string(),
        message: message.into(),
    }
}

/// Build the report from whatever sources succeeded.
///
/// # Errors
///
/// - [`crate::RevenueError::Overflow`] if any sum overflows
pub fn build_report(
    classifier: &NoteClassifier,
    request: &ReportRequest<'_>,
    feed: std::result::Result<FeedSnapshot, SourceError>,
    store: std::result::Result<StoreSnapshot, SourceError>,
) -> Result<AnalyticsReport> {
    let mut report = AnalyticsReport {
        generated_at: request.generated_at,
        since: request.since,
        films: None,
        blocks: None,
        sectors: None,
        totals: None,
        ledger: None,
        user_count: None,
        transaction_count: None,
        complete: true,
        errors: Vec::new(),
    };

    let store = match store {
        Ok(snapshot) => {
            report.user_count = Some(snapshot.user_count);
            Some(snapshot)
        }
        Err(e) => {
            report.errors.push(e);
            None
        }
    };

    let feed = match feed {
        Ok(feed) => {
            if let Some(reason) = &feed.truncation {
                report
                    .errors
                    .push(source_error(DataSource::Gateway, "truncated", reason.clone()));
            }
            if feed.rejected > 0 {
                report.errors.push(source_error(
                    DataSource::Gateway,
                    "rejected",
                    format!("{} malformed payment records skipped", feed.rejected),
                ));
            }
            Some(feed)
        }
        Err(e) => {
            report.errors.push(e);
            None
        }
    };

    match (&feed, &store) {
        (Some(feed), store) => {
            let summary = aggregate_payments(classifier, &feed.payments)?;
            let filmmakers = store.as_ref().map(StoreSnapshot::filmmakers).unwrap_or_default();
            let mut net = net_report(&summary, &request.splits, &filmmakers)?;

            if let Some(store) = store {
                report.ledger = Some(ledger_section(
                    &net,
                    &store.payouts,
                    store.known_recipients(),
                    request.recipient,
                )?);
                store.annotate_blocks(&mut net.blocks);
            }

            report.transaction_count = Some(net.transaction_count);
            report.totals = Some(net.totals);
            report.sectors = Some(net.sectors);
            report.films = Some(net.films);
            report.blocks = Some(net.blocks);
        }
        (None, Some(store)) => {
            report.ledger = Some(payout_ledger(
                &store.payouts,
                store.known_recipients(),
                request.recipient,
            )?);
        }
        (None, None) => {}
    }

    report.complete = report.errors.is_empty();

    info!(
        complete = report.complete,
        errors = report.errors.len(),
        transactions = ?report.transaction_count,
        "analytics report built"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use marquee_types::catalog::FestivalBlock;
    use marquee_types::PayoutStatus;

    fn payment(id: &str, memo: &str, amount: u64) -> RawPayment {
        RawPayment {
            id: id.to_string(),
            created_at: DateTime::from_timestamp(1_727_893_800, 0).expect("timestamp"),
            amount,
            memo: memo.to_string(),
            location_id: None,
            status: Some("COMPLETED".to_string()),
        }
    }

    fn movie(title: &str, filmmaker: &str) -> Movie {
        Movie {
            id: title.to_lowercase(),
            title: title.to_string(),
            filmmaker: Some(filmmaker.to_string()),
            sale_price: Some(399),
            watch_party_price: Some(500),
        }
    }

    fn request() -> ReportRequest<'static> {
        ReportRequest {
            generated_at: 1_728_000_000,
            since: 1_725_148_800,
            recipient: None,
            splits: SplitConfig::default(),
        }
    }

    fn feed() -> FeedSnapshot {
        FeedSnapshot {
            payments: vec![
                payment("p1", r#"Support for film: "Nightfall""#, 500),
                payment("p2", "Watch Party Ticket: Echoes", 500),
                payment("p3", r#"Unlock Block: "Indie Block""#, 1000),
                payment("p4", "", 40),
            ],
            truncation: None,
            rejected: 0,
        }
    }

    fn store() -> StoreSnapshot {
        StoreSnapshot {
            movies: vec![movie("Nightfall", "Ada Reyes"), movie("Echoes", "Sam Ito")],
            blocks: vec![
                FestivalBlock {
                    id: "b1".to_string(),
                    title: "Indie Block".to_string(),
                    price: Some(1000),
                    film_ids: vec!["nightfall".to_string(), "retired".to_string()],
                },
                FestivalBlock {
                    id: "b2".to_string(),
                    title: "Late Shorts".to_string(),
                    price: Some(800),
                    film_ids: vec!["echoes".to_string()],
                },
            ],
            payouts: vec![
                PayoutRecord {
                    recipient: "Ada Reyes".to_string(),
                    amount: 100,
                    timestamp: 1_727_950_000,
                    status: PayoutStatus::Completed,
                },
                PayoutRecord {
                    recipient: "Sam Ito".to_string(),
                    amount: 60,
                    timestamp: 1_727_960_000,
                    status: PayoutStatus::Pending,
                },
            ],
            user_count: 12,
        }
    }

    #[test]
    fn test_full_report() {
        let report = build_report(&NoteClassifier::new(), &request(), Ok(feed()), Ok(store()))
            .expect("report");

        assert!(report.complete);
        assert!(report.errors.is_empty());
        assert_eq!(report.user_count, Some(12));
        assert_eq!(report.transaction_count, Some(4));

        let totals = report.totals.expect("totals");
        assert_eq!(totals.grand_total, 2040);
        assert_eq!(totals.unattributed, 40);

        let films = report.films.expect("films");
        let nightfall = films.iter().find(|f| f.title == "Nightfall").expect("nightfall");
        assert_eq!(nightfall.figures.net, 350);
        assert_eq!(nightfall.figures.platform_cut, 150);

        let ledger = report.ledger.expect("ledger");
        let ada = ledger
            .entries
            .iter()
            .find(|e| e.recipient == "Ada Reyes")
            .expect("ada");
        assert_eq!(ada.balance, Some(250));
        assert_eq!(ledger.outstanding_balance, Some(1300));
    }

    #[test]
    fn test_blocks_carry_catalog_films() {
        let report = build_report(&NoteClassifier::new(), &request(), Ok(feed()), Ok(store()))
            .expect("report");

        let blocks = report.blocks.expect("blocks");
        let titles: Vec<&str> = blocks.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Indie Block", "Late Shorts"]);

        assert_eq!(blocks[0].films, vec!["Nightfall".to_string()]);
        assert_eq!(blocks[0].figures.gross, 1000);
        assert_eq!(blocks[1].films, vec!["Echoes".to_string()]);
        assert_eq!(blocks[1].figures.gross, 0, "unsold block reported at zero");
    }

    #[test]
    fn test_gateway_failure_keeps_store_sections() {
        let err = source_error(DataSource::Gateway, "unreachable", "connection refused");
        let report = build_report(&NoteClassifier::new(), &request(), Err(err), Ok(store()))
            .expect("report");

        assert!(!report.complete);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].source, DataSource::Gateway);
        assert!(report.films.is_none());
        assert!(report.totals.is_none());
        assert_eq!(report.user_count, Some(12));

        let ledger = report.ledger.expect("payout-only ledger");
        assert!(ledger.outstanding_balance.is_none());
        let ada = ledger
            .entries
            .iter()
            .find(|e| e.recipient == "Ada Reyes")
            .expect("ada");
        assert_eq!(ada.paid_out, 100);
        assert!(ada.earned.is_none());
        assert!(ada.balance.is_none());
        let sam = ledger
            .entries
            .iter()
            .find(|e| e.recipient == "Sam Ito")
            .expect("sam");
        assert_eq!(sam.pending, 60);
    }

    #[test]
    fn test_both_sources_down() {
        let report = build_report(
            &NoteClassifier::new(),
            &request(),
            Err(source_error(DataSource::Gateway, "timeout", "timed out")),
            Err(source_error(DataSource::Store, "unavailable", "database locked")),
        )
        .expect("report");

        assert!(!report.complete);
        assert_eq!(report.errors.len(), 2);
        assert!(report.ledger.is_none());
        assert!(report.films.is_none());
    }

    #[test]
    fn test_store_failure_keeps_feed_sections() {
        let err = source_error(DataSource::Store, "unavailable", "database locked");
        let report = build_report(&NoteClassifier::new(), &request(), Ok(feed()), Err(err))
            .expect("report");

        assert!(!report.complete);
        assert!(report.ledger.is_none());
        assert!(report.user_count.is_none());
        let films = report.films.expect("films");
        assert!(films.iter().all(|f| f.filmmaker.is_none()));
        assert_eq!(report.sectors.expect("sectors").block.gross, 1000);
    }

    #[test]
    fn test_truncated_feed_marks_incomplete() {
        let mut partial = feed();
        partial.truncation = Some("page 3 timed out".to_string());
        let report = build_report(&NoteClassifier::new(), &request(), Ok(partial), Ok(store()))
            .expect("report");

        assert!(!report.complete);
        assert_eq!(report.errors[0].kind, "truncated");
        assert!(report.films.is_some());
        assert!(report.ledger.is_some());
    }

    #[test]
    fn test_rejected_records_reported() {
        let mut partial = feed();
        partial.rejected = 2;
        let report = build_report(&NoteClassifier::new(), &request(), Ok(partial), Ok(store()))
            .expect("report");

        assert!(!report.complete);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, "rejected");
        assert!(report.errors[0].message.starts_with("2 "));
        assert_eq!(report.totals.expect("totals").grand_total, 2040);
    }
}
