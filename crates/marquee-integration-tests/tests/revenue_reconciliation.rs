//! Integration test: purchases reconcile into the analytics report.
//!
//! Exercises the full loop:
//! 1. Run purchases through the checkout flow against the stub gateway
//! 2. Read the gateway feed back since the ledger epoch
//! 3. Classify, aggregate and split the feed
//! 4. Join with payout history into the ledger
//!
//! Every memo the checkout writes must classify back into the category
//! the purchase was for.

use std::sync::Arc;

use marquee_db::queries::{catalog, payouts, users};
use marquee_gateway::feed::{fetch_all, FeedRequest};
use marquee_gateway::stub::StubGateway;
use marquee_integration_tests::{
    epoch, payment, request, seeded_store, Checkout, IN_WINDOW, LEDGER_EPOCH,
};
use marquee_revenue::classify::NoteClassifier;
use marquee_revenue::report::{build_report, source_error, FeedSnapshot, ReportRequest, StoreSnapshot};
use marquee_revenue::splits::{ShareRatio, SplitConfig};
use marquee_types::catalog::User;
use marquee_types::report::{AnalyticsReport, DataSource};
use marquee_types::{Category, PayoutRecord, PayoutStatus};

fn payout(recipient: &str, amount: u64, status: PayoutStatus) -> PayoutRecord {
    PayoutRecord {
        recipient: recipient.to_string(),
        amount,
        timestamp: 1_727_950_000,
        status,
    }
}

async fn store_snapshot(checkout: &Checkout) -> StoreSnapshot {
    let conn = checkout.store.lock().await;
    StoreSnapshot {
        movies: catalog::list_movies(&conn).expect("movies should list"),
        blocks: catalog::list_blocks(&conn).expect("blocks should list"),
        payouts: payouts::list(&conn, None, None).expect("payouts should list"),
        user_count: users::count(&conn).expect("users should count"),
    }
}

async fn report_for(
    checkout: &Checkout,
    recipient: Option<&str>,
    splits: SplitConfig,
) -> AnalyticsReport {
    let feed = fetch_all(checkout.gateway.as_ref(), &FeedRequest::new(epoch()))
        .await
        .expect("feed should be readable");
    let snapshot = FeedSnapshot {
        payments: feed.payments,
        truncation: feed.truncation_error.filter(|_| feed.truncated),
        rejected: feed.rejected,
    };
    let request = ReportRequest {
        generated_at: IN_WINDOW + 3600,
        since: LEDGER_EPOCH,
        recipient,
        splits,
    };
    build_report(
        &NoteClassifier::new(),
        &request,
        Ok(snapshot),
        Ok(store_snapshot(checkout).await),
    )
    .expect("report should build")
}

/// Runs the storefront purchases used by the scenarios below.
async fn run_purchases(checkout: &Checkout) {
    let flow = &checkout.flow;

    flow.purchase(&request("watch_party_ticket", Some("m2"), None))
        .await
        .expect("ticket purchase should succeed");
    flow.purchase(&request("block_unlock", Some("b1"), None))
        .await
        .expect("block unlock should succeed");

    let mut donation = request("donation", Some("m1"), None);
    donation.amount = Some(500);
    flow.purchase(&donation).await.expect("donation should succeed");

    flow.purchase(&request("festival_pass", None, None))
        .await
        .expect("festival pass should succeed");
    flow.purchase(&request("movie_purchase", Some("m1"), Some("FEST25")))
        .await
        .expect("discounted purchase should succeed");

    let mut deposit = request("savings_deposit", None, None);
    deposit.amount = Some(300);
    flow.purchase(&deposit).await.expect("deposit should succeed");

    let waived = flow
        .purchase(&request("rental", Some("m2"), Some("FREEPASS")))
        .await
        .expect("waived rental should succeed");
    assert_eq!(waived.charged, 0, "one-time access must waive the rental");
}

fn seeded_checkout() -> Checkout {
    let conn = seeded_store();
    payouts::insert(&conn, &payout("Ada Reyes", 200, PayoutStatus::Completed))
        .expect("payout insert should succeed");
    payouts::insert(&conn, &payout("Sam Ito", 100, PayoutStatus::Pending))
        .expect("payout insert should succeed");
    users::insert(
        &conn,
        &User {
            id: "u1".to_string(),
            email: "viewer@example.com".to_string(),
            created_at: 1_725_000_000,
        },
    )
    .expect("user insert should succeed");

    Checkout::new(conn, Arc::new(StubGateway::with_page_size(2)))
}

#[tokio::test]
async fn checkout_memos_classify_back() {
    let checkout = seeded_checkout();
    run_purchases(&checkout).await;

    let classifier = NoteClassifier::new();
    let categories: Vec<(Category, Option<String>)> = checkout
        .gateway
        .payments()
        .await
        .iter()
        .map(|p| {
            let c = classifier.classify(&p.memo);
            (c.category, c.entity_key)
        })
        .collect();

    // The waived rental never reached the gateway.
    assert_eq!(
        categories,
        vec![
            (Category::Ticket, Some("Echoes".to_string())),
            (Category::Block, Some("Indie Block".to_string())),
            (Category::Donation, Some("Nightfall".to_string())),
            (Category::FestivalPass, None),
            (Category::Movie, Some("Nightfall".to_string())),
            (Category::Other, None),
        ]
    );
}

#[tokio::test]
async fn purchases_reconcile_into_report() {
    let checkout = seeded_checkout();

    // A payment from before the ledger epoch and a failed one must not count.
    checkout
        .gateway
        .add_payment(payment("old", "Rental: Echoes", 399, LEDGER_EPOCH - 60))
        .await;
    let mut failed = payment("failed", "Rental: Echoes", 399, IN_WINDOW);
    failed.status = Some("FAILED".to_string());
    checkout.gateway.add_payment(failed).await;

    run_purchases(&checkout).await;

    let report = report_for(&checkout, None, SplitConfig::default()).await;
    assert!(report.complete, "no source failed: {:?}", report.errors);
    assert_eq!(report.user_count, Some(1));

    // =========================================================
    // Totals partition the grand total
    // =========================================================
    let totals = report.totals.expect("totals section");
    assert_eq!(totals.donations, 500);
    assert_eq!(totals.tickets, 500);
    assert_eq!(totals.festival, 3500);
    assert_eq!(totals.direct_sales, 975, "FEST25 takes 25% off 1299");
    assert_eq!(totals.unattributed, 300);
    assert_eq!(totals.grand_total, 5775);

    // =========================================================
    // Sectors and rows
    // =========================================================
    let sectors = report.sectors.expect("sectors section");
    assert_eq!(sectors.party.gross, 500);
    assert_eq!(sectors.block.gross, 1000);
    assert_eq!(sectors.pass.gross, 2500);
    assert_eq!(sectors.pass.net, 1750);

    let blocks = report.blocks.expect("blocks section");
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].title, "Indie Block");
    assert_eq!(blocks[0].figures.gross, 1000, "only block revenue lands in the block row");
    assert_eq!(blocks[0].films, vec!["Nightfall".to_string(), "Echoes".to_string()]);

    let films = report.films.expect("films section");
    let titles: Vec<&str> = films.iter().map(|f| f.title.as_str()).collect();
    assert_eq!(titles, vec!["Echoes", "Nightfall"]);

    let echoes = &films[0];
    assert_eq!(echoes.filmmaker.as_deref(), Some("Sam Ito"));
    assert_eq!(echoes.figures.gross, 500);
    assert_eq!(echoes.figures.net, 350);

    let nightfall = &films[1];
    assert_eq!(nightfall.figures.gross, 1475);
    // 350 from the donation, 682 from the 975 sale.
    assert_eq!(nightfall.figures.net, 1032);

    for row in &films {
        assert_eq!(
            row.figures.net + row.figures.platform_cut,
            row.figures.gross,
            "film row {} must conserve",
            row.title
        );
    }

    // =========================================================
    // Ledger
    // =========================================================
    let ledger = report.ledger.expect("ledger section");
    let ada = ledger
        .entries
        .iter()
        .find(|e| e.recipient == "Ada Reyes")
        .expect("Ada Reyes entry");
    assert_eq!(ada.earned, Some(1032));
    assert_eq!(ada.paid_out, 200);
    assert_eq!(ada.balance, Some(832));

    let sam = ledger
        .entries
        .iter()
        .find(|e| e.recipient == "Sam Ito")
        .expect("Sam Ito entry");
    assert_eq!(sam.pending, 100);
    assert_eq!(sam.balance, Some(350), "pending payouts do not reduce the balance");

    // Films 350 + 1032, pass 1750, block 700, minus 200 paid.
    assert_eq!(ledger.outstanding_balance, Some(3632));
}

#[tokio::test]
async fn recipient_report_and_overrides() {
    let checkout = seeded_checkout();
    run_purchases(&checkout).await;

    let splits = SplitConfig {
        party_override: Some(ShareRatio::from_bps(5000).expect("valid ratio")),
        ..SplitConfig::default()
    };
    let report = report_for(&checkout, Some("Sam Ito"), splits).await;

    let ledger = report.ledger.expect("ledger section");
    assert_eq!(ledger.recipient.as_deref(), Some("Sam Ito"));
    assert_eq!(ledger.entries.len(), 1);
    // The watch-party ticket follows the party ratio inside the film row.
    assert_eq!(ledger.outstanding_balance, Some(250));
    assert_eq!(report.sectors.expect("sectors").party.net, 250);
}

#[tokio::test]
async fn gateway_outage_keeps_store_sections() {
    let checkout = seeded_checkout();
    run_purchases(&checkout).await;
    checkout.gateway.fail_pages_from(0).await;

    let feed = fetch_all(checkout.gateway.as_ref(), &FeedRequest::new(epoch())).await;
    let err = feed.expect_err("first page failure must fail the feed");

    let request = ReportRequest {
        generated_at: IN_WINDOW,
        since: LEDGER_EPOCH,
        recipient: None,
        splits: SplitConfig::default(),
    };
    let report = build_report(
        &NoteClassifier::new(),
        &request,
        Err(source_error(DataSource::Gateway, "unreachable", err.to_string())),
        Ok(store_snapshot(&checkout).await),
    )
    .expect("report should build");

    assert!(!report.complete);
    assert_eq!(report.errors.len(), 1);
    assert!(report.films.is_none());
    assert_eq!(report.user_count, Some(1));

    // Payout history does not depend on the feed.
    let ledger = report.ledger.expect("payout-only ledger");
    assert!(ledger.outstanding_balance.is_none());
    let ada = ledger
        .entries
        .iter()
        .find(|e| e.recipient == "Ada Reyes")
        .expect("Ada Reyes entry");
    assert_eq!(ada.paid_out, 200);
    assert!(ada.balance.is_none());
    let sam = ledger
        .entries
        .iter()
        .find(|e| e.recipient == "Sam Ito")
        .expect("Sam Ito entry");
    assert_eq!(sam.pending, 100);
}

#[tokio::test]
async fn truncated_feed_keeps_earlier_pages() {
    let checkout = seeded_checkout();
    run_purchases(&checkout).await;
    // Page size 2: pages 0 and 1 hold the first four payments.
    checkout.gateway.fail_pages_from(2).await;

    let report = report_for(&checkout, None, SplitConfig::default()).await;
    assert!(!report.complete);
    assert_eq!(report.errors[0].kind, "truncated");
    assert_eq!(report.transaction_count, Some(4));
    assert_eq!(report.totals.expect("totals").grand_total, 500 + 1000 + 500 + 2500);
}
