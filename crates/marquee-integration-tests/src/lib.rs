//! Integration tests for the Marquee workspace.
//!
//! The library holds shared fixtures: a seeded in-memory store and payment
//! builders. The scenarios under `tests/` run purchases and analytics
//! reports end to end against the in-memory gateway.
//!
//! ```sh
//! cargo test -p marquee-integration-tests
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use marquee_checkout::pricing::{PricingResolver, PricingTable};
use marquee_checkout::purchase::{PurchaseFlow, PurchaseRequest};
use marquee_db::queries::{catalog, promos};
use marquee_gateway::charge::ChargeSubmitter;
use marquee_gateway::stub::StubGateway;
use marquee_types::catalog::{FestivalBlock, Movie};
use marquee_types::promo::{PromoCode, PromoType};
use marquee_types::{MinorUnits, RawPayment};
use rusqlite::Connection;
use tokio::sync::Mutex;

/// 2024-09-01T00:00:00Z.
pub const LEDGER_EPOCH: i64 = 1_725_148_800;

/// A moment inside the ledger window.
pub const IN_WINDOW: i64 = 1_727_893_800;

/// Timestamp used for seeded rows.
pub const SEEDED_AT: u64 = 1_725_000_000;

pub fn epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(LEDGER_EPOCH, 0).unwrap_or_default()
}

/// A completed gateway payment.
pub fn payment(id: &str, memo: &str, amount: MinorUnits, created_at: i64) -> RawPayment {
    RawPayment {
        id: id.to_string(),
        created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_default(),
        amount,
        memo: memo.to_string(),
        location_id: None,
        status: Some("COMPLETED".to_string()),
    }
}

fn movie(id: &str, title: &str, filmmaker: &str, sale: MinorUnits, party: MinorUnits) -> Movie {
    Movie {
        id: id.to_string(),
        title: title.to_string(),
        filmmaker: Some(filmmaker.to_string()),
        sale_price: Some(sale),
        watch_party_price: Some(party),
    }
}

fn promo(code: &str, promo_type: PromoType, pct: Option<u32>, max: u32, used: u32) -> PromoCode {
    PromoCode {
        code: code.to_string(),
        promo_type,
        discount_value: pct,
        max_uses: max,
        used_count: used,
    }
}

/// In-memory store with two films, one block and three promo codes.
///
/// - `m1` "Nightfall" by Ada Reyes: sale 1299, watch party 500
/// - `m2` "Echoes" by Sam Ito: sale 399, watch party 500
/// - `b1` "Indie Block": 1000
/// - `FREEPASS` one-time access, 3 uses; `ONCE` 50% off, used up;
///   `FEST25` 25% off, 10 uses
pub fn seeded_store() -> Connection {
    let conn = marquee_db::open_memory().expect("in-memory store should open");

    for m in [
        movie("m1", "Nightfall", "Ada Reyes", 1299, 500),
        movie("m2", "Echoes", "Sam Ito", 399, 500),
    ] {
        catalog::insert_movie(&conn, &m, SEEDED_AT).expect("movie insert should succeed");
    }
    catalog::insert_block(
        &conn,
        &FestivalBlock {
            id: "b1".to_string(),
            title: "Indie Block".to_string(),
            price: Some(1000),
            film_ids: vec!["m1".to_string(), "m2".to_string()],
        },
    )
    .expect("block insert should succeed");

    for p in [
        promo("FREEPASS", PromoType::OneTimeAccess, None, 3, 0),
        promo("ONCE", PromoType::Discount, Some(50), 1, 1),
        promo("FEST25", PromoType::Discount, Some(25), 10, 0),
    ] {
        promos::insert(&conn, &p, SEEDED_AT).expect("promo insert should succeed");
    }

    conn
}

/// Store, gateway and purchase flow wired the way the daemon wires them.
pub struct Checkout {
    pub store: Arc<Mutex<Connection>>,
    pub gateway: Arc<StubGateway>,
    pub flow: PurchaseFlow,
}

impl Checkout {
    pub fn new(conn: Connection, gateway: Arc<StubGateway>) -> Self {
        let store = Arc::new(Mutex::new(conn));
        let flow = PurchaseFlow::new(
            store.clone(),
            PricingResolver::new(PricingTable::default()),
            ChargeSubmitter::new(gateway.clone(), None).with_max_attempts(2),
        );
        Self {
            store,
            gateway,
            flow,
        }
    }
}

pub fn request(access_type: &str, item_id: Option<&str>, promo_code: Option<&str>) -> PurchaseRequest {
    PurchaseRequest {
        access_type: access_type.to_string(),
        item_id: item_id.map(str::to_string),
        amount: None,
        promo_code: promo_code.map(str::to_string),
        source_id: "cnon:card-nonce-ok".to_string(),
        buyer_email: Some("viewer@example.com".to_string()),
    }
}
