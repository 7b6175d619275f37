//! Payment feed retrieval.
//!
//! Pages are fetched sequentially: each request needs the cursor returned
//! by the one before it. The first page is mandatory; any later failure
//! truncates the feed but keeps the pages already read, so callers must
//! check [`FeedResult::truncated`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use marquee_types::RawPayment;
use tracing::{debug, info, warn};

use crate::{GatewayError, ListPaymentsQuery, PaymentGateway, Result};

/// Default upper bound on pages read per feed.
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Feed retrieval parameters.
#[derive(Debug, Clone)]
pub struct FeedRequest {
    /// Ledger epoch. Payments before this instant are excluded.
    pub since: DateTime<Utc>,
    pub location_id: Option<String>,
    pub max_pages: usize,
}

impl FeedRequest {
    pub fn new(since: DateTime<Utc>) -> Self {
        Self {
            since,
            location_id: None,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Everything read from the feed.
#[derive(Debug, Clone, Default)]
pub struct FeedResult {
    pub payments: Vec<RawPayment>,
    /// Pages successfully read.
    pub pages: usize,
    /// True when pagination stopped before the gateway's last page.
    pub truncated: bool,
    /// Why pagination stopped early.
    pub truncation_error: Option<String>,
    /// Records skipped because the gateway sent them malformed.
    pub rejected: usize,
}

/// Fetch every payment at or after `request.since`.
///
/// # Errors
///
/// - [`GatewayError::Unreachable`] if the first page cannot be retrieved
pub async fn fetch_all(gateway: &dyn PaymentGateway, request: &FeedRequest) -> Result<FeedResult> {
    let mut result = FeedResult::default();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut seen_cursors: HashSet<String> = HashSet::new();
    let mut cursor: Option<String> = None;

    loop {
        if result.pages >= request.max_pages {
            warn!(pages = result.pages, "payment feed hit page cap");
            result.truncated = true;
            result.truncation_error = Some(format!("page cap of {} reached", request.max_pages));
            break;
        }

        let query = ListPaymentsQuery {
            begin_time: request.since,
            cursor: cursor.clone(),
            location_id: request.location_id.clone(),
        };

        let page = match gateway.list_payments(&query).await {
            Ok(page) => page,
            Err(e) if result.pages == 0 => {
                return Err(GatewayError::Unreachable(format!("first feed page: {e}")));
            }
            Err(e) => {
                warn!(pages = result.pages, error = %e, "payment feed truncated");
                result.truncated = true;
                result.truncation_error = Some(e.to_string());
                break;
            }
        };

        result.pages += 1;
        result.rejected += page.rejected;
        let received = page.payments.len();
        for payment in page.payments {
            if payment.created_at < request.since {
                continue;
            }
            if seen_ids.insert(payment.id.clone()) {
                result.payments.push(payment);
            }
        }
        debug!(
            page = result.pages,
            received,
            rejected = page.rejected,
            total = result.payments.len(),
            "feed page read"
        );

        match page.cursor {
            None => break,
            Some(next) => {
                if !seen_cursors.insert(next.clone()) {
                    warn!(cursor = %next, "payment feed repeated a cursor");
                    result.truncated = true;
                    result.truncation_error = Some("gateway repeated a cursor".to_string());
                    break;
                }
                cursor = Some(next);
            }
        }
    }

    info!(
        payments = result.payments.len(),
        pages = result.pages,
        rejected = result.rejected,
        truncated = result.truncated,
        "payment feed fetched"
    );
    Ok(result)
}
