//! In-memory gateway.
//!
//! Used by the daemon when `gateway.use_stub` is set and by tests. Charges
//! are appended to the feed, so a purchase is immediately visible to the
//! next analytics report. Failures can be injected per page or per charge.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use marquee_types::RawPayment;
use tokio::sync::Mutex;

use crate::{
    CreatePaymentRequest, GatewayError, ListPaymentsQuery, PaymentGateway, PaymentsPage, Result,
};

const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Default)]
struct StubState {
    payments: Vec<RawPayment>,
    /// First page index that fails with `Unreachable`.
    fail_from_page: Option<usize>,
    /// Undecodable records reported on every page.
    rejected_per_page: usize,
    charge_failures: VecDeque<GatewayError>,
    charges_by_key: HashMap<String, RawPayment>,
    calls_by_key: HashMap<String, u32>,
    next_id: u64,
}

/// Gateway backed by an in-memory payment list.
pub struct StubGateway {
    page_size: usize,
    state: Mutex<StubState>,
}

impl Default for StubGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl StubGateway {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            state: Mutex::new(StubState::default()),
        }
    }

    /// Seed the feed with existing payments.
    pub fn with_payments(payments: Vec<RawPayment>) -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            state: Mutex::new(StubState {
                payments,
                ..StubState::default()
            }),
        }
    }

    pub async fn add_payment(&self, payment: RawPayment) {
        self.state.lock().await.payments.push(payment);
    }

    /// Every payment in the feed, in insertion order.
    pub async fn payments(&self) -> Vec<RawPayment> {
        self.state.lock().await.payments.clone()
    }

    /// Make every list request for page `index` or later fail.
    pub async fn fail_pages_from(&self, index: usize) {
        self.state.lock().await.fail_from_page = Some(index);
    }

    /// Report `count` undecodable records alongside every page.
    pub async fn reject_records_per_page(&self, count: usize) {
        self.state.lock().await.rejected_per_page = count;
    }

    /// Queue an error for the next charge attempt.
    pub async fn fail_next_charge(&self, error: GatewayError) {
        self.state.lock().await.charge_failures.push_back(error);
    }

    /// Number of create requests received for `idempotency_key`.
    pub async fn charge_calls(&self, idempotency_key: &str) -> u32 {
        self.state
            .lock()
            .await
            .calls_by_key
            .get(idempotency_key)
            .copied()
            .unwrap_or(0)
    }

    /// Number of distinct payments created.
    pub async fn total_charges(&self) -> usize {
        self.state.lock().await.charges_by_key.len()
    }
}

fn parse_cursor(cursor: Option<&str>) -> Result<usize> {
    match cursor {
        None => Ok(0),
        Some(c) => c
            .parse()
            .map_err(|_| GatewayError::Rejected {
                status: 400,
                detail: format!("invalid cursor {c}"),
            }),
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn list_payments(&self, query: &ListPaymentsQuery) -> Result<PaymentsPage> {
        let page_index = parse_cursor(query.cursor.as_deref())?;
        let state = self.state.lock().await;

        if state.fail_from_page.is_some_and(|from| page_index >= from) {
            return Err(GatewayError::Unreachable(format!(
                "stub configured to fail page {page_index}"
            )));
        }

        let matching: Vec<&RawPayment> = state
            .payments
            .iter()
            .filter(|p| p.created_at >= query.begin_time)
            .filter(|p| match &query.location_id {
                Some(loc) => p.location_id.as_deref() == Some(loc.as_str()),
                None => true,
            })
            .collect();

        let start = page_index.saturating_mul(self.page_size);
        let end = start.saturating_add(self.page_size).min(matching.len());
        let payments = matching
            .get(start..end)
            .unwrap_or(&[])
            .iter()
            .map(|p| (*p).clone())
            .collect();
        let cursor = (end < matching.len()).then(|| (page_index + 1).to_string());

        Ok(PaymentsPage {
            payments,
            cursor,
            rejected: state.rejected_per_page,
        })
    }

    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<RawPayment> {
        let mut state = self.state.lock().await;
        *state
            .calls_by_key
            .entry(request.idempotency_key.clone())
            .or_insert(0) += 1;

        if let Some(error) = state.charge_failures.pop_front() {
            return Err(error);
        }

        if let Some(existing) = state.charges_by_key.get(&request.idempotency_key) {
            return Ok(existing.clone());
        }

        state.next_id += 1;
        let payment = RawPayment {
            id: format!("stub-pay-{}", state.next_id),
            created_at: Utc::now(),
            amount: request.amount,
            memo: request.memo.clone(),
            location_id: request.location_id.clone(),
            status: Some("COMPLETED".to_string()),
        };
        state
            .charges_by_key
            .insert(request.idempotency_key.clone(), payment.clone());
        state.payments.push(payment.clone());
        Ok(payment)
    }
}
