//! Purchase flow.
//!
//! resolve price -> check promo quota -> apply discount -> charge -> commit
//! promo usage.
//!
//! The store lock is released before the gateway is called and taken again
//! for the commit, so a slow charge never blocks other requests. A commit
//! that fails after a successful charge does not fail the purchase: the
//! buyer has paid, and the receipt reports `promo_committed = false`.

use std::sync::Arc;

use marquee_gateway::charge::{new_idempotency_key, ChargeMetadata, ChargeSubmitter};
use marquee_types::report::{ChargeOutcome, PurchaseReceipt};
use marquee_types::MinorUnits;
use rusqlite::Connection;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::pricing::PricingResolver;
use crate::{promo, Result};

/// A purchase as submitted by the storefront.
#[derive(Clone, Debug, Deserialize)]
pub struct PurchaseRequest {
    /// Access type wire name.
    pub access_type: String,
    #[serde(default)]
    pub item_id: Option<String>,
    /// Only read for open-amount access types.
    #[serde(default)]
    pub amount: Option<MinorUnits>,
    #[serde(default)]
    pub promo_code: Option<String>,
    /// Card nonce from the checkout form.
    pub source_id: String,
    #[serde(default)]
    pub buyer_email: Option<String>,
}

pub struct PurchaseFlow {
    store: Arc<Mutex<Connection>>,
    pricing: PricingResolver,
    charges: ChargeSubmitter,
}

impl PurchaseFlow {
    pub fn new(
        store: Arc<Mutex<Connection>>,
        pricing: PricingResolver,
        charges: ChargeSubmitter,
    ) -> Self {
        Self {
            store,
            pricing,
            charges,
        }
    }

    /// Run one purchase.
    ///
    /// # Errors
    ///
    /// - pricing errors from [`PricingResolver::resolve_named`]
    /// - [`crate::CheckoutError::QuotaExceeded`] if the promo code is used up;
    ///   nothing is charged, and the caller may retry without the code
    /// - [`crate::CheckoutError::Gateway`] if the charge fails
    pub async fn purchase(&self, request: &PurchaseRequest) -> Result<PurchaseReceipt> {
        let (quote, promotion) = {
            let conn = self.store.lock().await;
            let quote = self.pricing.resolve_named(
                &*conn,
                &request.access_type,
                request.item_id.as_deref(),
                request.amount,
            )?;
            let promotion = match &request.promo_code {
                Some(code) => Some(promo::check_quota(&conn, code)?),
                None => None,
            };
            (quote, promotion)
        };

        let charged = match &promotion {
            Some(p) => promo::apply_discount(p, quote.amount)?,
            None => quote.amount,
        };

        let idempotency_key = new_idempotency_key();
        let metadata = ChargeMetadata {
            source_id: request.source_id.clone(),
            memo: quote.memo.clone(),
            buyer_email: request.buyer_email.clone(),
        };
        let outcome = self.charges.submit(charged, &idempotency_key, &metadata).await?;

        let promo_committed = match &promotion {
            Some(p) => {
                let conn = self.store.lock().await;
                match promo::commit_usage(&conn, &p.code) {
                    Ok(_) => true,
                    Err(e) => {
                        let payment_id = match &outcome {
                            ChargeOutcome::Charged { payment_id } => payment_id.as_str(),
                            ChargeOutcome::Waived => "",
                        };
                        warn!(
                            code = %p.code,
                            payment_id,
                            error = %e,
                            "charge succeeded but promo use was not recorded"
                        );
                        false
                    }
                }
            }
            None => false,
        };

        info!(
            access_type = %quote.access_type,
            list_price = quote.amount,
            charged,
            promo = ?promotion.as_ref().map(|p| p.code.as_str()),
            "purchase completed"
        );

        Ok(PurchaseReceipt {
            access_type: quote.access_type,
            item_id: quote.item_id,
            list_price: quote.amount,
            charged,
            promo_code: promotion.map(|p| p.code),
            outcome,
            idempotency_key,
            promo_committed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::PricingTable;
    use crate::CheckoutError;
    use marquee_db::queries::{catalog, promos};
    use marquee_gateway::stub::StubGateway;
    use marquee_gateway::GatewayError;
    use marquee_types::catalog::Movie;
    use marquee_types::promo::{PromoCode, PromoType};

    struct Harness {
        store: Arc<Mutex<Connection>>,
        gateway: Arc<StubGateway>,
        flow: PurchaseFlow,
    }

    fn harness(promos_to_seed: &[PromoCode]) -> Harness {
        let conn = marquee_db::open_memory().expect("open test db");
        catalog::insert_movie(
            &conn,
            &Movie {
                id: "m1".to_string(),
                title: "Nightfall".to_string(),
                filmmaker: Some("Ada Reyes".to_string()),
                sale_price: Some(1299),
                watch_party_price: Some(500),
            },
            1000,
        )
        .expect("insert movie");
        for p in promos_to_seed {
            promos::insert(&conn, p, 1000).expect("insert promo");
        }

        let store = Arc::new(Mutex::new(conn));
        let gateway = Arc::new(StubGateway::new());
        let flow = PurchaseFlow::new(
            store.clone(),
            PricingResolver::new(PricingTable::default()),
            ChargeSubmitter::new(gateway.clone(), None),
        );
        Harness {
            store,
            gateway,
            flow,
        }
    }

    fn request(access_type: &str, item_id: Option<&str>, promo_code: Option<&str>) -> PurchaseRequest {
        PurchaseRequest {
            access_type: access_type.to_string(),
            item_id: item_id.map(str::to_string),
            amount: None,
            promo_code: promo_code.map(str::to_string),
            source_id: "cnon:card-nonce-ok".to_string(),
            buyer_email: None,
        }
    }

    fn promo(code: &str, promo_type: PromoType, discount: Option<u32>, max: u32, used: u32) -> PromoCode {
        PromoCode {
            code: code.to_string(),
            promo_type,
            discount_value: discount,
            max_uses: max,
            used_count: used,
        }
    }

    async fn used_count(h: &Harness, code: &str) -> u32 {
        let conn = h.store.lock().await;
        promos::get(&conn, code).expect("get").expect("present").used_count
    }

    #[tokio::test]
    async fn test_full_price_purchase() {
        let h = harness(&[]);
        let receipt = h
            .flow
            .purchase(&request("watch_party_ticket", Some("m1"), None))
            .await
            .expect("purchase");

        assert_eq!(receipt.list_price, 500);
        assert_eq!(receipt.charged, 500);
        assert!(matches!(receipt.outcome, ChargeOutcome::Charged { .. }));
        assert!(!receipt.promo_committed);

        let payments = h.gateway.payments().await;
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].memo, "Watch Party Ticket: Nightfall");
        assert_eq!(h.gateway.charge_calls(&receipt.idempotency_key).await, 1);
    }

    #[tokio::test]
    async fn test_exhausted_code_fails_then_full_price() {
        let h = harness(&[promo("ONCE", PromoType::Discount, Some(50), 1, 1)]);

        let err = h
            .flow
            .purchase(&request("watch_party_ticket", Some("m1"), Some("ONCE")))
            .await
            .expect_err("quota exceeded");
        assert!(matches!(err, CheckoutError::QuotaExceeded(_)));
        assert_eq!(h.gateway.total_charges().await, 0);

        let receipt = h
            .flow
            .purchase(&request("watch_party_ticket", Some("m1"), None))
            .await
            .expect("retry without code");
        assert_eq!(receipt.charged, 500);
        assert_eq!(used_count(&h, "ONCE").await, 1);
    }

    #[tokio::test]
    async fn test_one_time_access_waives_and_commits() {
        let h = harness(&[promo("FREEPASS", PromoType::OneTimeAccess, None, 3, 0)]);

        let receipt = h
            .flow
            .purchase(&request("watch_party_ticket", Some("m1"), Some("freepass")))
            .await
            .expect("purchase");

        assert_eq!(receipt.list_price, 500);
        assert_eq!(receipt.charged, 0);
        assert_eq!(receipt.outcome, ChargeOutcome::Waived);
        assert!(receipt.promo_committed);
        assert_eq!(h.gateway.total_charges().await, 0);
        assert_eq!(h.gateway.charge_calls(&receipt.idempotency_key).await, 0);
        assert_eq!(used_count(&h, "FREEPASS").await, 1);
    }

    #[tokio::test]
    async fn test_discount_applied_to_charge() {
        let h = harness(&[promo("FEST25", PromoType::Discount, Some(25), 10, 0)]);

        let receipt = h
            .flow
            .purchase(&request("movie_purchase", Some("m1"), Some("FEST25")))
            .await
            .expect("purchase");

        // 25% of 1299 is 324.75; the discount rounds down to 324.
        assert_eq!(receipt.charged, 975);
        assert_eq!(receipt.promo_code.as_deref(), Some("FEST25"));
        assert!(receipt.promo_committed);
        assert_eq!(h.gateway.payments().await[0].amount, 975);
    }

    #[tokio::test]
    async fn test_gateway_failure_does_not_commit() {
        let h = harness(&[promo("FEST25", PromoType::Discount, Some(25), 10, 0)]);
        h.gateway
            .fail_next_charge(GatewayError::Rejected {
                status: 402,
                detail: "card declined".to_string(),
            })
            .await;

        let err = h
            .flow
            .purchase(&request("movie_purchase", Some("m1"), Some("FEST25")))
            .await
            .expect_err("declined");
        assert!(matches!(err, CheckoutError::Gateway(_)));
        assert_eq!(used_count(&h, "FEST25").await, 0);
    }

    #[tokio::test]
    async fn test_unknown_access_type_rejected() {
        let h = harness(&[]);
        let err = h
            .flow
            .purchase(&request("vip_lounge", None, None))
            .await
            .expect_err("unknown");
        assert!(matches!(err, CheckoutError::UnknownAccessType(_)));
        assert_eq!(h.gateway.total_charges().await, 0);
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: PurchaseRequest = serde_json::from_str(
            r#"{"access_type":"donation","amount":500,"source_id":"cnon:ok"}"#,
        )
        .expect("decode");
        assert_eq!(request.amount, Some(500));
        assert!(request.item_id.is_none());
        assert!(request.promo_code.is_none());
    }
}
