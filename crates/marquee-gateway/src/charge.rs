//! Idempotent charge submission.

use std::sync::Arc;

use marquee_types::report::ChargeOutcome;
use marquee_types::MinorUnits;
use tracing::{info, warn};

use crate::{CreatePaymentRequest, PaymentGateway, Result};

/// Generate a fresh idempotency key for one logical purchase.
pub fn new_idempotency_key() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Non-amount fields of a charge.
#[derive(Debug, Clone, Default)]
pub struct ChargeMetadata {
    pub source_id: String,
    pub memo: String,
    pub buyer_email: Option<String>,
}

/// Submits charges, retrying transient failures under the same key.
pub struct ChargeSubmitter {
    gateway: Arc<dyn PaymentGateway>,
    location_id: Option<String>,
    max_attempts: u32,
}

impl ChargeSubmitter {
    pub fn new(gateway: Arc<dyn PaymentGateway>, location_id: Option<String>) -> Self {
        Self {
            gateway,
            location_id,
            max_attempts: 1,
        }
    }

    /// Total attempts per charge, including the first. Clamped to at least 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Submit a charge.
    ///
    /// A zero amount is waived without contacting the gateway. Every retry
    /// reuses `idempotency_key`, so the gateway charges at most once.
    pub async fn submit(
        &self,
        amount: MinorUnits,
        idempotency_key: &str,
        metadata: &ChargeMetadata,
    ) -> Result<ChargeOutcome> {
        if amount == 0 {
            info!(idempotency_key, "zero amount, charge waived");
            return Ok(ChargeOutcome::Waived);
        }

        let request = CreatePaymentRequest {
            amount,
            idempotency_key: idempotency_key.to_string(),
            source_id: metadata.source_id.clone(),
            location_id: self.location_id.clone(),
            memo: metadata.memo.clone(),
            buyer_email: metadata.buyer_email.clone(),
        };

        let mut attempt = 1;
        loop {
            match self.gateway.create_payment(&request).await {
                Ok(payment) => {
                    info!(payment_id = %payment.id, amount, attempt, "charge accepted");
                    return Ok(ChargeOutcome::Charged {
                        payment_id: payment.id,
                    });
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(attempt, error = %e, "charge failed, retrying with same key");
                    attempt += 1;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "charge failed");
                    return Err(e);
                }
            }
        }
    }
}
