//! JSON shapes of the gateway REST API.
//!
//! Only the fields the ledger needs are modelled; unknown fields are ignored.

use chrono::{DateTime, Utc};
use marquee_types::RawPayment;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{CreatePaymentRequest, GatewayError, PaymentsPage, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Minor units.
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirePayment {
    pub id: String,
    /// RFC 3339 timestamp.
    pub created_at: String,
    pub amount_money: Money,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// One page of the payment list.
///
/// Records stay untyped until [`ListPaymentsResponse::into_page`] so that a
/// single malformed payment cannot fail the whole page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPaymentsResponse {
    #[serde(default)]
    pub payments: Vec<Value>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePaymentBody {
    pub source_id: String,
    pub idempotency_key: String,
    pub amount_money: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    pub note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_email_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentResponse {
    pub payment: WirePayment,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorResponse {
    /// Human-readable summary of the first reported error.
    pub fn summary(&self) -> String {
        match self.errors.first() {
            Some(e) => match &e.detail {
                Some(detail) => format!("{} {}: {}", e.category, e.code, detail),
                None => format!("{} {}", e.category, e.code),
            },
            None => "no error detail".to_string(),
        }
    }
}

impl ListPaymentsResponse {
    /// Decode each record on its own, skipping and counting the ones that
    /// do not parse.
    pub fn into_page(self) -> PaymentsPage {
        let mut page = PaymentsPage {
            cursor: self.cursor.filter(|c| !c.is_empty()),
            ..PaymentsPage::default()
        };
        for record in self.payments {
            match decode_payment(record) {
                Ok(payment) => page.payments.push(payment),
                Err(e) => {
                    warn!(error = %e, "skipping malformed payment record");
                    page.rejected += 1;
                }
            }
        }
        page
    }
}

fn decode_payment(record: Value) -> Result<RawPayment> {
    let id = record
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("<no id>")
        .to_string();
    let wire: WirePayment = serde_json::from_value(record)
        .map_err(|e| GatewayError::Decode(format!("payment {id}: {e}")))?;
    RawPayment::try_from(wire)
}

impl TryFrom<WirePayment> for RawPayment {
    type Error = GatewayError;

    fn try_from(wire: WirePayment) -> Result<Self> {
        let created_at = DateTime::parse_from_rfc3339(&wire.created_at)
            .map_err(|e| {
                GatewayError::Decode(format!("payment {}: bad created_at: {e}", wire.id))
            })?
            .with_timezone(&Utc);
        let amount = u64::try_from(wire.amount_money.amount).map_err(|_| {
            GatewayError::Decode(format!(
                "payment {}: negative amount {}",
                wire.id, wire.amount_money.amount
            ))
        })?;

        Ok(RawPayment {
            id: wire.id,
            created_at,
            amount,
            memo: wire.note.unwrap_or_default(),
            location_id: wire.location_id,
            status: wire.status,
        })
    }
}

impl CreatePaymentBody {
    pub fn from_request(request: &CreatePaymentRequest) -> Result<Self> {
        let amount = i64::try_from(request.amount)
            .map_err(|_| GatewayError::Decode(format!("amount {} out of range", request.amount)))?;
        Ok(Self {
            source_id: request.source_id.clone(),
            idempotency_key: request.idempotency_key.clone(),
            amount_money: Money {
                amount,
                currency: marquee_types::CURRENCY.to_string(),
            },
            location_id: request.location_id.clone(),
            note: request.memo.clone(),
            buyer_email_address: request.buyer_email.clone(),
        })
    }
}
