//! # marquee-gateway
//!
//! Boundary to the third-party payment gateway.
//!
//! The gateway is the system of record for payments: this crate reads its
//! transaction feed and submits charges, and never mutates a payment once
//! created.
//!
//! ## Modules
//!
//! - [`client`] — HTTP client for the gateway REST API
//! - [`wire`] — JSON request/response shapes
//! - [`feed`] — Cursor-following feed retrieval since the ledger epoch
//! - [`charge`] — Idempotent charge submission
//! - [`stub`] — In-memory gateway for development and tests

pub mod charge;
pub mod client;
pub mod feed;
pub mod stub;
pub mod wire;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_types::{MinorUnits, RawPayment};
use serde::{Deserialize, Serialize};

/// Error types for gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The gateway could not be reached (connection refused, DNS, TLS).
    #[error("gateway unreachable: {0}")]
    Unreachable(String),

    /// The request exceeded the configured timeout.
    #[error("gateway request timed out")]
    Timeout,

    /// The gateway answered with a non-success status.
    #[error("gateway rejected request ({status}): {detail}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// First error detail reported by the gateway.
        detail: String,
    },

    /// The response body did not have the expected shape.
    #[error("malformed gateway response: {0}")]
    Decode(String),

    /// Any other transport error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl GatewayError {
    /// Whether resending the same request (same idempotency key) may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Unreachable(_) | GatewayError::Timeout => true,
            GatewayError::Rejected { status, .. } => *status == 429 || *status >= 500,
            GatewayError::Decode(_) | GatewayError::Http(_) => false,
        }
    }
}

/// Convenience result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Which gateway deployment to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Production,
    #[default]
    Sandbox,
}

impl Environment {
    /// REST API base URL for this environment.
    pub fn base_url(self) -> &'static str {
        match self {
            Environment::Production => "https://connect.squareup.com",
            Environment::Sandbox => "https://connect.squareupsandbox.com",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Sandbox => "sandbox",
        }
    }
}

/// Parameters for one page of the payment list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPaymentsQuery {
    /// Only payments created at or after this instant.
    pub begin_time: DateTime<Utc>,
    /// Continuation cursor from the previous page.
    pub cursor: Option<String>,
    pub location_id: Option<String>,
}

/// One page of the payment list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentsPage {
    pub payments: Vec<RawPayment>,
    /// Absent on the last page.
    pub cursor: Option<String>,
    /// Records dropped because they could not be decoded.
    pub rejected: usize,
}

/// A charge to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePaymentRequest {
    pub amount: MinorUnits,
    pub idempotency_key: String,
    /// Card nonce or stored-card token supplied by the checkout form.
    pub source_id: String,
    pub location_id: Option<String>,
    /// Memo preserved by the gateway; the only record of purchase intent.
    pub memo: String,
    pub buyer_email: Option<String>,
}

/// The payment gateway seam.
///
/// Implemented by [`client::HttpGateway`] for the real API and by
/// [`stub::StubGateway`] for development and tests.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Fetch one page of payments.
    async fn list_payments(&self, query: &ListPaymentsQuery) -> Result<PaymentsPage>;

    /// Create a payment. Repeating an idempotency key returns the original
    /// payment instead of charging again.
    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<RawPayment>;
}
