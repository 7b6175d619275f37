//! HTTP client for the gateway REST API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use marquee_types::RawPayment;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::wire::{CreatePaymentBody, CreatePaymentResponse, ErrorResponse, ListPaymentsResponse};
use crate::{
    CreatePaymentRequest, Environment, GatewayError, ListPaymentsQuery, PaymentGateway,
    PaymentsPage, Result,
};

/// API version pinned in every request.
pub const API_VERSION: &str = "2024-09-19";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Gateway REST client.
pub struct HttpGateway {
    /// API base URL
    base_url: String,
    /// HTTP client
    client: Client,
    /// Bearer token
    access_token: String,
}

impl HttpGateway {
    /// Create a client for the given environment.
    ///
    /// Every request is bounded by `timeout`; an expired request surfaces as
    /// [`GatewayError::Timeout`] rather than hanging.
    pub fn new(environment: Environment, access_token: &str, timeout: Duration) -> Result<Self> {
        Self::with_base_url(environment.base_url(), access_token, timeout)
    }

    /// Create a client against an explicit base URL.
    pub fn with_base_url(base_url: &str, access_token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            access_token: access_token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Decode a response, mapping non-success statuses to [`GatewayError::Rejected`].
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.summary())
                .unwrap_or(text);
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

/// Classify transport failures.
fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else if e.is_connect() {
        GatewayError::Unreachable(e.to_string())
    } else {
        GatewayError::Http(e)
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn list_payments(&self, query: &ListPaymentsQuery) -> Result<PaymentsPage> {
        let url = format!("{}/v2/payments", self.base_url);
        let mut params = vec![
            (
                "begin_time",
                query.begin_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("sort_order", "ASC".to_string()),
        ];
        if let Some(cursor) = &query.cursor {
            params.push(("cursor", cursor.clone()));
        }
        if let Some(location_id) = &query.location_id {
            params.push(("location_id", location_id.clone()));
        }

        debug!(cursor = ?query.cursor, "GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .header("Square-Version", API_VERSION)
            .query(&params)
            .send()
            .await
            .map_err(transport_error)?;

        let body: ListPaymentsResponse = Self::decode(response).await?;
        Ok(body.into_page())
    }

    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<RawPayment> {
        let url = format!("{}/v2/payments", self.base_url);
        let body = CreatePaymentBody::from_request(request)?;

        debug!(idempotency_key = %request.idempotency_key, amount = request.amount, "POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .header("Square-Version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let created: CreatePaymentResponse = Self::decode(response).await?;
        RawPayment::try_from(created.payment)
    }
}
