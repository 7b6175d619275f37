//! Revenue command handlers.
//!
//! A report reads the gateway feed and a store snapshot concurrently and
//! builds from whichever succeeded. Neither source failing is fatal.

use std::sync::Arc;

use marquee_db::queries::{catalog, payouts, users};
use marquee_gateway::feed::{self, FeedRequest, FeedResult};
use marquee_gateway::GatewayError;
use marquee_revenue::report::{build_report, source_error, FeedSnapshot, ReportRequest, StoreSnapshot};
use marquee_revenue::splits::SplitConfig;
use marquee_types::report::{AnalyticsReport, DataSource, SourceError};
use serde_json::Value;
use tracing::warn;

use super::{optional_str, to_json};
use crate::events::{self, Event};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Full analytics report, optionally scoped to one payout recipient.
pub async fn get_revenue_report(state: &Arc<DaemonState>, params: &Value) -> Result {
    let recipient = optional_str(params, "recipient")?;
    let report = revenue_report(state, recipient.as_deref()).await?;
    to_json(&report)
}

/// Outstanding balance for one recipient, or platform-wide.
pub async fn get_outstanding_balance(state: &Arc<DaemonState>, params: &Value) -> Result {
    let recipient = optional_str(params, "recipient")?;
    let report = revenue_report(state, recipient.as_deref()).await?;

    Ok(serde_json::json!({
        "recipient": recipient,
        "balance": report.ledger.as_ref().and_then(|l| l.outstanding_balance),
        "complete": report.complete,
        "errors": to_json(&report.errors)?,
    }))
}

/// Classify one memo.
pub async fn classify_memo(state: &Arc<DaemonState>, params: &Value) -> Result {
    let memo = params
        .get("memo")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("memo required"))?;
    to_json(&state.classifier.classify(memo))
}

async fn revenue_report(
    state: &DaemonState,
    recipient: Option<&str>,
) -> std::result::Result<AnalyticsReport, RpcError> {
    let since = state
        .config
        .ledger
        .epoch()
        .map_err(|e| RpcError::internal_error(&e.to_string()))?;
    let feed_request = FeedRequest {
        since,
        location_id: state.config.gateway.location_id.clone(),
        max_pages: state.config.gateway.max_pages,
    };

    let (feed_result, store_result) = tokio::join!(
        feed::fetch_all(state.gateway.as_ref(), &feed_request),
        store_snapshot(state),
    );

    let feed = feed_result.map(feed_snapshot).map_err(|e| {
        source_error(DataSource::Gateway, gateway_error_kind(&e), e.to_string())
    });
    if let Ok(FeedSnapshot {
        truncation: Some(reason),
        ..
    }) = &feed
    {
        state.event_bus.emit(Event::now(
            events::FEED_TRUNCATED,
            serde_json::json!({ "reason": reason }),
        ));
    }

    // Store overrides are only readable with the store; fall back to the file.
    let (store, splits) = match store_result {
        Ok((snapshot, splits)) => (Ok(snapshot), splits),
        Err(e) => {
            let splits = state
                .config
                .ledger
                .splits()
                .map_err(|e| RpcError::internal_error(&e.to_string()))?;
            (Err(e), splits)
        }
    };

    let request = ReportRequest {
        generated_at: chrono::Utc::now().timestamp(),
        since: since.timestamp(),
        recipient,
        splits,
    };
    let report = build_report(&state.classifier, &request, feed, store)
        .map_err(|e| RpcError::internal_error(&e.to_string()))?;

    state.event_bus.emit(Event::now(
        events::REPORT_GENERATED,
        serde_json::json!({
            "recipient": recipient,
            "complete": report.complete,
            "errors": report.errors.len(),
        }),
    ));
    Ok(report)
}

fn feed_snapshot(result: FeedResult) -> FeedSnapshot {
    let truncation = result.truncated.then(|| {
        result
            .truncation_error
            .unwrap_or_else(|| "feed truncated".to_string())
    });
    FeedSnapshot {
        payments: result.payments,
        truncation,
        rejected: result.rejected,
    }
}

fn gateway_error_kind(e: &GatewayError) -> &'static str {
    match e {
        GatewayError::Unreachable(_) => "unreachable",
        GatewayError::Timeout => "timeout",
        GatewayError::Rejected { .. } => "rejected",
        GatewayError::Decode(_) => "decode",
        GatewayError::Http(_) => "http",
    }
}

/// Everything the report needs from the store, under one lock.
async fn store_snapshot(
    state: &DaemonState,
) -> std::result::Result<(StoreSnapshot, SplitConfig), SourceError> {
    let conn = state.db.lock().await;
    let unavailable = |e: &dyn std::fmt::Display| {
        warn!(error = %e, "store read failed during report");
        source_error(DataSource::Store, "unavailable", e.to_string())
    };

    let snapshot = StoreSnapshot {
        movies: catalog::list_movies(&conn).map_err(|e| unavailable(&e))?,
        blocks: catalog::list_blocks(&conn).map_err(|e| unavailable(&e))?,
        payouts: payouts::list(&conn, None, None).map_err(|e| unavailable(&e))?,
        user_count: users::count(&conn).map_err(|e| unavailable(&e))?,
    };
    let splits = state
        .config
        .ledger
        .split_config(&conn)
        .map_err(|e| source_error(DataSource::Store, "settings", e.to_string()))?;
    Ok((snapshot, splits))
}
