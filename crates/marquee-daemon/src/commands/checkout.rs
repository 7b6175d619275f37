//! Checkout command handlers.

use std::sync::Arc;

use marquee_checkout::promo;
use marquee_checkout::purchase::PurchaseRequest;
use serde_json::Value;

use super::{optional_str, to_json};
use crate::events::{self, Event};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Authoritative price and charge memo for one access type.
pub async fn resolve_price(state: &Arc<DaemonState>, params: &Value) -> Result {
    let access_type = params
        .get("access_type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("access_type required"))?;
    let item_id = optional_str(params, "item_id")?;
    let amount = match params.get("amount") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            v.as_u64()
                .ok_or_else(|| RpcError::invalid_params("amount must be a non-negative integer"))?,
        ),
    };

    let conn = state.db.lock().await;
    let quote = state
        .pricing
        .resolve_named(&*conn, access_type, item_id.as_deref(), amount)?;
    to_json(&quote)
}

/// State and remaining uses of a promo code.
pub async fn check_promo(state: &Arc<DaemonState>, params: &Value) -> Result {
    let code = params
        .get("code")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("code required"))?;

    let conn = state.db.lock().await;
    let promotion = promo::lookup(&conn, code)?;
    Ok(serde_json::json!({
        "code": promotion.code,
        "promo_type": promotion.promo_type,
        "state": promotion.state(),
        "remaining_uses": promotion.remaining_uses(),
    }))
}

/// Run a purchase end to end.
pub async fn purchase(state: &Arc<DaemonState>, params: &Value) -> Result {
    let request: PurchaseRequest = serde_json::from_value(params.clone())
        .map_err(|e| RpcError::invalid_params(&e.to_string()))?;

    let receipt = state.purchases.purchase(&request).await?;

    state.event_bus.emit(Event::now(
        events::PURCHASE_COMPLETED,
        serde_json::json!({
            "access_type": receipt.access_type,
            "item_id": receipt.item_id,
            "charged": receipt.charged,
            "outcome": receipt.outcome,
        }),
    ));
    if let Some(code) = &receipt.promo_code {
        let event_type = if receipt.promo_committed {
            events::PROMO_REDEEMED
        } else {
            events::PROMO_COMMIT_FAILED
        };
        state.event_bus.emit(Event::now(
            event_type,
            serde_json::json!({
                "code": code,
                "idempotency_key": receipt.idempotency_key,
            }),
        ));
    }

    to_json(&receipt)
}
