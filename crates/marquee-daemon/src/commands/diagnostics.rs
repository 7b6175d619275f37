//! Diagnostics command handlers.

use std::sync::Arc;

use serde_json::Value;

use crate::rpc::RpcError;
use crate::DaemonState;

/// Version, gateway environment and event count.
pub async fn get_daemon_status(state: &Arc<DaemonState>) -> Result<Value, RpcError> {
    Ok(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "gateway_environment": state.gateway_environment(),
        "events_emitted": state.event_bus.sequence(),
    }))
}
