//! IPC command handlers.
//!
//! Each submodule implements the commands for one IPC category.

pub mod analytics;
pub mod checkout;
pub mod diagnostics;

use serde_json::Value;

use crate::rpc::RpcError;

/// Optional string parameter. Absent and `null` are both `None`.
fn optional_str(params: &Value, key: &str) -> Result<Option<String>, RpcError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(RpcError::invalid_params(&format!("{key} must be a string"))),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::internal_error(&format!("encode: {e}")))
}
