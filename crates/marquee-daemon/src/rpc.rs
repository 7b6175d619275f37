//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! newline-delimited JSON-RPC 2.0 calls to the command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{debug, error, info, warn};

use marquee_checkout::CheckoutError;
use marquee_gateway::GatewayError;

use crate::commands;
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC success response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Result or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    /// Numeric error code.
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self {
            code: -32700,
            message: "PARSE_ERROR".to_string(),
            data: None,
        }
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self {
            code: -32600,
            message: "INVALID_REQUEST".to_string(),
            data: None,
        }
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "METHOD_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"method": method})),
        }
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self {
            code: -32602,
            message: "INVALID_PARAMS".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self {
            code: -32603,
            message: "INTERNAL_ERROR".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    fn coded(code: i32, message: &str, data: Option<serde_json::Value>) -> Self {
        Self {
            code,
            message: message.to_string(),
            data,
        }
    }

    /// Unknown access type (-32040).
    pub fn unknown_access_type(access_type: &str) -> Self {
        Self::coded(
            -32040,
            "UNKNOWN_ACCESS_TYPE",
            Some(serde_json::json!({"access_type": access_type})),
        )
    }

    /// Open amount under the minimum (-32041).
    pub fn amount_too_low(amount: u64, minimum: u64) -> Self {
        Self::coded(
            -32041,
            "AMOUNT_TOO_LOW",
            Some(serde_json::json!({"amount": amount, "minimum": minimum})),
        )
    }

    /// Item missing or unpriced (-32042).
    pub fn item_not_found(detail: &str) -> Self {
        Self::coded(-32042, "ITEM_NOT_FOUND", Some(serde_json::json!({"detail": detail})))
    }

    /// Promo code has no uses left (-32043).
    pub fn quota_exceeded(code: &str) -> Self {
        Self::coded(-32043, "QUOTA_EXCEEDED", Some(serde_json::json!({"code": code})))
    }

    /// Promo code does not exist (-32044).
    pub fn promo_not_found(code: &str) -> Self {
        Self::coded(-32044, "PROMO_NOT_FOUND", Some(serde_json::json!({"code": code})))
    }

    /// The gateway rejected or failed a charge (-32050).
    pub fn gateway_error(detail: &str) -> Self {
        Self::coded(-32050, "GATEWAY_ERROR", Some(serde_json::json!({"detail": detail})))
    }

    /// The gateway could not be reached in time (-32051).
    pub fn gateway_unreachable(detail: &str) -> Self {
        Self::coded(-32051, "GATEWAY_UNREACHABLE", Some(serde_json::json!({"detail": detail})))
    }

    /// The store failed (-32060).
    pub fn store_unavailable(detail: &str) -> Self {
        Self::coded(-32060, "STORE_UNAVAILABLE", Some(serde_json::json!({"detail": detail})))
    }
}

impl From<GatewayError> for RpcError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Unreachable(_) | GatewayError::Timeout => {
                Self::gateway_unreachable(&e.to_string())
            }
            other => Self::gateway_error(&other.to_string()),
        }
    }
}

impl From<CheckoutError> for RpcError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::UnknownAccessType(name) => Self::unknown_access_type(&name),
            CheckoutError::AmountTooLow { amount, minimum } => Self::amount_too_low(amount, minimum),
            CheckoutError::ItemRequired(_) | CheckoutError::AmountRequired(_) => {
                Self::invalid_params(&e.to_string())
            }
            CheckoutError::ItemNotFound { .. } | CheckoutError::PriceUnavailable { .. } => {
                Self::item_not_found(&e.to_string())
            }
            CheckoutError::QuotaExceeded(code) => Self::quota_exceeded(&code),
            CheckoutError::PromoNotFound(code) => Self::promo_not_found(&code),
            CheckoutError::InvalidDiscount { .. } => Self::internal_error(&e.to_string()),
            CheckoutError::Store(db) => Self::store_unavailable(&db.to_string()),
            CheckoutError::Gateway(gw) => gw.into(),
        }
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break; // EOF
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => dispatch_request(state.clone(), request).await,
            Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
        };

        let mut response_json = serde_json::to_string(&response)?;
        response_json.push('\n');
        writer.write_all(response_json.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
pub(crate) async fn dispatch_request(state: Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();

    debug!("Dispatching RPC method: {}", method);

    if request.jsonrpc != "2.0" {
        return RpcResponse::error(id, RpcError::invalid_request());
    }

    let result = match method {
        // Revenue
        "get_revenue_report" => commands::analytics::get_revenue_report(&state, &request.params).await,
        "get_outstanding_balance" => {
            commands::analytics::get_outstanding_balance(&state, &request.params).await
        }
        "classify_memo" => commands::analytics::classify_memo(&state, &request.params).await,

        // Checkout
        "resolve_price" => commands::checkout::resolve_price(&state, &request.params).await,
        "check_promo" => commands::checkout::check_promo(&state, &request.params).await,
        "purchase" => commands::checkout::purchase(&state, &request.params).await,

        // Diagnostics
        "get_daemon_status" => commands::diagnostics::get_daemon_status(&state).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}
