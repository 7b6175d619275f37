//! marquee-daemon: revenue analytics and checkout service.
//!
//! Single OS process running a Tokio async runtime. The admin console and
//! the storefront talk to the daemon via JSON-RPC over a Unix socket.

mod commands;
mod config;
mod events;
mod rpc;

use std::sync::Arc;

use marquee_checkout::pricing::PricingResolver;
use marquee_checkout::purchase::PurchaseFlow;
use marquee_gateway::charge::ChargeSubmitter;
use marquee_gateway::client::HttpGateway;
use marquee_gateway::stub::StubGateway;
use marquee_gateway::PaymentGateway;
use marquee_revenue::classify::NoteClassifier;
use rusqlite::Connection;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, warn};

use crate::config::DaemonConfig;
use crate::events::{Event, EventBus};
use crate::rpc::RpcServer;

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Database connection.
    pub db: Arc<Mutex<Connection>>,
    pub config: DaemonConfig,
    pub gateway: Arc<dyn PaymentGateway>,
    pub classifier: NoteClassifier,
    pub pricing: PricingResolver,
    pub purchases: PurchaseFlow,
    /// Event bus for pushing events to subscribers.
    pub event_bus: EventBus,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

impl DaemonState {
    pub fn new(conn: Connection, config: DaemonConfig, gateway: Arc<dyn PaymentGateway>) -> Self {
        let db = Arc::new(Mutex::new(conn));
        let charges = ChargeSubmitter::new(gateway.clone(), config.gateway.location_id.clone())
            .with_max_attempts(config.gateway.charge_attempts);
        let purchases = PurchaseFlow::new(
            db.clone(),
            PricingResolver::new(config.pricing.table()),
            charges,
        );
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            db,
            pricing: PricingResolver::new(config.pricing.table()),
            purchases,
            classifier: NoteClassifier::new(),
            gateway,
            config,
            event_bus: EventBus::new(1000),
            shutdown_tx,
        }
    }

    /// "stub", "sandbox" or "production".
    pub fn gateway_environment(&self) -> &'static str {
        if self.config.gateway.use_stub {
            "stub"
        } else {
            self.config.gateway.environment.as_str()
        }
    }
}

fn build_gateway(config: &DaemonConfig) -> anyhow::Result<Arc<dyn PaymentGateway>> {
    if config.gateway.use_stub {
        warn!("using in-memory stub gateway; no real payments will be read or made");
        return Ok(Arc::new(StubGateway::new()));
    }

    let token = config.gateway.token();
    if token.is_empty() {
        anyhow::bail!(
            "no gateway access token: set {} or gateway.access_token, or gateway.use_stub = true",
            config::TOKEN_ENV
        );
    }
    let client = HttpGateway::new(
        config.gateway.environment,
        &token,
        config.gateway.request_timeout(),
    )?;
    info!(base_url = client.base_url(), "payment gateway configured");
    Ok(Arc::new(client))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // 2. Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("marquee={}", config.advanced.log_level).parse()?),
        )
        .init();

    info!("Marquee daemon starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 3. Open database
    let db_path = data_dir.join("marquee.db");
    let conn = marquee_db::open(&db_path)?;
    info!(path = ?db_path, "store opened");

    // 4. Gateway
    let gateway = build_gateway(&config)?;

    // 5. Build daemon state
    let state = Arc::new(DaemonState::new(conn, config, gateway));

    // 6. Start IPC server
    let socket_path = data_dir.join("marquee.sock");
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    info!("Starting JSON-RPC server on {:?}", socket_path);

    // 7. Emit DaemonStarted event
    state.event_bus.emit(Event::now(
        events::DAEMON_STARTED,
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "gateway_environment": state.gateway_environment(),
        }),
    ));

    // 8. Run the RPC server until shutdown
    let mut shutdown_rx = state.shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    info!("Daemon shutting down gracefully");

    let _ = std::fs::remove_file(&socket_path);

    info!("Daemon stopped");
    Ok(())
}
