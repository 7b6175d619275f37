//! Configuration file management.
//!
//! `$MARQUEE_DATA_DIR/config.toml`, every field optional.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use marquee_checkout::pricing::PricingTable;
use marquee_db::queries::settings;
use marquee_gateway::Environment;
use marquee_revenue::splits::{ShareRatio, SplitConfig};
use marquee_types::{DEFAULT_LEDGER_EPOCH, DEFAULT_PARTNER_SHARE_BPS, MIN_OPEN_AMOUNT};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

/// Environment variable that overrides `gateway.access_token`.
pub const TOKEN_ENV: &str = "MARQUEE_GATEWAY_TOKEN";

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "MARQUEE_DATA_DIR";

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Payment gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub environment: Environment,
    /// Bearer token. Empty = read from `MARQUEE_GATEWAY_TOKEN`.
    #[serde(default)]
    pub access_token: String,
    /// Restrict the feed and charges to one location.
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Upper bound on feed pages per report.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Attempts per charge, including the first.
    #[serde(default = "default_charge_attempts")]
    pub charge_attempts: u32,
    /// Use the in-memory gateway instead of the REST API.
    #[serde(default)]
    pub use_stub: bool,
}

/// Ledger and revenue split configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// RFC 3339 instant. Payments before it are excluded.
    #[serde(default = "default_epoch")]
    pub epoch: String,
    #[serde(default = "default_partner_share")]
    pub partner_share_bps: u32,
    #[serde(default)]
    pub pass_share_bps: Option<u32>,
    #[serde(default)]
    pub block_share_bps: Option<u32>,
    #[serde(default)]
    pub party_share_bps: Option<u32>,
}

/// Static prices, in minor units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_festival_pass")]
    pub festival_pass: u64,
    #[serde(default = "default_all_access_pass")]
    pub all_access_pass: u64,
    #[serde(default = "default_subscription")]
    pub subscription: u64,
    #[serde(default = "default_min_open_amount")]
    pub min_open_amount: u64,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_pages() -> usize {
    marquee_gateway::feed::DEFAULT_MAX_PAGES
}

fn default_charge_attempts() -> u32 {
    1
}

fn default_epoch() -> String {
    DEFAULT_LEDGER_EPOCH.to_string()
}

fn default_partner_share() -> u32 {
    u32::from(DEFAULT_PARTNER_SHARE_BPS)
}

fn default_festival_pass() -> u64 {
    PricingTable::default().festival_pass
}

fn default_all_access_pass() -> u64 {
    PricingTable::default().all_access_pass
}

fn default_subscription() -> u64 {
    PricingTable::default().subscription
}

fn default_min_open_amount() -> u64 {
    MIN_OPEN_AMOUNT
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            access_token: String::new(),
            location_id: None,
            request_timeout_secs: default_request_timeout(),
            max_pages: default_max_pages(),
            charge_attempts: default_charge_attempts(),
            use_stub: false,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            epoch: default_epoch(),
            partner_share_bps: default_partner_share(),
            pass_share_bps: None,
            block_share_bps: None,
            party_share_bps: None,
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            festival_pass: default_festival_pass(),
            all_access_pass: default_all_access_pass(),
            subscription: default_subscription(),
            min_open_amount: default_min_open_amount(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl GatewayConfig {
    /// Reject settings that would make every gateway call fail.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.request_timeout_secs >= 1,
            "gateway.request_timeout_secs must be at least 1, got {}",
            self.request_timeout_secs
        );
        anyhow::ensure!(
            self.max_pages >= 1,
            "gateway.max_pages must be at least 1, got {}",
            self.max_pages
        );
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Access token, with the environment variable taking precedence.
    pub fn token(&self) -> String {
        std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.access_token.clone())
    }
}

impl LedgerConfig {
    pub fn epoch(&self) -> anyhow::Result<DateTime<Utc>> {
        let parsed = DateTime::parse_from_rfc3339(&self.epoch)
            .map_err(|e| anyhow::anyhow!("ledger.epoch {:?}: {e}", self.epoch))?;
        Ok(parsed.with_timezone(&Utc))
    }

    /// Split ratios from the file, before store overrides.
    pub fn splits(&self) -> anyhow::Result<SplitConfig> {
        let ratio = |bps: u32| ShareRatio::from_bps(bps).map_err(anyhow::Error::from);
        Ok(SplitConfig {
            partner_share: ratio(self.partner_share_bps)?,
            pass_override: self.pass_share_bps.map(ratio).transpose()?,
            block_override: self.block_share_bps.map(ratio).transpose()?,
            party_override: self.party_share_bps.map(ratio).transpose()?,
        })
    }

    /// Split ratios with the admin overrides in the settings table applied.
    ///
    /// A sector override set in the store wins over the config file.
    pub fn split_config(&self, conn: &Connection) -> anyhow::Result<SplitConfig> {
        let mut config = self.splits()?;
        let stored = |key: &str| -> anyhow::Result<Option<ShareRatio>> {
            match settings::get_opt_u64(conn, key)? {
                Some(bps) => {
                    let bps = u32::try_from(bps)
                        .map_err(|_| anyhow::anyhow!("setting {key} out of range: {bps}"))?;
                    Ok(Some(ShareRatio::from_bps(bps)?))
                }
                None => Ok(None),
            }
        };
        if let Some(r) = stored(settings::SPLIT_PASS_BPS)? {
            config.pass_override = Some(r);
        }
        if let Some(r) = stored(settings::SPLIT_BLOCK_BPS)? {
            config.block_override = Some(r);
        }
        if let Some(r) = stored(settings::SPLIT_PARTY_BPS)? {
            config.party_override = Some(r);
        }
        Ok(config)
    }
}

impl PricingConfig {
    pub fn table(&self) -> PricingTable {
        PricingTable {
            festival_pass: self.festival_pass,
            all_access_pass: self.all_access_pass,
            subscription: self.subscription,
            min_open_amount: self.min_open_amount,
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::parse(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a config file body.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: DaemonConfig = toml::from_str(content)?;
        config.gateway.validate()?;
        config.ledger.epoch()?;
        config.ledger.splits()?;
        Ok(config)
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".marquee"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/marquee"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.gateway.environment, Environment::Sandbox);
        assert_eq!(config.gateway.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.gateway.max_pages, 1000);
        assert!(!config.gateway.use_stub);
        assert_eq!(config.ledger.partner_share_bps, 7000);
        assert_eq!(config.pricing.table(), PricingTable::default());
        assert_eq!(config.advanced.log_level, "info");

        let epoch = config.ledger.epoch().expect("epoch");
        assert_eq!(epoch.timestamp(), 1_725_148_800);
    }

    #[test]
    fn test_config_serialization() {
        let config = DaemonConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let _parsed: DaemonConfig = toml::from_str(&toml_str).expect("parse");
    }

    #[test]
    fn test_partial_file() {
        let config = DaemonConfig::parse(
            r#"
            [gateway]
            environment = "production"
            use_stub = true

            [ledger]
            party_share_bps = 5000

            [pricing]
            festival_pass = 3000
            "#,
        )
        .expect("parse");

        assert_eq!(config.gateway.environment, Environment::Production);
        assert!(config.gateway.use_stub);
        assert_eq!(config.pricing.festival_pass, 3000);
        assert_eq!(config.pricing.subscription, 999);

        let splits = config.ledger.splits().expect("splits");
        assert_eq!(splits.partner_share.bps(), 7000);
        assert_eq!(splits.party_override.map(ShareRatio::bps), Some(5000));
        assert!(splits.pass_override.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(DaemonConfig::parse("[ledger]\npartner_share_bps = 10001\n").is_err());
        assert!(DaemonConfig::parse("[ledger]\nepoch = \"last tuesday\"\n").is_err());
    }

    #[test]
    fn test_zero_gateway_limits_rejected() {
        let err = DaemonConfig::parse("[gateway]\nrequest_timeout_secs = 0\n")
            .expect_err("zero timeout");
        assert!(err.to_string().contains("request_timeout_secs"));

        let err = DaemonConfig::parse("[gateway]\nmax_pages = 0\n").expect_err("zero page cap");
        assert!(err.to_string().contains("max_pages"));

        let config = DaemonConfig::parse("[gateway]\nrequest_timeout_secs = 1\nmax_pages = 1\n")
            .expect("minimums accepted");
        assert_eq!(config.gateway.request_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_store_override_wins() {
        let conn = marquee_db::open_memory().expect("open test db");
        settings::set(&conn, settings::SPLIT_BLOCK_BPS, "6000").expect("set");

        let ledger = LedgerConfig {
            block_share_bps: Some(8000),
            pass_share_bps: Some(7500),
            ..LedgerConfig::default()
        };
        let splits = ledger.split_config(&conn).expect("split config");
        assert_eq!(splits.block_override.map(ShareRatio::bps), Some(6000));
        assert_eq!(splits.pass_override.map(ShareRatio::bps), Some(7500));
        assert!(splits.party_override.is_none());
    }

    #[test]
    fn test_store_override_out_of_range() {
        let conn = marquee_db::open_memory().expect("open test db");
        settings::set(&conn, settings::SPLIT_PASS_BPS, "20000").expect("set");
        assert!(LedgerConfig::default().split_config(&conn).is_err());
    }
}
