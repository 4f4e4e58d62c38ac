//! Node configuration loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::directory::DEFAULT_GRPC_PORT;
use crate::ordering::OrderingConfig;

/// One configured ledger peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    /// Network address (host only; the gRPC port is shared by the peer set).
    pub address: String,
    /// Hex-encoded Ed25519 public key.
    pub public_key: String,
}

/// Ordering trigger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderingSettings {
    /// Size trigger and per-proposal transaction cap.
    pub max_size: usize,
    /// Time trigger cadence in milliseconds.
    pub delay_ms: u64,
}

impl Default for OrderingSettings {
    fn default() -> Self {
        let defaults = OrderingConfig::default();
        Self {
            max_size: defaults.max_size,
            delay_ms: defaults.delay.as_millis() as u64,
        }
    }
}

impl From<&OrderingSettings> for OrderingConfig {
    fn from(settings: &OrderingSettings) -> Self {
        Self {
            max_size: settings.max_size,
            delay: Duration::from_millis(settings.delay_ms),
        }
    }
}

/// Top-level configuration for one ledger node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// This node's own address as it appears in the peer set.
    pub my_address: String,
    /// gRPC port shared by every peer.
    pub grpc_port: u16,
    /// Path to the identity secret file; generated on first start when the
    /// file does not exist.
    pub identity_path: Option<PathBuf>,
    /// The permissioned peer set.
    pub peers: Vec<PeerConfig>,
    /// Ordering triggers.
    pub ordering: OrderingSettings,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            my_address: "127.0.0.1".to_string(),
            grpc_port: DEFAULT_GRPC_PORT,
            identity_path: None,
            peers: Vec::new(),
            ordering: OrderingSettings::default(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file. Environment variables with the
    /// `KAGURA_` prefix override file values.
    ///
    /// # Example config (TOML)
    /// ```toml
    /// [node]
    /// my_address = "10.0.0.1"
    /// grpc_port = 50051
    ///
    /// [[node.peers]]
    /// address = "10.0.0.2"
    /// public_key = "…64 hex chars…"
    ///
    /// [node.ordering]
    /// max_size = 10
    /// delay_ms = 5000
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut figment = Figment::new();

        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            figment = match ext {
                "toml" => figment.merge(Toml::file(path)),
                _ => {
                    return Err(anyhow::anyhow!(
                        "Unsupported config file format: {}. Use .toml",
                        ext
                    ));
                }
            };
        } else {
            return Err(anyhow::anyhow!("Config file must have a .toml extension"));
        }

        // Environment variables take precedence over file config
        figment = figment.merge(Env::prefixed("KAGURA_").split("_"));

        let config: NodeConfig = figment.extract_inner("node").map_err(anyhow::Error::msg)?;

        Ok(config)
    }
}
