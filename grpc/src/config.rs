//! Transport configuration.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Configuration for the gRPC server and outbound link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrpcConfig {
    /// Address to listen on (e.g., "0.0.0.0:50051")
    #[serde(with = "socket_addr_serde")]
    pub listen_addr: SocketAddr,
    /// Per-call timeout for outbound RPCs, in seconds
    pub request_timeout_secs: u64,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:50051".parse().unwrap(),
            request_timeout_secs: 30,
        }
    }
}

impl GrpcConfig {
    /// Load configuration from a TOML file. Environment variables with the
    /// `GRPC_` prefix override file values.
    ///
    /// # Example config (TOML)
    /// ```toml
    /// [grpc]
    /// listen_addr = "0.0.0.0:50051"
    /// request_timeout_secs = 30
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
        figment = figment.merge(Env::prefixed("GRPC_").split("_"));

        let config: GrpcConfig = figment.extract_inner("grpc").map_err(anyhow::Error::msg)?;

        Ok(config)
    }
}

/// Custom serde module for SocketAddr to handle string serialization.
mod socket_addr_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::net::SocketAddr;

    pub fn serialize<S>(addr: &SocketAddr, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        addr.to_string().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let config = GrpcConfig::default();
        assert_eq!(config.listen_addr.to_string(), "0.0.0.0:50051");
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn from_path_loads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grpc.toml");
        std::fs::write(
            &path,
            r#"
[grpc]
listen_addr = "127.0.0.1:6001"
request_timeout_secs = 5
"#,
        )
        .unwrap();

        let config = GrpcConfig::from_path(&path).unwrap();
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:6001");
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn from_path_unsupported_extension() {
        let result = GrpcConfig::from_path("config.yaml");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Unsupported"));
    }

    #[test]
    fn from_path_no_extension() {
        let result = GrpcConfig::from_path("config");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("extension"));
    }
}
