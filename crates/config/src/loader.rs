//! Configuration loading from multiple sources

use crate::{ConfigError, DeployConfig, Result};
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Configuration loader with support for multiple formats and sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    ///
    /// Supports TOML, YAML, and JSON formats based on file extension
    pub fn from_file(path: &Path) -> Result<DeployConfig> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::LoadError("No file extension found".to_string()))?;

        let content = std::fs::read_to_string(path)?;

        match extension {
            "toml" => Self::from_toml(&content),
            "yaml" | "yml" => Self::from_yaml(&content),
            "json" => Self::from_json(&content),
            _ => Err(ConfigError::LoadError(format!(
                "Unsupported file extension: {}",
                extension
            ))),
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<DeployConfig> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from YAML string
    pub fn from_yaml(content: &str) -> Result<DeployConfig> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from JSON string
    pub fn from_json(content: &str) -> Result<DeployConfig> {
        serde_json::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from environment variables
    ///
    /// Uses default prefix "CARAVAN"
    pub fn from_env() -> Result<DeployConfig> {
        Self::from_env_with_prefix("CARAVAN")
    }

    /// Load configuration from environment variables with custom prefix
    ///
    /// Environment variables should be in the format: PREFIX_SECTION_KEY
    /// For example: CARAVAN_NETWORK_RPC_URL=http://127.0.0.1:8545
    pub fn from_env_with_prefix(prefix: &str) -> Result<DeployConfig> {
        let config = Config::builder()
            .add_source(Environment::with_prefix(prefix).separator("_"))
            .build()?;

        config.try_deserialize().map_err(ConfigError::from)
    }

    /// Load configuration from a file with environment variable overrides
    pub fn from_file_with_env(path: &Path, prefix: &str) -> Result<DeployConfig> {
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => FileFormat::Toml,
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            other => {
                return Err(ConfigError::LoadError(format!(
                    "Unsupported file extension: {:?}",
                    other
                )))
            }
        };

        let config = Config::builder()
            .add_source(File::new(path.to_string_lossy().as_ref(), format))
            .add_source(Environment::with_prefix(prefix).separator("_"))
            .build()?;

        config.try_deserialize().map_err(ConfigError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_TOML: &str = r#"
[network]
chain_id = "11155111"
rpc_url = "https://rpc.example.org"
account = "0xaccount"

[supervisor]
stall_threshold_ms = 45000
fee_bump_percent = 15

[journal]
dir = "ignore/deployments"
"#;

    #[test]
    fn test_from_toml() {
        let config = ConfigLoader::from_toml(SAMPLE_TOML).unwrap();
        assert_eq!(config.network.chain_id, "11155111");
        assert_eq!(config.supervisor.stall_threshold_ms, 45_000);
        assert_eq!(config.supervisor.fee_bump_percent, 15);
        // Unset fields fall back to defaults.
        assert_eq!(config.supervisor.max_drop_resends, 3);
        assert_eq!(config.journal.dir, "ignore/deployments");
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
network:
  chain_id: "1"
  rpc_url: "https://mainnet.example.org"
  account: "0xacc"
supervisor:
  poll_interval_ms: 2000
"#;
        let config = ConfigLoader::from_yaml(yaml).unwrap();
        assert_eq!(config.network.chain_id, "1");
        assert_eq!(config.supervisor.poll_interval_ms, 2_000);
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "network": {
                "chain_id": "10",
                "rpc_url": "https://op.example.org",
                "account": "0xacc"
            }
        }"#;
        let config = ConfigLoader::from_json(json).unwrap();
        assert_eq!(config.network.chain_id, "10");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(SAMPLE_TOML.as_bytes()).unwrap();

        let config = ConfigLoader::from_file(file.path()).unwrap();
        assert_eq!(config.network.account, "0xaccount");
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let result = ConfigLoader::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}
