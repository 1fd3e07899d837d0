use std::path::{Path, PathBuf};
use serde::Deserialize;
use anyhow::{Context, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Header set by a trusted reverse proxy with the real client IP,
    /// e.g. "X-Real-IP". Unset: always use the peer address.
    #[serde(default)]
    pub real_ip_header: Option<String>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("/var/lib/device-registry/devices.db")
}

fn default_listen() -> String {
    "0.0.0.0:8888".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            real_ip_header: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.api.listen, "0.0.0.0:8888");
        assert_eq!(config.api.real_ip_header, None);
        assert_eq!(config.store.db_path, default_db_path());
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [store]
            db_path = "/tmp/devices.db"

            [api]
            real_ip_header = "X-Real-IP"
            "#,
        )
        .unwrap();
        assert_eq!(config.store.db_path, PathBuf::from("/tmp/devices.db"));
        assert_eq!(config.api.listen, "0.0.0.0:8888");
        assert_eq!(config.api.real_ip_header.as_deref(), Some("X-Real-IP"));
    }
}
