//! # Beacon Configuration
//!
//! Typed configuration for the beacon mDNS responder with sensible
//! defaults, strong validation, and support for YAML, JSON, and TOML
//! keyed on the file extension.

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum length of a DNS label; vendor identity strings become labels.
const MAX_LABEL_LENGTH: usize = 63;

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML syntax or type error.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON syntax or type error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML syntax or type error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Structurally valid configuration with a bad value.
    #[error("validation error: {0}")]
    Validation(String),

    /// The configuration file does not exist.
    #[error("file not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration for the beacon responder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network interface the responder binds to.
    pub interface: InterfaceConfig,

    /// Vendor identity advertised by the example handlers.
    pub vendor: VendorConfig,

    /// mDNS transport parameters.
    pub mdns: MdnsConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Network interface configuration, supplied by the enclosing
/// application or deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceConfig {
    /// Interface name (e.g. `eth0`).
    pub name: String,

    /// IPv4 address of the interface. Required at runtime; optional here
    /// so deployments can inject it late.
    pub ipv4: Option<Ipv4Addr>,
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            name: "eth0".to_string(),
            ipv4: None,
        }
    }
}

/// Vendor identity strings read by the example handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorConfig {
    /// Stable vendor node identifier.
    pub node_id: String,

    /// User-facing node name.
    pub node_name: String,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            node_id: "fa_node_id".to_string(),
            node_name: "fanode".to_string(),
        }
    }
}

/// mDNS transport parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MdnsConfig {
    /// UDP port to bind and reply to.
    pub port: u16,

    /// IPv4 multicast group.
    pub group: Ipv4Addr,

    /// IPv6 multicast group. Recognized for completeness; the responder
    /// replies on IPv4 only.
    pub group_v6: Ipv6Addr,

    /// Port advertised in outbound SRV records (the unencrypted web port
    /// in the default build).
    pub srv_port: u16,
}

impl Default for MdnsConfig {
    fn default() -> Self {
        Self {
            port: 5353,
            group: Ipv4Addr::new(224, 0, 0, 251),
            group_v6: Ipv6Addr::new(0xFF02, 0, 0, 0, 0, 0, 0, 0xFB),
            srv_port: 80,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Log format ("text" or "json").
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from a file, picking the parser by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;

        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?, // Default to YAML
        };

        Ok(config)
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Serializes to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.interface.name.is_empty() {
            return Err(ConfigError::Validation(
                "interface.name must not be empty".to_string(),
            ));
        }

        validate_label("vendor.node_id", &self.vendor.node_id)?;
        validate_label("vendor.node_name", &self.vendor.node_name)?;

        if self.mdns.port == 0 {
            return Err(ConfigError::Validation(
                "mdns.port must not be zero".to_string(),
            ));
        }
        if !self.mdns.group.is_multicast() {
            return Err(ConfigError::Validation(format!(
                "mdns.group {} is not a multicast address",
                self.mdns.group
            )));
        }

        match self.logging.format.as_str() {
            "text" | "json" => {}
            other => {
                return Err(ConfigError::Validation(format!(
                    "logging.format must be \"text\" or \"json\", got \"{other}\""
                )));
            }
        }

        Ok(())
    }
}

/// Vendor identity strings end up as single DNS labels.
fn validate_label(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!(
            "{field} must not be empty"
        )));
    }
    if value.len() > MAX_LABEL_LENGTH {
        return Err(ConfigError::Validation(format!(
            "{field} exceeds {MAX_LABEL_LENGTH} bytes"
        )));
    }
    if value.contains('.') {
        return Err(ConfigError::Validation(format!(
            "{field} must be a single label without dots"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();

        assert_eq!(config.mdns.port, 5353);
        assert_eq!(config.mdns.group, Ipv4Addr::new(224, 0, 0, 251));
        assert_eq!(config.vendor.node_id, "fa_node_id");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = Config::default();
        let yaml = config.to_yaml().unwrap();
        let parsed = Config::from_yaml(&yaml).unwrap();

        assert_eq!(parsed.mdns.port, config.mdns.port);
        assert_eq!(parsed.vendor.node_id, config.vendor.node_id);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = Config::from_yaml(
            r#"
vendor:
  node_id: mynode
mdns:
  srv_port: 8080
"#,
        )
        .unwrap();

        assert_eq!(config.vendor.node_id, "mynode");
        assert_eq!(config.vendor.node_name, "fanode");
        assert_eq!(config.mdns.srv_port, 8080);
        assert_eq!(config.mdns.port, 5353);
    }

    #[test]
    fn test_dotted_node_id_rejected() {
        let mut config = Config::default();
        config.vendor.node_id = "bad.id".to_string();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_port_rejected() {
        let mut config = Config::default();
        config.mdns.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_multicast_group_rejected() {
        let mut config = Config::default();
        config.mdns.group = Ipv4Addr::new(192, 168, 1, 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_logging_format_rejected() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }
}
