use std::{fmt, path::PathBuf};

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::hardware::fan::defs::PowerState;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// Initial controller state, applied to every device on launch.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default)]
    pub active: PowerState,
    #[serde(default = "default_rotation_speed")]
    pub rotation_speed: u8,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub prune_stale: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

/// A device entry as written in the configuration file. Validation happens
/// when the registry is built, not while parsing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub room: String,
    pub ip: String,
    #[serde(default)]
    pub encoding: PayloadEncoding,
    pub on_code: String,
    pub off_code: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    /// The bytes of the code string are sent as-is.
    #[default]
    Text,
    /// The code string is standard base64 and is decoded before sending.
    Base64,
}

impl Config {
    pub async fn load(path: &str) -> Result<Self> {
        let data = fs::read(path)
            .await
            .wrap_err_with(|| format!("Failed to read config file {path}"))?;

        Self::parse(&data)
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        serde_yaml::from_slice(data).wrap_err("Failed to parse config")
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            active: PowerState::Off,
            rotation_speed: default_rotation_speed(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Devices ({}):", self.devices.len())?;

        for device in &self.devices {
            writeln!(f, "  {} [{}] @ {}", device.name, device.id, device.ip)?;
        }

        let cache = self.cache.path.as_ref().map(|p| p.display().to_string());
        write!(f, "Cache: {}", cache.as_deref().unwrap_or("in-memory"))
    }
}

const fn default_rotation_speed() -> u8 {
    40
}

const fn default_port() -> u16 {
    8581
}

#[cfg(test)]
mod tests {
    use crate::registry::DeviceRegistry;

    use super::*;

    const EXAMPLE: &str = r#"
defaults:
  active: on
cache:
  path: accessories.json
devices:
  - id: office_fan
    name: Office Fan
    room: Office Room
    ip: 192.168.0.130
    on_code: ON_BYTES
    off_code: OFF_BYTES
  - id: guest_fan
    name: Guest Bedroom Fan
    ip: 192.168.0.238
    encoding: base64
    on_code: T04=
    off_code: T0ZG
"#;

    #[test]
    fn test_parse_config() {
        let config = Config::parse(EXAMPLE.as_bytes()).unwrap();

        assert_eq!(config.defaults.active, PowerState::On);
        assert_eq!(config.defaults.rotation_speed, 40);
        assert_eq!(config.server.port, 8581);
        assert_eq!(config.cache.path, Some(PathBuf::from("accessories.json")));
        assert!(!config.cache.prune_stale);

        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[0].encoding, PayloadEncoding::Text);
        assert_eq!(config.devices[1].encoding, PayloadEncoding::Base64);
        assert_eq!(config.devices[1].room, "");
    }

    #[test]
    fn test_empty_config() {
        let config = Config::parse(b"{}").unwrap();

        assert_eq!(config.defaults.active, PowerState::Off);
        assert!(config.devices.is_empty());
        assert!(config.cache.path.is_none());
    }

    #[test]
    fn test_bundled_config() {
        let config = Config::parse(include_bytes!("../config.yaml")).unwrap();
        let registry = DeviceRegistry::builder()
            .with_configs(&config.devices)
            .build()
            .unwrap();

        assert_eq!(registry.len(), 7);
        assert_eq!(registry.list_devices()[0].id, "office_fan");
    }

    #[test]
    fn test_missing_code_is_rejected() {
        let data = "devices:\n  - id: a\n    name: A\n    ip: 10.0.0.1\n    on_code: x\n";
        assert!(Config::parse(data.as_bytes()).is_err());
    }
}
