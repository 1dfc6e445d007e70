use std::{
    collections::HashSet,
    fmt,
    net::{AddrParseError, IpAddr, SocketAddr},
    sync::Arc,
};

use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use thiserror::Error;

use crate::{
    config::{DeviceConfig, PayloadEncoding},
    hardware::fan::defs::{CONTROL_PORT, PowerState},
    identity::{IdentityProvider, IdentityToken, NamespacedUuid},
};

/* === Definitions === */

/// Static description of one controllable fan. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceRecord {
    pub id: String,
    pub display_name: String,
    pub room: String,
    pub address: IpAddr,
    pub on_payload: Bytes,
    pub off_payload: Bytes,
}

pub struct DeviceRegistry {
    devices: Vec<Arc<DeviceRecord>>,
    identity: Arc<dyn IdentityProvider>,
}

pub struct RegistryBuilder {
    pending: Vec<Pending>,
    identity: Arc<dyn IdentityProvider>,
}

/// A device added to the builder, kept in call order until validation.
enum Pending {
    Config(DeviceConfig),
    Record(DeviceRecord),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Device id must not be empty")]
    EmptyId,

    #[error("Duplicate device id: {0}")]
    DuplicateId(String),

    #[error("Device {id} has an empty {kind} payload")]
    EmptyPayload { id: String, kind: PowerState },

    #[error("Device {id} uses the same payload for on and off")]
    IdenticalPayloads { id: String },

    #[error("Device {id} has an invalid address {address:?}: {source}")]
    InvalidAddress {
        id: String,
        address: String,
        source: AddrParseError,
    },

    #[error("Device {id} has an undecodable {kind} payload: {source}")]
    InvalidEncoding {
        id: String,
        kind: PowerState,
        source: base64::DecodeError,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("Device not found: {0}")]
    NotFound(String),
}

/* === Implementations === */

impl DeviceRecord {
    pub fn try_from_config(config: &DeviceConfig) -> Result<Self, ConfigError> {
        let id = config.id.clone();

        let address = config
            .ip
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidAddress {
                id: id.clone(),
                address: config.ip.clone(),
                source,
            })?;

        let on_payload = decode_payload(&id, PowerState::On, &config.on_code, config.encoding)?;
        let off_payload = decode_payload(&id, PowerState::Off, &config.off_code, config.encoding)?;

        let record = DeviceRecord {
            id,
            display_name: config.name.clone(),
            room: config.room.clone(),
            address,
            on_payload,
            off_payload,
        };

        record.validate()?;
        Ok(record)
    }

    pub fn payload(&self, state: PowerState) -> &Bytes {
        match state {
            PowerState::On => &self.on_payload,
            PowerState::Off => &self.off_payload,
        }
    }

    /// Destination of command datagrams for this device.
    pub fn control_address(&self) -> SocketAddr {
        SocketAddr::new(self.address, CONTROL_PORT)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.id.is_empty() {
            return Err(ConfigError::EmptyId);
        }

        for state in [PowerState::On, PowerState::Off] {
            if self.payload(state).is_empty() {
                return Err(ConfigError::EmptyPayload {
                    id: self.id.clone(),
                    kind: state,
                });
            }
        }

        if self.on_payload == self.off_payload {
            return Err(ConfigError::IdenticalPayloads {
                id: self.id.clone(),
            });
        }

        Ok(())
    }
}

impl fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] @ {}", self.display_name, self.id, self.address)
    }
}

impl DeviceRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            pending: Vec::new(),
            identity: Arc::new(NamespacedUuid::default()),
        }
    }

    /// All devices, in declaration order.
    pub fn list_devices(&self) -> &[Arc<DeviceRecord>] {
        &self.devices
    }

    pub fn get(&self, id: &str) -> Result<&Arc<DeviceRecord>, LookupError> {
        self.devices
            .iter()
            .find(|device| device.id == id)
            .ok_or_else(|| LookupError::NotFound(id.to_owned()))
    }

    /// Derived from `device.id` alone.
    pub fn derive_identity(&self, device: &DeviceRecord) -> IdentityToken {
        self.identity.derive(&device.id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl RegistryBuilder {
    pub fn with_identity(mut self, identity: impl IdentityProvider + 'static) -> Self {
        self.identity = Arc::new(identity);
        self
    }

    pub fn with_configs<'a>(mut self, configs: impl IntoIterator<Item = &'a DeviceConfig>) -> Self {
        self.pending
            .extend(configs.into_iter().cloned().map(Pending::Config));
        self
    }

    pub fn with_record(mut self, record: DeviceRecord) -> Self {
        self.pending.push(Pending::Record(record));
        self
    }

    /// Validates every device. Either the whole list is accepted or nothing is.
    pub fn build(self) -> Result<DeviceRegistry, ConfigError> {
        let mut devices = Vec::with_capacity(self.pending.len());

        for entry in self.pending {
            let record = match entry {
                Pending::Config(config) => DeviceRecord::try_from_config(&config)?,
                Pending::Record(record) => {
                    record.validate()?;
                    record
                }
            };

            devices.push(record);
        }

        let mut seen = HashSet::with_capacity(devices.len());

        for device in &devices {
            if !seen.insert(device.id.as_str()) {
                return Err(ConfigError::DuplicateId(device.id.clone()));
            }
        }

        tracing::debug!("Registry built with {} devices", devices.len());

        Ok(DeviceRegistry {
            devices: devices.into_iter().map(Arc::new).collect(),
            identity: self.identity,
        })
    }
}

fn decode_payload(
    id: &str,
    kind: PowerState,
    code: &str,
    encoding: PayloadEncoding,
) -> Result<Bytes, ConfigError> {
    match encoding {
        PayloadEncoding::Text => Ok(Bytes::copy_from_slice(code.as_bytes())),

        PayloadEncoding::Base64 => STANDARD
            .decode(code.trim())
            .map(Bytes::from)
            .map_err(|source| ConfigError::InvalidEncoding {
                id: id.to_owned(),
                kind,
                source,
            }),
    }
}
