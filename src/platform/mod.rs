//! Host integration: reconciles the registry against the accessory cache and
//! hands out one controller per configured fan.

use std::{fmt, sync::Arc};

use eyre::Result;
use serde::Serialize;

use crate::{
    config::{Config, Defaults},
    hardware::{
        FanController,
        fan::{
            defs::AccessoryInformation,
            protocol::{Transport, UdpLink},
        },
    },
    identity::IdentityToken,
    registry::{DeviceRecord, DeviceRegistry, LookupError},
};

use self::cache::{AccessoryCache, CachedAccessory};

pub mod cache;

/* === Definitions === */

pub struct Platform {
    registry: Arc<DeviceRegistry>,
    transport: Arc<dyn Transport>,
    defaults: Defaults,
    prune_stale: bool,
}

/// A fan as presented to the host.
pub struct Accessory {
    pub uuid: IdentityToken,
    pub info: AccessoryInformation,
    pub origin: Origin,
    pub controller: FanController,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Not previously known to the host, registered during this launch.
    New,
    /// Matched an accessory restored from the cache.
    Restored,
}

/// Every accessory created by a launch, in registry order.
pub struct Accessories {
    accessories: Vec<Accessory>,
}

/* === Implementations === */

impl Platform {
    pub fn new(
        registry: DeviceRegistry,
        transport: Arc<dyn Transport>,
        defaults: Defaults,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            transport,
            defaults,
            prune_stale: false,
        }
    }

    /// Builds the registry and the UDP transport described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = DeviceRegistry::builder()
            .with_configs(&config.devices)
            .build()?;

        let platform = Self::new(registry, Arc::new(UdpLink), config.defaults)
            .with_prune_stale(config.cache.prune_stale);

        Ok(platform)
    }

    pub fn with_prune_stale(mut self, prune_stale: bool) -> Self {
        self.prune_stale = prune_stale;
        self
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// A standalone controller for one device, without touching the cache.
    pub fn controller(&self, id: &str) -> Result<FanController, LookupError> {
        let record = self.registry.get(id)?;
        Ok(self.new_controller(record))
    }

    fn new_controller(&self, record: &Arc<DeviceRecord>) -> FanController {
        FanController::new(record.clone(), self.transport.clone(), self.defaults)
    }

    /// Matches every configured device against `cache`, registering the ones
    /// the host has not seen before. Nothing is sent to the fans.
    pub fn launch(&self, cache: &mut AccessoryCache) -> Accessories {
        let mut accessories = Vec::with_capacity(self.registry.len());

        for record in self.registry.list_devices() {
            let uuid = self.registry.derive_identity(record);

            let origin = match cache.get(&uuid) {
                Some(existing) => {
                    tracing::info!(
                        "Restoring existing accessory from cache: {}",
                        existing.display_name
                    );
                    Origin::Restored
                }

                None => {
                    tracing::info!("Adding new accessory: {}", record.display_name);
                    Origin::New
                }
            };

            // Refreshes the display name of restored entries as well
            cache.register(CachedAccessory {
                uuid,
                device_id: record.id.clone(),
                display_name: record.display_name.clone(),
            });

            accessories.push(Accessory {
                uuid,
                info: AccessoryInformation::new(&record.display_name),
                origin,
                controller: self.new_controller(record),
            });
        }

        self.handle_stale(cache, &accessories);

        Accessories { accessories }
    }

    fn handle_stale(&self, cache: &mut AccessoryCache, accessories: &[Accessory]) {
        let stale: Vec<_> = cache
            .entries()
            .iter()
            .filter(|entry| !accessories.iter().any(|a| a.uuid == entry.uuid))
            .cloned()
            .collect();

        for entry in stale {
            if self.prune_stale {
                tracing::info!("Removing existing accessory from cache: {}", entry.display_name);
                cache.unregister(&entry.uuid);
            } else {
                tracing::warn!(
                    "Cached accessory {} ({}) is no longer configured",
                    entry.display_name,
                    entry.device_id
                );
            }
        }
    }
}

impl Accessories {
    pub fn get(&self, id: &str) -> Result<&Accessory, LookupError> {
        self.accessories
            .iter()
            .find(|a| a.id() == id)
            .ok_or_else(|| LookupError::NotFound(id.to_owned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Accessory> {
        self.accessories.iter()
    }

    pub fn len(&self) -> usize {
        self.accessories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessories.is_empty()
    }
}

impl Accessory {
    pub fn id(&self) -> &str {
        &self.controller.record().id
    }
}

impl fmt::Display for Accessory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.controller.record(), self.uuid)
    }
}
