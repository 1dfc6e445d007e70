use std::{
    io,
    path::PathBuf,
};

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::identity::IdentityToken;

/// Accessories the host has registered before, keyed by identity token.
///
/// Only identity and display metadata are kept, never power state.
#[derive(Debug, Default)]
pub struct AccessoryCache {
    path: Option<PathBuf>,
    entries: Vec<CachedAccessory>,
    dirty: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct CachedAccessory {
    pub uuid: IdentityToken,
    pub device_id: String,
    pub display_name: String,
}

impl AccessoryCache {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens a file-backed cache. A missing file is an empty cache.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let entries = match fs::read(&path).await {
            Ok(data) => serde_json::from_slice(&data)
                .wrap_err_with(|| format!("Malformed accessory cache {}", path.display()))?,

            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No accessory cache at {}, starting empty", path.display());
                Vec::new()
            }

            Err(e) => {
                return Err(e)
                    .wrap_err_with(|| format!("Failed to read accessory cache {}", path.display()));
            }
        };

        Ok(Self {
            path: Some(path),
            entries,
            dirty: false,
        })
    }

    pub fn get(&self, uuid: &IdentityToken) -> Option<&CachedAccessory> {
        self.entries.iter().find(|entry| entry.uuid == *uuid)
    }

    pub fn contains(&self, uuid: &IdentityToken) -> bool {
        self.get(uuid).is_some()
    }

    pub fn entries(&self) -> &[CachedAccessory] {
        &self.entries
    }

    /// Adds or refreshes an entry. The cache is only marked for saving when
    /// something actually changed.
    pub fn register(&mut self, accessory: CachedAccessory) {
        match self.entries.iter_mut().find(|e| e.uuid == accessory.uuid) {
            Some(existing) if *existing == accessory => return,
            Some(existing) => *existing = accessory,
            None => self.entries.push(accessory),
        }

        self.dirty = true;
    }

    pub fn unregister(&mut self, uuid: &IdentityToken) -> Option<CachedAccessory> {
        let index = self.entries.iter().position(|e| e.uuid == *uuid)?;
        self.dirty = true;
        Some(self.entries.remove(index))
    }

    /// Writes the cache back to disk if it has changed since it was opened.
    pub async fn save(&mut self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if !self.dirty {
            return Ok(());
        }

        let data = serde_json::to_vec_pretty(&self.entries)?;

        fs::write(path, data)
            .await
            .wrap_err_with(|| format!("Failed to write accessory cache {}", path.display()))?;

        tracing::debug!("Saved {} accessories to {}", self.entries.len(), path.display());
        self.dirty = false;

        Ok(())
    }
}
