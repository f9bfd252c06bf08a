//! Registry storage and persistence
//!
//! Records live in a `BTreeMap` keyed by address. Mutations only mark the
//! registry dirty; the monitor writes the whole document once per cycle.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::record::{RegistryDocument, StoredRecord, ValidatorRecord};
use crate::chain::format_address;

#[derive(Debug, Clone)]
pub struct ValidatorRegistry {
    path: PathBuf,
    records: BTreeMap<String, ValidatorRecord>,
    dirty: bool,
}

impl ValidatorRegistry {
    /// Empty registry that will persist to `path`
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            records: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Load the registry from `path`.
    ///
    /// A missing or unreadable document is not fatal: the registry starts
    /// empty and the condition is logged. A corrupt document is moved aside so
    /// the next persist does not silently overwrite it.
    pub fn restore(path: PathBuf) -> Self {
        let mut registry = Self::new(path);

        let raw = match std::fs::read_to_string(&registry.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                crate::log_warn!(
                    "No validator registry at {}; starting empty",
                    registry.path.display()
                );
                return registry;
            }
            Err(e) => {
                crate::log_error!(
                    "Failed to read validator registry {}: {}. Starting empty; tracked state is lost",
                    registry.path.display(),
                    e
                );
                return registry;
            }
        };

        match serde_json::from_str::<RegistryDocument>(&raw) {
            Ok(document) => {
                registry.load_document(document);
                crate::log_stderr!(
                    "Restored {} validator records from {}",
                    registry.records.len(),
                    registry.path.display()
                );
            }
            Err(e) => {
                let backup = corrupt_backup_path(&registry.path);
                crate::log_error!(
                    "Validator registry {} is corrupt: {}. Starting empty; tracked state is lost (original kept at {})",
                    registry.path.display(),
                    e,
                    backup.display()
                );
                if let Err(e) = std::fs::rename(&registry.path, &backup) {
                    crate::log_error!("Failed to move corrupt registry aside: {}", e);
                }
            }
        }

        registry
    }

    fn load_document(&mut self, document: RegistryDocument) {
        self.records = document
            .into_iter()
            .map(|(address, stored)| {
                let record = stored.into_record(&address);
                (address, record)
            })
            .collect();
        self.dirty = false;
    }

    /// Serializable form of the whole registry
    pub fn to_document(&self) -> RegistryDocument {
        self.records
            .iter()
            .map(|(address, record)| (address.clone(), StoredRecord::from(record)))
            .collect()
    }

    /// Write the full registry to disk.
    ///
    /// Writes a sibling temp file first and renames it over the target.
    pub fn persist(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create registry directory")?;
        }

        let json = serde_json::to_string_pretty(&self.to_document())
            .context("Failed to serialize validator registry")?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        self.dirty = false;
        crate::log_debug!(
            "Persisted {} validator records to {}",
            self.records.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Persist only when something changed since the last write
    pub fn persist_if_dirty(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    pub fn get(&self, address: &str) -> Option<&ValidatorRecord> {
        self.records.get(address)
    }

    /// Replace the record for `address` with `update(current)`.
    ///
    /// Returns true when the stored record changed.
    pub fn upsert<F>(&mut self, address: &str, update: F) -> bool
    where
        F: FnOnce(Option<&ValidatorRecord>) -> ValidatorRecord,
    {
        let current = self.records.get(address);
        let next = update(current);
        if current == Some(&next) {
            return false;
        }

        crate::log_debug!("Registry update for {}", format_address(address));
        self.records.insert(address.to_string(), next);
        self.dirty = true;
        true
    }

    pub fn all(&self) -> impl Iterator<Item = &ValidatorRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn corrupt_backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".corrupt");
    path.with_file_name(name)
}
