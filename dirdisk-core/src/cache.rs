//! Persisted form of the disk model, so cached MSX writes survive a restart.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DiskError, DiskResult};
use crate::geometry::{
    DIR_ENTRY_SIZE, FAT_BYTES, FIRST_DATA_SECTOR, NUM_DATA_SECTORS, NUM_DIR_ENTRIES, NUM_SECTORS,
    SECTOR_SIZE,
};
use crate::model::{ReverseSector, Usage};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// One directory slot as saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedEntry {
    /// The 32-byte on-disk image.
    pub image: Vec<u8>,
    pub short_name: String,
    pub host_name: String,
    pub known_size: u64,
}

/// Everything needed to rebuild the engine state exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub version: u32,
    pub fat: Vec<u8>,
    pub fat2: Vec<u8>,
    pub entries: Vec<SavedEntry>,
    /// Reverse sector map, one element per data sector.
    pub sectors: Vec<ReverseSector>,
    /// Sector cache keyed by absolute sector number.
    pub cache: BTreeMap<u32, Vec<u8>>,
    /// Host files kept after an MSX-side delete, with their size then.
    #[serde(default)]
    pub suppressed: BTreeMap<String, u64>,
}

impl CacheSnapshot {
    /// Check every length and index against the disk geometry.
    pub fn validate(&self) -> DiskResult<()> {
        let invalid = |msg: String| Err(DiskError::InvalidSnapshot(msg));

        if self.version != SNAPSHOT_VERSION {
            return invalid(format!("unsupported version {}", self.version));
        }
        if self.fat.len() != FAT_BYTES || self.fat2.len() != FAT_BYTES {
            return invalid(format!("FAT copies must be {} bytes", FAT_BYTES));
        }
        if self.entries.len() != NUM_DIR_ENTRIES {
            return invalid(format!(
                "{} directory entries, expected {}",
                self.entries.len(),
                NUM_DIR_ENTRIES
            ));
        }
        if let Some(i) = self
            .entries
            .iter()
            .position(|e| e.image.len() != DIR_ENTRY_SIZE)
        {
            return invalid(format!("directory entry {} is not {} bytes", i, DIR_ENTRY_SIZE));
        }
        if self.sectors.len() != NUM_DATA_SECTORS {
            return invalid(format!(
                "{} reverse map entries, expected {}",
                self.sectors.len(),
                NUM_DATA_SECTORS
            ));
        }
        for (&sector, data) in &self.cache {
            if !(FIRST_DATA_SECTOR..NUM_SECTORS).contains(&sector) {
                return invalid(format!("cached sector {} outside the data area", sector));
            }
            if data.len() != SECTOR_SIZE {
                return invalid(format!("cached sector {} is not {} bytes", sector, SECTOR_SIZE));
            }
        }
        for (i, rev) in self.sectors.iter().enumerate() {
            let sector = FIRST_DATA_SECTOR + i as u32;
            if let Some(owner) = rev.owner {
                if owner.dir_index >= NUM_DIR_ENTRIES {
                    return invalid(format!("sector {} owned by slot {}", sector, owner.dir_index));
                }
            }
            match rev.usage {
                Usage::Clean => {}
                Usage::Mixed { host_len } if host_len as usize > SECTOR_SIZE => {
                    return invalid(format!("sector {} mixed length {}", sector, host_len));
                }
                _ if !self.cache.contains_key(&sector) => {
                    return invalid(format!("sector {} marked cached but has no data", sector));
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> DiskResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a snapshot.
    pub fn from_json(text: &str) -> DiskResult<Self> {
        let snapshot: Self = serde_json::from_str(text)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

/// Write a snapshot to a JSON file.
pub fn save_snapshot(path: &Path, snapshot: &CacheSnapshot) -> DiskResult<()> {
    std::fs::write(path, snapshot.to_json()?)?;
    Ok(())
}

/// Read a snapshot from a JSON file.
pub fn load_snapshot(path: &Path) -> DiskResult<CacheSnapshot> {
    let text = std::fs::read_to_string(path)?;
    CacheSnapshot::from_json(&text)
}
