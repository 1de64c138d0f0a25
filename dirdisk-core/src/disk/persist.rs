//! Snapshot and restore of the disk model.

use std::collections::BTreeMap;

use log::debug;

use super::{DirAsDisk, SectorData};
use crate::cache::{CacheSnapshot, SavedEntry, SNAPSHOT_VERSION};
use crate::diagnostics::Diagnostics;
use crate::dir_entry::DirEntry;
use crate::error::{DiskError, DiskResult};
use crate::fat12::FatTable;
use crate::geometry::SECTOR_SIZE;
use crate::host::HostFs;
use crate::model::MappedDirEntry;

impl<H: HostFs, G: Diagnostics> DirAsDisk<H, G> {
    /// Capture FATs, slots, reverse map and sector cache.
    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            version: SNAPSHOT_VERSION,
            fat: self.fat.as_bytes().to_vec(),
            fat2: self.fat2.as_bytes().to_vec(),
            entries: self
                .entries
                .iter()
                .map(|e| SavedEntry {
                    image: e.image.as_bytes().to_vec(),
                    short_name: e.short_name.clone(),
                    host_name: e.host_name.clone(),
                    known_size: e.known_size,
                })
                .collect(),
            sectors: self.sectors.clone(),
            cache: self
                .cache
                .iter()
                .map(|(&sector, data)| (sector, data.to_vec()))
                .collect(),
            suppressed: self.suppressed.clone(),
        }
    }

    /// Replace the model with a saved one.
    ///
    /// The snapshot is validated first; on error the engine is unchanged.
    /// Host changes made since the snapshot are picked up by the next scan.
    pub fn restore(&mut self, snapshot: &CacheSnapshot) -> DiskResult<()> {
        snapshot.validate()?;
        let invalid = || DiskError::InvalidSnapshot("bad FAT length".to_string());
        let fat = FatTable::from_bytes(snapshot.fat.clone()).ok_or_else(invalid)?;
        let fat2 = FatTable::from_bytes(snapshot.fat2.clone()).ok_or_else(invalid)?;

        let mut cache = BTreeMap::new();
        for (&sector, data) in &snapshot.cache {
            let mut buf: SectorData = [0; SECTOR_SIZE];
            buf.copy_from_slice(data);
            cache.insert(sector, buf);
        }

        self.fat = fat;
        self.fat2 = fat2;
        self.entries = snapshot
            .entries
            .iter()
            .map(|e| MappedDirEntry {
                image: DirEntry::from_bytes(&e.image),
                short_name: e.short_name.clone(),
                host_name: e.host_name.clone(),
                known_size: e.known_size,
            })
            .collect();
        self.sectors = snapshot.sectors.clone();
        self.cache = cache;
        self.suppressed = snapshot.suppressed.clone();
        self.rejected.clear();
        debug!("restored snapshot with {} cached sectors", self.cache.len());
        Ok(())
    }
}
