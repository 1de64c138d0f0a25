//! Directory-as-disk engine - a host directory served as an MSX floppy.
//!
//! The engine keeps one in-memory model of the disk:
//! - both FAT copies in packed form
//! - the 112 directory slots, each mapped to a host file
//! - a reverse map telling, per data sector, which file bytes it shows
//! - a sparse cache of sector contents written by the MSX side
//!
//! Sector reads are answered from that model (and the host files it points
//! to); sector writes update it and push the changes to the host directory
//! according to the configured [`SyncMode`].

mod persist;
mod propagate;
mod scan;
mod sector_io;

pub use scan::ScanReport;

use std::collections::BTreeMap;
use std::path::PathBuf;

use log::trace;

use crate::boot::boot_sector;
use crate::config::{DiskConfig, SyncMode};
use crate::diagnostics::{Diagnostics, LogDiagnostics};
use crate::error::{DiskError, DiskResult};
use crate::fat12::{FatTable, FREE};
use crate::geometry::{
    cluster_to_sector, data_index, CLUSTER_SIZE, FIRST_DATA_SECTOR, NUM_DATA_SECTORS,
    NUM_DIR_ENTRIES, SECTORS_PER_CLUSTER, SECTOR_SIZE,
};
use crate::host::{HostFs, LocalHostFs};
use crate::model::{MappedDirEntry, ReverseSector, SectorOwner, Usage};

/// Contents of one sector.
pub type SectorData = [u8; SECTOR_SIZE];

/// A host directory presented as a 720KB FAT12 disk.
pub struct DirAsDisk<H: HostFs, G: Diagnostics> {
    host: H,
    diag: G,
    config: DiskConfig,
    boot: SectorData,
    /// Authoritative FAT copy.
    fat: FatTable,
    /// Mirror, kept identical to `fat`.
    fat2: FatTable,
    entries: Vec<MappedDirEntry>,
    /// Indexed by data sector (absolute sector - FIRST_DATA_SECTOR).
    sectors: Vec<ReverseSector>,
    /// Keyed by absolute sector number.
    cache: BTreeMap<u32, SectorData>,
    /// NO_DELETE: host files deleted on the MSX side, with their size then.
    suppressed: BTreeMap<String, u64>,
    /// Host files that could not be added, with the size that failed.
    rejected: BTreeMap<String, u64>,
}

impl DirAsDisk<LocalHostFs, LogDiagnostics> {
    /// Serve a local directory, reporting warnings through the `log` crate.
    pub fn open(dir: impl Into<PathBuf>, config: DiskConfig) -> DiskResult<Self> {
        Ok(Self::new(LocalHostFs::new(dir)?, LogDiagnostics, config))
    }
}

impl<H: HostFs, G: Diagnostics> DirAsDisk<H, G> {
    /// Create the disk and populate it from the host directory.
    pub fn new(host: H, diag: G, config: DiskConfig) -> Self {
        let mut disk = Self {
            host,
            diag,
            boot: boot_sector(config.boot_sector),
            config,
            fat: FatTable::new(),
            fat2: FatTable::new(),
            entries: vec![MappedDirEntry::default(); NUM_DIR_ENTRIES],
            sectors: vec![ReverseSector::default(); NUM_DATA_SECTORS],
            cache: BTreeMap::new(),
            suppressed: BTreeMap::new(),
            rejected: BTreeMap::new(),
        };
        disk.rescan();
        disk
    }

    pub fn config(&self) -> &DiskConfig {
        &self.config
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.config.sync_mode
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the host directory (e.g. to simulate external edits).
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn diagnostics(&self) -> &G {
        &self.diag
    }

    pub fn diagnostics_mut(&mut self) -> &mut G {
        &mut self.diag
    }

    /// Directory slot `slot`.
    pub fn entry(&self, slot: usize) -> &MappedDirEntry {
        &self.entries[slot]
    }

    pub fn entries(&self) -> &[MappedDirEntry] {
        &self.entries
    }

    /// Slot currently representing `host_name`.
    pub fn slot_of_host_name(&self, host_name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.in_use() && e.host_name == host_name)
    }

    /// Reverse map entry of a data sector. None outside the data area.
    pub fn reverse_sector(&self, sector: u32) -> Option<&ReverseSector> {
        sector
            .checked_sub(FIRST_DATA_SECTOR)
            .and_then(|i| self.sectors.get(i as usize))
    }

    /// Check if a sector has bytes in the sector cache.
    pub fn is_cached(&self, sector: u32) -> bool {
        self.cache.contains_key(&sector)
    }

    /// Number of sectors held in the sector cache.
    pub fn cached_sector_count(&self) -> usize {
        self.cache.len()
    }

    pub fn fat(&self) -> &FatTable {
        &self.fat
    }

    /// Second FAT copy.
    pub fn fat_mirror(&self) -> &FatTable {
        &self.fat2
    }

    /// Cluster chain of a slot, following the FAT from its start cluster.
    pub fn chain(&self, slot: usize) -> Vec<u16> {
        self.fat.chain(self.entries[slot].image.start_cluster())
    }

    pub fn free_clusters(&self) -> usize {
        self.fat.free_count()
    }

    /// Take the disk apart, returning the host directory and diagnostics sink.
    pub fn into_parts(self) -> (H, G) {
        (self.host, self.diag)
    }

    fn warn(&mut self, err: &DiskError) {
        self.diag.warn(&err.to_string());
    }

    /// Write a FAT entry to both copies.
    fn set_fat(&mut self, cluster: u16, value: u16) {
        self.fat.set(cluster, value);
        self.fat2.set(cluster, value);
    }

    /// Bytes of the file a slot may show: its declared size, capped by its chain.
    fn effective_size(&self, slot: usize) -> u64 {
        let chain_bytes = (self.chain(slot).len() * CLUSTER_SIZE) as u64;
        (self.entries[slot].image.size() as u64).min(chain_bytes)
    }

    /// Data sectors owned by a slot, with their file offsets, in file order.
    fn owned_sectors(&self, slot: usize) -> Vec<(u32, u64)> {
        let mut owned: Vec<(u32, u64)> = self
            .sectors
            .iter()
            .enumerate()
            .filter_map(|(i, rev)| match rev.owner {
                Some(o) if o.dir_index == slot => {
                    Some((FIRST_DATA_SECTOR + i as u32, o.file_offset))
                }
                _ => None,
            })
            .collect();
        owned.sort_by_key(|&(_, offset)| offset);
        owned
    }

    fn has_cached_sectors(&self, slot: usize) -> bool {
        self.sectors
            .iter()
            .any(|rev| rev.usage != Usage::Clean && rev.owner.is_some_and(|o| o.dir_index == slot))
    }

    /// Store MSX-written bytes for a sector.
    fn cache_sector(&mut self, sector: u32, data: &SectorData, usage: Usage) {
        debug_assert!(usage != Usage::Clean);
        self.cache.insert(sector, *data);
        self.sectors[data_index(sector)].usage = usage;
    }

    /// Drop cached bytes; the sector reads from its host file again.
    fn uncache_sector(&mut self, sector: u32) {
        self.cache.remove(&sector);
        self.sectors[data_index(sector)].usage = Usage::Clean;
    }

    /// Detach a sector from its file, keeping any cached bytes as orphan content.
    ///
    /// Orphans stay until their cluster is reused. An MSX-side allocation
    /// adopts them as file content and a host-side allocation drops them.
    /// One sector of cache per data sector bounds them.
    fn unmap_sector(&mut self, sector: u32) {
        let cached = self.cache.contains_key(&sector);
        let rev = &mut self.sectors[data_index(sector)];
        rev.owner = None;
        rev.usage = if cached { Usage::Cached } else { Usage::Clean };
    }

    /// Detach a sector and forget its content.
    fn release_sector(&mut self, sector: u32) {
        self.cache.remove(&sector);
        self.sectors[data_index(sector)] = ReverseSector::default();
    }

    /// Point the sectors of `cluster` at chain position `index` of `slot`.
    ///
    /// With `keep_cache` unset, orphan bytes left in those sectors are dropped.
    fn map_cluster(&mut self, slot: usize, index: usize, cluster: u16, keep_cache: bool) {
        let first = cluster_to_sector(cluster);
        for j in 0..SECTORS_PER_CLUSTER {
            let sector = first + j;
            let owner = SectorOwner {
                dir_index: slot,
                file_offset: ((index * SECTORS_PER_CLUSTER as usize + j as usize) * SECTOR_SIZE)
                    as u64,
            };
            if !keep_cache {
                self.cache.remove(&sector);
            }
            let rev = &mut self.sectors[data_index(sector)];
            if keep_cache && rev.owner == Some(owner) {
                continue;
            }
            rev.owner = Some(owner);
            rev.usage = if self.cache.contains_key(&sector) {
                Usage::Cached
            } else {
                Usage::Clean
            };
        }
    }

    /// Mark a cluster free in both FATs and forget its sectors.
    fn free_cluster(&mut self, cluster: u16) {
        trace!("freeing cluster {}", cluster);
        self.set_fat(cluster, FREE);
        let first = cluster_to_sector(cluster);
        for j in 0..SECTORS_PER_CLUSTER {
            self.release_sector(first + j);
        }
    }
}
