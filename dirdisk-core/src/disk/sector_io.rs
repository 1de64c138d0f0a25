//! Sector dispatch: boot, FAT, directory and data regions.

use log::trace;

use super::{DirAsDisk, SectorData};
use crate::config::SyncMode;
use crate::diagnostics::Diagnostics;
use crate::dir_entry::DirEntry;
use crate::error::DiskError;
use crate::geometry::{
    classify, data_index, Region, DIR_ENTRIES_PER_SECTOR, DIR_ENTRY_SIZE, FIRST_CLUSTER,
    MAX_CLUSTER, SECTOR_SIZE,
};
use crate::host::HostFs;
use crate::model::{SectorOwner, Usage};

fn region_of(sector: u32) -> Region {
    match classify(sector) {
        Some(region) => region,
        None => panic!("sector {} is outside the disk geometry", sector),
    }
}

impl<H: HostFs, G: Diagnostics> DirAsDisk<H, G> {
    /// True when MSX-side writes are discarded.
    pub fn is_write_protected(&self) -> bool {
        self.config.sync_mode == SyncMode::ReadOnly
    }

    /// Read one sector.
    ///
    /// # Panics
    /// If `sector` is outside the disk geometry.
    pub fn read_sector(&mut self, sector: u32) -> SectorData {
        match region_of(sector) {
            Region::Boot => {
                if self.config.rescan_on_boot_read {
                    self.rescan();
                }
                self.boot
            }
            Region::Fat { copy, offset } => {
                let table = if copy == 0 { &self.fat } else { &self.fat2 };
                let mut buf = [0u8; SECTOR_SIZE];
                buf.copy_from_slice(&table.as_bytes()[offset..offset + SECTOR_SIZE]);
                buf
            }
            Region::Dir { first_slot } => {
                let mut buf = [0u8; SECTOR_SIZE];
                for (i, chunk) in buf.chunks_exact_mut(DIR_ENTRY_SIZE).enumerate() {
                    chunk.copy_from_slice(self.entries[first_slot + i].image.as_bytes());
                }
                buf
            }
            Region::Data { sector } => self.read_data_sector(sector),
        }
    }

    /// Write one sector. A no-op on a write-protected disk.
    ///
    /// # Panics
    /// If `sector` is outside the disk geometry.
    pub fn write_sector(&mut self, sector: u32, data: &SectorData) {
        let region = region_of(sector);
        if self.is_write_protected() {
            trace!("write to sector {} ignored (read-only)", sector);
            return;
        }
        match region {
            Region::Boot => trace!("write to boot sector ignored"),
            Region::Fat { offset, .. } => self.write_fat_sector(offset, data),
            Region::Dir { first_slot } => self.write_dir_sector(first_slot, data),
            Region::Data { sector } => self.write_data_sector(sector, data),
        }
    }

    /// Composite a data sector from the host file and the sector cache.
    pub(super) fn read_data_sector(&mut self, sector: u32) -> SectorData {
        let rev = self.sectors[data_index(sector)];
        let mut buf = [0u8; SECTOR_SIZE];
        match (rev.owner, rev.usage) {
            (_, Usage::Cached) => {
                if let Some(cached) = self.cache.get(&sector) {
                    buf = *cached;
                }
            }
            (None, _) => {}
            (Some(owner), Usage::Clean) => self.read_host_into(owner, &mut buf),
            (Some(owner), Usage::Mixed { host_len }) => {
                if let Some(cached) = self.cache.get(&sector) {
                    buf = *cached;
                }
                self.read_host_into(owner, &mut buf[..host_len as usize]);
            }
        }
        buf
    }

    /// Fill `buf` from the owner's host file, zero past end of file.
    fn read_host_into(&mut self, owner: SectorOwner, buf: &mut [u8]) {
        let name = &self.entries[owner.dir_index].host_name;
        match self.host.read_at(name, owner.file_offset, buf) {
            Ok(n) => buf[n..].fill(0),
            Err(e) => {
                buf.fill(0);
                let err = DiskError::host_io("read", name, e);
                self.warn(&err);
            }
        }
    }

    fn write_fat_sector(&mut self, offset: usize, data: &SectorData) {
        let mut updated = self.fat.clone();
        updated.bytes_mut()[offset..offset + SECTOR_SIZE].copy_from_slice(data);
        let changed: Vec<u16> = (FIRST_CLUSTER..=MAX_CLUSTER)
            .filter(|&c| updated.get(c) != self.fat.get(c))
            .collect();
        let previous = std::mem::replace(&mut self.fat, updated.clone());
        self.fat2 = updated;
        if !changed.is_empty() {
            trace!("FAT write changed {} entries", changed.len());
            self.update_file_from_altered_fat(&changed, &previous);
        }
    }

    fn write_dir_sector(&mut self, first_slot: usize, data: &SectorData) {
        for i in 0..DIR_ENTRIES_PER_SECTOR {
            let slot = first_slot + i;
            let new = DirEntry::from_bytes(&data[i * DIR_ENTRY_SIZE..]);
            if new != self.entries[slot].image {
                self.write_dir_entry(slot, new);
            }
        }
    }

    fn write_data_sector(&mut self, sector: u32, data: &SectorData) {
        let Some(owner) = self.sectors[data_index(sector)].owner else {
            trace!("caching unowned sector {}", sector);
            self.cache_sector(sector, data, Usage::Cached);
            return;
        };
        let slot = owner.dir_index;
        let known = self.entries[slot].known_size;
        let within = known.saturating_sub(owner.file_offset).min(SECTOR_SIZE as u64) as usize;
        let growth_pending = self.effective_size(slot) > known;

        if within == 0 {
            self.cache_sector(sector, data, Usage::Cached);
        } else {
            let name = self.entries[slot].host_name.clone();
            match self.host.write_at(&name, owner.file_offset, &data[..within]) {
                Ok(()) => {
                    let tail_is_zero = data[within..].iter().all(|&b| b == 0);
                    if within == SECTOR_SIZE || (tail_is_zero && !growth_pending) {
                        self.uncache_sector(sector);
                    } else {
                        self.cache_sector(
                            sector,
                            data,
                            Usage::Mixed {
                                host_len: within as u16,
                            },
                        );
                    }
                }
                Err(e) => {
                    self.warn(&DiskError::host_io("write", &name, e));
                    self.cache_sector(sector, data, Usage::Cached);
                }
            }
        }

        if growth_pending {
            match self.extract_cache_to_file(slot) {
                Ok(true) => trace!("{} extended from cache", self.entries[slot].host_name),
                Ok(false) => {}
                Err(e) => self.warn(&e),
            }
        }
    }
}
