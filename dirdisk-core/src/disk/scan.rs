//! Host directory scanner: brings the disk model in line with the host.

use std::collections::BTreeSet;

use log::{debug, info};

use super::DirAsDisk;
use crate::diagnostics::Diagnostics;
use crate::dir_entry::{fat_datetime, to_8_3, DirEntry, ShortName, MAX_NAME_SUFFIX};
use crate::error::{Capacity, DiskError, DiskResult};
use crate::fat12::END_OF_CHAIN;
use crate::geometry::{clusters_for_size, sector_to_cluster};
use crate::host::{HostFs, HostMeta};
use crate::model::MappedDirEntry;

/// Host file names touched by one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
}

impl ScanReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

impl<H: HostFs, G: Diagnostics> DirAsDisk<H, G> {
    /// Bring the disk in line with the host directory.
    ///
    /// Mapped files that vanished are removed from the disk, files whose size
    /// changed get their chain resized, and new files are added. Problems
    /// are reported as warnings; the scan itself never fails.
    pub fn rescan(&mut self) -> ScanReport {
        let mut report = ScanReport::default();

        for slot in 0..self.entries.len() {
            if !self.entries[slot].in_use() {
                continue;
            }
            let name = self.entries[slot].host_name.clone();
            match self.host.stat(&name) {
                Ok(Some(meta)) if meta.is_file => {
                    if meta.len == self.entries[slot].known_size {
                        continue;
                    }
                    match self.update_file_in_disk(slot, &meta) {
                        Ok(()) => report.updated.push(name),
                        Err(e) => self.warn(&e),
                    }
                }
                Ok(_) => {
                    self.remove_file_from_disk(slot);
                    report.removed.push(name);
                }
                Err(e) => self.warn(&DiskError::host_io("stat", &name, e)),
            }
        }

        let listing = match self.host.list() {
            Ok(listing) => listing,
            Err(e) => {
                self.warn(&DiskError::host_io("list", ".", e));
                return report;
            }
        };

        // A suppressed file that changed size (or is gone) is fair game again
        self.suppressed.retain(|name, size| {
            listing
                .iter()
                .any(|e| &e.name == name && e.meta.len == *size)
        });
        self.rejected
            .retain(|name, _| listing.iter().any(|e| &e.name == name));

        for host_entry in listing {
            if !host_entry.meta.is_file
                || self.suppressed.contains_key(&host_entry.name)
                || self.slot_of_host_name(&host_entry.name).is_some()
            {
                continue;
            }
            match self.add_file_to_disk(&host_entry.name, &host_entry.meta) {
                Ok(slot) => {
                    info!(
                        "added {} as {} (slot {})",
                        host_entry.name, self.entries[slot].short_name, slot
                    );
                    self.rejected.remove(&host_entry.name);
                    report.added.push(host_entry.name);
                }
                Err(e) => {
                    // Warn once per name and size; retried on every scan
                    let len = host_entry.meta.len;
                    if self.rejected.insert(host_entry.name, len) != Some(len) {
                        self.warn(&e);
                    }
                }
            }
        }

        if !report.is_empty() {
            debug!(
                "scan: {} added, {} updated, {} removed",
                report.added.len(),
                report.updated.len(),
                report.removed.len()
            );
        }
        report
    }

    /// Map a new host file into a free slot and fresh clusters.
    fn add_file_to_disk(&mut self, host_name: &str, meta: &HostMeta) -> DiskResult<usize> {
        let short = self.unique_short_name(host_name)?;
        let capacity = |kind| DiskError::CapacityExceeded {
            kind,
            name: host_name.to_string(),
        };
        let slot = self
            .entries
            .iter()
            .position(MappedDirEntry::is_free)
            .ok_or_else(|| capacity(Capacity::DirectoryFull))?;
        let needed = clusters_for_size(meta.len);
        if needed > self.fat.free_count() {
            return Err(capacity(Capacity::DiskFull));
        }

        let (time, date) = fat_datetime(meta.modified);
        self.entries[slot] = MappedDirEntry {
            image: DirEntry::for_file(&short, 0, meta.len as u32, time, date),
            short_name: short.to_string(),
            host_name: host_name.to_string(),
            known_size: meta.len,
        };
        let chain = self.resize_chain(slot, Vec::new(), needed);
        self.entries[slot]
            .image
            .set_start_cluster(chain.first().copied().unwrap_or(0));
        Ok(slot)
    }

    /// Resize a mapped file's chain to match a new host length.
    ///
    /// Fails with `DiskFull` and leaves the slot untouched when growth does
    /// not fit.
    fn update_file_in_disk(&mut self, slot: usize, meta: &HostMeta) -> DiskResult<()> {
        let chain = self.chain(slot);
        let needed = clusters_for_size(meta.len);
        if needed > chain.len() && needed - chain.len() > self.fat.free_count() {
            return Err(DiskError::CapacityExceeded {
                kind: Capacity::DiskFull,
                name: self.entries[slot].host_name.clone(),
            });
        }

        debug!(
            "{} changed on host: {} -> {} bytes",
            self.entries[slot].host_name, self.entries[slot].known_size, meta.len
        );
        let chain = self.resize_chain(slot, chain, needed);
        let (time, date) = fat_datetime(meta.modified);
        let entry = &mut self.entries[slot];
        entry.image.set_start_cluster(chain.first().copied().unwrap_or(0));
        entry.image.set_size(meta.len as u32);
        entry.image.set_time(time);
        entry.image.set_date(date);
        entry.known_size = meta.len;
        Ok(())
    }

    /// Drop a slot whose host file is gone, releasing its clusters.
    fn remove_file_from_disk(&mut self, slot: usize) {
        debug!(
            "{} removed on host, freeing slot {}",
            self.entries[slot].host_name, slot
        );
        let clusters: BTreeSet<u16> = self
            .owned_sectors(slot)
            .into_iter()
            .map(|(sector, _)| sector_to_cluster(sector))
            .collect();
        for cluster in clusters {
            self.free_cluster(cluster);
        }
        let entry = &mut self.entries[slot];
        entry.unmap();
        entry.image.erase();
    }

    /// Shrink or grow `chain` to `needed` clusters, mapping new clusters to `slot`.
    ///
    /// Callers check that enough clusters are free.
    fn resize_chain(&mut self, slot: usize, mut chain: Vec<u16>, needed: usize) -> Vec<u16> {
        if needed < chain.len() {
            for &cluster in &chain[needed..] {
                self.free_cluster(cluster);
            }
            chain.truncate(needed);
            if let Some(&last) = chain.last() {
                self.set_fat(last, END_OF_CHAIN);
            }
            return chain;
        }

        while chain.len() < needed {
            let next = match chain.last() {
                Some(&last) => self.fat.find_next_free(last),
                None => self.fat.find_first_free(),
            };
            let Some(next) = next else {
                break;
            };
            if let Some(&last) = chain.last() {
                self.set_fat(last, next);
            }
            self.set_fat(next, END_OF_CHAIN);
            self.map_cluster(slot, chain.len(), next, false);
            chain.push(next);
        }
        chain
    }

    /// 8.3 name for a host file, unique among the slots in use.
    fn unique_short_name(&self, host_name: &str) -> DiskResult<ShortName> {
        let taken = |candidate: &ShortName| {
            let candidate = candidate.to_string();
            self.entries
                .iter()
                .any(|e| e.in_use() && e.short_name == candidate)
        };

        let base = to_8_3(host_name);
        if !taken(&base) {
            return Ok(base);
        }
        (1..=MAX_NAME_SUFFIX)
            .map(|n| base.with_suffix(n))
            .find(|candidate| !taken(candidate))
            .ok_or_else(|| DiskError::NameCollisionExhausted(host_name.to_string()))
    }
}
