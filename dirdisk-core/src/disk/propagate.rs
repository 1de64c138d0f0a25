//! Change propagation: MSX-side FAT and directory edits applied to host files.

use std::collections::BTreeSet;
use std::io;

use log::debug;

use super::DirAsDisk;
use crate::config::SyncMode;
use crate::diagnostics::Diagnostics;
use crate::dir_entry::DirEntry;
use crate::error::{DiskError, DiskResult};
use crate::fat12::FatTable;
use crate::geometry::{cluster_to_sector, data_index, SECTORS_PER_CLUSTER, SECTOR_SIZE};
use crate::host::HostFs;
use crate::model::{MappedDirEntry, Usage};

impl<H: HostFs, G: Diagnostics> DirAsDisk<H, G> {
    /// Apply a changed directory entry image to the slot and its host file.
    pub(super) fn write_dir_entry(&mut self, slot: usize, new: DirEntry) {
        if !self.entries[slot].in_use() {
            if new.is_regular_file() {
                if let Err(e) = self.create_file_for_entry(slot, new) {
                    self.warn(&e);
                }
            } else {
                // Labels, subdirectories and erased images are kept as-is
                self.entries[slot].image = new;
            }
            return;
        }

        if new.is_erased() || new.is_unused() {
            if let Err(e) = self.delete_file_for_entry(slot, new) {
                self.warn(&e);
            }
            return;
        }

        let old = self.entries[slot].image;
        if old.raw_name_ext() != new.raw_name_ext() {
            if let Err(e) = self.rename_file_for_entry(slot, &new) {
                self.warn(&e);
                return;
            }
        }
        self.entries[slot].image = new;
        if old.start_cluster() != new.start_cluster() || old.size() != new.size() {
            let known = self.entries[slot].known_size;
            self.remap_entry(slot);
            if let Err(e) = self.reconcile_size(slot) {
                self.warn(&e);
                // Host length untouched: show the old layout again
                if self.entries[slot].known_size == known {
                    let image = &mut self.entries[slot].image;
                    image.set_start_cluster(old.start_cluster());
                    image.set_size(old.size());
                    self.remap_entry(slot);
                }
            }
        }
    }

    /// Re-derive ownership for every slot touched by a FAT change.
    ///
    /// `previous` is the table before the change. A slot whose host file
    /// cannot follow gets its old chain back.
    pub(super) fn update_file_from_altered_fat(&mut self, changed: &[u16], previous: &FatTable) {
        let slots: BTreeSet<usize> = changed
            .iter()
            .filter_map(|&cluster| self.cluster_owner(cluster))
            .collect();
        for slot in slots {
            debug!(
                "FAT change affects {} (slot {})",
                self.entries[slot].host_name, slot
            );
            self.remap_entry(slot);
            let known = self.entries[slot].known_size;
            if known > 0 && self.chain(slot).is_empty() && !self.config.sync_mode.deletes_host_files()
            {
                // Whole chain freed: the directory write decides whether the file goes
                debug!("keeping {} until its entry changes", self.entries[slot].host_name);
                continue;
            }
            if let Err(e) = self.reconcile_size(slot) {
                self.warn(&e);
                if self.entries[slot].known_size == known {
                    for cluster in previous.chain(self.entries[slot].image.start_cluster()) {
                        self.set_fat(cluster, previous.get(cluster));
                    }
                    self.remap_entry(slot);
                }
            }
        }
    }

    /// Slot a cluster belonged to, or now belongs to.
    fn cluster_owner(&self, cluster: u16) -> Option<usize> {
        let rev = self.sectors[data_index(cluster_to_sector(cluster))];
        if let Some(owner) = rev.owner {
            if self.entries[owner.dir_index].in_use() {
                return Some(owner.dir_index);
            }
        }
        (0..self.entries.len())
            .find(|&slot| self.entries[slot].in_use() && self.chain(slot).contains(&cluster))
    }

    /// MSX created a file in a free slot: create its host counterpart.
    fn create_file_for_entry(&mut self, slot: usize, new: DirEntry) -> DiskResult<()> {
        let host_name = new.condensed_name();
        if host_name.is_empty() {
            self.entries[slot].image = new;
            return Ok(());
        }
        if self.slot_of_host_name(&host_name).is_some() {
            return Err(DiskError::host_io(
                "create",
                &host_name,
                io::Error::new(io::ErrorKind::AlreadyExists, "name already mapped"),
            ));
        }
        self.host
            .create(&host_name)
            .map_err(|e| DiskError::host_io("create", &host_name, e))?;
        debug!("created {} for slot {}", host_name, slot);

        self.suppressed.remove(&host_name);
        self.entries[slot] = MappedDirEntry {
            image: new,
            short_name: host_name.clone(),
            host_name,
            known_size: 0,
        };
        self.remap_entry(slot);
        self.reconcile_size(slot)
    }

    /// MSX erased an in-use entry.
    fn delete_file_for_entry(&mut self, slot: usize, new: DirEntry) -> DiskResult<()> {
        let name = self.entries[slot].host_name.clone();
        if self.config.sync_mode.deletes_host_files() {
            match self.host.remove(&name) {
                Ok(()) => debug!("deleted {}", name),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(DiskError::host_io("remove", &name, e)),
            }
        } else {
            debug!("keeping {} on host", name);
            let known = self.entries[slot].known_size;
            self.suppressed.insert(name, known);
        }

        for (sector, _) in self.owned_sectors(slot) {
            self.unmap_sector(sector);
        }
        let entry = &mut self.entries[slot];
        entry.unmap();
        entry.image = new;
        Ok(())
    }

    /// MSX renamed an in-use entry. Refused when the target name exists.
    fn rename_file_for_entry(&mut self, slot: usize, new: &DirEntry) -> DiskResult<()> {
        let from = self.entries[slot].host_name.clone();
        let to = new.condensed_name();
        if to.is_empty() {
            return Err(DiskError::host_io(
                "rename",
                &from,
                io::Error::new(io::ErrorKind::InvalidInput, "blank name"),
            ));
        }
        if to != from {
            if self.host.exists(&to) {
                return Err(DiskError::host_io(
                    "rename",
                    &to,
                    io::Error::new(io::ErrorKind::AlreadyExists, "target exists"),
                ));
            }
            self.host
                .rename(&from, &to)
                .map_err(|e| DiskError::host_io("rename", &from, e))?;
            debug!("renamed {} -> {}", from, to);
        }
        let entry = &mut self.entries[slot];
        entry.short_name = to.clone();
        entry.host_name = to;
        Ok(())
    }

    /// Point the reverse map at the slot's current chain.
    ///
    /// Sectors that left the chain keep their cached bytes as orphans;
    /// sectors that joined it pick up any orphan bytes as file content.
    fn remap_entry(&mut self, slot: usize) {
        let chain = self.chain(slot);
        let wanted: BTreeSet<u32> = chain
            .iter()
            .flat_map(|&cluster| {
                let first = cluster_to_sector(cluster);
                first..first + SECTORS_PER_CLUSTER
            })
            .collect();

        for (sector, _) in self.owned_sectors(slot) {
            if !wanted.contains(&sector) {
                self.unmap_sector(sector);
            }
        }
        for (index, &cluster) in chain.iter().enumerate() {
            self.map_cluster(slot, index, cluster, true);
        }
    }

    /// Bring the host file length in line with the slot's effective size.
    fn reconcile_size(&mut self, slot: usize) -> DiskResult<()> {
        let effective = self.effective_size(slot);
        let known = self.entries[slot].known_size;
        if effective < known {
            self.truncate_corresponding_file(slot, effective)?;
        } else if effective > known && self.config.sync_mode == SyncMode::Full {
            let name = self.entries[slot].host_name.clone();
            self.host
                .set_len(&name, effective)
                .map_err(|e| DiskError::host_io("extend", &name, e))?;
            debug!("extended {} to {} bytes", name, effective);
            self.entries[slot].known_size = effective;
        }

        if self.has_cached_sectors(slot) || effective > self.entries[slot].known_size {
            self.extract_cache_to_file(slot)?;
        }
        Ok(())
    }

    /// Cut the host file to `len` bytes.
    fn truncate_corresponding_file(&mut self, slot: usize, len: u64) -> DiskResult<()> {
        let name = self.entries[slot].host_name.clone();
        self.host
            .set_len(&name, len)
            .map_err(|e| DiskError::host_io("truncate", &name, e))?;
        debug!("truncated {} to {} bytes", name, len);
        self.entries[slot].known_size = len;

        for (sector, offset) in self.owned_sectors(slot) {
            let rev = &mut self.sectors[data_index(sector)];
            if let Usage::Mixed { host_len } = rev.usage {
                let keep = len.saturating_sub(offset).min(host_len as u64) as u16;
                rev.usage = if keep == 0 {
                    Usage::Cached
                } else {
                    Usage::Mixed { host_len: keep }
                };
            }
        }
        Ok(())
    }

    /// Write cached sectors of a slot into its host file.
    ///
    /// Returns `Ok(false)` without touching anything while part of the
    /// effective size is neither on the host nor in the cache.
    pub(super) fn extract_cache_to_file(&mut self, slot: usize) -> DiskResult<bool> {
        let target = self.effective_size(slot);
        let known = self.entries[slot].known_size;

        let mut pending = Vec::new();
        for (sector, offset) in self.owned_sectors(slot) {
            if offset >= target {
                continue;
            }
            let len = (target - offset).min(SECTOR_SIZE as u64) as usize;
            match self.sectors[data_index(sector)].usage {
                Usage::Clean if offset + len as u64 > known => return Ok(false),
                Usage::Clean => {}
                _ => pending.push((sector, offset, len)),
            }
        }

        let name = self.entries[slot].host_name.clone();
        for &(sector, offset, len) in &pending {
            let data = self.read_data_sector(sector);
            self.host
                .write_at(&name, offset, &data[..len])
                .map_err(|e| DiskError::host_io("write", &name, e))?;
        }
        if target > known {
            debug!("flushed {} to {} bytes", name, target);
            self.entries[slot].known_size = target;
        }

        for (sector, _, len) in pending {
            let slack_is_zero = self
                .cache
                .get(&sector)
                .map_or(true, |data| data[len..].iter().all(|&b| b == 0));
            if len == SECTOR_SIZE || slack_is_zero {
                self.uncache_sector(sector);
            } else {
                self.sectors[data_index(sector)].usage = Usage::Mixed {
                    host_len: len as u16,
                };
            }
        }
        Ok(true)
    }
}
