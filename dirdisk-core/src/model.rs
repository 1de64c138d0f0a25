//! In-memory mirror of the emulated disk.
//!
//! Slots and sectors refer to each other only by index: a directory slot is
//! an index into the slot array, a data sector is its absolute sector number.

use serde::{Deserialize, Serialize};

use crate::dir_entry::DirEntry;

/// Where a data sector's bytes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Usage {
    /// Read straight from the host file, nothing cached.
    #[default]
    Clean,
    /// Entirely served from the sector cache.
    Cached,
    /// First `host_len` bytes from the host file, the rest from the cache.
    Mixed { host_len: u16 },
}

/// The file and byte offset a data sector currently represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorOwner {
    pub dir_index: usize,
    pub file_offset: u64,
}

/// Reverse sector map entry.
///
/// `usage != Clean` implies the sector has a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReverseSector {
    pub owner: Option<SectorOwner>,
    pub usage: Usage,
}

/// A directory slot and the host file it stands for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedDirEntry {
    /// On-disk image, kept even when the slot is not in use.
    pub image: DirEntry,
    /// Assigned 8.3 name; empty when the slot is not in use.
    pub short_name: String,
    /// Host file name this slot represents.
    pub host_name: String,
    /// Host file length at last reconciliation.
    pub known_size: u64,
}

impl MappedDirEntry {
    pub fn in_use(&self) -> bool {
        !self.short_name.is_empty()
    }

    /// Slot may receive a newly discovered host file.
    pub fn is_free(&self) -> bool {
        !self.in_use() && (self.image.is_unused() || self.image.is_erased())
    }

    /// Drop the host mapping, keeping the on-disk image.
    pub fn unmap(&mut self) {
        self.short_name.clear();
        self.host_name.clear();
        self.known_size = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dir_entry::{to_8_3, ATTR_VOLUME};

    #[test]
    fn test_slot_states() {
        let mut slot = MappedDirEntry::default();
        assert!(!slot.in_use());
        assert!(slot.is_free());

        slot.image = DirEntry::for_file(&to_8_3("a.txt"), 2, 10, 0, 0);
        slot.short_name = "A.TXT".to_string();
        slot.host_name = "a.txt".to_string();
        assert!(slot.in_use());
        assert!(!slot.is_free());

        slot.unmap();
        slot.image.erase();
        assert!(!slot.in_use());
        assert!(slot.is_free());
        assert!(slot.host_name.is_empty());
    }

    #[test]
    fn test_volume_label_slot_is_not_free() {
        let mut slot = MappedDirEntry::default();
        slot.image = DirEntry::for_file(&to_8_3("MYDISK"), 0, 0, 0, 0);
        slot.image.set_attrib(ATTR_VOLUME);
        assert!(!slot.in_use());
        assert!(!slot.is_free());
    }
}
