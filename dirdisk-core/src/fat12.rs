//! FAT12 table packing and cluster chain helpers.
//!
//! Two 12-bit entries share three bytes:
//! - even entry: low byte in `b0`, high nibble in the low nibble of `b1`
//! - odd entry: low nibble in the high nibble of `b1`, high byte in `b2`

use serde::{Deserialize, Serialize};

use crate::geometry::{FAT_BYTES, FIRST_CLUSTER, MAX_CLUSTER, MEDIA_DESCRIPTOR, NUM_CLUSTERS};

/// Free cluster marker.
pub const FREE: u16 = 0x000;
/// End-of-chain value written by this engine.
pub const END_OF_CHAIN: u16 = 0xFFF;
/// Values at or above this terminate a chain.
pub const END_OF_CHAIN_MIN: u16 = 0xFF8;

/// Read 12-bit entry `index` from packed FAT bytes.
pub fn decode12(bytes: &[u8], index: usize) -> u16 {
    let off = index * 3 / 2;
    let lo = bytes[off] as u16;
    let hi = bytes[off + 1] as u16;
    if index % 2 == 0 {
        lo | ((hi & 0x0F) << 8)
    } else {
        (lo >> 4) | (hi << 4)
    }
}

/// Write 12-bit entry `index` into packed FAT bytes, leaving neighbours intact.
pub fn encode12(bytes: &mut [u8], index: usize, value: u16) {
    let off = index * 3 / 2;
    let value = value & 0x0FFF;
    if index % 2 == 0 {
        bytes[off] = value as u8;
        bytes[off + 1] = (bytes[off + 1] & 0xF0) | (value >> 8) as u8;
    } else {
        bytes[off] = (bytes[off] & 0x0F) | ((value & 0x0F) << 4) as u8;
        bytes[off + 1] = (value >> 4) as u8;
    }
}

/// One copy of the FAT, kept in its packed on-disk form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FatTable {
    bytes: Vec<u8>,
}

impl Default for FatTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FatTable {
    /// Create an empty FAT with the media descriptor in entries 0 and 1.
    pub fn new() -> Self {
        let mut bytes = vec![0u8; FAT_BYTES];
        bytes[0] = MEDIA_DESCRIPTOR;
        bytes[1] = 0xFF;
        bytes[2] = 0xFF;
        Self { bytes }
    }

    /// Wrap packed bytes. Returns None unless exactly one FAT copy long.
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        (bytes.len() == FAT_BYTES).then_some(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable view of the packed bytes (for whole-sector writes).
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn get(&self, cluster: u16) -> u16 {
        decode12(&self.bytes, cluster as usize)
    }

    pub fn set(&mut self, cluster: u16, value: u16) {
        encode12(&mut self.bytes, cluster as usize, value);
    }

    pub fn is_free(&self, cluster: u16) -> bool {
        self.get(cluster) == FREE
    }

    /// First free cluster scanning upward from cluster 2.
    pub fn find_first_free(&self) -> Option<u16> {
        (FIRST_CLUSTER..=MAX_CLUSTER).find(|&c| self.is_free(c))
    }

    /// Next free cluster after `current`, wrapping around to cluster 2.
    pub fn find_next_free(&self, current: u16) -> Option<u16> {
        let start = current.clamp(FIRST_CLUSTER - 1, MAX_CLUSTER);
        (start + 1..=MAX_CLUSTER)
            .chain(FIRST_CLUSTER..=start)
            .find(|&c| self.is_free(c))
    }

    /// Number of free clusters in the data area.
    pub fn free_count(&self) -> usize {
        (FIRST_CLUSTER..=MAX_CLUSTER)
            .filter(|&c| self.is_free(c))
            .count()
    }

    /// Follow the chain starting at `start`.
    ///
    /// A cluster whose own entry is free is not part of the chain, so a link
    /// into a freed cluster ends the chain there. Out-of-range links, end
    /// markers and cycles also terminate it.
    pub fn chain(&self, start: u16) -> Vec<u16> {
        let mut chain = Vec::new();
        let mut cluster = start;
        while (FIRST_CLUSTER..=MAX_CLUSTER).contains(&cluster) && chain.len() < NUM_CLUSTERS {
            let next = self.get(cluster);
            if next == FREE {
                break;
            }
            chain.push(cluster);
            if next >= END_OF_CHAIN_MIN || chain.contains(&next) {
                break;
            }
            cluster = next;
        }
        chain
    }
}
