//! Fixed 720KB floppy geometry and sector range classification.
//!
//! Layout:
//! - Sector 0: boot sector
//! - Sectors 1-3: FAT copy 1
//! - Sectors 4-6: FAT copy 2
//! - Sectors 7-13: root directory (112 entries of 32 bytes)
//! - Sectors 14-1439: data area, 2 sectors per cluster, first cluster is 2

/// Bytes per sector.
pub const SECTOR_SIZE: usize = 512;
/// Total sectors on the disk.
pub const NUM_SECTORS: u32 = 1440;

pub const SECTORS_PER_FAT: u32 = 3;
pub const NUM_FATS: u32 = 2;
pub const SECTORS_PER_DIR: u32 = 7;
pub const SECTORS_PER_CLUSTER: u32 = 2;
pub const SECTORS_PER_TRACK: u16 = 9;
pub const NUM_HEADS: u16 = 2;

/// Size of one directory entry on disk.
pub const DIR_ENTRY_SIZE: usize = 32;
pub const DIR_ENTRIES_PER_SECTOR: usize = SECTOR_SIZE / DIR_ENTRY_SIZE;
pub const NUM_DIR_ENTRIES: usize = SECTORS_PER_DIR as usize * DIR_ENTRIES_PER_SECTOR;

pub const FIRST_FAT_SECTOR: u32 = 1;
pub const FIRST_DIR_SECTOR: u32 = FIRST_FAT_SECTOR + NUM_FATS * SECTORS_PER_FAT;
pub const FIRST_DATA_SECTOR: u32 = FIRST_DIR_SECTOR + SECTORS_PER_DIR;
pub const NUM_DATA_SECTORS: usize = (NUM_SECTORS - FIRST_DATA_SECTOR) as usize;

/// Bytes in one copy of the FAT.
pub const FAT_BYTES: usize = SECTORS_PER_FAT as usize * SECTOR_SIZE;
pub const CLUSTER_SIZE: usize = SECTORS_PER_CLUSTER as usize * SECTOR_SIZE;

/// First cluster number that addresses the data area.
pub const FIRST_CLUSTER: u16 = 2;
pub const NUM_CLUSTERS: usize = NUM_DATA_SECTORS / SECTORS_PER_CLUSTER as usize;
/// Highest valid cluster number.
pub const MAX_CLUSTER: u16 = FIRST_CLUSTER + NUM_CLUSTERS as u16 - 1;

pub const MEDIA_DESCRIPTOR: u8 = 0xF9;

/// What a sector number addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Boot,
    /// FAT sector: which copy, and byte offset of the sector within that copy.
    Fat { copy: usize, offset: usize },
    /// Directory sector: index of the first slot it holds.
    Dir { first_slot: usize },
    /// Data sector (absolute sector number).
    Data { sector: u32 },
}

/// Classify a sector number. Returns None outside the disk geometry.
pub fn classify(sector: u32) -> Option<Region> {
    if sector == 0 {
        Some(Region::Boot)
    } else if sector < FIRST_DIR_SECTOR {
        let rel = sector - FIRST_FAT_SECTOR;
        Some(Region::Fat {
            copy: (rel / SECTORS_PER_FAT) as usize,
            offset: (rel % SECTORS_PER_FAT) as usize * SECTOR_SIZE,
        })
    } else if sector < FIRST_DATA_SECTOR {
        Some(Region::Dir {
            first_slot: (sector - FIRST_DIR_SECTOR) as usize * DIR_ENTRIES_PER_SECTOR,
        })
    } else if sector < NUM_SECTORS {
        Some(Region::Data { sector })
    } else {
        None
    }
}

/// First sector of a cluster.
pub fn cluster_to_sector(cluster: u16) -> u32 {
    debug_assert!((FIRST_CLUSTER..=MAX_CLUSTER).contains(&cluster));
    FIRST_DATA_SECTOR + (cluster - FIRST_CLUSTER) as u32 * SECTORS_PER_CLUSTER
}

/// Cluster holding a data sector.
pub fn sector_to_cluster(sector: u32) -> u16 {
    debug_assert!(sector >= FIRST_DATA_SECTOR && sector < NUM_SECTORS);
    ((sector - FIRST_DATA_SECTOR) / SECTORS_PER_CLUSTER) as u16 + FIRST_CLUSTER
}

/// Index of a data sector in the reverse sector map.
pub fn data_index(sector: u32) -> usize {
    (sector - FIRST_DATA_SECTOR) as usize
}

/// Clusters needed to hold `size` bytes.
pub fn clusters_for_size(size: u64) -> usize {
    size.div_ceil(CLUSTER_SIZE as u64) as usize
}
