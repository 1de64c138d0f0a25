//! Boot sector images for the two supported MSX-DOS dialects.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DiskError;
use crate::geometry::{
    MEDIA_DESCRIPTOR, NUM_DIR_ENTRIES, NUM_FATS, NUM_HEADS, NUM_SECTORS, SECTORS_PER_CLUSTER,
    SECTORS_PER_FAT, SECTORS_PER_TRACK, SECTOR_SIZE,
};

/// Offset of the boot program called by the disk ROM.
const BOOT_ENTRY: usize = 0x1E;
/// Offset of the DOS2 volume id tag.
const VOL_ID_OFFSET: usize = 0x26;
/// DOS2 boot stub, placed after the volume id.
const DOS2_STUB: usize = 0x30;
const VOLUME_SERIAL: [u8; 4] = [0x4D, 0x53, 0x58, 0x21];

/// Boot sector dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootSectorKind {
    Dos1,
    #[default]
    Dos2,
}

impl fmt::Display for BootSectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootSectorKind::Dos1 => write!(f, "dos1"),
            BootSectorKind::Dos2 => write!(f, "dos2"),
        }
    }
}

impl FromStr for BootSectorKind {
    type Err = DiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dos1" => Ok(BootSectorKind::Dos1),
            "dos2" => Ok(BootSectorKind::Dos2),
            _ => Err(DiskError::InvalidBootSector(s.to_string())),
        }
    }
}

/// Build the 512-byte boot sector for a dialect.
///
/// Both dialects carry a BIOS parameter block for the fixed 720KB geometry.
pub fn boot_sector(kind: BootSectorKind) -> [u8; SECTOR_SIZE] {
    let mut b = [0u8; SECTOR_SIZE];

    b[0..3].copy_from_slice(&[0xEB, 0xFE, 0x90]);
    let oem: &[u8; 8] = match kind {
        BootSectorKind::Dos1 => b"MSXDOS  ",
        BootSectorKind::Dos2 => b"MSXDOS2 ",
    };
    b[3..11].copy_from_slice(oem);

    b[0x0B..0x0D].copy_from_slice(&(SECTOR_SIZE as u16).to_le_bytes());
    b[0x0D] = SECTORS_PER_CLUSTER as u8;
    b[0x0E..0x10].copy_from_slice(&1u16.to_le_bytes());
    b[0x10] = NUM_FATS as u8;
    b[0x11..0x13].copy_from_slice(&(NUM_DIR_ENTRIES as u16).to_le_bytes());
    b[0x13..0x15].copy_from_slice(&(NUM_SECTORS as u16).to_le_bytes());
    b[0x15] = MEDIA_DESCRIPTOR;
    b[0x16..0x18].copy_from_slice(&(SECTORS_PER_FAT as u16).to_le_bytes());
    b[0x18..0x1A].copy_from_slice(&SECTORS_PER_TRACK.to_le_bytes());
    b[0x1A..0x1C].copy_from_slice(&NUM_HEADS.to_le_bytes());

    match kind {
        BootSectorKind::Dos1 => {
            b[BOOT_ENTRY] = 0xC9; // RET
        }
        BootSectorKind::Dos2 => {
            // JR over the volume id to the stub
            b[BOOT_ENTRY] = 0x18;
            b[BOOT_ENTRY + 1] = (DOS2_STUB - (BOOT_ENTRY + 2)) as u8;
            b[VOL_ID_OFFSET..VOL_ID_OFFSET + 6].copy_from_slice(b"VOL_ID");
            b[VOL_ID_OFFSET + 6..VOL_ID_OFFSET + 10].copy_from_slice(&VOLUME_SERIAL);
            b[DOS2_STUB] = 0xC9; // RET
        }
    }

    b[510] = 0x55;
    b[511] = 0xAA;
    b
}
