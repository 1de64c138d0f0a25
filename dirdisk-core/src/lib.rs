//! Directory-as-disk core
//!
//! This crate presents a host directory as a 720KB MSX-DOS FAT12 floppy:
//! - Sector reads synthesize boot sector, FATs, directory and file data
//! - Sector writes are propagated back to the host files
//! - Host-side changes are picked up by re-scanning the directory
//!
//! # Architecture
//!
//! - `HostFs` trait: the host directory (local or in-memory)
//! - `Diagnostics` trait: sink for warnings raised during synchronization
//! - `SectorDevice` trait: the block-device boundary
//! - `DirAsDisk`: the engine tying them together

pub mod block;
pub mod boot;
pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod dir_entry;
pub mod disk;
pub mod error;
pub mod fat12;
pub mod geometry;
pub mod host;
pub mod model;

pub use block::{read_image, write_image, SectorDevice};
pub use boot::BootSectorKind;
pub use cache::{load_snapshot, save_snapshot, CacheSnapshot};
pub use config::{DiskConfig, SyncMode};
pub use diagnostics::{CollectedWarnings, Diagnostics, LogDiagnostics};
pub use dir_entry::{to_8_3, DirEntry, ShortName};
pub use disk::{DirAsDisk, ScanReport, SectorData};
pub use error::{Capacity, DiskError, DiskResult};
pub use fat12::FatTable;
pub use geometry::{NUM_SECTORS, SECTOR_SIZE};
pub use host::{HostEntry, HostFs, HostMeta, LocalHostFs, MemoryHostFs};
pub use model::{MappedDirEntry, ReverseSector, SectorOwner, Usage};
