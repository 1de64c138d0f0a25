//! SectorDevice trait - the block-device boundary the disk plugs into.

use crate::diagnostics::Diagnostics;
use crate::disk::{DirAsDisk, SectorData};
use crate::geometry::{NUM_SECTORS, SECTOR_SIZE};
use crate::host::HostFs;

/// A sector-addressable disk.
pub trait SectorDevice {
    /// Total number of sectors.
    fn num_sectors(&self) -> u32;

    /// Read a sector. Panics if `sector >= num_sectors()`.
    fn read_sector(&mut self, sector: u32) -> SectorData;

    /// Write a sector. Panics if `sector >= num_sectors()`.
    fn write_sector(&mut self, sector: u32, data: &SectorData);

    /// True if writes are discarded.
    fn is_write_protected(&self) -> bool;
}

impl<H: HostFs, G: Diagnostics> SectorDevice for DirAsDisk<H, G> {
    fn num_sectors(&self) -> u32 {
        NUM_SECTORS
    }

    fn read_sector(&mut self, sector: u32) -> SectorData {
        DirAsDisk::read_sector(self, sector)
    }

    fn write_sector(&mut self, sector: u32, data: &SectorData) {
        DirAsDisk::write_sector(self, sector, data)
    }

    fn is_write_protected(&self) -> bool {
        DirAsDisk::is_write_protected(self)
    }
}

/// Read every sector of a device into one raw image.
pub fn read_image<D: SectorDevice + ?Sized>(device: &mut D) -> Vec<u8> {
    let mut image = Vec::with_capacity(device.num_sectors() as usize * SECTOR_SIZE);
    for sector in 0..device.num_sectors() {
        image.extend_from_slice(&device.read_sector(sector));
    }
    image
}

/// Write a raw image to a device sector by sector. A short final sector is zero padded.
pub fn write_image<D: SectorDevice + ?Sized>(device: &mut D, image: &[u8]) {
    for (sector, chunk) in (0..device.num_sectors()).zip(image.chunks(SECTOR_SIZE)) {
        let mut data = [0u8; SECTOR_SIZE];
        data[..chunk.len()].copy_from_slice(chunk);
        device.write_sector(sector, &data);
    }
}
