//! The physical-layer boundary the FAT32 volume consumes.
//!
//! Spec §9 asks that the three function pointers the original C source kept
//! in a static struct (`phyInit`/`phyReadSectors`/`phyWriteSectors`) become a
//! capability trait injected at mount time, so the FAT32 layer can be tested
//! against a RAM-disk without any SD card at all.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::{Error, Result};

/// Sector size this engine supports; spec.md §4.4 rejects any other value at
/// mount time.
pub const SECTOR_SIZE: usize = 512;

/// The physical layer FS (C4/C5) consumes; BD (`crate::sd::SdSpi`) is one
/// implementation, `RamDisk` another.
pub trait PhysicalLayer {
    /// Performs any one-time bring-up (e.g. the SD card init FSM). Callers
    /// invoke this once, before the first `read_sectors`/`write_sectors`.
    fn phy_init(&mut self) -> Result<()>;

    /// Reads `count` consecutive 512-byte sectors starting at `sector` into
    /// `buf`, which must be at least `count * 512` bytes.
    fn phy_read_sectors(&mut self, buf: &mut [u8], sector: u32, count: u32) -> Result<()>;

    /// Writes `count` consecutive 512-byte sectors starting at `sector` from
    /// `buf`, which must be at least `count * 512` bytes.
    fn phy_write_sectors(&mut self, buf: &[u8], sector: u32, count: u32) -> Result<()>;
}

/// An in-memory physical layer, sufficient to test the FAT32 volume/file
/// layer without a card — spec.md §6: "A RAM-disk implementation suffices to
/// test FS without a card."
pub struct RamDisk {
    sectors: Vec<u8>,
}

impl RamDisk {
    /// Creates a zero-filled RAM disk of `sector_count` 512-byte sectors.
    pub fn new(sector_count: u32) -> Self {
        RamDisk {
            sectors: vec![0u8; sector_count as usize * SECTOR_SIZE],
        }
    }

    /// Creates a RAM disk from a pre-built image, e.g. a golden test volume.
    /// `image.len()` must be a multiple of 512.
    pub fn from_image(image: Vec<u8>) -> Self {
        assert!(image.len() % SECTOR_SIZE == 0, "image is not sector-aligned");
        RamDisk { sectors: image }
    }

    /// Raw access to the backing bytes, for test assertions.
    pub fn as_bytes(&self) -> &[u8] {
        &self.sectors
    }
}

impl PhysicalLayer for RamDisk {
    fn phy_init(&mut self) -> Result<()> {
        Ok(())
    }

    fn phy_read_sectors(&mut self, buf: &mut [u8], sector: u32, count: u32) -> Result<()> {
        let start = sector as usize * SECTOR_SIZE;
        let len = count as usize * SECTOR_SIZE;
        let end = start.checked_add(len).ok_or(Error::BadArgument)?;
        let src = self.sectors.get(start..end).ok_or(Error::Io)?;
        buf.get_mut(..len).ok_or(Error::BadArgument)?.copy_from_slice(src);
        Ok(())
    }

    fn phy_write_sectors(&mut self, buf: &[u8], sector: u32, count: u32) -> Result<()> {
        let start = sector as usize * SECTOR_SIZE;
        let len = count as usize * SECTOR_SIZE;
        let end = start.checked_add(len).ok_or(Error::BadArgument)?;
        let dst = self.sectors.get_mut(start..end).ok_or(Error::Io)?;
        dst.copy_from_slice(buf.get(..len).ok_or(Error::BadArgument)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let mut disk = RamDisk::new(4);
        let data = [0xABu8; SECTOR_SIZE];
        disk.phy_write_sectors(&data, 2, 1).unwrap();

        let mut out = [0u8; SECTOR_SIZE];
        disk.phy_read_sectors(&mut out, 2, 1).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn read_past_end_is_io_error() {
        let mut disk = RamDisk::new(1);
        let mut out = [0u8; SECTOR_SIZE];
        assert_eq!(disk.phy_read_sectors(&mut out, 5, 1), Err(Error::Io));
    }
}
