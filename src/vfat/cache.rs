use crate::block::{PhysicalLayer, SECTOR_SIZE};
use crate::error::Result;

/// The single 512-byte read-through cache slot FS shares across C4/C5
/// (spec.md §4.3). Sequential reads within a sector and repeated FAT-entry
/// lookups in the same FAT sector become free; the slot is write-through, so
/// a crash between logical operations can never leave the medium holding
/// only a cache-resident mutation.
pub struct SectorCache {
    slot: Option<u32>,
    data: [u8; SECTOR_SIZE],
    dirty: bool,
}

impl SectorCache {
    pub fn new() -> Self {
        SectorCache {
            slot: None,
            data: [0u8; SECTOR_SIZE],
            dirty: false,
        }
    }

    /// Returns the cached contents of `sector`, reading the medium only if
    /// the slot doesn't already hold it.
    pub fn get<D: PhysicalLayer>(&mut self, device: &mut D, sector: u32) -> Result<&[u8]> {
        self.fill(device, sector)?;
        Ok(&self.data)
    }

    /// Returns a mutable view of `sector`'s cached contents for in-place
    /// editing. The caller must `flush` before fetching a different sector,
    /// or call `put` instead to write through immediately.
    pub fn get_mut<D: PhysicalLayer>(&mut self, device: &mut D, sector: u32) -> Result<&mut [u8]> {
        self.fill(device, sector)?;
        self.dirty = true;
        Ok(&mut self.data)
    }

    /// Writes `bytes` to `sector` on the medium and updates the slot to
    /// match, in one step.
    pub fn put<D: PhysicalLayer>(&mut self, device: &mut D, sector: u32, bytes: &[u8]) -> Result<()> {
        device.phy_write_sectors(bytes, sector, 1)?;
        self.data.copy_from_slice(bytes);
        self.slot = Some(sector);
        self.dirty = false;
        Ok(())
    }

    /// Writes the current slot back to the medium if it has been mutated
    /// through `get_mut` since the last flush.
    pub fn flush<D: PhysicalLayer>(&mut self, device: &mut D) -> Result<()> {
        if self.dirty {
            if let Some(sector) = self.slot {
                device.phy_write_sectors(&self.data, sector, 1)?;
            }
            self.dirty = false;
        }
        Ok(())
    }

    /// Forgets the cached sector. A subsequent `get`/`get_mut` re-reads from
    /// the medium. Any unflushed mutation is discarded without reaching the
    /// medium — callers must `flush` first if that matters.
    pub fn invalidate(&mut self) {
        self.slot = None;
        self.dirty = false;
    }

    fn fill<D: PhysicalLayer>(&mut self, device: &mut D, sector: u32) -> Result<()> {
        if self.slot != Some(sector) {
            // The slot is about to be evicted for a different sector; write
            // back a pending mutation first, or it's lost with no trace.
            self.flush(device)?;
            device.phy_read_sectors(&mut self.data, sector, 1)?;
            self.slot = Some(sector);
            self.dirty = false;
        }
        Ok(())
    }
}

impl Default for SectorCache {
    fn default() -> Self {
        Self::new()
    }
}
