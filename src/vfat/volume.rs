use log::debug;

use crate::block::PhysicalLayer;
use crate::error::{Error, Result};
use crate::mbr::MasterBootRecord;
use crate::vfat::cache::SectorCache;
use crate::vfat::ebpb::BiosParameterBlock;
use crate::vfat::fat::{Cluster, FatEntry, Status};

/// Size in bytes of one on-medium FAT entry.
const FAT_ENTRY_SIZE: u32 = 4;

/// Geometry recovered from the MBR + VBR at mount time (spec.md §3), plus
/// the single shared sector cache (spec.md §4.3). Owned explicitly instead
/// of kept in statics (spec.md §9's "Global state" note).
pub struct Volume<D> {
    device: D,
    cache: SectorCache,
    pub partition_lba: u32,
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub num_fats: u8,
    pub sectors_per_fat_32: u32,
    pub fat_start_sector: u32,
    pub data_start_sector: u32,
    pub root_cluster: Cluster,
}

impl<D: PhysicalLayer> Volume<D> {
    /// Mounts the first FAT32 partition on `device` (spec.md §4.4).
    ///
    /// # Errors
    ///
    /// `BadSignature` on a bad MBR/VBR signature, `UnsupportedPartition` if
    /// no FAT32 entry exists, `UnsupportedSectorSize` if the VBR's logical
    /// sector size isn't 512.
    pub fn mount(mut device: D) -> Result<Volume<D>> {
        device.phy_init()?;

        let mbr = MasterBootRecord::read(&mut device)?;
        let pe = mbr.first_fat32_partition()?;
        let partition_lba = { pe.relative_sector };

        let bpb = BiosParameterBlock::read(&mut device, partition_lba)?;

        let fat_start_sector = partition_lba + bpb.reserved_sectors as u32;
        let data_start_sector =
            fat_start_sector + bpb.number_of_fats as u32 * bpb.sectors_per_fat_32;

        debug!(
            "mounted FAT32 volume: partition_lba={} fat_start={} data_start={} spc={}",
            partition_lba, fat_start_sector, data_start_sector, bpb.sectors_per_cluster
        );

        if { pe.total_sectors } != { bpb.total_sectors_32 } {
            debug!(
                "MBR/VBR size mismatch: mbr={} vbr={}",
                { pe.total_sectors },
                { bpb.total_sectors_32 }
            );
        }

        Ok(Volume {
            device,
            cache: SectorCache::new(),
            partition_lba,
            bytes_per_sector: bpb.bytes_per_sector,
            sectors_per_cluster: bpb.sectors_per_cluster,
            num_fats: bpb.number_of_fats,
            sectors_per_fat_32: bpb.sectors_per_fat_32,
            fat_start_sector,
            data_start_sector,
            root_cluster: Cluster::from(bpb.root_dir_cluster),
        })
    }

    /// Absolute sector holding the first byte of `cluster` (spec.md §4.4).
    pub fn cluster_to_sector(&self, cluster: Cluster) -> u32 {
        self.data_start_sector + (cluster.0 - 2) * self.sectors_per_cluster as u32
    }

    /// Reads the raw FAT entry for `cluster` (spec.md §4.4). Backed by the
    /// shared cache, so consecutive lookups in the same FAT sector cost one
    /// medium read.
    pub fn fat_entry(&mut self, cluster: Cluster) -> Result<FatEntry> {
        let byte_offset = cluster.0 * FAT_ENTRY_SIZE;
        let sector = self.fat_start_sector + byte_offset / self.bytes_per_sector as u32;
        let offset_in_sector = (byte_offset % self.bytes_per_sector as u32) as usize;

        let data = self.cache.get(&mut self.device, sector)?;
        let raw = u32::from_le_bytes([
            data[offset_in_sector],
            data[offset_in_sector + 1],
            data[offset_in_sector + 2],
            data[offset_in_sector + 3],
        ]);
        Ok(FatEntry(raw))
    }

    /// Follows `k` chain links starting at `first`, stopping early at
    /// end-of-chain. Returns the terminal cluster reached and the number of
    /// hops actually made; callers test `consumed == k` to detect
    /// EOF-by-allocation (spec.md §4.4).
    pub fn walk_chain(&mut self, first: Cluster, k: u32) -> Result<(Cluster, u32)> {
        let mut current = first;
        for hop in 0..k {
            match self.fat_entry(current)?.status() {
                Status::Data(next) => current = next,
                Status::Eoc(_) => return Ok((current, hop)),
                _ => return Err(Error::ChainTruncated),
            }
        }
        Ok((current, k))
    }

    /// Reads absolute sector `sector` through the shared cache.
    pub fn get_sector(&mut self, sector: u32) -> Result<&[u8]> {
        self.cache.get(&mut self.device, sector)
    }

    /// Opens absolute sector `sector` for in-place editing through the
    /// shared cache; pair with `flush_cache` before touching a different
    /// sector (spec.md §4.3's write policy).
    pub fn get_sector_mut(&mut self, sector: u32) -> Result<&mut [u8]> {
        self.cache.get_mut(&mut self.device, sector)
    }

    /// Writes `bytes` to `sector` immediately (spec.md §4.3 `put`).
    pub fn put_sector(&mut self, sector: u32, bytes: &[u8]) -> Result<()> {
        self.cache.put(&mut self.device, sector, bytes)
    }

    /// Flushes the cache slot if it was mutated via `get_sector_mut`.
    pub fn flush_cache(&mut self) -> Result<()> {
        self.cache.flush(&mut self.device)
    }

    /// Reclaims the underlying physical layer, e.g. to remount the same
    /// medium and verify a write-through flush actually reached it
    /// (spec.md §8's "write-through durability" property).
    pub fn into_device(self) -> D {
        self.device
    }
}
