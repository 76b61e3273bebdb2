use crate::block::{PhysicalLayer, SECTOR_SIZE};
use crate::error::{Error, Result};

/// The FAT32 extended BIOS parameter block, one sector at `partition_lba`
/// (spec.md §6). Packed byte-for-byte over the sector so it can be read with
/// a single transmute, as the teacher's `BiosParameterBlock` does.
#[repr(C, packed)]
pub struct BiosParameterBlock {
    pub jump_boot: [u8; 3],
    pub oem_identifier: [u8; 8],
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub number_of_fats: u8,
    pub max_root_entries: u16,
    pub total_sectors_16: u16,
    pub media: u8,
    pub sectors_per_fat_16: u16,
    pub sectors_per_track: u16,
    pub number_of_heads: u16,
    pub hidden_sectors: u32,
    pub total_sectors_32: u32,

    // Extended BPB, FAT32 only.
    pub sectors_per_fat_32: u32,
    pub ext_flags: u16,
    pub fat_version: [u8; 2],
    pub root_dir_cluster: u32,
    pub fsinfo_sector: u16,
    pub backup_boot_sector: u16,
    pub reserved: [u8; 12],
    pub drive_number: u8,
    pub reserved1: u8,
    pub ext_boot_signature: u8,
    pub volume_id: u32,
    pub volume_label: [u8; 11],
    pub fs_type: [u8; 8],
    pub boot_code: [u8; 420],
    pub boot_sector_signature: [u8; 2],
}

impl BiosParameterBlock {
    /// Reads the FAT32 extended BPB from absolute sector `sector`.
    ///
    /// # Errors
    ///
    /// `BadSignature` if the trailing `0x55 0xAA` is missing.
    /// `UnsupportedSectorSize` if `bytes_per_sector != 512` (spec.md §4.4
    /// step 4).
    pub fn read<D: PhysicalLayer>(device: &mut D, sector: u32) -> Result<BiosParameterBlock> {
        let mut buf = [0u8; SECTOR_SIZE];
        device.phy_read_sectors(&mut buf, sector, 1)?;

        let bpb = unsafe { core::mem::transmute::<[u8; SECTOR_SIZE], BiosParameterBlock>(buf) };

        if bpb.boot_sector_signature != [0x55, 0xAA] {
            return Err(Error::BadSignature);
        }
        if { bpb.bytes_per_sector } != SECTOR_SIZE as u16 {
            return Err(Error::UnsupportedSectorSize);
        }

        Ok(bpb)
    }
}
