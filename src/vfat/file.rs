use alloc::string::String;
use log::trace;

use crate::block::{PhysicalLayer, SECTOR_SIZE};
use crate::error::{Error, Result};
use crate::util::encode_short_name;
use crate::vfat::dirent::{LfnDirEntry, RegularDirEntry, ATTR_LFN, ENTRY_END, ENTRY_FREE};
use crate::vfat::fat::{Cluster, Status};
use crate::vfat::metadata::Metadata;
use crate::vfat::volume::Volume;

/// Open-file table capacity (spec.md §3: "A fixed-capacity table (≥ 32
/// slots)").
pub const MAX_OPEN_FILES: usize = 32;

/// An index into the open-file table (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handle(usize);

struct OpenFile {
    short_name: [u8; 11],
    long_name: Option<String>,
    first_cluster: Cluster,
    size: u32,
    metadata: Metadata,
    /// 0-based index of this file's 32-byte record within the root chain.
    root_dir_entry: u32,
    rd: u32,
    wr: u32,
}

/// The fixed-capacity open-file table (spec.md §3/§4.5), replacing the
/// source's process-wide static table (spec.md §9).
pub struct OpenFiles {
    slots: [Option<OpenFile>; MAX_OPEN_FILES],
}

impl OpenFiles {
    pub fn new() -> Self {
        OpenFiles {
            slots: core::array::from_fn(|_| None),
        }
    }

    fn alloc(&mut self) -> Result<usize> {
        self.slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::TooManyOpen)
    }

    fn file(&self, h: Handle) -> Result<&OpenFile> {
        self.slots
            .get(h.0)
            .and_then(Option::as_ref)
            .ok_or(Error::InvalidHandle)
    }

    fn file_mut(&mut self, h: Handle) -> Result<&mut OpenFile> {
        self.slots
            .get_mut(h.0)
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidHandle)
    }

    /// Encodes `name` as 8.3, scans the root directory one sector at a time
    /// (following the root's own FAT chain across cluster boundaries), and
    /// on a match fills a free handle (spec.md §4.5 `open`).
    pub fn open<D: PhysicalLayer>(&mut self, volume: &mut Volume<D>, name: &str) -> Result<Handle> {
        let target = encode_short_name(name).ok_or(Error::BadArgument)?;
        let slot = self.alloc()?;

        let mut cluster = volume.root_cluster;
        let mut entry_index: u32 = 0;
        let mut pending_long_name: Option<String> = None;

        loop {
            for sector_in_cluster in 0..volume.sectors_per_cluster as u32 {
                let sector = volume.cluster_to_sector(cluster) + sector_in_cluster;
                let mut raw = [0u8; 32];
                let entries_per_sector = SECTOR_SIZE / 32;

                for i in 0..entries_per_sector {
                    raw.copy_from_slice(&volume.get_sector(sector)?[i * 32..i * 32 + 32]);

                    match raw[0] {
                        ENTRY_END => return Err(Error::NotFound),
                        ENTRY_FREE => {
                            pending_long_name = None;
                            entry_index += 1;
                            continue;
                        }
                        _ => {}
                    }

                    if raw[11] == ATTR_LFN {
                        let lfn = LfnDirEntry::parse(&raw);
                        let fragment = lfn.name_fragment();
                        pending_long_name = Some(match pending_long_name.take() {
                            Some(rest) => {
                                let mut joined = fragment;
                                joined.push_str(&rest);
                                joined
                            }
                            None => fragment,
                        });
                        entry_index += 1;
                        continue;
                    }

                    let regular = RegularDirEntry::parse(&raw);
                    let long_name = pending_long_name.take();

                    if regular.short_name_bytes() == target {
                        trace!("open: matched entry {} cluster={}", entry_index, { regular.first_cluster_lo });
                        self.slots[slot] = Some(OpenFile {
                            short_name: target,
                            long_name,
                            first_cluster: regular.first_cluster(),
                            size: regular.file_size,
                            metadata: regular.metadata(),
                            root_dir_entry: entry_index,
                            rd: 0,
                            wr: 0,
                        });
                        return Ok(Handle(slot));
                    }

                    entry_index += 1;
                }
            }

            match volume.fat_entry(cluster)?.status() {
                Status::Eoc(_) => return Err(Error::NotFound),
                Status::Data(next) => cluster = next,
                _ => return Err(Error::ChainTruncated),
            }
        }
    }

    /// Reads up to `buf.len()` bytes starting at the handle's read cursor
    /// (spec.md §4.5 `read`). Returns `0` (not `Eof`) once `buf` is fully
    /// satisfied; returns `Err(Eof)` only when the cursor is already at
    /// `size` on entry.
    pub fn read<D: PhysicalLayer>(
        &mut self,
        volume: &mut Volume<D>,
        h: Handle,
        buf: &mut [u8],
    ) -> Result<usize> {
        let (first_cluster, size, mut rd) = {
            let f = self.file(h)?;
            (f.first_cluster, f.size, f.rd)
        };

        if rd == size {
            return Err(Error::Eof);
        }

        let spc = volume.sectors_per_cluster as u32;
        let mut total = 0usize;

        while total < buf.len() && rd < size {
            let sector_in_file = rd / SECTOR_SIZE as u32;
            let cluster_offset = sector_in_file / spc;
            let sector_in_cluster = sector_in_file % spc;

            let (cluster, consumed) = volume.walk_chain(first_cluster, cluster_offset)?;
            if consumed != cluster_offset {
                return Err(Error::ChainTruncated);
            }

            let sector = volume.cluster_to_sector(cluster) + sector_in_cluster;
            let data = volume.get_sector(sector)?;

            let offset_in_sector = (rd % SECTOR_SIZE as u32) as usize;
            let remaining_in_sector = SECTOR_SIZE - offset_in_sector;
            let remaining_in_file = (size - rd) as usize;
            let n = (buf.len() - total)
                .min(remaining_in_sector)
                .min(remaining_in_file);

            buf[total..total + n].copy_from_slice(&data[offset_in_sector..offset_in_sector + n]);

            total += n;
            rd += n as u32;
        }

        self.file_mut(h)?.rd = rd;
        Ok(total)
    }

    /// Overwrites bytes starting at the handle's write cursor (spec.md §4.5
    /// `write`). Never allocates new clusters: a write that would cross the
    /// file's current `size` is refused wholesale with `WouldGrow`, after
    /// which the cursor and medium are both left unchanged.
    pub fn write<D: PhysicalLayer>(
        &mut self,
        volume: &mut Volume<D>,
        h: Handle,
        bytes: &[u8],
    ) -> Result<usize> {
        let (first_cluster, size, mut wr) = {
            let f = self.file(h)?;
            (f.first_cluster, f.size, f.wr)
        };

        if wr as u64 + bytes.len() as u64 > size as u64 {
            return Err(Error::WouldGrow);
        }

        let spc = volume.sectors_per_cluster as u32;
        let mut total = 0usize;
        let mut current_sector: Option<u32> = None;

        while total < bytes.len() {
            let sector_in_file = wr / SECTOR_SIZE as u32;
            let cluster_offset = sector_in_file / spc;
            let sector_in_cluster = sector_in_file % spc;

            let (cluster, consumed) = volume.walk_chain(first_cluster, cluster_offset)?;
            if consumed != cluster_offset {
                return Err(Error::ChainTruncated);
            }

            let sector = volume.cluster_to_sector(cluster) + sector_in_cluster;
            if current_sector != Some(sector) {
                if current_sector.is_some() {
                    volume.flush_cache()?;
                }
                current_sector = Some(sector);
            }

            let offset_in_sector = (wr % SECTOR_SIZE as u32) as usize;
            let remaining_in_sector = SECTOR_SIZE - offset_in_sector;
            let n = (bytes.len() - total).min(remaining_in_sector);

            let data = volume.get_sector_mut(sector)?;
            data[offset_in_sector..offset_in_sector + n]
                .copy_from_slice(&bytes[total..total + n]);

            total += n;
            wr += n as u32;
        }

        volume.flush_cache()?;

        self.file_mut(h)?.wr = wr;
        self.update_root_entry(volume, h)?;
        Ok(total)
    }

    /// Clamps and moves the read cursor (spec.md §4.5 `seek`).
    pub fn seek_rd(&mut self, h: Handle, pos: u32) -> Result<u32> {
        let f = self.file_mut(h)?;
        if pos > f.size {
            return Err(Error::BadArgument);
        }
        f.rd = pos;
        Ok(pos)
    }

    /// Clamps and moves the write cursor (spec.md §4.5 `seek`). The design
    /// never grows a file, so positions past `size` are rejected rather than
    /// zero-filled (spec.md §9's open item).
    pub fn seek_wr(&mut self, h: Handle, pos: u32) -> Result<u32> {
        let f = self.file_mut(h)?;
        if pos > f.size {
            return Err(Error::BadArgument);
        }
        f.wr = pos;
        Ok(pos)
    }

    /// Releases the handle's slot (spec.md §4.5 `close`). The cache is
    /// already write-through, so there is nothing left to flush.
    pub fn close(&mut self, h: Handle) -> Result<()> {
        self.file(h)?;
        self.slots[h.0] = None;
        Ok(())
    }

    /// Overwrites the `file_size` field of the handle's 32-byte root-chain
    /// record, preserving every other byte (spec.md §4.5
    /// `update_root_entry`).
    pub fn update_root_entry<D: PhysicalLayer>(
        &mut self,
        volume: &mut Volume<D>,
        h: Handle,
    ) -> Result<()> {
        let (root_dir_entry, size) = {
            let f = self.file(h)?;
            (f.root_dir_entry, f.size)
        };

        let entries_per_sector = (SECTOR_SIZE / 32) as u32;
        let entries_per_cluster = entries_per_sector * volume.sectors_per_cluster as u32;

        let cluster_offset = root_dir_entry / entries_per_cluster;
        let index_in_cluster = root_dir_entry % entries_per_cluster;
        let sector_in_cluster = index_in_cluster / entries_per_sector;
        let index_in_sector = (index_in_cluster % entries_per_sector) as usize;

        let (cluster, consumed) = volume.walk_chain(volume.root_cluster, cluster_offset)?;
        if consumed != cluster_offset {
            return Err(Error::ChainTruncated);
        }

        let sector = volume.cluster_to_sector(cluster) + sector_in_cluster;
        let data = volume.get_sector_mut(sector)?;
        let off = index_in_sector * 32 + 28; // file_size field, spec.md §6
        data[off..off + 4].copy_from_slice(&size.to_le_bytes());
        volume.flush_cache()
    }

    /// The long name decoded from the LFN records preceding this handle's
    /// short entry, if any (spec.md §8 scenario 5's diagnostic accessor).
    pub fn long_name(&self, h: Handle) -> Result<Option<&str>> {
        Ok(self.file(h)?.long_name.as_deref())
    }

    pub fn size(&self, h: Handle) -> Result<u32> {
        Ok(self.file(h)?.size)
    }

    pub fn metadata(&self, h: Handle) -> Result<Metadata> {
        Ok(self.file(h)?.metadata)
    }
}

impl Default for OpenFiles {
    fn default() -> Self {
        Self::new()
    }
}
