//! A golden FAT32 image shared by the end-to-end scenario tests, matching
//! the geometry and file layout worked through by hand: MBR partition 0 at
//! LBA `0x0800`, VBR reporting `sectors_per_cluster=8`, `reserved=32`,
//! `num_fats=2`, `sectors_per_fat_32=1024`, `root_cluster=2` — recovering
//! `fat_start_sector=2080`, `data_start_sector=4128`.

pub const SECTOR_COUNT: u32 = 8192;
pub const FAT_START_SECTOR: u32 = 2080;
pub const DATA_START_SECTOR: u32 = 4128;

pub const HELLO_CONTENTS: &[u8] = b"Hello, FAT!\r\n";
pub const NOTES_SIZE: usize = 1024;
pub const LONG_NAME: &str = "Długa nazwa.txt";
pub const SHORT_ALIAS: &str = "DUGANA~1.TXT";

/// `BIG.TXT` spans exactly two clusters (4096 B each at `sectors_per_cluster
/// = 8`), so a write straddling byte 4096 crosses a cluster boundary rather
/// than just a sector boundary within one cluster.
pub const BIG_FIRST_CLUSTER: u32 = 6;
pub const BIG_SIZE: usize = 8192;

/// `notes[i] == i as u8`, so the bytes straddling an in-place overwrite are
/// predictable without needing to read the whole file back.
pub fn notes_contents() -> Vec<u8> {
    (0..NOTES_SIZE).map(|i| i as u8).collect()
}

/// `big[i] == (i % 256) as u8`, same predictability as `notes_contents`.
pub fn big_contents() -> Vec<u8> {
    (0..BIG_SIZE).map(|i| (i % 256) as u8).collect()
}

fn set_short_entry(buf: &mut [u8; 32], name: &str, ext: &str, first_cluster: u32, size: u32) {
    let mut short_name = [b' '; 8];
    short_name[..name.len()].copy_from_slice(name.as_bytes());
    let mut short_ext = [b' '; 3];
    short_ext[..ext.len()].copy_from_slice(ext.as_bytes());

    buf[0..8].copy_from_slice(&short_name);
    buf[8..11].copy_from_slice(&short_ext);
    buf[26..28].copy_from_slice(&((first_cluster & 0xFFFF) as u16).to_le_bytes());
    buf[20..22].copy_from_slice(&((first_cluster >> 16) as u16).to_le_bytes());
    buf[28..32].copy_from_slice(&size.to_le_bytes());
}

/// Builds the on-disk LFN fragment records for `name`, in the order they
/// must appear before the short entry: highest sequence number (the
/// `LAST_LONG_ENTRY` fragment, covering the tail of the name) first.
fn build_lfn_entries(name: &str) -> Vec<[u8; 32]> {
    let units: Vec<u16> = name.encode_utf16().collect();
    let total_entries = (units.len() + 12) / 13;

    let mut entries = Vec::new();
    for seq in (1..=total_entries).rev() {
        let start = (seq - 1) * 13;
        let end = (start + 13).min(units.len());
        let real_count = end - start;

        let mut name_units = [0xFFFFu16; 13];
        name_units[..real_count].copy_from_slice(&units[start..end]);
        if real_count < 13 {
            name_units[real_count] = 0x0000;
        }

        let mut raw = [0u8; 32];
        let order = if seq == total_entries {
            (seq as u8) | 0x40
        } else {
            seq as u8
        };
        raw[0] = order;
        for (i, u) in name_units[..5].iter().enumerate() {
            raw[1 + i * 2..3 + i * 2].copy_from_slice(&u.to_le_bytes());
        }
        raw[11] = 0x0F; // ATTR_LFN
        raw[12] = 0x00;
        raw[13] = 0x00; // checksum, unchecked by this reader
        for (i, u) in name_units[5..11].iter().enumerate() {
            raw[14 + i * 2..16 + i * 2].copy_from_slice(&u.to_le_bytes());
        }
        raw[26..28].copy_from_slice(&0u16.to_le_bytes());
        for (i, u) in name_units[11..13].iter().enumerate() {
            raw[28 + i * 2..30 + i * 2].copy_from_slice(&u.to_le_bytes());
        }
        entries.push(raw);
    }
    entries
}

fn set_fat_entry(buf: &mut [u8], cluster: u32, value: u32) {
    let off = FAT_START_SECTOR as usize * 512 + cluster as usize * 4;
    buf[off..off + 4].copy_from_slice(&(value & 0x0FFF_FFFF).to_le_bytes());
}

/// The full golden image: root directory holds `HELLO.TXT` (cluster 3),
/// `NOTES.TXT` (cluster 4), and the LFN pair for `LONG_NAME` aliased as
/// `SHORT_ALIAS` (cluster 5). Every named cluster is single-cluster and
/// terminates its own chain (EOC).
pub fn golden_image() -> Vec<u8> {
    let mut buf = vec![0u8; SECTOR_COUNT as usize * 512];

    let partition = &mut buf[446..462];
    partition[4] = 0x0B;
    partition[8..12].copy_from_slice(&0x0000_0800u32.to_le_bytes());
    partition[12..16].copy_from_slice(&0x0010_0000u32.to_le_bytes());
    buf[510] = 0x55;
    buf[511] = 0xAA;

    let vbr_off = 0x0800 * 512;
    buf[vbr_off + 11..vbr_off + 13].copy_from_slice(&512u16.to_le_bytes());
    buf[vbr_off + 13] = 8; // sectors_per_cluster
    buf[vbr_off + 14..vbr_off + 16].copy_from_slice(&32u16.to_le_bytes()); // reserved
    buf[vbr_off + 16] = 2; // num_fats
    buf[vbr_off + 32..vbr_off + 36].copy_from_slice(&(SECTOR_COUNT - 0x0800).to_le_bytes());
    buf[vbr_off + 36..vbr_off + 40].copy_from_slice(&1024u32.to_le_bytes()); // sectors_per_fat_32
    buf[vbr_off + 44..vbr_off + 48].copy_from_slice(&2u32.to_le_bytes()); // root_dir_cluster
    buf[vbr_off + 510] = 0x55;
    buf[vbr_off + 511] = 0xAA;

    let root_off = DATA_START_SECTOR as usize * 512;
    let mut entry = [0u8; 32];
    set_short_entry(&mut entry, "HELLO", "TXT", 3, HELLO_CONTENTS.len() as u32);
    buf[root_off..root_off + 32].copy_from_slice(&entry);

    let notes = notes_contents();
    let mut entry = [0u8; 32];
    set_short_entry(&mut entry, "NOTES", "TXT", 4, notes.len() as u32);
    buf[root_off + 32..root_off + 64].copy_from_slice(&entry);

    let mut offset = root_off + 64;
    for lfn in build_lfn_entries(LONG_NAME) {
        buf[offset..offset + 32].copy_from_slice(&lfn);
        offset += 32;
    }
    let mut entry = [0u8; 32];
    set_short_entry(&mut entry, "DUGANA~1", "TXT", 5, 0);
    buf[offset..offset + 32].copy_from_slice(&entry);
    offset += 32;

    let big = big_contents();
    let mut entry = [0u8; 32];
    set_short_entry(&mut entry, "BIG", "TXT", BIG_FIRST_CLUSTER, big.len() as u32);
    buf[offset..offset + 32].copy_from_slice(&entry);

    let hello_data_off = (DATA_START_SECTOR + 8) as usize * 512; // cluster 3
    buf[hello_data_off..hello_data_off + HELLO_CONTENTS.len()].copy_from_slice(HELLO_CONTENTS);

    let notes_data_off = (DATA_START_SECTOR + 16) as usize * 512; // cluster 4
    buf[notes_data_off..notes_data_off + notes.len()].copy_from_slice(&notes);

    // BIG.TXT: cluster 6 then cluster 7, 4096 B each.
    let big_data_off = (DATA_START_SECTOR + (BIG_FIRST_CLUSTER - 2) * 8) as usize * 512;
    buf[big_data_off..big_data_off + big.len()].copy_from_slice(&big);

    set_fat_entry(&mut buf, 2, 0x0FFF_FFFF); // root is a single cluster
    set_fat_entry(&mut buf, 3, 0x0FFF_FFFF); // HELLO.TXT
    set_fat_entry(&mut buf, 4, 0x0FFF_FFFF); // NOTES.TXT
    set_fat_entry(&mut buf, 5, 0x0FFF_FFFF); // the LFN-named file
    set_fat_entry(&mut buf, BIG_FIRST_CLUSTER, BIG_FIRST_CLUSTER + 1); // cluster 6 -> 7
    set_fat_entry(&mut buf, BIG_FIRST_CLUSTER + 1, 0x0FFF_FFFF); // cluster 7 -> EOC

    buf
}
