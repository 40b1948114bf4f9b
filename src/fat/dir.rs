//! The Directory Engine (spec §4.5): 8.3 name formatting, directory-entry
//! parsing, and walking/extending a directory's entry list.
//!
//! [`DirCursor`] gives the FAT16 root directory and a cluster-chained
//! directory (a FAT32 root, or any subdirectory) their own explicit
//! states instead of repurposing a cluster field as an entry counter the
//! way the source this driver is descended from did — that overload is
//! exactly the kind of bug class a tagged enum rules out at compile time.

use crate::error::Error;
use crate::transport::BlockDevice;
use crate::util::Bits;
use super::{Fat, Location, DIR_ENTRY_SIZE, ENTRIES_PER_SECTOR};
use crate::mbr::FatVariant;
use core::convert::TryInto;
use core::fmt::{self, Debug};

macro_rules! field {
    ($ty:tt, $raw:expr, $offset:literal) => {
        $ty::from_le_bytes($raw[$offset..$offset + core::mem::size_of::<$ty>()].try_into().unwrap())
    };
}

/// A directory attribute bit (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    ReadOnly = 0x01,
    Hidden = 0x02,
    System = 0x04,
    VolumeId = 0x08,
    Directory = 0x10,
    Archive = 0x20,
}

/// Attribute byte marking a long-filename slot (spec §3): all four of
/// `READ_ONLY|HIDDEN|SYSTEM|VOLUME_ID` set at once. The core skips these
/// outright rather than surfacing them as ordinary entries.
const LONG_NAME_ATTRIBUTE: u8 = 0x0F;

/// The raw attribute byte of a directory entry.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttributeSet {
    inner: u8,
}

impl AttributeSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_set(&self, attr: Attribute) -> bool {
        self.inner.bit((attr as u8).trailing_zeros())
    }

    pub fn set(&mut self, attr: Attribute) {
        self.inner.set_bit((attr as u8).trailing_zeros(), true);
    }

    pub fn is_dir(&self) -> bool {
        self.is_set(Attribute::Directory)
    }

    pub fn is_volume_id(&self) -> bool {
        self.is_set(Attribute::VolumeId)
    }

    /// Whether this is a long-filename slot (spec §3/§4.5), which the core
    /// skips during enumeration rather than yielding as a file or subdir.
    pub fn is_long_name(&self) -> bool {
        self.inner == LONG_NAME_ATTRIBUTE
    }
}

/// A name in raw 8.3 form: 8 name bytes followed by 3 extension bytes,
/// space-padded, with no embedded `.` (spec §4.6).
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Name83([u8; 11]);

impl Name83 {
    /// Wraps an already-packed 11-byte 8.3 name as read off disk.
    pub fn from_raw(raw: [u8; 11]) -> Self {
        Self(raw)
    }

    /// Builds a name/extension pair into packed 8.3 form: upper-cased,
    /// truncated to 8 and 3 bytes respectively, and space-padded.
    pub fn from_parts(name: &str, ext: &str) -> Self {
        let mut raw = [0x20u8; 11];

        for (slot, byte) in raw[0..8].iter_mut().zip(name.bytes()) {
            *slot = byte.to_ascii_uppercase();
        }
        for (slot, byte) in raw[8..11].iter_mut().zip(ext.bytes()) {
            *slot = byte.to_ascii_uppercase();
        }

        Self(raw)
    }

    pub fn as_bytes(&self) -> &[u8; 11] {
        &self.0
    }
}

impl Debug for Name83 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0[0..8] {
            if b == 0x20 {
                break;
            }
            write!(f, "{}", b as char)?;
        }
        if self.0[8] != 0x20 {
            write!(f, ".")?;
            for &b in &self.0[8..11] {
                if b == 0x20 {
                    break;
                }
                write!(f, "{}", b as char)?;
            }
        }
        Ok(())
    }
}

/// Whether a 32-byte slot holds a live entry, a deleted one, or marks the
/// end of the directory's entry list (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Exists,
    Deleted,
    End,
}

/// One parsed 32-byte directory entry (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub name: Name83,
    pub attributes: AttributeSet,
    pub creation_time: u16,
    pub creation_date: u16,
    pub last_access_date: u16,
    pub write_time: u16,
    pub write_date: u16,
    cluster_high: u16,
    cluster_low: u16,
    pub file_size: u32,
}

impl DirEntry {
    /// A brand-new entry with no timestamps set, ready for a name,
    /// attribute set, and starting cluster to be filled in.
    pub fn new(name: Name83, attributes: AttributeSet, cluster: u32, file_size: u32) -> Self {
        let mut entry = Self {
            name,
            attributes,
            creation_time: 0,
            creation_date: 0,
            last_access_date: 0,
            write_time: 0,
            write_date: 0,
            cluster_high: 0,
            cluster_low: 0,
            file_size,
        };
        entry.set_cluster(cluster);
        entry
    }

    pub fn state(&self) -> EntryState {
        match self.name.0[0] {
            0x00 => EntryState::End,
            0xE5 => EntryState::Deleted,
            _ => EntryState::Exists,
        }
    }

    pub fn cluster(&self) -> u32 {
        (self.cluster_high as u32) << 16 | self.cluster_low as u32
    }

    pub fn set_cluster(&mut self, cluster: u32) {
        self.cluster_high = (cluster >> 16) as u16;
        self.cluster_low = cluster as u16;
    }

    fn from_raw(raw: &[u8]) -> Self {
        let mut name = [0u8; 11];
        name.copy_from_slice(&raw[0..11]);

        Self {
            name: Name83(name),
            attributes: AttributeSet { inner: raw[11] },
            creation_time: field!(u16, raw, 14),
            creation_date: field!(u16, raw, 16),
            last_access_date: field!(u16, raw, 18),
            cluster_high: field!(u16, raw, 20),
            write_time: field!(u16, raw, 22),
            write_date: field!(u16, raw, 24),
            cluster_low: field!(u16, raw, 26),
            file_size: field!(u32, raw, 28),
        }
    }

    /// Packs this entry into its 32-byte on-disk form, for callers (tests,
    /// or an upper layer doing its own directory-sector I/O) that need the
    /// raw bytes without going through [`Fat::create_entry`].
    pub fn to_raw(&self) -> [u8; 32] {
        let mut raw = [0u8; 32];
        self.write_into(&mut raw);
        raw
    }

    fn write_into(&self, raw: &mut [u8]) {
        raw[0..11].copy_from_slice(&self.name.0);
        raw[11] = self.attributes.inner;
        raw[12] = 0;
        raw[13] = 0;
        raw[14..16].copy_from_slice(&self.creation_time.to_le_bytes());
        raw[16..18].copy_from_slice(&self.creation_date.to_le_bytes());
        raw[18..20].copy_from_slice(&self.last_access_date.to_le_bytes());
        raw[20..22].copy_from_slice(&self.cluster_high.to_le_bytes());
        raw[22..24].copy_from_slice(&self.write_time.to_le_bytes());
        raw[24..26].copy_from_slice(&self.write_date.to_le_bytes());
        raw[26..28].copy_from_slice(&self.cluster_low.to_le_bytes());
        raw[28..32].copy_from_slice(&self.file_size.to_le_bytes());
    }
}

/// A free-standing (unwritten) 32-byte slot, used as the terminator value.
fn end_marker() -> [u8; 32] {
    [0u8; 32]
}

/// Where a directory walk currently is (spec §4.5).
///
/// The FAT16 root directory lives in a fixed run of sectors that precedes
/// the data region and is never cluster-chained, so it gets its own
/// variant with its own counters instead of forcing it through
/// [`Location`], which assumes cluster addressing.
#[derive(Debug, Clone, Copy)]
pub enum DirCursor {
    Fat16Root {
        next_sector: u32,
        entries_remaining: u16,
    },
    Chained(Location),
}

/// A live walk over a directory's entries, backed by the partition's
/// shared sector buffer.
pub struct DirEntries {
    cursor: DirCursor,
    slot: u16,
}

impl DirEntries {
    /// Absolute sector LBA the walk is currently positioned at.
    pub fn current_sector(&self) -> u32 {
        match self.cursor {
            DirCursor::Fat16Root { next_sector, .. } => next_sector - 1,
            DirCursor::Chained(loc) => loc.sector,
        }
    }

    /// Byte offset of the walk's current slot within [`current_sector`](Self::current_sector).
    pub fn entry_offset(&self) -> usize {
        self.slot as usize * DIR_ENTRY_SIZE as usize
    }
}

impl<'buf, D: BlockDevice> Fat<'buf, D> {
    /// Opens a walk over the volume's root directory.
    pub fn open_root_dir(&mut self) -> Result<DirEntries, Error<D::Error>> {
        let cursor = match self.variant {
            FatVariant::Fat16 => {
                let sector = self.root_data_lba();
                self.device.read_sector(sector, self.buffer)?;
                DirCursor::Fat16Root {
                    next_sector: sector + 1,
                    entries_remaining: self.root_dir_entries,
                }
            }
            FatVariant::Fat32 => {
                let mut loc = Location { cluster: 0, sector: 0, remaining: 0 };
                self.seek(&mut loc, self.root_dir_cluster);
                self.read_first_sector(&loc)?;
                DirCursor::Chained(loc)
            }
        };

        Ok(DirEntries { cursor, slot: 0 })
    }

    /// Opens a walk over a subdirectory's entries, given its first
    /// cluster (taken from that subdirectory's own [`DirEntry::cluster`]).
    pub fn open_dir(&mut self, cluster: u32) -> Result<DirEntries, Error<D::Error>> {
        let mut loc = Location { cluster: 0, sector: 0, remaining: 0 };
        self.seek(&mut loc, cluster);
        self.read_first_sector(&loc)?;
        Ok(DirEntries { cursor: DirCursor::Chained(loc), slot: 0 })
    }

    /// Returns the next live entry, skipping deleted slots, or `None` once
    /// the end-of-directory marker or the chain's end is reached (spec §4.5).
    pub fn next_entry(&mut self, dir: &mut DirEntries) -> Result<Option<DirEntry>, Error<D::Error>> {
        loop {
            if dir.slot as u32 == ENTRIES_PER_SECTOR {
                if !self.advance_dir_sector(dir)? {
                    return Ok(None);
                }
            }

            let offset = dir.slot as usize * DIR_ENTRY_SIZE as usize;
            let entry = DirEntry::from_raw(&self.buffer.as_slice()[offset..offset + 32]);
            dir.slot += 1;

            match entry.state() {
                EntryState::End => return Ok(None),
                EntryState::Deleted => continue,
                EntryState::Exists if entry.attributes.is_long_name() => continue,
                EntryState::Exists => return Ok(Some(entry)),
            }
        }
    }

    /// Linear search for the first live entry whose name matches `name`
    /// (spec §4.5). The only entries skipped are the ones `next_entry`
    /// itself already skips (deleted and long-filename slots) — a
    /// volume-label entry's name is matched like any other, since spec.md
    /// doesn't name it as an exception.
    pub fn find_entry(&mut self, dir: &mut DirEntries, name: &Name83) -> Result<Option<DirEntry>, Error<D::Error>> {
        while let Some(entry) = self.next_entry(dir)? {
            if entry.name.as_bytes() == name.as_bytes() {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    /// Advances `dir` to the next sector of its directory. Returns `false`
    /// once there is no next sector (FAT16 root exhausted, or the
    /// cluster chain ended).
    ///
    /// `entries_remaining` counts entries not yet visited, including the
    /// sector just scanned; it's decremented here by a full sector's worth
    /// rather than per-entry in [`Fat::next_entry`], so the fixed-size root
    /// directory's end is detected correctly whether a caller walks it via
    /// `next_entry` or via `create_entry`'s own direct slot scan.
    fn advance_dir_sector(&mut self, dir: &mut DirEntries) -> Result<bool, Error<D::Error>> {
        match &mut dir.cursor {
            DirCursor::Fat16Root { next_sector, entries_remaining } => {
                *entries_remaining = entries_remaining.saturating_sub(ENTRIES_PER_SECTOR as u16);
                if *entries_remaining == 0 {
                    return Ok(false);
                }
                self.device.read_sector(*next_sector, self.buffer)?;
                *next_sector += 1;
                dir.slot = 0;
                Ok(true)
            }
            DirCursor::Chained(loc) => {
                self.read_next_sector(loc)?;
                if !self.is_valid_cluster(loc.cluster) {
                    return Ok(false);
                }
                dir.slot = 0;
                Ok(true)
            }
        }
    }
}

#[cfg(feature = "write")]
impl<'buf, D: BlockDevice> Fat<'buf, D> {
    /// Allocates a fresh, zeroed cluster and links it after `predecessor`
    /// (spec §4.4/§4.5). Follows spec §5's write ordering exactly: when
    /// `predecessor != 0`, its FAT slot is written before the new
    /// cluster's own terminator (`link_clusters` already does this);
    /// `predecessor == 0` begins a brand-new chain with only the
    /// terminator write.
    pub fn create_cluster(&mut self, predecessor: u32) -> Result<u32, Error<D::Error>> {
        let cluster = self.find_free_cluster()?.ok_or(Error::DiskFull)?;
        self.link_clusters(predecessor, cluster)?;
        log::debug!("created cluster {} (predecessor {})", cluster, predecessor);

        self.buffer.iter_mut().for_each(|b| *b = 0);
        let mut loc = Location { cluster: 0, sector: 0, remaining: 0 };
        self.seek(&mut loc, cluster);
        for offset in 0..self.sectors_per_cluster as u32 {
            self.device.write_sector(loc.sector + offset, self.buffer)?;
        }

        Ok(cluster)
    }

    /// Locates the first free (`0x00`) or deleted (`0xE5`) slot reachable
    /// from `dir`'s current position, extending the directory with a
    /// freshly allocated cluster if every existing slot is taken (spec
    /// §4.5, "directory growth"), and positions `dir` at that slot.
    ///
    /// This only locates the slot; [`Fat::init_entry`] does the actual
    /// writing (spec §4.5 keeps the two as separate primitives — the
    /// caller may inspect or reuse the located cursor before committing a
    /// name to it). Not available for the FAT16 root directory, whose size
    /// is fixed at format time.
    pub fn create_entry(&mut self, dir: &mut DirEntries) -> Result<(), Error<D::Error>> {
        loop {
            for slot in dir.slot..ENTRIES_PER_SECTOR as u16 {
                let offset = slot as usize * DIR_ENTRY_SIZE as usize;
                let existing = DirEntry::from_raw(&self.buffer.as_slice()[offset..offset + 32]);

                if existing.state() != EntryState::Exists {
                    dir.slot = slot;
                    return Ok(());
                }
            }

            match &mut dir.cursor {
                DirCursor::Fat16Root { entries_remaining, .. } => {
                    if *entries_remaining == 0 {
                        log::warn!("fixed-size FAT16 root directory is full");
                        return Err(Error::DiskFull);
                    }
                    self.advance_dir_sector(dir)?;
                }
                DirCursor::Chained(loc) => {
                    let predecessor = loc.cluster;
                    let next = self.next_cluster(predecessor)?;
                    if self.is_valid_cluster(next) {
                        self.seek(loc, next);
                        self.read_first_sector(loc)?;
                    } else {
                        let new_cluster = self.create_cluster(predecessor)?;
                        self.seek(loc, new_cluster);
                        self.read_first_sector(loc)?;
                    }
                    dir.slot = 0;
                }
            }
        }
    }

    /// Zero-fills the slot `dir` is currently positioned at, copies `name`
    /// into its name field, and writes the enclosing sector (spec §4.5).
    /// Every other field — attributes, timestamps, size, start cluster —
    /// is left zero; the caller fills those in with further mutations of
    /// `Fat::buffer` (and a follow-up `Fat::device.write_sector`) before
    /// the buffer is next reloaded.
    pub fn init_entry(&mut self, dir: &DirEntries, name: &Name83) -> Result<(), Error<D::Error>> {
        let offset = dir.entry_offset();
        for b in self.buffer[offset..offset + 32].iter_mut() {
            *b = 0;
        }
        self.buffer[offset..offset + 11].copy_from_slice(name.as_bytes());
        self.device.write_sector(dir.current_sector(), self.buffer)?;
        log::trace!("wrote name {:?} into slot at sector {}", name, dir.current_sector());
        Ok(())
    }
}
