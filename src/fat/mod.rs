//! The FAT16/FAT32 core: partition mount, the cluster/sector walker, FAT
//! table access, and the directory engine (spec §2, components 3-6).

pub mod boot_sector;
pub mod table;
pub mod dir;

use crate::error::Error;
use crate::mbr::{self, FatVariant};
use crate::transport::{BlockDevice, SectorBuffer};
use boot_sector::BiosParameterBlock;

/// Number of FAT copies this driver understands (spec §6).
pub const NUM_FATS: u32 = 2;
/// Fixed sector size this driver supports (spec §6).
pub const BYTES_PER_SECTOR: u16 = 512;
/// On-disk size of one directory entry (spec §3).
pub const DIR_ENTRY_SIZE: u32 = 32;
/// Directory entries packed into one sector (spec §3).
pub const ENTRIES_PER_SECTOR: u32 = BYTES_PER_SECTOR as u32 / DIR_ENTRY_SIZE;

/// End-of-chain sentinel for FAT16 (spec §3).
pub const FAT16_EOC: u32 = 0xFFFF;
/// End-of-chain sentinel for FAT32 (spec §3); compared against the already
/// `0x0FFFFFFF`-masked FAT entry value.
pub const FAT32_EOC: u32 = 0x0FFF_FFFF;
/// Mask applied to a raw FAT32 entry; the top 4 bits are reserved.
pub const FAT32_CLUSTER_MASK: u32 = 0x0FFF_FFFF;

/// A sector/cluster traversal cursor (spec §3, "Location cursor").
///
/// After [`Fat::seek`], `sector` points at the first sector of `cluster`
/// and `remaining` is `sectors_per_cluster - 1`. After [`Fat::read_next_sector`]
/// crosses into a new cluster, the same invariant holds for the new
/// cluster; when the chain ends, `cluster` is set to the variant's
/// end-of-chain sentinel so that [`Fat::is_valid_cluster`] reports `false`
/// without the caller needing separate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub cluster: u32,
    pub sector: u32,
    pub remaining: u8,
}

/// A mounted FAT16 or FAT32 partition.
///
/// Borrows the caller's sector buffer for its entire lifetime and owns the
/// block-transport handle; every field but `buffer`/`device` is immutable
/// after [`Fat::mount`] returns (spec §3).
pub struct Fat<'buf, D: BlockDevice> {
    pub device: D,
    pub buffer: &'buf mut SectorBuffer,

    pub partition_lba: u32,
    pub variant: FatVariant,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub sectors_per_fat: u32,
    /// Zero on FAT32.
    pub root_dir_entries: u16,
    /// Meaningless on FAT16 (the root directory isn't cluster-chained there).
    pub root_dir_cluster: u32,
}

impl<'buf, D: BlockDevice> Fat<'buf, D> {
    /// Opens partition `partition_index` (`0..4`) of the disk behind
    /// `device`, using `buffer` as the sole sector buffer for the returned
    /// descriptor's lifetime (spec §4.2).
    pub fn mount(
        mut device: D,
        buffer: &'buf mut SectorBuffer,
        partition_index: u8,
    ) -> Result<Self, Error<D::Error>> {
        device.read_sector(0, buffer)?;

        if !mbr::is_valid(buffer) {
            return Err(Error::BadMbr);
        }

        let entry = mbr::partition_entry(buffer, partition_index);
        let variant = FatVariant::from_partition_type(entry.partition_type)
            .ok_or(Error::UnsupportedPartitionType(entry.partition_type))?;

        device.read_sector(entry.first_lba, buffer)?;
        let bpb = BiosParameterBlock::read(buffer, variant);

        if bpb.bytes_per_sector != BYTES_PER_SECTOR {
            return Err(Error::UnsupportedSectorSize(bpb.bytes_per_sector));
        }
        if bpb.num_fats as u32 != NUM_FATS {
            return Err(Error::UnsupportedLayout);
        }

        log::debug!(
            "mounted {:?} partition at lba {}: {} sectors/cluster, {} reserved, {} sectors/fat",
            variant, entry.first_lba, bpb.sectors_per_cluster, bpb.reserved_sectors, bpb.sectors_per_fat,
        );

        Ok(Self {
            device,
            buffer,
            partition_lba: entry.first_lba,
            variant,
            sectors_per_cluster: bpb.sectors_per_cluster,
            reserved_sectors: bpb.reserved_sectors,
            sectors_per_fat: bpb.sectors_per_fat,
            root_dir_entries: bpb.root_dir_entries,
            root_dir_cluster: bpb.root_dir_cluster,
        })
    }

    /// Number of sectors occupied by the FAT16 fixed-size root directory;
    /// zero on FAT32, where the BPB zeroes `root_dir_entries` (spec §9,
    /// "`FAT_Seek` adds `root_directory_entries / 16` unconditionally").
    pub fn root_entries_sectors(&self) -> u32 {
        self.root_dir_entries as u32 / ENTRIES_PER_SECTOR
    }

    /// First sector LBA of the first FAT copy.
    pub fn fat_start_sector(&self) -> u32 {
        self.partition_lba + self.reserved_sectors as u32
    }

    /// First sector LBA of the data region (spec §3 invariant: the
    /// partition's `root_data_lba`, before the FAT16 fixed-root offset).
    pub fn root_data_lba(&self) -> u32 {
        self.fat_start_sector() + NUM_FATS * self.sectors_per_fat
    }

    /// First sector LBA of cluster `cluster` (spec §4.3/§8 invariant).
    pub fn first_sector_of(&self, cluster: u32) -> u32 {
        self.root_data_lba()
            + self.root_entries_sectors()
            + (cluster - 2) * self.sectors_per_cluster as u32
    }

    /// The end-of-chain sentinel for this partition's variant.
    pub fn eoc(&self) -> u32 {
        match self.variant {
            FatVariant::Fat16 => FAT16_EOC,
            FatVariant::Fat32 => FAT32_EOC,
        }
    }

    /// Terminal-cluster predicate (spec §4.3): `true` while traversal may
    /// continue, `false` once `cluster` is the variant's EOC sentinel.
    pub fn is_valid_cluster(&self, cluster: u32) -> bool {
        cluster != self.eoc()
    }

    /// Positions `loc` at the first sector of `cluster`. No I/O (spec §4.3).
    pub fn seek(&self, loc: &mut Location, cluster: u32) {
        loc.cluster = cluster;
        loc.sector = self.first_sector_of(cluster);
        loc.remaining = self.sectors_per_cluster - 1;
    }

    /// Reads the sector `loc` currently points to into the partition's
    /// sector buffer.
    pub fn read_first_sector(&mut self, loc: &Location) -> Result<(), Error<D::Error>> {
        self.device.read_sector(loc.sector, self.buffer)?;
        Ok(())
    }

    /// Advances `loc` by one sector, crossing into the next cluster via the
    /// FAT when the current cluster is exhausted, and reads the resulting
    /// sector into the buffer (spec §4.3). Leaves `loc` in a terminal state
    /// (and issues no I/O) once the chain's end-of-chain sentinel is hit.
    pub fn read_next_sector(&mut self, loc: &mut Location) -> Result<(), Error<D::Error>> {
        if loc.remaining > 0 {
            loc.sector += 1;
            loc.remaining -= 1;
        } else {
            let next = self.next_cluster(loc.cluster)?;
            if !self.is_valid_cluster(next) {
                loc.cluster = self.eoc();
                return Ok(());
            }
            self.seek(loc, next);
        }
        self.device.read_sector(loc.sector, self.buffer)?;
        Ok(())
    }
}
