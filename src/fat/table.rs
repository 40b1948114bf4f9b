//! FAT Table Access (spec §4.4): reading and writing individual FAT
//! entries, and finding/linking free clusters.
//!
//! The scan in [`Fat::find_free_cluster`] fixes two bugs flagged in the
//! source this driver is descended from: the free-cluster search started
//! at cluster 0 (clusters 0 and 1 are reserved and never allocatable) and
//! bounded itself by `sectors_per_fat / sectors_per_cluster`, a quantity
//! with the wrong dimensions (it conflates FAT sectors with data-region
//! clusters). Both are corrected here: the scan starts at cluster 2 and
//! runs for `sectors_per_fat * entries_per_sector` entries, which is
//! exactly the number of cluster slots a FAT of that size addresses.

use crate::error::Error;
use crate::transport::BlockDevice;
use super::{Fat, FAT32_CLUSTER_MASK};
use crate::mbr::FatVariant;
use core::convert::TryInto;

impl<'buf, D: BlockDevice> Fat<'buf, D> {
    fn entry_size(&self) -> u32 {
        match self.variant {
            FatVariant::Fat16 => 2,
            FatVariant::Fat32 => 4,
        }
    }

    fn entries_per_sector(&self) -> u32 {
        super::BYTES_PER_SECTOR as u32 / self.entry_size()
    }

    /// Total number of cluster slots addressed by one FAT copy.
    fn total_entries(&self) -> u32 {
        self.sectors_per_fat * self.entries_per_sector()
    }

    fn entry_location(&self, cluster: u32) -> (u32, usize) {
        let per_sector = self.entries_per_sector();
        let sector = self.fat_start_sector() + cluster / per_sector;
        let offset = (cluster % per_sector) as usize * self.entry_size() as usize;
        (sector, offset)
    }

    /// Reads FAT slot `cluster` out of the first FAT copy.
    ///
    /// FAT16 entries are raw 16-bit values; FAT32 entries are masked to 28
    /// bits, since the top nibble is reserved and must be ignored both when
    /// comparing against the end-of-chain sentinel and when following a
    /// chain (spec §9).
    pub fn next_cluster(&mut self, cluster: u32) -> Result<u32, Error<D::Error>> {
        let (sector, offset) = self.entry_location(cluster);
        self.device.read_sector(sector, self.buffer)?;
        let raw = self.buffer.as_slice();

        Ok(match self.variant {
            FatVariant::Fat16 => u16::from_le_bytes(raw[offset..offset + 2].try_into().unwrap()) as u32,
            FatVariant::Fat32 => {
                u32::from_le_bytes(raw[offset..offset + 4].try_into().unwrap()) & FAT32_CLUSTER_MASK
            }
        })
    }
}

// `find_free_cluster`/`link_clusters` are write-mode APIs (spec §6);
// `next_cluster` above is not, since ordinary chain traversal needs it even
// with the `write` feature disabled.
#[cfg(feature = "write")]
impl<'buf, D: BlockDevice> Fat<'buf, D> {
    /// Writes `value` into FAT slot `cluster`, in both FAT copies.
    fn write_fat_entry(&mut self, cluster: u32, value: u32) -> Result<(), Error<D::Error>> {
        let (sector, offset) = self.entry_location(cluster);
        let entry_size = self.entry_size();

        for copy in 0..super::NUM_FATS {
            let copy_sector = sector + copy * self.sectors_per_fat;
            self.device.read_sector(copy_sector, self.buffer)?;

            match entry_size {
                2 => self.buffer[offset..offset + 2].copy_from_slice(&(value as u16).to_le_bytes()),
                _ => {
                    // Preserve the reserved top nibble of the existing FAT32 entry.
                    let existing = u32::from_le_bytes(
                        self.buffer.as_slice()[offset..offset + 4].try_into().unwrap(),
                    );
                    let merged = (existing & !FAT32_CLUSTER_MASK) | (value & FAT32_CLUSTER_MASK);
                    self.buffer[offset..offset + 4].copy_from_slice(&merged.to_le_bytes());
                }
            }

            self.device.write_sector(copy_sector, self.buffer)?;
        }

        Ok(())
    }

    /// Scans the FAT for an unused cluster (FAT entry `0`), returning its
    /// number, or `None` if the volume is full (spec §4.4, "disk full").
    ///
    /// Always starts at cluster 2 and scans in increasing order (spec §4.4:
    /// "scan sector-by-sector starting at the FAT's first sector, entries
    /// in increasing offset... first free wins"). A cluster this returns
    /// without the caller ever linking it is still legally free — nothing
    /// in this driver's contract requires the caller to link what it's
    /// handed — so a scan-start hint that skipped past it on the next call
    /// would violate the "first free wins" ordering spec.md mandates.
    pub fn find_free_cluster(&mut self) -> Result<Option<u32>, Error<D::Error>> {
        let total = self.total_entries();

        for cluster in 2..total {
            if self.next_cluster(cluster)? == 0 {
                log::trace!("allocated cluster {}", cluster);
                return Ok(Some(cluster));
            }
        }

        log::warn!("no free cluster found among {} total entries", total);
        Ok(None)
    }

    /// Chains cluster `from` to cluster `to` by writing `to` into `from`'s
    /// FAT slot, then terminates the chain by writing the end-of-chain
    /// sentinel into `to`'s slot (spec §4.4). When `from` is `0` (there is
    /// no predecessor, e.g. the first cluster of a new file), only `to`'s
    /// slot is written.
    pub fn link_clusters(&mut self, from: u32, to: u32) -> Result<(), Error<D::Error>> {
        log::trace!("linking cluster {} -> {}", from, to);
        if from != 0 {
            self.write_fat_entry(from, to)?;
        }
        let eoc = self.eoc();
        self.write_fat_entry(to, eoc)
    }
}
