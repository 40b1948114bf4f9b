//! Master Boot Record parsing (spec §4.1).
//!
//! Pure, no-I/O decoding of sector 0's partition table. Grounded on the
//! same offset-macro style the teacher crate used for `BiosParameterBlock`
//! and `Gpt` (`fat/boot_sector.rs`, `gpt.rs`): named fields, read with a
//! small `from_le_bytes` helper macro, no unsafe casts over the raw bytes.

use crate::transport::SectorBuffer;
use core::convert::TryInto;

const SIGNATURE_OFFSET: usize = 510;
const PARTITION_TABLE_OFFSET: usize = 446;
const PARTITION_ENTRY_SIZE: usize = 16;
const NUM_PARTITION_ENTRIES: usize = 4;

/// FAT16 partition-type bytes accepted by this driver (spec §4.1).
pub const FAT16_TYPES: [u8; 3] = [0x04, 0x06, 0x0E];
/// FAT32 partition-type bytes accepted by this driver (spec §4.1).
pub const FAT32_TYPES: [u8; 2] = [0x0B, 0x0C];

/// Which FAT variant a partition-table entry's type byte names, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatVariant {
    Fat16,
    Fat32,
}

impl FatVariant {
    /// Classifies a raw MBR partition-type byte, respecting which variants
    /// this build was compiled with (spec §6 configuration gates).
    pub fn from_partition_type(partition_type: u8) -> Option<Self> {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "fat16", feature = "fat32"))] {
                if FAT16_TYPES.contains(&partition_type) {
                    Some(FatVariant::Fat16)
                } else if FAT32_TYPES.contains(&partition_type) {
                    Some(FatVariant::Fat32)
                } else {
                    None
                }
            } else if #[cfg(feature = "fat16")] {
                if FAT16_TYPES.contains(&partition_type) {
                    Some(FatVariant::Fat16)
                } else {
                    None
                }
            } else if #[cfg(feature = "fat32")] {
                if FAT32_TYPES.contains(&partition_type) {
                    Some(FatVariant::Fat32)
                } else {
                    None
                }
            } else {
                compile_error!("at least one of the `fat16`/`fat32` features must be enabled");
            }
        }
    }
}

/// One raw entry out of the MBR's four-entry partition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbrPartitionEntry {
    pub bootable: bool,
    pub partition_type: u8,
    pub first_lba: u32,
    pub length_in_sectors: u32,
}

impl MbrPartitionEntry {
    fn read(sector: &SectorBuffer, index: u8) -> Self {
        let sector = sector.as_slice();
        let base = PARTITION_TABLE_OFFSET + (index as usize) * PARTITION_ENTRY_SIZE;
        let entry = &sector[base..base + PARTITION_ENTRY_SIZE];

        Self {
            bootable: entry[0] == 0x80,
            partition_type: entry[4],
            first_lba: u32::from_le_bytes(entry[8..12].try_into().unwrap()),
            length_in_sectors: u32::from_le_bytes(entry[12..16].try_into().unwrap()),
        }
    }
}

/// Checks the `0xAA55` boot signature at bytes `[510..512)`.
pub fn is_valid(sector: &SectorBuffer) -> bool {
    let sector = sector.as_slice();
    u16::from_le_bytes(sector[SIGNATURE_OFFSET..SIGNATURE_OFFSET + 2].try_into().unwrap()) == 0xAA55
}

/// Reads partition-table entry `index` (`0..4`) out of the MBR sector.
///
/// Caller must have already confirmed [`is_valid`]; this function does not
/// itself check the boot signature. `index` values outside `0..4` panic,
/// mirroring the source's `FAT_GetPartitionLBA`/`FAT_GetPartitionType`
/// macros, which never range-checked their `PartitionNr` argument either.
pub fn partition_entry(sector: &SectorBuffer, index: u8) -> MbrPartitionEntry {
    assert!((index as usize) < NUM_PARTITION_ENTRIES, "partition index out of range");
    MbrPartitionEntry::read(sector, index)
}
