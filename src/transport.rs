//! The Block Transport collaborator (spec §6): a pair of synchronous,
//! single-sector read/write operations the core issues every I/O through.
//!
//! The core never owns a block device of its own and never buffers more
//! than one sector; implementing this trait for a real disk, an SD card,
//! or a host-side file is entirely the caller's responsibility.

use generic_array::GenericArray;
use typenum::consts::U512;

/// Fixed 512-byte unit the transport moves at a time (spec §6,
/// `BYTES_PER_SECTOR`).
pub type SectorBuffer = GenericArray<u8, U512>;

/// A sector-addressable block device backing a single FAT volume.
///
/// Implementations must be synchronous from the core's point of view
/// (spec §5): a call either completes with the sector moved, or it fails.
/// There is no retry protocol at this layer — a failure is terminal for
/// the operation that triggered it.
pub trait BlockDevice {
    /// The transport's native failure mode.
    type Error: core::fmt::Debug;

    /// Fills `buffer` with the contents of logical sector `lba`.
    fn read_sector(&mut self, lba: u32, buffer: &mut SectorBuffer) -> Result<(), Self::Error>;

    /// Persists `buffer` to logical sector `lba`.
    fn write_sector(&mut self, lba: u32, buffer: &SectorBuffer) -> Result<(), Self::Error>;
}
