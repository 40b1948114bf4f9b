//! The driver's error taxonomy.
//!
//! Mirrors the five failure modes spec'd for the core: a bad MBR signature,
//! an unrecognised partition type, a transport failure, a full disk, and a
//! directory search that didn't find its entry. `DiskFull` and `NotFound`
//! are also surfaced as plain `None`s by the functions that can return them
//! (`find_free_cluster`, `find_entry`, ...); `Error` exists for the paths
//! that need a real error (mount, and anything that touches the transport).

use core::fmt::{self, Display};

/// Everything that can go wrong while mounting or driving a FAT volume.
///
/// Carries the transport's own error type so a caller can recover the
/// underlying I/O failure instead of just knowing that *something* failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// The master boot record's `0xAA55` signature didn't match.
    BadMbr,
    /// The partition-table entry's type byte isn't one of the recognised
    /// FAT16 (`0x04`, `0x06`, `0x0E`) or FAT32 (`0x0B`, `0x0C`) codes.
    UnsupportedPartitionType(u8),
    /// The volume boot record claims a sector size other than 512 bytes;
    /// this driver supports none other (SPEC_FULL §4.2, demoted from the
    /// teacher's `assert_eq!(512, ...)` to a recoverable error).
    UnsupportedSectorSize(u16),
    /// The volume boot record claims a FAT copy count other than 2; the
    /// rest of the driver hard-codes `NUM_FATS = 2` and silently assuming
    /// otherwise would be worse than failing the mount (SPEC_FULL §4.2).
    UnsupportedLayout,
    /// No free cluster remained while allocating space for a new file,
    /// directory, or directory-table extension.
    DiskFull,
    /// `read_sector`/`write_sector` on the transport returned an error.
    IoFailed(E),
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::IoFailed(e)
    }
}

impl<E: Display> Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadMbr => write!(f, "master boot record signature is invalid"),
            Error::UnsupportedPartitionType(t) => {
                write!(f, "unsupported partition type: {:#04x}", t)
            }
            Error::UnsupportedSectorSize(n) => write!(f, "unsupported sector size: {} bytes", n),
            Error::UnsupportedLayout => write!(f, "unsupported volume layout"),
            Error::DiskFull => write!(f, "no free cluster available"),
            Error::IoFailed(e) => write!(f, "block transport error: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl<E: Display + fmt::Debug> std::error::Error for Error<E> {}
