//! Small, dependency-free helpers shared across the driver.

pub mod bits;

pub use bits::Bits;
