//! Partition table support
//!
//! ESP32 partition schemes are described by CSV tables shipped with the
//! Arduino core (`tools/partitions/*.csv`):
//!
//! ```text
//! # Name,   Type, SubType, Offset,  Size, Flags
//! nvs,      data, nvs,     0x9000,  0x5000,
//! otadata,  data, ota,     0xe000,  0x2000,
//! app0,     app,  ota_0,   0x10000, 0x1E0000,
//! app1,     app,  ota_1,   0x1F0000,0x1E0000,
//! spiffs,   data, spiffs,  0x3D0000,0x20000,
//! ```
//!
//! This module locates the table for a scheme name and extracts the
//! filesystem (SPIFFS) region from it.

mod resolver;
mod table;

pub use resolver::PartitionTables;
pub use table::{parse_number, PartitionEntry, PartitionTable};

/// Location of a region in flash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionRegion {
    /// Start address in bytes
    pub offset: u64,
    /// Size in bytes
    pub size: u64,
}

/// Something that can report the filesystem region of a scheme
///
/// `None` means the scheme has no filesystem region, or no table could be
/// found for it. Neither is an error.
pub trait RegionSource {
    /// Filesystem region of `scheme`, if any
    fn filesystem_region(&self, scheme: &str) -> Option<PartitionRegion>;
}
