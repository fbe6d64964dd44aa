//! Error types for inoflash-core
//!
//! Only fatal conditions are errors. Recoverable situations (unreadable
//! sketch, missing data directory, scheme without a filesystem region,
//! no partition table file) are logged and replaced by a default instead.

use std::path::PathBuf;

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// No sketch (`*.ino`) found in the project directory
    #[error("no .ino sketch found in {}", .0.display())]
    SketchNotFound(PathBuf),

    /// A binary required for the merged image does not exist
    #[error("missing file: {}", .0.display())]
    MissingArtifact(PathBuf),

    /// The data payload does not fit in the filesystem region
    #[error(
        "data ({payload} B) does not fit in the filesystem partition \
         ({region} B, {margin} B reserved); reduce data/ content or select a larger \
         partition scheme (e.g. HA/huge_app)"
    )]
    PayloadTooLarge {
        /// Total payload size in bytes
        payload: u64,
        /// Filesystem region size in bytes
        region: u64,
        /// Bytes reserved for filesystem structures
        margin: u64,
    },

    /// A segment was appended at or below the last offset of a merge layout
    #[error("segment at 0x{offset:X} must come after 0x{last:X} ({})", .path.display())]
    SegmentOrder {
        /// Offset of the rejected segment
        offset: u64,
        /// Highest offset already in the layout
        last: u64,
        /// File of the rejected segment
        path: PathBuf,
    },

    /// Filesystem I/O error
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
