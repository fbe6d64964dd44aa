//! Filesystem image planning
//!
//! Before `mkspiffs` is asked for an image, the `data/` payload is measured
//! and checked against the filesystem region of the selected scheme.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::partition::PartitionRegion;
use crate::scheme::FS_MARGIN;

/// Size and shape of a payload directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PayloadStats {
    /// Sum of all file sizes in bytes
    pub bytes: u64,
    /// Number of files
    pub files: usize,
    /// Number of subdirectories
    pub dirs: usize,
}

impl PayloadStats {
    /// Measure a directory recursively
    ///
    /// Returns `Ok(None)` if `dir` does not exist. Symlinked files are
    /// counted but symlinked directories are not entered.
    pub fn measure(dir: &Path) -> Result<Option<Self>> {
        if !dir.is_dir() {
            return Ok(None);
        }
        let mut stats = Self::default();
        stats.walk(dir)?;
        Ok(Some(stats))
    }

    fn walk(&mut self, dir: &Path) -> Result<()> {
        let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| Error::io(&path, e))?;
            if file_type.is_dir() {
                self.dirs += 1;
                self.walk(&path)?;
            } else if file_type.is_file() {
                let meta = entry.metadata().map_err(|e| Error::io(&path, e))?;
                self.files += 1;
                self.bytes += meta.len();
            } else if file_type.is_symlink() {
                // Linked files count, linked directories are not entered
                match fs::metadata(&path) {
                    Ok(meta) if meta.is_file() => {
                        self.files += 1;
                        self.bytes += meta.len();
                    }
                    Ok(_) => log::debug!("Not following directory link {}", path.display()),
                    Err(e) => log::debug!("Skipping dangling link {}: {}", path.display(), e),
                }
            }
        }
        Ok(())
    }
}

/// Whether `payload` bytes fit in a region of `region_size` bytes
///
/// The payload may use everything but `margin` bytes.
pub fn fits(payload: u64, region_size: u64, margin: u64) -> bool {
    region_size
        .checked_sub(margin)
        .is_some_and(|usable| payload <= usable)
}

/// An accepted request for a filesystem image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsImagePlan {
    /// Directory the image is built from
    pub source: PathBuf,
    /// Payload measurement
    pub stats: PayloadStats,
    /// Exact size of the image to build
    pub image_size: u64,
    /// Flash offset the image belongs at
    pub offset: u64,
}

impl FsImagePlan {
    /// Plan an image of `region` from `payload_dir`
    ///
    /// Returns `Ok(None)` when the payload directory does not exist, and
    /// [`Error::PayloadTooLarge`] when the payload does not fit.
    pub fn new(payload_dir: &Path, region: PartitionRegion) -> Result<Option<Self>> {
        let Some(stats) = PayloadStats::measure(payload_dir)? else {
            log::warn!(
                "Missing {} directory: not creating SPIFFS",
                payload_dir.display()
            );
            return Ok(None);
        };

        log::info!(
            "{}: {} directories, {} files, {} B of data",
            payload_dir.display(),
            stats.dirs,
            stats.files,
            stats.bytes
        );

        Self::from_stats(payload_dir, stats, region).map(Some)
    }

    /// Check measured stats against a region
    pub fn from_stats(
        payload_dir: &Path,
        stats: PayloadStats,
        region: PartitionRegion,
    ) -> Result<Self> {
        if !fits(stats.bytes, region.size, FS_MARGIN) {
            return Err(Error::PayloadTooLarge {
                payload: stats.bytes,
                region: region.size,
                margin: FS_MARGIN,
            });
        }

        Ok(Self {
            source: payload_dir.to_path_buf(),
            stats,
            image_size: region.size,
            offset: region.offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGION: PartitionRegion = PartitionRegion {
        offset: 0x290000,
        size: 0x170000,
    };

    fn stats(bytes: u64) -> PayloadStats {
        PayloadStats {
            bytes,
            files: 1,
            dirs: 0,
        }
    }

    #[test]
    fn test_fits_boundary() {
        assert!(fits(0x170000 - FS_MARGIN, 0x170000, FS_MARGIN));
        assert!(!fits(0x170000 - FS_MARGIN + 1, 0x170000, FS_MARGIN));
        assert!(!fits(0, 100, FS_MARGIN));
    }

    #[test]
    fn test_capacity_check() {
        let dir = Path::new("data");
        let plan = FsImagePlan::from_stats(dir, stats(REGION.size - FS_MARGIN), REGION).unwrap();
        assert_eq!(plan.image_size, REGION.size);
        assert_eq!(plan.offset, REGION.offset);

        let err =
            FsImagePlan::from_stats(dir, stats(REGION.size - FS_MARGIN + 1), REGION).unwrap_err();
        assert!(matches!(
            err,
            Error::PayloadTooLarge {
                region: 0x170000,
                margin: FS_MARGIN,
                ..
            }
        ));
        assert!(err.to_string().contains("huge_app"));
    }

    #[test]
    fn test_measure() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        assert_eq!(PayloadStats::measure(&data).unwrap(), None);

        fs::create_dir_all(data.join("www/img")).unwrap();
        fs::write(data.join("index.html"), vec![b'a'; 100]).unwrap();
        fs::write(data.join("www/style.css"), vec![b'b'; 20]).unwrap();
        fs::write(data.join("www/img/logo.png"), vec![b'c'; 3]).unwrap();

        let stats = PayloadStats::measure(&data).unwrap().unwrap();
        assert_eq!(
            stats,
            PayloadStats {
                bytes: 123,
                files: 3,
                dirs: 2
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_measure_symlink_loop() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        fs::write(data.join("index.html"), vec![b'a'; 10]).unwrap();
        fs::write(dir.path().join("outside.txt"), vec![b'b'; 5]).unwrap();
        symlink(&data, data.join("loop")).unwrap();
        symlink(dir.path().join("outside.txt"), data.join("linked.txt")).unwrap();
        symlink(dir.path().join("gone"), data.join("dangling")).unwrap();

        let stats = PayloadStats::measure(&data).unwrap().unwrap();
        assert_eq!(
            stats,
            PayloadStats {
                bytes: 15,
                files: 2,
                dirs: 0
            }
        );
    }

    #[test]
    fn test_plan_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        assert_eq!(FsImagePlan::new(&data, REGION).unwrap(), None);

        fs::create_dir(&data).unwrap();
        fs::write(data.join("config.json"), b"{}").unwrap();
        let plan = FsImagePlan::new(&data, REGION).unwrap().unwrap();
        assert_eq!(plan.source, data);
        assert_eq!(plan.stats.bytes, 2);
    }
}
