//! Merged image layout
//!
//! The compiler leaves the bootloader, partition table and application as
//! separate binaries. esptool's `merge-bin` combines them with the boot
//! selector stub (`boot_app0.bin`) into one image written at address 0:
//!
//! ```text
//! 0x1000 / 0x0000  bootloader   (classic ESP32 / S3 and C3)
//! 0x8000           partition table
//! 0xE000           boot_app0.bin
//! 0x10000          application
//! ```
//!
//! The filesystem image is not part of the plan: its offset comes from the
//! partition table and is appended by the caller with [`MergeLayout::append`].

use std::path::{Path, PathBuf};

use crate::directive::ChipFamily;
use crate::error::{Error, Result};

/// Partition table offset
pub const PARTITIONS_OFFSET: u64 = 0x8000;
/// Boot selector stub offset
pub const BOOT_APP0_OFFSET: u64 = 0xE000;
/// Application offset
pub const APP_OFFSET: u64 = 0x10000;

impl ChipFamily {
    /// Bootloader offset for this family
    pub fn bootloader_offset(&self) -> u64 {
        match self {
            Self::Esp32 => 0x1000,
            Self::Esp32S3 | Self::Esp32C3 => 0x0000,
        }
    }
}

/// Binaries that make up the merged image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeArtifacts {
    /// Second stage bootloader
    pub bootloader: PathBuf,
    /// Binary partition table
    pub partitions: PathBuf,
    /// Application image
    pub app: PathBuf,
    /// Boot selector stub shipped with the Arduino core
    pub boot_app0: PathBuf,
}

impl MergeArtifacts {
    /// Artifacts the compiler produces for `sketch_base` in `bin_dir`
    ///
    /// `radio` gives `radio.ino.bootloader.bin`, `radio.ino.partitions.bin`
    /// and `radio.ino.bin`.
    pub fn for_sketch(bin_dir: &Path, sketch_base: &str, boot_app0: &Path) -> Self {
        Self {
            bootloader: bin_dir.join(format!("{}.ino.bootloader.bin", sketch_base)),
            partitions: bin_dir.join(format!("{}.ino.partitions.bin", sketch_base)),
            app: bin_dir.join(format!("{}.ino.bin", sketch_base)),
            boot_app0: boot_app0.to_path_buf(),
        }
    }

    /// Compiler output files, without the boot stub
    pub fn compiler_outputs(&self) -> [&Path; 3] {
        [
            self.bootloader.as_path(),
            self.partitions.as_path(),
            self.app.as_path(),
        ]
    }

    /// Fail with the first artifact that does not exist
    pub fn check(&self) -> Result<()> {
        for path in [&self.bootloader, &self.partitions, &self.app, &self.boot_app0] {
            if !path.is_file() {
                return Err(Error::MissingArtifact(path.clone()));
            }
        }
        Ok(())
    }
}

/// One file placed at a flash offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSegment {
    /// Flash offset in bytes
    pub offset: u64,
    /// File to place there
    pub path: PathBuf,
}

/// Ordered segments of a merged image, strictly increasing by offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeLayout {
    chip: ChipFamily,
    segments: Vec<MergeSegment>,
}

impl MergeLayout {
    /// Plan the layout for a chip family
    ///
    /// Every artifact must exist; nothing is planned otherwise.
    pub fn plan(chip: ChipFamily, artifacts: &MergeArtifacts) -> Result<Self> {
        artifacts.check()?;

        let segments = vec![
            MergeSegment {
                offset: chip.bootloader_offset(),
                path: artifacts.bootloader.clone(),
            },
            MergeSegment {
                offset: PARTITIONS_OFFSET,
                path: artifacts.partitions.clone(),
            },
            MergeSegment {
                offset: BOOT_APP0_OFFSET,
                path: artifacts.boot_app0.clone(),
            },
            MergeSegment {
                offset: APP_OFFSET,
                path: artifacts.app.clone(),
            },
        ];

        log::debug!("Merge layout for {}: {:?}", chip, segments);
        Ok(Self { chip, segments })
    }

    /// Append a segment after the existing ones (e.g. the SPIFFS image)
    pub fn append(&mut self, offset: u64, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        if let Some(last) = self.segments.last() {
            if offset <= last.offset {
                return Err(Error::SegmentOrder {
                    offset,
                    last: last.offset,
                    path,
                });
            }
        }
        self.segments.push(MergeSegment { offset, path });
        Ok(())
    }

    /// Chip family the layout was planned for
    pub fn chip(&self) -> ChipFamily {
        self.chip
    }

    /// Segments in offset order
    pub fn segments(&self) -> &[MergeSegment] {
        &self.segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn artifacts(dir: &Path) -> MergeArtifacts {
        let artifacts = MergeArtifacts::for_sketch(dir, "radio", &dir.join("boot_app0.bin"));
        for path in [
            &artifacts.bootloader,
            &artifacts.partitions,
            &artifacts.app,
            &artifacts.boot_app0,
        ] {
            fs::write(path, [0u8; 16]).unwrap();
        }
        artifacts
    }

    fn offsets(layout: &MergeLayout) -> Vec<u64> {
        layout.segments().iter().map(|s| s.offset).collect()
    }

    #[test]
    fn test_artifact_names() {
        let a = MergeArtifacts::for_sketch(Path::new("out"), "radio", Path::new("boot_app0.bin"));
        assert_eq!(a.bootloader, Path::new("out/radio.ino.bootloader.bin"));
        assert_eq!(a.partitions, Path::new("out/radio.ino.partitions.bin"));
        assert_eq!(a.app, Path::new("out/radio.ino.bin"));
    }

    #[test]
    fn test_family_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifacts(dir.path());

        let classic = MergeLayout::plan(ChipFamily::Esp32, &a).unwrap();
        assert_eq!(offsets(&classic), vec![0x1000, 0x8000, 0xE000, 0x10000]);

        for chip in [ChipFamily::Esp32S3, ChipFamily::Esp32C3] {
            let layout = MergeLayout::plan(chip, &a).unwrap();
            assert_eq!(offsets(&layout), vec![0x0000, 0x8000, 0xE000, 0x10000]);
            assert_eq!(layout.chip(), chip);
        }
    }

    #[test]
    fn test_segment_paths() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifacts(dir.path());
        let layout = MergeLayout::plan(ChipFamily::Esp32, &a).unwrap();
        let paths: Vec<&Path> = layout.segments().iter().map(|s| s.path.as_path()).collect();
        assert_eq!(
            paths,
            vec![
                a.bootloader.as_path(),
                a.partitions.as_path(),
                a.boot_app0.as_path(),
                a.app.as_path()
            ]
        );
    }

    #[test]
    fn test_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifacts(dir.path());

        for missing in [&a.bootloader, &a.partitions, &a.app, &a.boot_app0] {
            fs::remove_file(missing).unwrap();
            match MergeLayout::plan(ChipFamily::Esp32S3, &a) {
                Err(Error::MissingArtifact(path)) => assert_eq!(&path, missing),
                other => panic!("expected missing artifact, got {:?}", other),
            }
            fs::write(missing, [0u8; 16]).unwrap();
        }
    }

    #[test]
    fn test_append_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifacts(dir.path());
        let mut layout = MergeLayout::plan(ChipFamily::Esp32, &a).unwrap();

        layout.append(0x290000, dir.path().join("radio.spiffs.bin")).unwrap();
        assert_eq!(layout.segments().len(), 5);
        assert_eq!(layout.segments()[4].offset, 0x290000);

        assert!(matches!(
            layout.append(0x8000, "late.bin"),
            Err(Error::SegmentOrder { offset: 0x8000, last: 0x290000, .. })
        ));
        assert_eq!(layout.segments().len(), 5);
    }
}
