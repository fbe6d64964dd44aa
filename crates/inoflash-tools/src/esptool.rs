//! esptool command construction (esptool v5 command names)

use std::path::{Path, PathBuf};

use inoflash_core::{ChipFamily, FlashSize, MergeLayout, MergeSegment};

use crate::runner::ToolCommand;

/// Default serial baud rate for writes
pub const DEFAULT_BAUD: u32 = 921_600;

/// Format a flash offset the way esptool expects
pub fn format_offset(offset: u64) -> String {
    format!("0x{:X}", offset)
}

/// esptool bound to one chip family
#[derive(Debug, Clone)]
pub struct Esptool {
    program: PathBuf,
    chip: ChipFamily,
}

impl Esptool {
    /// Use `program` for `chip`
    pub fn new(program: impl Into<PathBuf>, chip: ChipFamily) -> Self {
        Self {
            program: program.into(),
            chip,
        }
    }

    fn base(&self) -> ToolCommand {
        ToolCommand::new(&self.program).args(["--chip", self.chip.as_str()])
    }

    fn with_segments(mut cmd: ToolCommand, segments: &[MergeSegment]) -> ToolCommand {
        for segment in segments {
            cmd = cmd.arg(format_offset(segment.offset)).path_arg(&segment.path);
        }
        cmd
    }

    /// Erase the entire flash
    pub fn erase_flash(&self, port: &str) -> ToolCommand {
        self.base().args(["--port", port, "erase-flash"])
    }

    /// Write files at the given offsets
    pub fn write_flash(&self, port: &str, baud: u32, segments: &[MergeSegment]) -> ToolCommand {
        let cmd = self
            .base()
            .args(["--port", port])
            .arg("--baud")
            .arg(baud.to_string())
            .arg("write-flash");
        Self::with_segments(cmd, segments)
    }

    /// Write a single file at `offset`
    pub fn write_file(&self, port: &str, baud: u32, offset: u64, path: &Path) -> ToolCommand {
        self.write_flash(
            port,
            baud,
            &[MergeSegment {
                offset,
                path: path.to_path_buf(),
            }],
        )
    }

    /// Merge a layout into one image at `output`
    pub fn merge_bin(
        &self,
        flash_size: FlashSize,
        output: &Path,
        layout: &MergeLayout,
    ) -> ToolCommand {
        let cmd = self
            .base()
            .arg("merge-bin")
            .arg("--flash-size")
            .arg(flash_size.to_string())
            .arg("-o")
            .path_arg(output);
        Self::with_segments(cmd, layout.segments())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inoflash_core::MergeArtifacts;
    use std::fs;

    #[test]
    fn test_erase() {
        let tool = Esptool::new("esptool", ChipFamily::Esp32C3);
        assert_eq!(
            tool.erase_flash("COM4").to_string(),
            "esptool --chip esp32c3 --port COM4 erase-flash"
        );
    }

    #[test]
    fn test_write_file() {
        let tool = Esptool::new("esptool", ChipFamily::Esp32);
        let cmd = tool.write_file(
            "/dev/ttyUSB0",
            DEFAULT_BAUD,
            0x290000,
            Path::new("radio.spiffs.bin"),
        );
        assert_eq!(
            cmd.to_string(),
            "esptool --chip esp32 --port /dev/ttyUSB0 --baud 921600 \
             write-flash 0x290000 radio.spiffs.bin"
        );
    }

    #[test]
    fn test_merge_bin() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts =
            MergeArtifacts::for_sketch(dir.path(), "radio", &dir.path().join("boot_app0.bin"));
        for path in [
            &artifacts.bootloader,
            &artifacts.partitions,
            &artifacts.app,
            &artifacts.boot_app0,
        ] {
            fs::write(path, b"x").unwrap();
        }
        let layout = MergeLayout::plan(ChipFamily::Esp32S3, &artifacts).unwrap();

        let tool = Esptool::new("esptool", ChipFamily::Esp32S3);
        let cmd = tool.merge_bin(FlashSize::Mb16, &dir.path().join("radio_merged.bin"), &layout);
        let args = cmd.arg_strings();

        assert_eq!(&args[..6], ["--chip", "esp32s3", "merge-bin", "--flash-size", "16MB", "-o"]);
        let offsets: Vec<&str> = args[7..].iter().step_by(2).map(String::as_str).collect();
        assert_eq!(offsets, ["0x0", "0x8000", "0xE000", "0x10000"]);
        assert_eq!(args[8], artifacts.bootloader.to_string_lossy());
        assert_eq!(args.len(), 15);
    }
}
