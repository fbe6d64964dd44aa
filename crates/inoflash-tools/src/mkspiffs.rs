//! mkspiffs command construction

use std::path::{Path, PathBuf};

use inoflash_core::FsImagePlan;

use crate::runner::ToolCommand;

/// SPIFFS block size
pub const BLOCK_SIZE: u32 = 4096;
/// SPIFFS page size
pub const PAGE_SIZE: u32 = 256;

/// mkspiffs front end
#[derive(Debug, Clone)]
pub struct Mkspiffs {
    program: PathBuf,
}

impl Mkspiffs {
    /// Use `program` as the mkspiffs executable
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Build an image of exactly `plan.image_size` bytes at `output`
    pub fn create(&self, plan: &FsImagePlan, output: &Path) -> ToolCommand {
        ToolCommand::new(&self.program)
            .arg("-c")
            .path_arg(&plan.source)
            .arg("-b")
            .arg(BLOCK_SIZE.to_string())
            .arg("-p")
            .arg(PAGE_SIZE.to_string())
            .arg("-s")
            .arg(plan.image_size.to_string())
            .path_arg(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inoflash_core::PayloadStats;

    #[test]
    fn test_create() {
        let plan = FsImagePlan {
            source: PathBuf::from("data"),
            stats: PayloadStats::default(),
            image_size: 0x170000,
            offset: 0x290000,
        };
        let cmd = Mkspiffs::new("mkspiffs").create(&plan, Path::new("bin_out/radio.spiffs.bin"));
        assert_eq!(
            cmd.to_string(),
            "mkspiffs -c data -b 4096 -p 256 -s 1507328 bin_out/radio.spiffs.bin"
        );
    }
}
