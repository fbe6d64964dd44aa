//! arduino-cli command construction

use std::path::{Path, PathBuf};

use inoflash_core::BoardDescriptor;

use crate::runner::ToolCommand;

/// arduino-cli front end
#[derive(Debug, Clone)]
pub struct ArduinoCli {
    program: PathBuf,
}

impl ArduinoCli {
    /// Use `program` as the arduino-cli executable
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Compile `project` for `board`, leaving binaries in `build_path`
    pub fn compile(
        &self,
        board: &BoardDescriptor,
        build_path: &Path,
        project: &Path,
    ) -> ToolCommand {
        ToolCommand::new(&self.program)
            .arg("compile")
            .arg("--fqbn")
            .arg(board.to_string())
            .arg("--build-path")
            .path_arg(build_path)
            .path_arg(project)
    }
}
