//! Error types for external tool operations

use std::path::PathBuf;

use thiserror::Error;

/// Tool invocation and environment errors
#[derive(Debug, Error)]
pub enum ToolError {
    /// The program could not be started at all
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// Program that failed to start
        program: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully
    #[error("command failed ({}): {command}", exit_status(.code))]
    Failed {
        /// Rendered command line
        command: String,
        /// Exit code, if the process exited normally
        code: Option<i32>,
    },

    /// A tool finished but the file it should have produced is missing
    #[error("{tool} did not produce {}", .path.display())]
    MissingOutput {
        /// Tool name
        tool: &'static str,
        /// Expected output file
        path: PathBuf,
    },

    /// No serial port configured and none detected
    #[error("no serial ports found; connect the board or set //COM= or //PORT= in the sketch")]
    NoSerialPort,

    /// Serial port enumeration failed
    #[error("serial port enumeration failed: {0}")]
    SerialError(#[from] serialport::Error),

    /// The boot selector stub could not be located
    #[error("boot_app0.bin not found; set paths.boot_app0 in inoflash.toml")]
    BootStubNotFound,

    /// No partition table file exists for a scheme
    #[error("no partition table for '{scheme}' in {}", .dir.display())]
    NoPartitionTable {
        /// Scheme name
        scheme: String,
        /// Directory searched
        dir: PathBuf,
    },

    /// AUTO has no table until the payload is measured
    #[error("AUTO is chosen at build time from the data/ size; use `inoflash plan`")]
    AutoScheme,

    /// Configuration file could not be parsed
    #[error("invalid configuration {}: {source}", .path.display())]
    Config {
        /// Configuration file
        path: PathBuf,
        /// Parse error
        #[source]
        source: toml::de::Error,
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

    /// Build plan error
    #[error(transparent)]
    Plan(#[from] inoflash_core::Error),
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl ToolError {
    /// I/O error on `path`
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for tool operations
pub type Result<T> = core::result::Result<T, ToolError>;
