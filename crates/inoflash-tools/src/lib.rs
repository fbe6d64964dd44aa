//! inoflash-tools - External tool invocation for inoflash
//!
//! Builds command lines for arduino-cli, esptool and mkspiffs from the
//! decisions made in `inoflash-core`, and runs them through a
//! [`CommandRunner`]. Also covers serial port detection, the optional
//! `inoflash.toml` configuration and the run log.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod arduino;
pub mod error;
pub mod esptool;
pub mod mkspiffs;
pub mod port;
pub mod runlog;
pub mod runner;
pub mod toolchain;

pub use arduino::ArduinoCli;
pub use error::{Result, ToolError};
pub use esptool::{format_offset, Esptool, DEFAULT_BAUD};
pub use mkspiffs::Mkspiffs;
pub use port::{detect_port, PortEnumerator, PortInfo, SystemPorts};
pub use runlog::RunLog;
pub use runner::{CommandOutput, CommandRunner, DryRunRunner, ProcessRunner, ToolCommand};
pub use toolchain::{find_boot_app0, Toolchain, CONFIG_FILE};
