//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "inoflash")]
#[command(
    author,
    version,
    about = "Build, package and flash ESP32 Arduino sketches",
    long_about = "Build, package and flash ESP32 Arduino sketches.\n\n\
        Build options are read from `//KEY=value` directives at the top of the \
        sketch (PART, FLASH, PSRAM, ERASE, CUST, COM, PORT, PLATFORM). Without a \
        subcommand the full pipeline runs: compile, merge, flash and optionally \
        build and flash a SPIFFS image from data/."
)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Project directory containing the sketch
    #[arg(short = 'C', long, default_value = ".", global = true)]
    pub project: PathBuf,

    /// Configuration file (defaults to inoflash.toml in the project)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print tool commands instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile, merge and flash the sketch (the default)
    Build,

    /// Print the resolved build plan without running any tool
    Plan,

    /// Show the partition table for a scheme
    Partitions {
        /// Scheme name or alias (e.g. huge_app, MS, HA)
        scheme: String,
    },
}
