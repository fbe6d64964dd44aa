//! inoflash - Build and flash ESP32 Arduino sketches
//!
//! Reads build directives from the sketch, picks a partition scheme that
//! fits the `data/` payload, compiles with arduino-cli, merges the binaries
//! with esptool and flashes the board, optionally with a SPIFFS image.
//!
//! # Architecture
//!
//! - `inoflash-core` makes every decision (directives, scheme, FQBN, merge
//!   offsets, filesystem capacity) without touching external tools
//! - `inoflash-tools` builds tool command lines and runs them through a
//!   `CommandRunner`
//! - this binary wires the two together into the pipeline

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use inoflash_tools::Toolchain;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let toolchain = Toolchain::load(&cli.project, cli.config.as_deref())?;
    log::debug!("Toolchain: {:?}", toolchain);

    match cli.command.unwrap_or(Commands::Build) {
        Commands::Build => commands::build::run_build(&cli.project, &toolchain, cli.dry_run)?,
        Commands::Plan => commands::plan::run_plan(&cli.project, &toolchain)?,
        Commands::Partitions { scheme } => {
            commands::partitions::cmd_show(&toolchain.partition_tables(), &scheme)?
        }
    }

    Ok(())
}
