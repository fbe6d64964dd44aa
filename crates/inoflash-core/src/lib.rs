//! inoflash-core - Build plan decisions for ESP32 sketch deployment
//!
//! This crate turns sketch directives and on-disk facts (size of the
//! `data/` directory, available partition tables) into a resolved build
//! plan. It never runs external tools; see `inoflash-tools` for that.
//!
//! # Pipeline
//!
//! ```text
//! sketch lines ──► BuildConfig ──► ResolvedConfig ──► BoardDescriptor
//!                      │  (scheme selection,                │
//!                      │   PartitionTables)                 ▼
//!                      │                         MergeLayout + FsImagePlan
//! ```
//!
//! # Example
//!
//! ```ignore
//! use inoflash_core::{BuildConfig, BoardDescriptor, PartitionTables};
//!
//! let tables = PartitionTables::new(partitions_dir);
//! let config = BuildConfig::from_sketch(&sketch).resolve(Some(900_000), &tables);
//! println!("FQBN: {}", BoardDescriptor::new(&config));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod board;
pub mod directive;
pub mod error;
pub mod fsimage;
pub mod merge;
pub mod partition;
pub mod scheme;

pub use board::BoardDescriptor;
pub use directive::{find_sketch, BuildConfig, ChipFamily, FlashSize};
pub use error::{Error, Result};
pub use fsimage::{FsImagePlan, PayloadStats};
pub use merge::{MergeArtifacts, MergeLayout, MergeSegment};
pub use partition::{PartitionRegion, PartitionTable, PartitionTables, RegionSource};
pub use scheme::{PartitionChoice, ResolvedConfig, FS_MARGIN};
