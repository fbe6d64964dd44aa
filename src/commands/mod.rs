//! CLI command implementations
//!
//! ## Build pipeline
//!
//! `build` runs the full sequence from sketch to flashed board. Every
//! external tool goes through a [`CommandRunner`](inoflash_tools::CommandRunner),
//! so the pipeline can be driven by a recording runner in tests.
//!
//! ## Inspection
//!
//! `plan` and `partitions` print the decisions the pipeline would make
//! without running any tool.

pub mod build;
pub mod partitions;
pub mod plan;

use std::time::{Duration, Instant};

use inoflash_tools::RunLog;

/// Format a byte count for display
pub fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

/// Times pipeline steps on the console and in the run log
pub struct StepTimer<'a> {
    start: Instant,
    last: Instant,
    log: &'a RunLog,
}

impl<'a> StepTimer<'a> {
    /// Start timing now
    pub fn new(log: &'a RunLog) -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            log,
        }
    }

    /// Mark the end of a step
    pub fn step(&mut self, name: &str) {
        let now = Instant::now();
        let line = format!(
            "{}: {:.2}s (since start {:.2}s)",
            name,
            now.duration_since(self.last).as_secs_f64(),
            now.duration_since(self.start).as_secs_f64()
        );
        println!("[time] {}", line);
        self.log.append(&line);
        self.last = now;
    }

    /// Time since the first step started
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
