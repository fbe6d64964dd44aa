//! Append-only run log
//!
//! Each pipeline step appends one line prefixed with a UNIX timestamp.
//! Failing to write the log never aborts a build.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Run log file
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    /// Log to `path`, creating it on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one line
    pub fn append(&self, message: &str) {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);

        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "[{}] {}", seconds, message));

        if let Err(e) = written {
            log::warn!("Could not write run log {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_appends_timestamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inoflash.log");
        let log = RunLog::new(&path);

        log.append("Compile done (12.3s)");
        log.append("Flash done (4.0s)");

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] Compile done (12.3s)"));
        assert!(lines[1].ends_with("] Flash done (4.0s)"));
    }

    #[test]
    fn test_unwritable_log_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("missing").join("inoflash.log"));
        log.append("ignored");
        assert!(!dir.path().join("missing").exists());
    }
}
