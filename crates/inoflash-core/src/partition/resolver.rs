//! Partition table lookup by scheme name

use std::fs;
use std::path::{Path, PathBuf};

use super::{PartitionRegion, PartitionTable, RegionSource};

/// Extension of partition table files
const TABLE_EXT: &str = "csv";

/// Directory of partition table CSV files
#[derive(Debug, Clone)]
pub struct PartitionTables {
    dir: PathBuf,
}

impl PartitionTables {
    /// Use tables from `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory being searched
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Locate the table file for a scheme
    ///
    /// An exact `<name>.csv` wins. Otherwise the shortest `*.csv` file whose
    /// name starts with `name` (case-insensitive) is taken, so `huge_app`
    /// finds `huge_app.csv` rather than `huge_app_debug.csv`.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        if !self.dir.is_dir() {
            log::warn!("Missing partitions directory: {}", self.dir.display());
            return None;
        }

        let exact = self.dir.join(format!("{}.{}", name, TABLE_EXT));
        if exact.is_file() {
            return Some(exact);
        }

        let prefix = name.to_lowercase();
        let mut candidates: Vec<String> = fs::read_dir(&self.dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|file| {
                file.to_lowercase().starts_with(&prefix)
                    && Path::new(file)
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case(TABLE_EXT))
            })
            .collect();

        candidates.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        candidates.into_iter().next().map(|file| self.dir.join(file))
    }

    /// Load the parsed table for a scheme
    pub fn table(&self, name: &str) -> Option<(PathBuf, PartitionTable)> {
        let Some(path) = self.find(name) else {
            log::warn!("Partition table not found for '{}'", name);
            return None;
        };

        match PartitionTable::from_file(&path) {
            Ok(table) => Some((path, table)),
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        }
    }
}

impl RegionSource for PartitionTables {
    fn filesystem_region(&self, scheme: &str) -> Option<PartitionRegion> {
        let (path, table) = self.table(scheme)?;
        log::info!("Using partition table: {}", path.display());

        match table.filesystem_region() {
            Some(region) => {
                log::info!(
                    "SPIFFS from table: offset=0x{:06X}, size=0x{:06X}",
                    region.offset,
                    region.size
                );
                Some(region)
            }
            None => {
                log::warn!("Partition scheme '{}' has no SPIFFS region", scheme);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables_with(files: &[(&str, &str)]) -> (tempfile::TempDir, PartitionTables) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let tables = PartitionTables::new(dir.path());
        (dir, tables)
    }

    #[test]
    fn test_exact_match() {
        let (dir, tables) = tables_with(&[("default.csv", ""), ("default_8MB.csv", "")]);
        assert_eq!(tables.find("default"), Some(dir.path().join("default.csv")));
    }

    #[test]
    fn test_shortest_prefix_match() {
        let (dir, tables) = tables_with(&[
            ("huge_app_v2.csv", ""),
            ("huge_app_debug.csv", ""),
            ("Huge_App.csv", ""),
        ]);
        // Exact lookup is case-sensitive on most filesystems, prefix is not
        let found = tables.find("huge_app").unwrap();
        let file = found.file_name().unwrap().to_string_lossy().to_lowercase();
        assert_eq!(file, "huge_app.csv");
        assert!(found.starts_with(dir.path()));
    }

    #[test]
    fn test_prefix_ignores_other_extensions() {
        let (dir, tables) = tables_with(&[("min.txt", ""), ("min_spiffs.csv", "")]);
        assert_eq!(tables.find("min"), Some(dir.path().join("min_spiffs.csv")));
    }

    #[test]
    fn test_not_found() {
        let (_dir, tables) = tables_with(&[("default.csv", "")]);
        assert_eq!(tables.find("rainmaker"), None);
        assert_eq!(tables.filesystem_region("rainmaker"), None);

        let missing = PartitionTables::new("/nonexistent/partitions");
        assert_eq!(missing.find("default"), None);
    }

    #[test]
    fn test_filesystem_region_lookup() {
        let (_dir, tables) = tables_with(&[
            (
                "min_spiffs.csv",
                "app0, app, ota_0, 0x10000, 0x1E0000\nspiffs, data, spiffs, 0x3D0000, 0x20000\n",
            ),
            ("no_ota.csv", "app0, app, factory, 0x10000, 0x200000\n"),
        ]);
        assert_eq!(
            tables.filesystem_region("min_spiffs"),
            Some(PartitionRegion {
                offset: 0x3D0000,
                size: 0x20000
            })
        );
        assert_eq!(tables.filesystem_region("no_ota"), None);
    }
}
