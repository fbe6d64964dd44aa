//! Partition table CSV parsing

use std::fs;
use std::path::Path;

use super::PartitionRegion;
use crate::error::{Error, Result};

/// One row of a partition table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionEntry {
    /// Partition name (e.g. `spiffs`)
    pub name: String,
    /// Partition type (`app` or `data`)
    pub kind: String,
    /// Partition subtype (e.g. `ota_0`, `spiffs`)
    pub subtype: String,
    /// Offset column, as written (may be empty for auto-placed rows)
    pub offset: String,
    /// Size column, as written
    pub size: String,
    /// Flags column (e.g. `encrypted`), empty if absent
    pub flags: String,
}

impl PartitionEntry {
    /// Whether this row holds the data filesystem
    pub fn is_filesystem(&self) -> bool {
        self.kind.eq_ignore_ascii_case("data")
            && (self.subtype.eq_ignore_ascii_case("spiffs")
                || self.name.eq_ignore_ascii_case("spiffs"))
    }

    /// Parsed offset and size, if both are numbers
    pub fn region(&self) -> Option<PartitionRegion> {
        let offset = parse_number(&self.offset).ok()?;
        let size = parse_number(&self.size).ok()?;
        Some(PartitionRegion { offset, size })
    }
}

/// A parsed partition table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionTable {
    /// Rows in file order
    pub entries: Vec<PartitionEntry>,
}

impl PartitionTable {
    /// Parse a table from CSV text
    ///
    /// Comment (`#`) and blank lines are skipped, as are rows with fewer
    /// than five columns.
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| {
                let cols: Vec<&str> = line.split(',').map(str::trim).collect();
                if cols.len() < 5 {
                    log::trace!("Skipping short partition row: {}", line);
                    return None;
                }
                Some(PartitionEntry {
                    name: cols[0].to_string(),
                    kind: cols[1].to_string(),
                    subtype: cols[2].to_string(),
                    offset: cols[3].to_string(),
                    size: cols[4].to_string(),
                    flags: cols.get(5).copied().unwrap_or_default().to_string(),
                })
            })
            .collect();

        Self { entries }
    }

    /// Load a table from a CSV file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::parse(&content))
    }

    /// First filesystem row with a usable offset and size
    pub fn filesystem_region(&self) -> Option<PartitionRegion> {
        self.entries
            .iter()
            .filter(|entry| entry.is_filesystem())
            .find_map(|entry| {
                let region = entry.region();
                if region.is_none() {
                    log::debug!(
                        "Ignoring filesystem row '{}' with offset '{}' size '{}'",
                        entry.name,
                        entry.offset,
                        entry.size
                    );
                }
                region
            })
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse a number that can be hex (`0x...`), decimal, or carry a `K`/`M` suffix
pub fn parse_number(s: &str) -> core::result::Result<u64, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_err(|e| format!("invalid hex: {}", e));
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix(['K', 'k']) {
        (n.trim(), 1024)
    } else if let Some(n) = s.strip_suffix(['M', 'm']) {
        (n.trim(), 1024 * 1024)
    } else {
        (s, 1)
    };

    let num: u64 = num_str
        .parse()
        .map_err(|e| format!("invalid number '{}': {}", s, e))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("number '{}' out of range", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN_SPIFFS_CSV: &str = "\
# Name,   Type, SubType, Offset,  Size, Flags
nvs,      data, nvs,     0x9000,  0x5000,
otadata,  data, ota,     0xe000,  0x2000,
app0,     app,  ota_0,   0x10000, 0x1E0000,
app1,     app,  ota_1,   0x1F0000,0x1E0000,
spiffs,   data, spiffs,  0x3D0000,0x20000,
coredump, data, coredump,0x3F0000,0x10000,
";

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("4096").unwrap(), 4096);
        assert_eq!(parse_number("0x1000").unwrap(), 4096);
        assert_eq!(parse_number(" 0X3D0000 ").unwrap(), 0x3D0000);
        assert_eq!(parse_number("64K").unwrap(), 64 * 1024);
        assert_eq!(parse_number("1M").unwrap(), 1024 * 1024);
        assert!(parse_number("").is_err());
        assert!(parse_number("0xZZ").is_err());
        assert!(parse_number("99999999999999M").is_err());
        assert!(parse_number("18014398509481984K").is_err());
    }

    #[test]
    fn test_parse_table() {
        let table = PartitionTable::parse(MIN_SPIFFS_CSV);
        assert_eq!(table.len(), 6);
        assert_eq!(table.entries[2].name, "app0");
        assert_eq!(table.entries[2].kind, "app");
        assert_eq!(table.entries[2].subtype, "ota_0");
        assert_eq!(table.entries[0].flags, "");
    }

    #[test]
    fn test_filesystem_region() {
        let table = PartitionTable::parse(MIN_SPIFFS_CSV);
        assert_eq!(
            table.filesystem_region(),
            Some(PartitionRegion {
                offset: 0x3D0000,
                size: 0x20000
            })
        );
    }

    #[test]
    fn test_filesystem_by_name() {
        let table = PartitionTable::parse("SPIFFS, DATA, fat, 0x290000, 0x170000\n");
        assert_eq!(
            table.filesystem_region(),
            Some(PartitionRegion {
                offset: 0x290000,
                size: 0x170000
            })
        );
    }

    #[test]
    fn test_first_match_wins() {
        let csv = "\
storage, data, spiffs, 0x200000, 0x100000
spiffs,  data, spiffs, 0x300000, 0x100000
";
        let table = PartitionTable::parse(csv);
        assert_eq!(table.filesystem_region().unwrap().offset, 0x200000);
    }

    #[test]
    fn test_unparsable_row_skipped() {
        let csv = "\
spiffs, data, spiffs, , 0x100000
spiffs1, data, spiffs, 0x290000, 99999999999999M
spiffs2, data, spiffs, 0x300000, 0x100000
";
        let table = PartitionTable::parse(csv);
        assert_eq!(table.filesystem_region().unwrap().offset, 0x300000);
    }

    #[test]
    fn test_no_filesystem() {
        let csv = "\
nvs,     data, nvs,   0x9000,  0x5000,
app0,    app,  ota_0, 0x10000, 0x300000,
ffat,    data, fat,   0x310000, 0xF0000
short,   data
";
        let table = PartitionTable::parse(csv);
        assert_eq!(table.len(), 3);
        assert_eq!(table.filesystem_region(), None);
    }
}
