//! Toolchain configuration
//!
//! Tool locations and flashing options come from an optional
//! `inoflash.toml` in the project directory:
//!
//! ```toml
//! [tools]
//! arduino_cli = "/opt/arduino-cli/arduino-cli"
//! esptool = "esptool"
//! mkspiffs = "mkspiffs"
//!
//! [paths]
//! partitions_dir = "/home/me/.arduino15/packages/esp32/hardware/esp32/3.3.3/tools/partitions"
//! build_base = "/tmp/inoflash-builds"
//!
//! [flash]
//! baud = 921600
//! embed_filesystem = false
//!
//! [log]
//! file = "inoflash.log"
//! ```
//!
//! Every key is optional. Relative entries under `[paths]` and `[log]` are
//! taken relative to the project directory; tool programs are looked up on
//! `PATH` unless given as paths.

use std::fs;
use std::path::{Path, PathBuf};

use inoflash_core::PartitionTables;
use serde::Deserialize;

use crate::error::{Result, ToolError};
use crate::esptool::DEFAULT_BAUD;

/// Configuration file name looked up in the project directory
pub const CONFIG_FILE: &str = "inoflash.toml";

/// Boot selector stub location inside an installed esp32 core
const BOOT_APP0_IN_CORE: &str = "tools/partitions/boot_app0.bin";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    tools: ToolsSection,
    paths: PathsSection,
    flash: FlashSection,
    log: LogSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ToolsSection {
    arduino_cli: Option<PathBuf>,
    esptool: Option<PathBuf>,
    mkspiffs: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PathsSection {
    boot_app0: Option<PathBuf>,
    partitions_dir: Option<PathBuf>,
    build_base: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FlashSection {
    baud: Option<u32>,
    embed_filesystem: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LogSection {
    file: Option<PathBuf>,
}

/// Resolved tool locations and options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// arduino-cli executable
    pub arduino_cli: PathBuf,
    /// esptool executable
    pub esptool: PathBuf,
    /// mkspiffs executable
    pub mkspiffs: PathBuf,
    /// Boot selector stub (`boot_app0.bin`), if known
    pub boot_app0: Option<PathBuf>,
    /// Partition table directory override
    pub partitions_dir: Option<PathBuf>,
    /// Parent of per-sketch build directories
    pub build_base: PathBuf,
    /// Baud rate for writes
    pub baud: u32,
    /// Put the SPIFFS image into the merged image instead of writing it separately
    pub embed_filesystem: bool,
    /// Run log file
    pub log_file: PathBuf,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            arduino_cli: PathBuf::from("arduino-cli"),
            esptool: PathBuf::from("esptool"),
            mkspiffs: PathBuf::from("mkspiffs"),
            boot_app0: None,
            partitions_dir: None,
            build_base: std::env::temp_dir().join("inoflash-builds"),
            baud: DEFAULT_BAUD,
            embed_filesystem: false,
            log_file: PathBuf::from("inoflash.log"),
        }
    }
}

impl Toolchain {
    /// Load configuration for a project
    ///
    /// `explicit` must exist when given. Otherwise `inoflash.toml` in the
    /// project directory is used if present, and defaults if not. A missing
    /// `boot_app0` is looked up in the local Arduino15 installation.
    pub fn load(project: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Some(project.join(CONFIG_FILE)).filter(|path| path.is_file()),
        };

        let mut toolchain = match path {
            Some(path) => {
                let content = fs::read_to_string(&path).map_err(|e| ToolError::io(&path, e))?;
                log::info!("Loaded configuration from {}", path.display());
                Self::from_toml_str(&content, project)
                    .map_err(|source| ToolError::Config { path, source })?
            }
            None => Self::with_project(Self::default(), project),
        };

        if toolchain.boot_app0.is_none() {
            toolchain.boot_app0 = discover_boot_app0();
            if let Some(stub) = &toolchain.boot_app0 {
                log::debug!("Discovered boot_app0.bin at {}", stub.display());
            }
        }

        Ok(toolchain)
    }

    /// Parse configuration text; relative paths are resolved against `project`
    pub fn from_toml_str(
        content: &str,
        project: &Path,
    ) -> core::result::Result<Self, toml::de::Error> {
        let file: ConfigFile = toml::from_str(content)?;
        let defaults = Self::default();

        let toolchain = Self {
            arduino_cli: file.tools.arduino_cli.unwrap_or(defaults.arduino_cli),
            esptool: file.tools.esptool.unwrap_or(defaults.esptool),
            mkspiffs: file.tools.mkspiffs.unwrap_or(defaults.mkspiffs),
            boot_app0: file.paths.boot_app0,
            partitions_dir: file.paths.partitions_dir,
            build_base: file.paths.build_base.unwrap_or(defaults.build_base),
            baud: file.flash.baud.unwrap_or(defaults.baud),
            embed_filesystem: file.flash.embed_filesystem.unwrap_or(defaults.embed_filesystem),
            log_file: file.log.file.unwrap_or(defaults.log_file),
        };

        Ok(Self::with_project(toolchain, project))
    }

    fn with_project(mut self, project: &Path) -> Self {
        self.boot_app0 = self.boot_app0.map(|p| project.join(p));
        self.partitions_dir = self.partitions_dir.map(|p| project.join(p));
        self.build_base = project.join(&self.build_base);
        self.log_file = project.join(&self.log_file);
        self
    }

    /// Boot selector stub, required for merging
    pub fn boot_app0(&self) -> Result<&Path> {
        self.boot_app0.as_deref().ok_or(ToolError::BootStubNotFound)
    }

    /// Partition tables to search
    ///
    /// Defaults to the directory holding `boot_app0.bin`, which is where
    /// the esp32 core keeps its CSV tables.
    pub fn partition_tables(&self) -> PartitionTables {
        let dir = self
            .partitions_dir
            .clone()
            .or_else(|| {
                self.boot_app0
                    .as_deref()
                    .and_then(Path::parent)
                    .map(Path::to_path_buf)
            })
            .unwrap_or_else(|| PathBuf::from("partitions"));
        PartitionTables::new(dir)
    }

    /// Build directory for a sketch
    pub fn build_dir(&self, sketch_base: &str) -> PathBuf {
        self.build_base.join(sketch_base)
    }
}

/// Candidate Arduino15 data directories for this host
fn arduino_data_dirs() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".arduino15"));
        candidates.push(home.join("Library").join("Arduino15"));
    }
    if let Some(local) = dirs::data_local_dir() {
        candidates.push(local.join("Arduino15"));
    }
    candidates
}

fn discover_boot_app0() -> Option<PathBuf> {
    arduino_data_dirs()
        .iter()
        .find_map(|dir| find_boot_app0(dir))
}

/// Find `boot_app0.bin` in the newest esp32 core under an Arduino15 directory
///
/// Core directories are compared as semantic versions, so `3.10.0` beats
/// `3.3.3`. Directories that are not versions are ignored.
pub fn find_boot_app0(arduino_data: &Path) -> Option<PathBuf> {
    let cores = arduino_data.join("packages/esp32/hardware/esp32");
    let (_, newest) = fs::read_dir(&cores)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            let version = semver::Version::parse(&name).ok()?;
            Some((version, entry.path()))
        })
        .max_by(|a, b| a.0.cmp(&b.0))?;

    let stub = newest.join(BOOT_APP0_IN_CORE);
    stub.is_file().then_some(stub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let project = Path::new("/work/radio");
        let toolchain = Toolchain::from_toml_str("", project).unwrap();
        assert_eq!(toolchain.arduino_cli, PathBuf::from("arduino-cli"));
        assert_eq!(toolchain.baud, 921_600);
        assert!(!toolchain.embed_filesystem);
        assert_eq!(toolchain.log_file, project.join("inoflash.log"));
        assert!(matches!(toolchain.boot_app0(), Err(ToolError::BootStubNotFound)));
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[tools]
arduino_cli = "/opt/arduino/arduino-cli"

[paths]
boot_app0 = "/cores/esp32/3.3.3/tools/partitions/boot_app0.bin"
build_base = "build"

[flash]
baud = 460800
embed_filesystem = true
"#;
        let project = Path::new("/work/radio");
        let toolchain = Toolchain::from_toml_str(toml, project).unwrap();
        assert_eq!(toolchain.arduino_cli, PathBuf::from("/opt/arduino/arduino-cli"));
        assert_eq!(toolchain.esptool, PathBuf::from("esptool"));
        assert_eq!(toolchain.baud, 460_800);
        assert!(toolchain.embed_filesystem);
        assert_eq!(toolchain.build_dir("radio"), project.join("build/radio"));
        assert_eq!(
            toolchain.partition_tables().dir(),
            Path::new("/cores/esp32/3.3.3/tools/partitions")
        );
    }

    #[test]
    fn test_partitions_dir_override() {
        let toml = "[paths]\npartitions_dir = \"tables\"\nboot_app0 = \"/x/boot_app0.bin\"\n";
        let toolchain = Toolchain::from_toml_str(toml, Path::new("/p")).unwrap();
        assert_eq!(toolchain.partition_tables().dir(), Path::new("/p/tables"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Toolchain::from_toml_str("[flash]\nspeed = 1\n", Path::new("/p")).is_err());
    }

    #[test]
    fn test_load_reports_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[flash]\nbaud = \"fast\"\n").unwrap();
        assert!(matches!(
            Toolchain::load(dir.path(), None),
            Err(ToolError::Config { .. })
        ));

        let missing = dir.path().join("other.toml");
        assert!(matches!(
            Toolchain::load(dir.path(), Some(&missing)),
            Err(ToolError::Io { .. })
        ));
    }

    #[test]
    fn test_find_boot_app0_newest_core() {
        let dir = tempfile::tempdir().unwrap();
        let cores = dir.path().join("packages/esp32/hardware/esp32");
        for version in ["2.0.17", "3.3.3", "3.10.0", "nightly"] {
            let partitions = cores.join(version).join("tools/partitions");
            fs::create_dir_all(&partitions).unwrap();
            fs::write(partitions.join("boot_app0.bin"), [0u8; 8192]).unwrap();
        }
        assert_eq!(
            find_boot_app0(dir.path()),
            Some(cores.join("3.10.0").join(BOOT_APP0_IN_CORE))
        );
        assert_eq!(find_boot_app0(&dir.path().join("empty")), None);
    }
}
