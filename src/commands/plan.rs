//! Build plan resolution and the `plan` command

use std::path::{Path, PathBuf};

use inoflash_core::merge::{APP_OFFSET, BOOT_APP0_OFFSET, PARTITIONS_OFFSET};
use inoflash_core::{
    find_sketch, BoardDescriptor, BuildConfig, PartitionRegion, PartitionTables, PayloadStats,
    RegionSource, ResolvedConfig,
};
use inoflash_tools::{format_offset, Result, Toolchain};

use super::format_size;

/// Name of the filesystem payload directory inside a project
pub const DATA_DIR: &str = "data";

/// Everything decided before any tool runs
#[derive(Debug, Clone)]
pub struct BuildPlan {
    /// Project directory
    pub project: PathBuf,
    /// Sketch file
    pub sketch: PathBuf,
    /// Sketch file name without extension
    pub sketch_base: String,
    /// Resolved build options
    pub config: ResolvedConfig,
    /// Compiler target
    pub board: BoardDescriptor,
    /// Measured `data/` payload, if the directory exists
    pub payload: Option<PayloadStats>,
    /// Filesystem region of the selected scheme
    pub fs_region: Option<PartitionRegion>,
}

impl BuildPlan {
    /// Find the sketch, read its directives and select a partition scheme
    pub fn prepare(project: &Path, tables: &PartitionTables) -> Result<Self> {
        let sketch = find_sketch(project)?;
        let sketch_base = sketch
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        let config = BuildConfig::from_sketch(&sketch);
        log::debug!("Directives: {:?}", config);

        let payload_dir = project.join(DATA_DIR);
        let payload = match PayloadStats::measure(&payload_dir) {
            Ok(Some(stats)) => {
                log::info!("Size of {}/: {} B", DATA_DIR, stats.bytes);
                Some(stats)
            }
            Ok(None) => {
                log::warn!("Missing {}/ in the project", DATA_DIR);
                None
            }
            Err(e) => {
                log::warn!("Could not measure {}/: {}", DATA_DIR, e);
                None
            }
        };

        let config = config.resolve(payload.map(|stats| stats.bytes), tables);
        let board = BoardDescriptor::new(&config);
        let fs_region = tables.filesystem_region(&config.scheme);

        Ok(Self {
            project: project.to_path_buf(),
            sketch,
            sketch_base,
            config,
            board,
            payload,
            fs_region,
        })
    }

    /// Payload directory of the project
    pub fn payload_dir(&self) -> PathBuf {
        self.project.join(DATA_DIR)
    }
}

/// Print the resolved plan for a project
pub fn run_plan(project: &Path, toolchain: &Toolchain) -> Result<()> {
    let plan = BuildPlan::prepare(project, &toolchain.partition_tables())?;
    let config = &plan.config;

    println!("Build Plan");
    println!("==========");
    println!("Sketch:     {}", plan.sketch.display());
    println!("Chip:       {}", config.chip);
    println!("Scheme:     {}", config.scheme);
    println!("FQBN:       {}", plan.board);
    println!("Flash size: {}", config.flash_size);
    println!(
        "Port:       {}",
        config.port.as_deref().unwrap_or("auto-detect")
    );
    println!("Erase:      {}", if config.erase { "yes" } else { "no" });
    match &plan.payload {
        Some(stats) => println!(
            "Data:       {} files, {} directories, {}",
            stats.files,
            stats.dirs,
            format_size(stats.bytes)
        ),
        None => println!("Data:       none"),
    }
    println!(
        "SPIFFS:     {}",
        if config.wants_fs_image() {
            "build image"
        } else {
            "skip"
        }
    );

    println!("\nMerge layout:");
    println!("{:<12} {:>10}", "Segment", "Offset");
    println!("{:-<23}", "");
    let segments = [
        ("bootloader", config.chip.bootloader_offset()),
        ("partitions", PARTITIONS_OFFSET),
        ("boot_app0", BOOT_APP0_OFFSET),
        ("app", APP_OFFSET),
    ];
    for (name, offset) in segments {
        println!("{:<12} {:>10}", name, format_offset(offset));
    }
    match plan.fs_region {
        Some(region) => println!(
            "{:<12} {:>10} ({})",
            "spiffs",
            format_offset(region.offset),
            format_size(region.size)
        ),
        None => println!("{:<12} {:>10}", "spiffs", "-"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use inoflash_core::ChipFamily;
    use std::fs;

    const HUGE_APP_CSV: &str = "\
# Name,   Type, SubType, Offset,  Size, Flags
nvs,      data, nvs,     0x9000,  0x5000,
otadata,  data, ota,     0xe000,  0x2000,
app0,     app,  ota_0,   0x10000, 0x300000,
spiffs,   data, spiffs,  0x310000,0xE0000,
coredump, data, coredump,0x3F0000,0x10000,
";

    #[test]
    fn test_prepare() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("radio");
        fs::create_dir_all(project.join(DATA_DIR)).unwrap();
        fs::write(project.join(DATA_DIR).join("index.html"), [0u8; 2000]).unwrap();
        fs::write(
            project.join("radio.ino"),
            "//PART=HA\n//PLATFORM=ESP32S3\n//PSRAM=ENABLED\nvoid setup() {}\n",
        )
        .unwrap();

        let tables_dir = dir.path().join("partitions");
        fs::create_dir_all(&tables_dir).unwrap();
        fs::write(tables_dir.join("huge_app.csv"), HUGE_APP_CSV).unwrap();

        let plan = BuildPlan::prepare(&project, &PartitionTables::new(&tables_dir)).unwrap();
        assert_eq!(plan.sketch_base, "radio");
        assert_eq!(plan.config.scheme, "huge_app");
        assert_eq!(plan.config.chip, ChipFamily::Esp32S3);
        assert_eq!(
            plan.board.to_string(),
            "esp32:esp32:esp32s3:PartitionScheme=huge_app,PSRAM=opi"
        );
        assert_eq!(plan.payload.map(|stats| stats.bytes), Some(2000));
        assert_eq!(
            plan.fs_region,
            Some(PartitionRegion {
                offset: 0x310000,
                size: 0xE0000
            })
        );
    }

    #[test]
    fn test_prepare_without_tables() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blink.ino"), "void setup() {}\n").unwrap();

        let plan =
            BuildPlan::prepare(dir.path(), &PartitionTables::new(dir.path().join("none"))).unwrap();
        assert_eq!(plan.config.scheme, "default");
        assert_eq!(plan.payload, None);
        assert_eq!(plan.fs_region, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_prepare_unreadable_payload() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blink.ino"), "void setup() {}\n").unwrap();
        let locked = dir.path().join(DATA_DIR).join("locked");
        fs::create_dir_all(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Running as root, permissions are not enforced
            return;
        }

        let plan =
            BuildPlan::prepare(dir.path(), &PartitionTables::new(dir.path().join("none"))).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(plan.payload, None);
        assert_eq!(plan.config.scheme, "default");
    }

    #[cfg(unix)]
    #[test]
    fn test_prepare_with_symlink_loop() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blink.ino"), "void setup() {}\n").unwrap();
        let data = dir.path().join(DATA_DIR);
        fs::create_dir(&data).unwrap();
        fs::write(data.join("index.html"), [0u8; 300]).unwrap();
        std::os::unix::fs::symlink(&data, data.join("loop")).unwrap();

        let plan =
            BuildPlan::prepare(dir.path(), &PartitionTables::new(dir.path().join("none"))).unwrap();
        assert_eq!(plan.payload.map(|stats| stats.bytes), Some(300));
    }
}
