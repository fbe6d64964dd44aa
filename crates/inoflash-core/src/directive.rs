//! Sketch directive parsing
//!
//! Build options live in the sketch itself as comment lines:
//!
//! ```text
//! //PART=HA
//! //FLASH=16MB
//! //CUST=TRUE
//! //PLATFORM=ESP32S3
//! //-ERASE=TRUE      <- disabled, ignored
//! ```
//!
//! Each trimmed line is classified against a fixed prefix table into a
//! [`DirectiveKind`], then applied to a [`BuildConfig`]. Lines that match
//! nothing are ignored, and later directives override earlier ones.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::scheme::PartitionChoice;

/// Prefix that marks a directive as disabled
const DISABLED_PREFIX: &str = "//-";

/// Serial port prefix applied to `//COM=` values
pub const PORT_PREFIX: &str = "COM";

/// Target chip family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChipFamily {
    /// Classic ESP32 (bootloader at 0x1000)
    #[default]
    Esp32,
    /// ESP32-S3
    Esp32S3,
    /// ESP32-C3
    Esp32C3,
}

impl ChipFamily {
    /// Token used by esptool's `--chip` option
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Esp32 => "esp32",
            Self::Esp32S3 => "esp32s3",
            Self::Esp32C3 => "esp32c3",
        }
    }

    /// Parse a family token such as `ESP32S3`, `esp32_c3` or `ESP32-S3`
    pub fn from_token(token: &str) -> Option<Self> {
        let normalized: String = token
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "ESP32" => Some(Self::Esp32),
            "ESP32S3" => Some(Self::Esp32S3),
            "ESP32C3" => Some(Self::Esp32C3),
            _ => None,
        }
    }
}

impl fmt::Display for ChipFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flash chip capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FlashSize {
    /// 2 MB
    Mb2,
    /// 4 MB
    #[default]
    Mb4,
    /// 8 MB
    Mb8,
    /// 16 MB
    Mb16,
    /// 32 MB
    Mb32,
}

impl FlashSize {
    /// Size in megabytes
    pub fn megabytes(&self) -> u32 {
        match self {
            Self::Mb2 => 2,
            Self::Mb4 => 4,
            Self::Mb8 => 8,
            Self::Mb16 => 16,
            Self::Mb32 => 32,
        }
    }

    /// Normalize a directive value (`"16"`, `"16MB"`, `"16 m"`)
    ///
    /// Anything outside the supported set falls back to the 4 MB default.
    pub fn normalize(value: &str) -> Self {
        let compact: String = value
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();
        let digits = compact
            .strip_suffix("MB")
            .or_else(|| compact.strip_suffix('M'))
            .unwrap_or(&compact);
        match digits {
            "2" => Self::Mb2,
            "4" => Self::Mb4,
            "8" => Self::Mb8,
            "16" => Self::Mb16,
            "32" => Self::Mb32,
            _ => {
                log::debug!("Unsupported flash size '{}', using 4MB", value);
                Self::Mb4
            }
        }
    }
}

impl fmt::Display for FlashSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}MB", self.megabytes())
    }
}

/// Build options collected from the sketch
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildConfig {
    /// Partition scheme request (alias, custom name or AUTO)
    pub partition: PartitionChoice,
    /// Flash size passed to esptool
    pub flash_size: FlashSize,
    /// PSRAM option token, as written
    pub psram: Option<String>,
    /// Erase the whole flash before writing
    pub erase: bool,
    /// Build and flash a SPIFFS image from `data/`
    pub custom_fs_image: Option<bool>,
    /// Target chip
    pub chip: ChipFamily,
    /// Explicit serial port
    pub port: Option<String>,
}

/// Kinds of directive understood in a sketch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    /// `//PART=`
    Partition,
    /// `//FLASH-SIZE=` or `//FLASH=`
    FlashSize,
    /// `//PSRAM=`
    Psram,
    /// `//ERASE=`
    Erase,
    /// `//CUST=`
    CustomImage,
    /// `//COM=` (port number, prefixed with `COM`)
    ComPort,
    /// `//PORT=` (device path taken verbatim)
    PortDevice,
    /// `//PLATFORM=`
    Platform,
    /// Bare family line such as `//ESP32S3`
    Chip(ChipFamily),
}

/// Prefix table, checked in order. Longer prefixes sharing a stem come first.
const DIRECTIVES: &[(&str, DirectiveKind)] = &[
    ("//PART=", DirectiveKind::Partition),
    ("//FLASH-SIZE=", DirectiveKind::FlashSize),
    ("//FLASH=", DirectiveKind::FlashSize),
    ("//PSRAM=", DirectiveKind::Psram),
    ("//ERASE=", DirectiveKind::Erase),
    ("//CUST=", DirectiveKind::CustomImage),
    ("//COM=", DirectiveKind::ComPort),
    ("//PORT=", DirectiveKind::PortDevice),
    ("//PLATFORM=", DirectiveKind::Platform),
    ("//ESP32S3", DirectiveKind::Chip(ChipFamily::Esp32S3)),
    ("//ESP32C3", DirectiveKind::Chip(ChipFamily::Esp32C3)),
    ("//ESP32", DirectiveKind::Chip(ChipFamily::Esp32)),
];

/// A classified directive line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive<'a> {
    /// What the line configures
    pub kind: DirectiveKind,
    /// Trimmed value after `=` (empty for bare directives)
    pub value: &'a str,
}

impl<'a> Directive<'a> {
    /// Classify a single source line
    ///
    /// Returns `None` for ordinary code, unknown comments and disabled
    /// (`//-`) directives.
    pub fn classify(line: &'a str) -> Option<Self> {
        let line = line.trim();
        if line.starts_with(DISABLED_PREFIX) {
            return None;
        }

        DIRECTIVES.iter().find_map(|(prefix, kind)| {
            line.strip_prefix(prefix).map(|rest| Directive {
                kind: *kind,
                value: match kind {
                    DirectiveKind::Chip(_) => "",
                    _ => rest.trim(),
                },
            })
        })
    }
}

/// Normalize a `//COM=` value into a `COMx` port name
///
/// `5`, `COM5` and `com5` all give `COM5`.
pub fn normalize_com_port(value: &str) -> String {
    let number = value.trim().to_ascii_uppercase().replace(PORT_PREFIX, "");
    format!("{}{}", PORT_PREFIX, number)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_uppercase().as_str(),
        "TRUE" | "YES" | "ON" | "1"
    )
}

impl BuildConfig {
    /// Apply one directive, overriding the field it targets
    pub fn apply(&mut self, directive: Directive<'_>) {
        let value = directive.value;
        match directive.kind {
            DirectiveKind::Partition => self.partition = PartitionChoice::parse(value),
            DirectiveKind::FlashSize => self.flash_size = FlashSize::normalize(value),
            DirectiveKind::Psram => self.psram = Some(value.to_string()),
            DirectiveKind::Erase => self.erase = value.eq_ignore_ascii_case("TRUE"),
            DirectiveKind::CustomImage => self.custom_fs_image = Some(parse_flag(value)),
            DirectiveKind::ComPort => self.port = Some(normalize_com_port(value)),
            DirectiveKind::PortDevice => self.port = Some(value.to_string()),
            DirectiveKind::Platform => {
                self.chip = ChipFamily::from_token(value).unwrap_or_else(|| {
                    log::warn!("Unknown PLATFORM '{}', using esp32", value);
                    ChipFamily::Esp32
                });
            }
            DirectiveKind::Chip(family) => self.chip = family,
        }
    }

    /// Build a configuration from source lines
    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut config = Self::default();
        for directive in lines.into_iter().filter_map(Directive::classify) {
            log::debug!("Directive {:?} = '{}'", directive.kind, directive.value);
            config.apply(directive);
        }
        config
    }

    /// Read directives from a sketch file
    ///
    /// An unreadable file yields the default configuration.
    pub fn from_sketch(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_lines(content.lines()),
            Err(e) => {
                log::warn!(
                    "Could not read directives from {}: {}; using defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }
}

/// Find the sketch (`*.ino`) in a project directory
///
/// Candidates are sorted by name so the choice is stable when a directory
/// holds more than one sketch.
pub fn find_sketch(project: &Path) -> Result<PathBuf> {
    let entries = fs::read_dir(project).map_err(|e| Error::io(project, e))?;

    let mut sketches: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "ino"))
        .collect();
    sketches.sort();

    match sketches.into_iter().next() {
        Some(sketch) => {
            log::info!("Sketch found: {}", sketch.display());
            Ok(sketch)
        }
        None => Err(Error::SketchNotFound(project.to_path_buf())),
    }
}
