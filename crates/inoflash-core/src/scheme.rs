//! Partition scheme selection
//!
//! Turns the `//PART=` request into the concrete scheme name passed to the
//! compiler. Aliases map straight to a scheme, custom names pass through,
//! and `AUTO` picks the smallest stock scheme whose filesystem region can
//! hold the `data/` payload.

use std::fmt;

use crate::directive::{BuildConfig, ChipFamily, FlashSize};
use crate::partition::RegionSource;

/// Bytes kept free in a filesystem region for SPIFFS structures
pub const FS_MARGIN: u64 = 4096;

/// Scheme name of the minimal SPIFFS layout
pub const MIN_SPIFFS: &str = "min_spiffs";
/// Scheme name of the huge application layout
pub const HUGE_APP: &str = "huge_app";
/// Scheme name of the stock layout
pub const DEFAULT_SCHEME: &str = "default";

/// Requested partition scheme, as written in the sketch
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PartitionChoice {
    /// Pick a scheme from the payload size
    #[default]
    Auto,
    /// `min_spiffs`
    MinSpiffs,
    /// `huge_app`
    HugeApp,
    /// `default`
    Default,
    /// Any other scheme name, passed through unchanged
    Custom(String),
}

impl PartitionChoice {
    /// Parse a `//PART=` value
    ///
    /// Matching is case-insensitive and treats `-` like `_`, so `ms`,
    /// `MS` and `min-spiffs` are the same alias. Unknown names keep their
    /// original spelling.
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        let normalized = token.to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "" | "AUTO" | "AUT" => Self::Auto,
            "MS" | "MINIMAL_SPIFFS" | "MIN_SPIFFS" | "MIN_SPIPFS" | "MIN_SPIFS" => Self::MinSpiffs,
            "HA" | "HUGE_APP" | "HUGEAPP" | "HUGE" => Self::HugeApp,
            "DEF" | "DEFAULT" => Self::Default,
            _ => Self::Custom(token.to_string()),
        }
    }

    /// Scheme name for explicit choices, `None` for `Auto`
    pub fn scheme_name(&self) -> Option<&str> {
        match self {
            Self::Auto => None,
            Self::MinSpiffs => Some(MIN_SPIFFS),
            Self::HugeApp => Some(HUGE_APP),
            Self::Default => Some(DEFAULT_SCHEME),
            Self::Custom(name) => Some(name),
        }
    }
}

impl fmt::Display for PartitionChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme_name().unwrap_or("AUTO"))
    }
}

/// Build options with the partition scheme pinned down
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Concrete partition scheme name
    pub scheme: String,
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

impl ResolvedConfig {
    /// Whether a SPIFFS image should be built
    pub fn wants_fs_image(&self) -> bool {
        self.custom_fs_image.unwrap_or(false)
    }
}

/// Pick a scheme for `AUTO` from the payload size
///
/// Smaller schemes are tried first; a scheme is used only when the payload
/// is strictly below its filesystem capacity minus [`FS_MARGIN`].
pub fn auto_scheme(payload: Option<u64>, regions: &dyn RegionSource) -> &'static str {
    let Some(payload) = payload else {
        log::info!("PART=AUTO, no data directory: using '{}'", DEFAULT_SCHEME);
        return DEFAULT_SCHEME;
    };

    log::info!(
        "PART=AUTO, data size = {} B: trying {} / {}",
        payload,
        MIN_SPIFFS,
        HUGE_APP
    );

    for scheme in [MIN_SPIFFS, HUGE_APP] {
        if let Some(region) = regions.filesystem_region(scheme) {
            if payload < region.size.saturating_sub(FS_MARGIN) {
                log::info!(
                    "Selected PartitionScheme={} (SPIFFS ~0x{:X} B)",
                    scheme,
                    region.size
                );
                return scheme;
            }
        }
    }

    log::warn!(
        "Data does not fit {} or {}: using '{}'",
        MIN_SPIFFS,
        HUGE_APP,
        DEFAULT_SCHEME
    );
    DEFAULT_SCHEME
}

impl BuildConfig {
    /// Resolve the partition request into a concrete scheme
    ///
    /// `payload` is the size of the `data/` directory, or `None` when it
    /// does not exist.
    pub fn resolve(self, payload: Option<u64>, regions: &dyn RegionSource) -> ResolvedConfig {
        let scheme = match self.partition.scheme_name() {
            Some(name) => {
                log::info!("PART={} -> PartitionScheme={}", self.partition, name);
                name.to_string()
            }
            None => auto_scheme(payload, regions).to_string(),
        };

        ResolvedConfig {
            scheme,
            flash_size: self.flash_size,
            psram: self.psram,
            erase: self.erase,
            custom_fs_image: self.custom_fs_image,
            chip: self.chip,
            port: self.port,
        }
    }
}
