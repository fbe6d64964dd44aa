//! Board descriptor (FQBN) construction

use std::fmt;

use crate::directive::ChipFamily;
use crate::scheme::ResolvedConfig;

impl ChipFamily {
    /// Board part of the fully qualified board name
    pub fn fqbn_base(&self) -> &'static str {
        match self {
            Self::Esp32 => "esp32:esp32:esp32",
            Self::Esp32S3 => "esp32:esp32:esp32s3",
            Self::Esp32C3 => "esp32:esp32:esp32c3",
        }
    }
}

/// Translate a PSRAM directive into the board menu value for a family
///
/// The same word maps to different menu values per family (`ENABLED` is
/// `opi` on the S3 but `enabled` on the classic ESP32). Unknown tokens are
/// returned as written.
pub fn psram_value(chip: ChipFamily, token: &str) -> String {
    let key: String = token
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();

    let mapped = match chip {
        ChipFamily::Esp32S3 => match key.as_str() {
            "OPI" | "ON" | "EN" | "ENABLED" | "QIO_OPI" | "OCTAL" => Some("opi"),
            "QPI" | "QSPI" => Some("qspi"),
            "OFF" | "NONE" | "DIS" | "DISABLED" => Some("disabled"),
            _ => None,
        },
        ChipFamily::Esp32 => match key.as_str() {
            "ON" | "EN" | "ENABLED" => Some("enabled"),
            "OFF" | "NONE" | "DIS" | "DISABLED" => Some("disabled"),
            _ => None,
        },
        ChipFamily::Esp32C3 => None,
    };

    mapped.map_or_else(|| token.to_string(), |value| value.to_string())
}

/// Compiler target descriptor
///
/// Only the partition scheme and PSRAM are encoded. Flash mode, frequency
/// and size menus differ between core versions and an unknown option makes
/// `arduino-cli compile` fail, so those go to esptool instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardDescriptor {
    /// Target chip
    pub chip: ChipFamily,
    /// `PartitionScheme` menu value
    pub scheme: String,
    /// `PSRAM` menu value, if requested
    pub psram: Option<String>,
}

impl BoardDescriptor {
    /// Descriptor for a resolved configuration
    pub fn new(config: &ResolvedConfig) -> Self {
        Self {
            chip: config.chip,
            scheme: config.scheme.clone(),
            psram: config
                .psram
                .as_deref()
                .filter(|token| !token.is_empty())
                .map(|token| psram_value(config.chip, token)),
        }
    }
}

impl fmt::Display for BoardDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:PartitionScheme={}", self.chip.fqbn_base(), self.scheme)?;
        if let Some(psram) = &self.psram {
            write!(f, ",PSRAM={}", psram)?;
        }
        Ok(())
    }
}
