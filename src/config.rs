//! Board configuration.
//!
//! The constants describe the standard DB6502 memory map. [`MachineConfig`]
//! carries the same values at runtime and can be overridden from a TOML file:
//!
//! ```toml
//! clock_hz = 2000000
//!
//! [acia]
//! base = 0x8400
//! irq = 2
//!
//! [paste]
//! high_water = 128
//! ```
//!
//! Every field is optional; missing fields keep their defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CPU clock frequency in Hz.
pub const CLOCK_FREQ_HZ: u32 = 4_000_000;

/// Size of the device table.
pub const MAX_DEVICES: usize = 16;

/// Devices that can actually be registered (one table slot is held back).
pub const REGISTRY_CAPACITY: usize = MAX_DEVICES - 1;

pub const RAM_START: u16 = 0x0000;
pub const RAM_SIZE: usize = 0x8000;

pub const ROM_START: u16 = 0x8000;
pub const ROM_SIZE: usize = 0x8000;

pub const ACIA_ADDR: u16 = 0x8400;
pub const ACIA_IRQ: u8 = 2;

/// Zero-page cell holding the guest's serial input buffer read pointer.
pub const PASTE_READ_PTR_ADDR: u16 = 0x0000;
/// Zero-page cell holding the guest's serial input buffer write pointer.
pub const PASTE_WRITE_PTR_ADDR: u16 = 0x0001;
/// Pasted bytes are held back while the guest buffer holds this many or more.
pub const PASTE_HIGH_WATER: u8 = 192;

pub const DEFAULT_ROM_PATH: &str = "eater.bin";

/// Errors raised while loading a configuration file.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read.
    Io(std::io::Error),
    /// The file is not valid TOML for [`MachineConfig`].
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Cannot read config: {}", e),
            ConfigError::Parse(e) => write!(f, "Invalid config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// RAM window.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RamConfig {
    pub start: u16,
    pub size: usize,
}

impl Default for RamConfig {
    fn default() -> Self {
        Self {
            start: RAM_START,
            size: RAM_SIZE,
        }
    }
}

/// ACIA placement. `irq = 0` leaves the ACIA without an interrupt line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AciaConfig {
    pub base: u16,
    pub irq: u8,
}

impl Default for AciaConfig {
    fn default() -> Self {
        Self {
            base: ACIA_ADDR,
            irq: ACIA_IRQ,
        }
    }
}

/// Flow control for pasted serial input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PasteConfig {
    pub read_ptr_addr: u16,
    pub write_ptr_addr: u16,
    pub high_water: u8,
}

impl Default for PasteConfig {
    fn default() -> Self {
        Self {
            read_ptr_addr: PASTE_READ_PTR_ADDR,
            write_ptr_addr: PASTE_WRITE_PTR_ADDR,
            high_water: PASTE_HIGH_WATER,
        }
    }
}

/// Runtime machine configuration.
///
/// # Examples
///
/// ```rust
/// use sbc6502::MachineConfig;
///
/// let config = MachineConfig::from_toml_str("clock_hz = 1000000").unwrap();
/// assert_eq!(config.clock_hz, 1_000_000);
/// assert_eq!(config.acia.base, 0x8400);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub clock_hz: u32,
    pub ram: RamConfig,
    pub acia: AciaConfig,
    pub paste: PasteConfig,
    /// ROM image loaded at startup when no other path is given.
    pub default_rom: PathBuf,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            clock_hz: CLOCK_FREQ_HZ,
            ram: RamConfig::default(),
            acia: AciaConfig::default(),
            paste: PasteConfig::default(),
            default_rom: PathBuf::from(DEFAULT_ROM_PATH),
        }
    }
}

impl MachineConfig {
    /// Parse a TOML document; missing fields take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_memory_map() {
        let config = MachineConfig::default();
        assert_eq!(config.clock_hz, 4_000_000);
        assert_eq!(config.ram, RamConfig { start: 0x0000, size: 0x8000 });
        assert_eq!(config.acia, AciaConfig { base: 0x8400, irq: 2 });
        assert_eq!(config.paste.read_ptr_addr, 0x0000);
        assert_eq!(config.paste.write_ptr_addr, 0x0001);
        assert_eq!(config.paste.high_water, 192);
        assert_eq!(config.default_rom, PathBuf::from("eater.bin"));
        assert_eq!(REGISTRY_CAPACITY, 15);
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(MachineConfig::from_toml_str("").unwrap(), MachineConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = MachineConfig::from_toml_str(
            r#"
            default_rom = "roms/basic.bin"

            [acia]
            irq = 3

            [paste]
            high_water = 128
            "#,
        )
        .unwrap();

        assert_eq!(config.acia.base, 0x8400);
        assert_eq!(config.acia.irq, 3);
        assert_eq!(config.paste.high_water, 128);
        assert_eq!(config.paste.write_ptr_addr, 0x0001);
        assert_eq!(config.default_rom, PathBuf::from("roms/basic.bin"));
        assert_eq!(config.clock_hz, CLOCK_FREQ_HZ);
    }

    #[test]
    fn test_parse_error() {
        let err = MachineConfig::from_toml_str("clock_hz = \"fast\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("Invalid config"));
    }

    #[test]
    fn test_missing_file() {
        let err = MachineConfig::load("/nonexistent/sbc6502.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
