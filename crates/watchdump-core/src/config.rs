//! Configuration system for watchdump.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $WATCHDUMP_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/watchdump/config.toml
//!   3. ~/.config/watchdump/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::channel::DEFAULT_TIMEOUT;
use crate::directory::DEFAULT_MAX_ENTRIES;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdumpConfig {
    pub device: DeviceConfig,
    pub protocol: ProtocolConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// USB vendor id. Default: TomTom.
    pub vendor_id: u16,
    /// USB product id. Default: Multisport Cardio.
    pub product_id: u16,
    /// HID interface number to claim.
    pub interface: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Per-direction transfer timeout in milliseconds.
    pub timeout_ms: u64,
    /// Upper bound on directory entries read in one listing.
    pub max_directory_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where extracted files are written.
    pub directory: PathBuf,
    /// Extract every file, not just activity tracks.
    pub all_files: bool,
    /// Carry on with the next file after a failed read.
    pub keep_going: bool,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            vendor_id: 0x1390,
            product_id: 0x7474,
            interface: 0,
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            max_directory_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            all_files: false,
            keep_going: false,
        }
    }
}

impl ProtocolConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("watchdump")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

/// Parse `0x`-prefixed hex or plain decimal.
pub fn parse_number<T: TryFrom<u64>>(text: &str) -> Option<T> {
    let text = text.trim();
    let value = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok()?,
        None => text.parse().ok()?,
    };
    T::try_from(value).ok()
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl WatchdumpConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path())
    }

    /// Load config from an explicit path, then apply env overrides.
    /// A missing file yields defaults.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            WatchdumpConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("WATCHDUMP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&WatchdumpConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text)
                .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply WATCHDUMP_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_number("WATCHDUMP_DEVICE__VENDOR_ID") {
            self.device.vendor_id = v;
        }
        if let Some(v) = env_number("WATCHDUMP_DEVICE__PRODUCT_ID") {
            self.device.product_id = v;
        }
        if let Some(v) = env_number("WATCHDUMP_PROTOCOL__TIMEOUT_MS") {
            self.protocol.timeout_ms = v;
        }
        if let Some(v) = env_number("WATCHDUMP_PROTOCOL__MAX_DIRECTORY_ENTRIES") {
            self.protocol.max_directory_entries = v;
        }
        if let Ok(v) = std::env::var("WATCHDUMP_OUTPUT__DIRECTORY") {
            self.output.directory = PathBuf::from(v);
        }
    }
}

fn env_number<T: TryFrom<u64>>(key: &str) -> Option<T> {
    let v = std::env::var(key).ok()?;
    let parsed = parse_number(&v);
    if parsed.is_none() {
        tracing::warn!(key, value = %v, "ignoring non-numeric override");
    }
    parsed
}
