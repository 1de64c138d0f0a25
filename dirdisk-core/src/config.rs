//! Construction-time configuration.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::boot::BootSectorKind;
use crate::error::{DiskError, DiskResult};

/// How MSX-side writes propagate to the host directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SyncMode {
    /// Disk is write protected; host changes are still picked up.
    #[serde(rename = "readonly")]
    ReadOnly,
    /// Writes are buffered and flushed when they fully cover new content.
    #[default]
    #[serde(rename = "cached-write")]
    CachedWrite,
    /// Like `CachedWrite`, but MSX-side deletes keep the host file.
    #[serde(rename = "no-delete")]
    NoDelete,
    /// Like `CachedWrite`, and growth is committed to the host file at once.
    #[serde(rename = "full")]
    Full,
}

impl SyncMode {
    /// Whether MSX-side deletes remove the host file.
    pub fn deletes_host_files(self) -> bool {
        matches!(self, SyncMode::CachedWrite | SyncMode::Full)
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncMode::ReadOnly => "readonly",
            SyncMode::CachedWrite => "cached-write",
            SyncMode::NoDelete => "no-delete",
            SyncMode::Full => "full",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for SyncMode {
    type Err = DiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "readonly" => Ok(SyncMode::ReadOnly),
            "cachedwrite" => Ok(SyncMode::CachedWrite),
            "nodelete" => Ok(SyncMode::NoDelete),
            "full" => Ok(SyncMode::Full),
            _ => Err(DiskError::InvalidSyncMode(s.to_string())),
        }
    }
}

/// Engine configuration, fixed for the engine's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiskConfig {
    pub sync_mode: SyncMode,
    pub boot_sector: BootSectorKind,
    /// Re-scan the host directory whenever the boot sector is read.
    pub rescan_on_boot_read: bool,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::default(),
            boot_sector: BootSectorKind::default(),
            rescan_on_boot_read: true,
        }
    }
}

impl DiskConfig {
    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json(text: &str) -> DiskResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a JSON configuration file.
    pub fn load(path: &Path) -> DiskResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
