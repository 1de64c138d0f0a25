//! Error types for the directory-as-disk engine.

use std::fmt;

use thiserror::Error;

/// Which capacity limit a host file ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    /// Every directory slot is taken.
    DirectoryFull,
    /// Not enough free clusters for the file's content.
    DiskFull,
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::DirectoryFull => write!(f, "directory full"),
            Capacity::DiskFull => write!(f, "disk full"),
        }
    }
}

/// Errors that can occur while synthesizing or synchronizing the disk.
#[derive(Error, Debug)]
pub enum DiskError {
    #[error("{kind}: host file {name} not added")]
    CapacityExceeded { kind: Capacity, name: String },

    #[error("No free short name for host file {0}")]
    NameCollisionExhausted(String),

    #[error("Host {op} failed for {name}: {source}")]
    HostIo {
        op: &'static str,
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid cache snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Invalid sync mode: {0}")]
    InvalidSyncMode(String),

    #[error("Invalid boot sector type: {0}")]
    InvalidBootSector(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DiskError {
    /// Wrap a host filesystem failure with the operation and file it concerned.
    pub fn host_io(op: &'static str, name: &str, source: std::io::Error) -> Self {
        DiskError::HostIo {
            op,
            name: name.to_string(),
            source,
        }
    }
}

/// Result type for disk operations.
pub type DiskResult<T> = Result<T, DiskError>;
