//! Host filesystem abstractions for the directory-as-disk engine.
//!
//! This module provides the host side of the synchronization:
//! - `HostFs`: File operations on the mounted directory, by name
//! - `MemoryHostFs`: In-memory implementation
//! - `LocalHostFs`: A real directory on disk

mod host_fs;
mod local_host;
mod memory_host;

pub use host_fs::{HostEntry, HostFs, HostMeta};
pub use local_host::LocalHostFs;
pub use memory_host::MemoryHostFs;
