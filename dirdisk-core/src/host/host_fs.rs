//! HostFs trait - the host directory as seen by the engine.

use std::io;

/// Metadata of a host directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostMeta {
    /// File length in bytes.
    pub len: u64,
    /// Modification time, seconds since the unix epoch.
    pub modified: u64,
    /// False for subdirectories and other non-regular entries.
    pub is_file: bool,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    pub name: String,
    pub meta: HostMeta,
}

/// Filesystem interface for the mounted host directory.
/// All names are plain file names relative to that directory.
pub trait HostFs: Send {
    /// List the directory, sorted by name.
    fn list(&self) -> io::Result<Vec<HostEntry>>;

    /// Stat a file. Returns None if it does not exist.
    fn stat(&self, name: &str) -> io::Result<Option<HostMeta>>;

    /// Read up to `buf.len()` bytes at `offset`. Returns the count read;
    /// short only at end of file.
    fn read_at(&self, name: &str, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Write `data` at `offset`, extending the file if needed.
    fn write_at(&mut self, name: &str, offset: u64, data: &[u8]) -> io::Result<()>;

    /// Create an empty file, truncating any existing one.
    fn create(&mut self, name: &str) -> io::Result<()>;

    /// Truncate or zero-extend a file.
    fn set_len(&mut self, name: &str, len: u64) -> io::Result<()>;

    /// Rename a file.
    fn rename(&mut self, from: &str, to: &str) -> io::Result<()>;

    /// Delete a file.
    fn remove(&mut self, name: &str) -> io::Result<()>;

    /// Check if a file exists.
    fn exists(&self, name: &str) -> bool {
        matches!(self.stat(name), Ok(Some(_)))
    }
}
