//! In-memory host directory implementation.

use std::collections::BTreeMap;
use std::io;

use super::host_fs::{HostEntry, HostFs, HostMeta};

#[derive(Debug, Clone, Default)]
struct MemFile {
    data: Vec<u8>,
    modified: u64,
}

/// Simple in-memory host directory. Names are case sensitive.
#[derive(Debug, Default, Clone)]
pub struct MemoryHostFs {
    files: BTreeMap<String, MemFile>,
    read_only: bool,
}

impl MemoryHostFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with initial files.
    pub fn with_files<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: AsRef<str>,
    {
        let mut fs = Self::new();
        for (name, data) in files {
            fs.add_file(name.as_ref(), data);
        }
        fs
    }

    /// Add or replace a file (convenience method, ignores the read-only switch).
    pub fn add_file(&mut self, name: &str, data: impl Into<Vec<u8>>) {
        let modified = self.files.get(name).map(|f| f.modified).unwrap_or(0);
        self.files.insert(
            name.to_string(),
            MemFile {
                data: data.into(),
                modified,
            },
        );
    }

    /// Delete a file behind the engine's back.
    pub fn remove_file(&mut self, name: &str) -> bool {
        self.files.remove(name).is_some()
    }

    /// Get file content.
    pub fn file(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(|f| f.data.as_slice())
    }

    /// Set a file's modification time.
    pub fn set_modified(&mut self, name: &str, unix_secs: u64) {
        if let Some(f) = self.files.get_mut(name) {
            f.modified = unix_secs;
        }
    }

    /// Names of all files.
    pub fn names(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    /// Make every mutating operation fail with `PermissionDenied`.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    fn check_writable(&self) -> io::Result<()> {
        if self.read_only {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "host directory is read-only",
            ))
        } else {
            Ok(())
        }
    }

    fn get_mut(&mut self, name: &str) -> io::Result<&mut MemFile> {
        self.files.get_mut(name).ok_or_else(|| not_found(name))
    }
}

fn not_found(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{} not found", name))
}

impl HostFs for MemoryHostFs {
    fn list(&self) -> io::Result<Vec<HostEntry>> {
        Ok(self
            .files
            .iter()
            .map(|(name, f)| HostEntry {
                name: name.clone(),
                meta: HostMeta {
                    len: f.data.len() as u64,
                    modified: f.modified,
                    is_file: true,
                },
            })
            .collect())
    }

    fn stat(&self, name: &str) -> io::Result<Option<HostMeta>> {
        Ok(self.files.get(name).map(|f| HostMeta {
            len: f.data.len() as u64,
            modified: f.modified,
            is_file: true,
        }))
    }

    fn read_at(&self, name: &str, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let file = self.files.get(name).ok_or_else(|| not_found(name))?;
        let start = (offset as usize).min(file.data.len());
        let n = buf.len().min(file.data.len() - start);
        buf[..n].copy_from_slice(&file.data[start..start + n]);
        Ok(n)
    }

    fn write_at(&mut self, name: &str, offset: u64, data: &[u8]) -> io::Result<()> {
        self.check_writable()?;
        let file = self.get_mut(name)?;
        let start = offset as usize;
        let end = start + data.len();
        if file.data.len() < end {
            file.data.resize(end, 0);
        }
        file.data[start..end].copy_from_slice(data);
        Ok(())
    }

    fn create(&mut self, name: &str) -> io::Result<()> {
        self.check_writable()?;
        self.files.insert(name.to_string(), MemFile::default());
        Ok(())
    }

    fn set_len(&mut self, name: &str, len: u64) -> io::Result<()> {
        self.check_writable()?;
        self.get_mut(name)?.data.resize(len as usize, 0);
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> io::Result<()> {
        self.check_writable()?;
        let file = self.files.remove(from).ok_or_else(|| not_found(from))?;
        self.files.insert(to.to_string(), file);
        Ok(())
    }

    fn remove(&mut self, name: &str) -> io::Result<()> {
        self.check_writable()?;
        self.files.remove(name).map(|_| ()).ok_or_else(|| not_found(name))
    }
}
