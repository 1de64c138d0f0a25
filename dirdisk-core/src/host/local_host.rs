//! Host directory backed by the real filesystem.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use super::host_fs::{HostEntry, HostFs, HostMeta};
use crate::error::{DiskError, DiskResult};

/// A directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalHostFs {
    root: PathBuf,
}

impl LocalHostFs {
    /// Open an existing directory.
    pub fn new(root: impl Into<PathBuf>) -> DiskResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(DiskError::NotADirectory(root.display().to_string()));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

fn to_meta(md: &fs::Metadata) -> HostMeta {
    let modified = md
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);
    HostMeta {
        len: md.len(),
        modified,
        is_file: md.is_file(),
    }
}

impl HostFs for LocalHostFs {
    fn list(&self) -> io::Result<Vec<HostEntry>> {
        let mut entries = Vec::new();
        for dirent in fs::read_dir(&self.root)? {
            let dirent = dirent?;
            // Names that are not valid UTF-8 cannot be mapped to a short name
            let Ok(name) = dirent.file_name().into_string() else {
                continue;
            };
            let md = fs::metadata(dirent.path())?;
            entries.push(HostEntry {
                name,
                meta: to_meta(&md),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn stat(&self, name: &str) -> io::Result<Option<HostMeta>> {
        match fs::metadata(self.path(name)) {
            Ok(md) => Ok(Some(to_meta(&md))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn read_at(&self, name: &str, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let mut file = File::open(self.path(name))?;
        file.seek(SeekFrom::Start(offset))?;
        let mut total = 0;
        while total < buf.len() {
            match file.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(total)
    }

    fn write_at(&mut self, name: &str, offset: u64, data: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).open(self.path(name))?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)
    }

    fn create(&mut self, name: &str) -> io::Result<()> {
        File::create(self.path(name)).map(|_| ())
    }

    fn set_len(&mut self, name: &str, len: u64) -> io::Result<()> {
        OpenOptions::new()
            .write(true)
            .open(self.path(name))?
            .set_len(len)
    }

    fn rename(&mut self, from: &str, to: &str) -> io::Result<()> {
        fs::rename(self.path(from), self.path(to))
    }

    fn remove(&mut self, name: &str) -> io::Result<()> {
        fs::remove_file(self.path(name))
    }
}
