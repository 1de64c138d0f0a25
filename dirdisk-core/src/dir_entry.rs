//! MSX directory entry image and 8.3 short names.
//!
//! Layout (32 bytes):
//! - Bytes 0-7: Filename (space-padded)
//! - Bytes 8-10: Extension (space-padded)
//! - Byte 11: Attributes
//! - Bytes 12-21: Reserved
//! - Bytes 22-23: Time (FAT packed, little endian)
//! - Bytes 24-25: Date (FAT packed, little endian)
//! - Bytes 26-27: Start cluster
//! - Bytes 28-31: File size

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::DIR_ENTRY_SIZE;

/// First name byte of an erased entry.
pub const ERASED_MARKER: u8 = 0xE5;
/// First name byte of an entry that was never used.
pub const UNUSED_MARKER: u8 = 0x00;

pub const ATTR_READ_ONLY: u8 = 0x01;
pub const ATTR_HIDDEN: u8 = 0x02;
pub const ATTR_SYSTEM: u8 = 0x04;
pub const ATTR_VOLUME: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;

/// Characters allowed in a short name besides A-Z and 0-9.
const SHORT_NAME_SPECIALS: &str = "$#@!%'`(){}~^-_&";

/// Highest numeric suffix tried when disambiguating a short name.
pub const MAX_NAME_SUFFIX: u32 = 999;

/// A 32-byte directory entry exactly as it appears on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    raw: [u8; DIR_ENTRY_SIZE],
}

impl Default for DirEntry {
    fn default() -> Self {
        Self {
            raw: [0; DIR_ENTRY_SIZE],
        }
    }
}

impl DirEntry {
    /// Build an entry from its on-disk bytes (must be at least 32 bytes).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut raw = [0u8; DIR_ENTRY_SIZE];
        raw.copy_from_slice(&bytes[..DIR_ENTRY_SIZE]);
        Self { raw }
    }

    /// Fresh entry for a regular file.
    pub fn for_file(name: &ShortName, start_cluster: u16, size: u32, time: u16, date: u16) -> Self {
        let mut entry = Self::default();
        entry.set_short_name(name);
        entry.set_start_cluster(start_cluster);
        entry.set_size(size);
        entry.set_time(time);
        entry.set_date(date);
        entry
    }

    pub fn as_bytes(&self) -> &[u8; DIR_ENTRY_SIZE] {
        &self.raw
    }

    /// Get raw filename bytes (8 chars, space-padded).
    pub fn raw_name(&self) -> &[u8] {
        &self.raw[0..8]
    }

    /// Get raw extension bytes (3 chars, space-padded).
    pub fn raw_ext(&self) -> &[u8] {
        &self.raw[8..11]
    }

    /// Raw 11-byte name+extension, used to detect renames.
    pub fn raw_name_ext(&self) -> &[u8] {
        &self.raw[0..11]
    }

    pub fn first_byte(&self) -> u8 {
        self.raw[0]
    }

    /// Mark the entry erased.
    pub fn erase(&mut self) {
        self.raw[0] = ERASED_MARKER;
    }

    pub fn is_erased(&self) -> bool {
        self.raw[0] == ERASED_MARKER
    }

    pub fn is_unused(&self) -> bool {
        self.raw[0] == UNUSED_MARKER
    }

    /// A regular file: named, not erased, not a volume label or directory.
    pub fn is_regular_file(&self) -> bool {
        !self.is_unused()
            && !self.is_erased()
            && self.attrib() & (ATTR_VOLUME | ATTR_DIRECTORY) == 0
    }

    pub fn attrib(&self) -> u8 {
        self.raw[11]
    }

    pub fn set_attrib(&mut self, v: u8) {
        self.raw[11] = v;
    }

    pub fn time(&self) -> u16 {
        u16::from_le_bytes([self.raw[22], self.raw[23]])
    }

    pub fn set_time(&mut self, v: u16) {
        self.raw[22..24].copy_from_slice(&v.to_le_bytes());
    }

    pub fn date(&self) -> u16 {
        u16::from_le_bytes([self.raw[24], self.raw[25]])
    }

    pub fn set_date(&mut self, v: u16) {
        self.raw[24..26].copy_from_slice(&v.to_le_bytes());
    }

    pub fn start_cluster(&self) -> u16 {
        u16::from_le_bytes([self.raw[26], self.raw[27]])
    }

    pub fn set_start_cluster(&mut self, v: u16) {
        self.raw[26..28].copy_from_slice(&v.to_le_bytes());
    }

    pub fn size(&self) -> u32 {
        u32::from_le_bytes([self.raw[28], self.raw[29], self.raw[30], self.raw[31]])
    }

    pub fn set_size(&mut self, v: u32) {
        self.raw[28..32].copy_from_slice(&v.to_le_bytes());
    }

    /// Store a short name, space-padding name and extension.
    pub fn set_short_name(&mut self, name: &ShortName) {
        pad_into(&mut self.raw[0..8], &name.name);
        pad_into(&mut self.raw[8..11], &name.ext);
    }

    /// Host-side name for this entry: trimmed `NAME.EXT`, or `NAME` without extension.
    ///
    /// Bytes outside printable ASCII become `_`.
    pub fn condensed_name(&self) -> String {
        fn part(bytes: &[u8]) -> String {
            let s: String = bytes
                .iter()
                .map(|&b| match b {
                    0x21..=0x7E if b != b'/' && b != b'\\' => b as char,
                    b' ' => ' ',
                    _ => '_',
                })
                .collect();
            s.trim_end().to_string()
        }

        let name = part(self.raw_name());
        let ext = part(self.raw_ext());
        if ext.is_empty() {
            name
        } else {
            format!("{}.{}", name, ext)
        }
    }
}

fn pad_into(dst: &mut [u8], src: &str) {
    for (i, byte) in dst.iter_mut().enumerate() {
        *byte = src.as_bytes().get(i).copied().unwrap_or(b' ');
    }
}

/// A legal 8.3 name, split into base name and extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShortName {
    pub name: String,
    pub ext: String,
}

impl fmt::Display for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ext.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.name, self.ext)
        }
    }
}

impl ShortName {
    /// Same extension, base name shortened to make room for `~n`.
    pub fn with_suffix(&self, n: u32) -> Self {
        let suffix = format!("~{}", n);
        let keep = 8usize.saturating_sub(suffix.len());
        let base: String = self.name.chars().take(keep).collect();
        Self {
            name: format!("{}{}", base, suffix),
            ext: self.ext.clone(),
        }
    }
}

/// Convert a host filename to a legal 8.3 short name.
///
/// - Uppercases everything
/// - Truncates name to 8 chars, extension to 3 chars
/// - Removes invalid characters
///
/// # Examples
/// ```
/// use dirdisk_core::to_8_3;
/// assert_eq!(to_8_3("hello.txt").to_string(), "HELLO.TXT");
/// assert_eq!(to_8_3("VeryLongName.extension").to_string(), "VERYLONG.EXT");
/// assert_eq!(to_8_3("noext").to_string(), "NOEXT");
/// ```
pub fn to_8_3(filename: &str) -> ShortName {
    let upper = filename.to_uppercase();
    let (name, ext) = match upper.rfind('.') {
        Some(pos) => (&upper[..pos], &upper[pos + 1..]),
        None => (upper.as_str(), ""),
    };

    fn clean(s: &str) -> String {
        s.chars()
            .filter(|c| c.is_ascii_alphanumeric() || SHORT_NAME_SPECIALS.contains(*c))
            .collect()
    }

    let clean_name: String = clean(name).chars().take(8).collect();
    let clean_ext: String = clean(ext).chars().take(3).collect();

    // Name must be at least 1 char
    let final_name = if clean_name.is_empty() {
        "_".to_string()
    } else {
        clean_name
    };

    ShortName {
        name: final_name,
        ext: clean_ext,
    }
}

/// Encode a unix timestamp (UTC) as FAT `(time, date)`.
///
/// Clamped to the representable range 1980-01-01 .. 2107-12-31.
pub fn fat_datetime(unix_secs: u64) -> (u16, u16) {
    let days = (unix_secs / 86_400) as i64;
    let secs = unix_secs % 86_400;
    let (year, month, day) = civil_from_days(days);

    if year < 1980 {
        return (0, (1 << 5) | 1);
    }
    if year > 2107 {
        return ((23 << 11) | (59 << 5) | 29, (127 << 9) | (12 << 5) | 31);
    }

    let hour = (secs / 3600) as u16;
    let minute = (secs % 3600 / 60) as u16;
    let second = (secs % 60) as u16;
    let time = (hour << 11) | (minute << 5) | (second / 2);
    let date = (((year - 1980) as u16) << 9) | ((month as u16) << 5) | day as u16;
    (time, date)
}

/// Days since 1970-01-01 to (year, month, day) in the proleptic Gregorian calendar.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
