use std::fmt;

use binrw::{BinRead, BinWrite};

/// OS version and patch level
///
/// # Bitwise format
///
/// * 7 bits indicate first part of version
/// * 7 bits indicate second part of version
/// * 7 bits indicate third part of version
/// * 7 bits indicate patch year, as an offset from 2000
/// * 4 bits indicate patch month
#[derive(BinRead, BinWrite, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[brw(little)]
pub struct OsVersionPatch(u32);

impl OsVersionPatch {
    /// Creates a new `OsVersionPatch`.
    pub fn new(version: OsVersion, patch: OsPatch) -> Self {
        Self((version.0 << 11) + patch.0 as u32)
    }
    /// Wraps the raw header field.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
    /// Returns the version part.
    pub fn version(self) -> OsVersion {
        OsVersion(self.0 >> 11)
    }
    /// Returns the patch part.
    pub fn patch(self) -> OsPatch {
        OsPatch((self.0 & 0x7ff) as u16)
    }
    pub fn info(self) -> OsVersionInfo {
        let (major, minor, patch) = self.version().version_parts();
        let level = self.patch();
        OsVersionInfo {
            major,
            minor,
            patch,
            year: level.year_offset(),
            month: level.month(),
        }
    }
}

impl fmt::Debug for OsVersionPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OsVersionPatch({}, {})", self.version(), self.patch())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OsPatch(u16);
impl OsPatch {
    /// Creates a new `OsPatch`.
    pub fn new(year: u16, month: u8) -> Self {
        Self(((year - 2000) << 4) + month as u16)
    }
    /// Returns the year.
    pub fn year(self) -> u16 {
        self.year_offset() as u16 + 2000
    }
    /// Returns the year as an offset from 2000.
    pub fn year_offset(self) -> u8 {
        // Highest 7 bits indicate year
        ((self.0 >> 4) & 0x7f) as u8
    }
    /// Returns the month.
    pub fn month(self) -> u8 {
        // Lowest 4 bits indicate month
        (self.0 & 0xf) as u8
    }
}

/// Formats as `YYYY-MM-01`. The day is not stored in the header.
impl fmt::Display for OsPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.year(),
            self.month(),
            OsVersionInfo::DAY
        )
    }
}
impl fmt::Debug for OsPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OsVersion(u32);
impl OsVersion {
    /// Creates a new `OsVersion`.
    pub fn new(a: u8, b: u8, c: u8) -> Self {
        Self(((a as u32) << 14) | ((b as u32) << 7) | c as u32)
    }
    /// Returns the version parts.
    pub fn version_parts(self) -> (u8, u8, u8) {
        let x = self.0;
        let a = (x >> 14) & 0x7f; // Top 7 bits
        let b = (x >> 7) & 0x7f; // Middle 7 bits
        let c = x & 0x7f; // Low 7 bits
        (a as u8, b as u8, c as u8)
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, b, c) = self.version_parts();
        write!(f, "{a}.{b}.{c}")
    }
}
impl fmt::Debug for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Unpacked form of [`OsVersionPatch`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct OsVersionInfo {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    /// Years since 2000
    pub year: u8,
    pub month: u8,
}

impl OsVersionInfo {
    /// Patch levels only record year and month.
    pub const DAY: u8 = 1;

    /// `major.minor.patch`
    pub fn version_string(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }

    /// `YYYY-MM-01`
    pub fn patch_level_string(&self) -> String {
        format!(
            "{:04}-{:02}-{:02}",
            2000 + self.year as u16,
            self.month,
            Self::DAY
        )
    }
}

/// Decodes the packed `os_version` header field.
pub fn decode_os_version(raw: u32) -> OsVersionInfo {
    OsVersionPatch::from_raw(raw).info()
}
