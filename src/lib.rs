//! Android boot image splitter.
//!
//! Parses the legacy (version 0) boot image header, works out where the
//! kernel, ramdisk and second stage bootloader live in the image, copies
//! them into their own files and generates a shell script that rebuilds an
//! equivalent image with `mkbootimg`.

use std::borrow::Cow;
use std::io::{Cursor, Read};

use binrw::{binrw, BinRead, BinWrite};

pub mod error;
pub mod extract;
pub mod geometry;
pub mod id;
pub mod script;
pub mod unpack;
pub mod version;

pub use error::{Error, ErrorKind, Result};
pub use geometry::{Geometry, Slice, SliceDescriptor};
pub use id::ImageId;
pub use script::{Destinations, RebuildScript};
pub use unpack::{UnpackOptions, UnpackReport, Unpacker};
pub use version::{OsPatch, OsVersion, OsVersionInfo, OsVersionPatch};

/// Magic literal at offset 0 of every boot image.
pub const BOOT_MAGIC: &[u8; 8] = b"ANDROID!";
/// Size of the encoded header record in bytes.
pub const HEADER_SIZE: usize = 1632;
/// Largest page size accepted by [`Header::validate`].
pub const MAX_PAGE_SIZE: u32 = 1 << 20;

pub const BOARD_NAME_SIZE: usize = 16;
pub const CMDLINE_SIZE: usize = 512;
pub const EXTRA_CMDLINE_SIZE: usize = 1024;

/// Android boot image header, version 0 layout
#[binrw]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[brw(little, magic = b"ANDROID!")]
pub struct Header {
    /// Kernel size
    pub kernel_size: u32,
    /// Kernel physical load addr
    pub kernel_addr: u32,
    /// Ramdisk size
    pub ramdisk_size: u32,
    /// Ramdisk physical load addr
    pub ramdisk_addr: u32,
    /// Second bootloader size, zero when absent
    pub second_size: u32,
    /// Second bootloader physical load addr
    pub second_addr: u32,
    pub tags_addr: u32,
    pub page_size: u32,
    /// Header version. Carried along but never interpreted.
    pub header_version: u32,
    // OS version and patch level
    pub os_version: OsVersionPatch,
    pub board_name: [u8; BOARD_NAME_SIZE],
    /// Kernel command line, part 1
    pub cmdline: Box<[u8; CMDLINE_SIZE]>,
    pub id: ImageId,
    /// Kernel command line, part 2
    pub extra_cmdline: Box<[u8; EXTRA_CMDLINE_SIZE]>,
}

impl Header {
    /// Decodes and validates a header from the start of `bytes`.
    ///
    /// Bytes past [`HEADER_SIZE`] are ignored.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::TruncatedHeader {
                needed: HEADER_SIZE,
                available: bytes.len(),
            });
        }
        let mut found = [0u8; 8];
        found.copy_from_slice(&bytes[..BOOT_MAGIC.len()]);
        if &found != BOOT_MAGIC {
            return Err(Error::BadMagic { found });
        }

        let header = Self::read(&mut Cursor::new(&bytes[..HEADER_SIZE]))?;
        header.validate()?;
        Ok(header)
    }

    /// Reads the header record from the current position of `reader`.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = Vec::with_capacity(HEADER_SIZE);
        reader
            .by_ref()
            .take(HEADER_SIZE as u64)
            .read_to_end(&mut buf)
            .map_err(Error::io("read header"))?;
        Self::parse(&buf)
    }

    /// Encodes the header record, magic included.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::with_capacity(HEADER_SIZE));
        self.write(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Checks the invariants every downstream stage relies on.
    pub fn validate(&self) -> Result<()> {
        if self.kernel_size == 0 {
            return Err(Error::EmptySlice {
                field: "kernel_size",
            });
        }
        if self.ramdisk_size == 0 {
            return Err(Error::EmptySlice {
                field: "ramdisk_size",
            });
        }
        geometry::check_page_size(self.page_size)?;
        Ok(())
    }

    pub fn has_second(&self) -> bool {
        self.second_size != 0
    }

    /// Board or product name, up to the first NUL.
    pub fn board_name_bytes(&self) -> &[u8] {
        take_until_null(&self.board_name)
    }

    /// Both kernel command line parts joined together, each up to its
    /// first NUL.
    pub fn cmdline_bytes(&self) -> Vec<u8> {
        let mut cmdline = take_until_null(&*self.cmdline).to_vec();
        cmdline.extend_from_slice(take_until_null(&*self.extra_cmdline));
        cmdline
    }

    /// Lossy view of [`Header::board_name_bytes`] for display.
    pub fn board_name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.board_name_bytes())
    }

    /// Lossy view of [`Header::cmdline_bytes`] for display.
    pub fn cmdline(&self) -> String {
        String::from_utf8_lossy(&self.cmdline_bytes()).into_owned()
    }

    pub fn os_version_info(&self) -> OsVersionInfo {
        self.os_version.info()
    }
}

impl Default for Header {
    fn default() -> Self {
        Self {
            kernel_size: 0,
            kernel_addr: 0,
            ramdisk_size: 0,
            ramdisk_addr: 0,
            second_size: 0,
            second_addr: 0,
            tags_addr: 0,
            page_size: 0,
            header_version: 0,
            os_version: OsVersionPatch::default(),
            board_name: [0; BOARD_NAME_SIZE],
            cmdline: Box::new([0; CMDLINE_SIZE]),
            id: ImageId::default(),
            extra_cmdline: Box::new([0; EXTRA_CMDLINE_SIZE]),
        }
    }
}

/// Returns `input` up to, not including, its first NUL byte.
pub fn take_until_null(input: &[u8]) -> &[u8] {
    match input.iter().position(|x| *x == 0) {
        Some(null_idx) => &input[..null_idx],
        None => input,
    }
}
