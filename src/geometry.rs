//! Slice sizes and page-aligned offsets.
//!
//! A boot image is laid out as
//!
//! ```text
//! +-----------------+ 0
//! | header          |
//! | padding         |
//! +-----------------+ page aligned
//! | kernel          |
//! | padding         |
//! +-----------------+ page aligned
//! | ramdisk         |
//! | padding         |
//! +-----------------+ page aligned
//! | second stage    | (optional)
//! | padding         |
//! +-----------------+
//! ```

use tracing::debug;

use crate::{Error, Header, Result, HEADER_SIZE, MAX_PAGE_SIZE};

/// One region of a boot image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slice {
    Header,
    Kernel,
    Ramdisk,
    Second,
}

impl Slice {
    /// All slices in image order.
    pub const ALL: [Slice; 4] = [Slice::Header, Slice::Kernel, Slice::Ramdisk, Slice::Second];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Slice::Header => "header",
            Slice::Kernel => "kernel",
            Slice::Ramdisk => "ramdisk",
            Slice::Second => "second",
        }
    }
}

/// Rejects page sizes that can't describe a layout.
pub fn check_page_size(page_size: u32) -> Result<u64> {
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(Error::PageSize(page_size));
    }
    Ok(page_size as u64)
}

/// Rounds `size` up to the next multiple of `page_size`.
///
/// `page_size` must not be zero.
pub fn round_up_to_page(size: u64, page_size: u64) -> u64 {
    size.div_ceil(page_size) * page_size
}

/// Unpadded size of every slice, in [`Slice::ALL`] order.
pub fn sizes(header: &Header) -> [u64; 4] {
    [
        HEADER_SIZE as u64,
        header.kernel_size as u64,
        header.ramdisk_size as u64,
        header.second_size as u64,
    ]
}

/// Start offset of every slice, in [`Slice::ALL`] order.
pub fn offsets(header: &Header) -> Result<[u64; 4]> {
    let page_size = check_page_size(header.page_size)?;
    let sizes = sizes(header);
    let mut offsets = [0; 4];
    for i in 0..3 {
        offsets[i + 1] = offsets[i] + round_up_to_page(sizes[i], page_size);
    }
    Ok(offsets)
}

/// Where a slice lives in the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SliceDescriptor {
    pub slice: Slice,
    /// Declared size, without padding
    pub size: u64,
    /// Page-aligned start offset
    pub offset: u64,
}

impl SliceDescriptor {
    /// A zero-sized slice is absent from the image.
    pub fn is_present(&self) -> bool {
        self.size != 0
    }

    /// One past the last declared byte.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Layout of all four slices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Geometry {
    page_size: u64,
    slices: [SliceDescriptor; 4],
}

impl Geometry {
    pub fn new(header: &Header) -> Result<Self> {
        let page_size = check_page_size(header.page_size)?;
        let sizes = sizes(header);
        let offsets = offsets(header)?;
        let slices = Slice::ALL.map(|slice| SliceDescriptor {
            slice,
            size: sizes[slice.index()],
            offset: offsets[slice.index()],
        });
        for s in &slices {
            debug!(
                "{} slice: offset {:#x}, size {}",
                s.slice.name(),
                s.offset,
                s.size
            );
        }
        Ok(Self { page_size, slices })
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn slice(&self, slice: Slice) -> &SliceDescriptor {
        &self.slices[slice.index()]
    }

    pub fn slices(&self) -> &[SliceDescriptor; 4] {
        &self.slices
    }

    pub fn sizes(&self) -> [u64; 4] {
        self.slices.map(|s| s.size)
    }

    pub fn offsets(&self) -> [u64; 4] {
        self.slices.map(|s| s.offset)
    }

    /// End of the image, including the padding after the last slice.
    pub fn image_end(&self) -> u64 {
        let last = self.slice(Slice::Second);
        last.offset + round_up_to_page(last.size, self.page_size)
    }
}
