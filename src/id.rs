use std::fmt::{self, Write};

use binrw::{BinRead, BinWrite};

/// Size of the `id` header field in bytes.
pub const IMAGE_ID_SIZE: usize = 32;
/// Bytes used by a SHA-1 digest.
const SHA1_SIZE: usize = 20;

/// The 32 byte `id` header field, usually a digest over the image contents.
///
/// `mkbootimg` stores a SHA-1 digest here and zero-fills the remainder, but
/// nothing in the format says so. [`ImageId::is_sha1`] is a guess based on
/// those trailing zero bytes.
#[derive(BinRead, BinWrite, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ImageId(pub [u8; IMAGE_ID_SIZE]);

impl ImageId {
    /// Returns the field as the eight little-endian words of the header.
    pub fn words(&self) -> [u32; 8] {
        let mut words = [0; 8];
        for (word, chunk) in words.iter_mut().zip(self.0.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        words
    }

    /// Heuristic: true when every byte after the first 20 is zero.
    pub fn is_sha1(&self) -> bool {
        self.0[SHA1_SIZE..].iter().all(|b| *b == 0)
    }
}

/// Renders a SHA-1 looking id as `<40 hex digits> sha1`, anything else as
/// 4 byte groups like `01:02:03:04 05:06:07:08 ...`.
impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sha1() {
            for b in &self.0[..SHA1_SIZE] {
                write!(f, "{b:02x}")?;
            }
            return f.write_str(" sha1");
        }
        for (i, b) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_char(if i % 4 == 0 { ' ' } else { ':' })?;
            }
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageId({self})")
    }
}

pub fn format_image_id(id: &[u8; IMAGE_ID_SIZE]) -> String {
    ImageId(*id).to_string()
}
