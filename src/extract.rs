use std::io::{self, Read, Seek, SeekFrom, Write};

use tracing::debug;

use crate::{Error, Result};

/// Copies `count` bytes starting at `offset` of `source` into `destination`.
///
/// Data moves through a single buffer of at most `block_size` bytes, so
/// memory use does not depend on `count`. Running out of input before
/// `count` bytes have been copied is an error.
pub fn copy_slice<R, W>(
    source: &mut R,
    destination: &mut W,
    block_size: usize,
    offset: u64,
    count: u64,
) -> Result<()>
where
    R: Read + Seek + ?Sized,
    W: Write + ?Sized,
{
    if block_size == 0 {
        return Err(Error::BlockSize);
    }
    source
        .seek(SeekFrom::Start(offset))
        .map_err(Error::io("seek to slice"))?;

    let mut buffer = vec![0u8; block_size.min(count.try_into().unwrap_or(usize::MAX))];
    let mut copied = 0u64;
    while copied < count {
        let quota = buffer.len().min((count - copied).try_into().unwrap_or(usize::MAX));
        let chunk = &mut buffer[..quota];
        source.read_exact(chunk).map_err(|err| {
            if err.kind() == io::ErrorKind::UnexpectedEof {
                Error::UnexpectedEof {
                    offset: offset + copied,
                    source: err,
                }
            } else {
                Error::io("read slice")(err)
            }
        })?;
        destination
            .write_all(chunk)
            .map_err(Error::io("write slice"))?;
        copied += quota as u64;
    }
    destination.flush().map_err(Error::io("flush slice"))?;
    debug!("copied {count} bytes from offset {offset:#x}");
    Ok(())
}
