//! Splitting a whole image into its parts.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::extract::copy_slice;
use crate::script::{self, DEFAULT_REBUILD_COMMAND};
use crate::{Destinations, Error, Geometry, Header, Result, Slice};

/// Settings for [`Unpacker::unpack_to`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnpackOptions {
    pub destinations: Destinations,
    /// Command invoked by the rebuild script
    pub rebuild_command: String,
    /// Copy buffer size. Defaults to the image's page size.
    pub block_size: Option<NonZeroUsize>,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        Self {
            destinations: Destinations::default(),
            rebuild_command: DEFAULT_REBUILD_COMMAND.to_owned(),
            block_size: None,
        }
    }
}

/// What an unpack run wrote.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnpackReport {
    /// Every file written, in write order
    pub written: Vec<(Slice, PathBuf)>,
}

impl UnpackReport {
    pub fn path(&self, slice: Slice) -> Option<&Path> {
        self.written
            .iter()
            .find(|(s, _)| *s == slice)
            .map(|(_, path)| path.as_path())
    }
}

/// A validated boot image ready to be split.
pub struct Unpacker<R> {
    source: R,
    header: Header,
    geometry: Geometry,
}

impl<R: Read + Seek> Unpacker<R> {
    /// Reads and validates the header at the start of `source`.
    pub fn open(mut source: R) -> Result<Self> {
        info!("Reading header...");
        source
            .seek(SeekFrom::Start(0))
            .map_err(Error::io("rewind to start"))?;
        let header = Header::read_from(&mut source)?;
        let geometry = Geometry::new(&header)?;

        info!("Page size: {}B", header.page_size);
        info!("Kernel size: {}B", geometry.slice(Slice::Kernel).size);
        info!("Ramdisk size: {}B", geometry.slice(Slice::Ramdisk).size);
        info!("Second size: {}B", geometry.slice(Slice::Second).size);
        info!(
            "Android Version: {}; Patch Level: {}",
            header.os_version.version(),
            header.os_version.patch()
        );
        info!("Image ID: {}", header.id);

        Ok(Self {
            source,
            header,
            geometry,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Writes the rebuild script, kernel, ramdisk and second stage into `dir`.
    ///
    /// Absent slices produce no file. Each slice is copied without its page
    /// padding. A failure leaves already written files in place.
    pub fn unpack_to(&mut self, dir: &Path, options: &UnpackOptions) -> Result<UnpackReport> {
        let block_size = match options.block_size {
            Some(size) => size.get(),
            None => self.geometry.page_size() as usize,
        };
        let mut report = UnpackReport::default();

        for slice in Slice::ALL {
            let descriptor = *self.geometry.slice(slice);
            if !descriptor.is_present() {
                continue;
            }
            let path = dir.join(options.destinations.for_slice(slice));
            info!("Writing \"{}\"", path.display());

            match slice {
                Slice::Header => {
                    let text = script::emit(
                        &self.header,
                        &options.destinations,
                        &options.rebuild_command,
                    );
                    script::write_script(&path, &text)?;
                }
                _ => {
                    let mut file = File::create(&path).map_err(|source| Error::FileCreate {
                        path: path.clone(),
                        source,
                    })?;
                    copy_slice(
                        &mut self.source,
                        &mut file,
                        block_size,
                        descriptor.offset,
                        descriptor.size,
                    )?;
                }
            }
            report.written.push((slice, path));
        }
        Ok(report)
    }
}
