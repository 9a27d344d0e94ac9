//! Error types for boot image splitting.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::MAX_PAGE_SIZE;

/// Broad classification of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The image is not a well-formed boot image.
    Format,
    /// Reading, writing or seeking failed.
    Io,
    /// A size parameter is outside of what can be processed.
    Config,
}

/// The main error type for boot image operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("header truncated: need {needed} bytes, have {available}")]
    TruncatedHeader { needed: usize, available: usize },

    #[error("invalid magic number at start of header: {found:?}")]
    BadMagic { found: [u8; 8] },

    #[error("invalid {field}: must not be zero")]
    EmptySlice { field: &'static str },

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("invalid page size {0}: must be between 1 and {max}", max = MAX_PAGE_SIZE)]
    PageSize(u32),

    #[error("invalid block size: must not be zero")]
    BlockSize,

    #[error("failed to {op}: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("unexpected end of input at offset {offset:#x}: {source}")]
    UnexpectedEof {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("failed to create '{path}': {source}")]
    FileCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A specialized Result type for boot image operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TruncatedHeader { .. }
            | Error::BadMagic { .. }
            | Error::EmptySlice { .. }
            | Error::MalformedHeader(_) => ErrorKind::Format,
            Error::PageSize(_) | Error::BlockSize => ErrorKind::Config,
            Error::Io { .. } | Error::UnexpectedEof { .. } | Error::FileCreate { .. } => {
                ErrorKind::Io
            }
        }
    }

    #[inline]
    pub(crate) fn io(op: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Error::Io { op, source }
    }
}

impl From<binrw::Error> for Error {
    fn from(err: binrw::Error) -> Self {
        match err {
            binrw::Error::Io(source) => Error::Io {
                op: "decode header",
                source,
            },
            other => Error::MalformedHeader(other.to_string()),
        }
    }
}
