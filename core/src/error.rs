use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("occurrence index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not an index file (bad magic)")]
    BadMagic,

    #[error("unsupported format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("truncated index file: expected {expected} bytes, got {actual}")]
    Truncated { expected: u64, actual: u64 },

    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("failed to encode index: {0}")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode index: {0}")]
    Decode(#[source] bincode::Error),

    #[error("corrupt index: {0}")]
    Corrupt(String),
}

impl IndexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IndexError::Io { path: path.into(), source }
    }

    /// True for every failure raised by `save`/`load`.
    pub fn is_persistence(&self) -> bool {
        !matches!(self, IndexError::OutOfRange { .. })
    }
}
