//! Error types for the necrc-core library.
//!
//! This module provides comprehensive error handling using the `thiserror` crate,
//! with detailed error variants for different failure modes.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for necrc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all necrc operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to open or read an input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to seek within the byte source
    #[error("failed to seek to offset {offset:#x}: {source}")]
    Seek {
        /// Target offset of the failed seek
        offset: u64,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to read from the byte source
    #[error("failed to read at offset {offset:#x}: {source}")]
    Read {
        /// Byte offset where the read failed
        offset: u64,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A structurally required read returned fewer bytes than expected
    #[error("truncated read at offset {offset:#x}: expected at least {expected} bytes, got {actual}")]
    Truncated {
        /// Byte offset the read started at
        offset: u64,
        /// Minimum number of bytes the structure requires
        expected: usize,
        /// Number of bytes actually available
        actual: usize,
    },

    /// The file does not start with the "MZ" signature
    #[error("not an MZ executable: expected \"MZ\" at offset 0, found {found:02x?}")]
    NotMz {
        /// The two bytes found at offset 0
        found: [u8; 2],
    },

    /// The new-header offset does not point at an "NE" signature
    #[error("no NE header: expected \"NE\" at offset {offset:#x}, found {found:02x?}")]
    NotNe {
        /// The offset the MZ header pointed at
        offset: u64,
        /// The two bytes found there
        found: [u8; 2],
    },
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new seek error
    pub fn seek(offset: u64, source: std::io::Error) -> Self {
        Self::Seek { offset, source }
    }

    /// Creates a new read error
    pub fn read(offset: u64, source: std::io::Error) -> Self {
        Self::Read { offset, source }
    }

    /// Creates a new truncated read error
    pub fn truncated(offset: u64, expected: usize, actual: usize) -> Self {
        Self::Truncated {
            offset,
            expected,
            actual,
        }
    }

    /// Creates a new bad-MZ-signature error
    pub fn not_mz(found: [u8; 2]) -> Self {
        Self::NotMz { found }
    }

    /// Creates a new bad-NE-signature error
    pub fn not_ne(offset: u64, found: [u8; 2]) -> Self {
        Self::NotNe { offset, found }
    }

    /// Returns true if this error means the input is not an MZ/NE executable,
    /// as opposed to an I/O failure
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::NotMz { .. } | Self::NotNe { .. } | Self::Truncated { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_ne(0x400, [0x50, 0x45]);
        assert!(err.to_string().contains("NE"));
        assert!(err.to_string().contains("0x400"));

        let err = Error::not_mz([b'X', b'X']);
        assert!(err.to_string().contains("MZ"));
    }

    #[test]
    fn test_is_format_error() {
        assert!(Error::not_mz([0, 0]).is_format_error());
        assert!(Error::not_ne(0, [0, 0]).is_format_error());
        assert!(Error::truncated(0, 64, 2).is_format_error());
        assert!(!Error::seek(0, std::io::Error::other("boom")).is_format_error());
    }
}
