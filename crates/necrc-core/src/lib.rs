//! # necrc-core
//!
//! A library for recomputing the stored checksum of MZ/NE "New Executable"
//! binaries.
//!
//! 16-bit Windows executables carry a 32-bit checksum inside the NE header.
//! The original toolchain computed it as a table-driven CRC over the whole
//! file with the checksum field itself folded as zero, so the field never
//! has to checksum its own contents. This crate reproduces that computation
//! for any candidate generator polynomial.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`ne`]: MZ/NE signature validation and checksum field location
//! - [`digest`]: masked CRC digest engine and table construction
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use necrc_core::digest::{digest_all, DigestConfig, DEFAULT_GENERATOR};
//! use necrc_core::ne;
//! use std::fs::File;
//!
//! let mut file = File::open("./WIN.EXE")?;
//!
//! // Locate the NE header's checksum field
//! let header = ne::locate(&mut file)?;
//!
//! // Digest the file with the field masked out
//! let results = digest_all(
//!     &mut file,
//!     header.window(),
//!     &[DEFAULT_GENERATOR],
//!     DigestConfig::default(),
//! )?;
//! for result in results {
//!     println!("{:08x} -> {:08x}", result.generator, result.crc);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod digest;
pub mod error;
pub mod ne;

// Re-export primary types for convenience
pub use digest::{
    CrcTable, DigestConfig, DigestResult, Digester, ExclusionWindow, DEFAULT_GENERATOR,
    GENERATOR_CANDIDATES,
};
pub use error::{Error, Result};
pub use ne::NeHeader;

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
