//! Masked CRC digest engine.
//!
//! This module streams a byte source from offset 0 to end-of-file, folding
//! every byte into a running CRC remainder via a division table, except that
//! bytes inside an [`ExclusionWindow`] are folded as zero. Masking is what
//! lets a stored checksum field coexist with the data it checksums: the
//! digest is invariant to whatever the field currently holds.
//!
//! ## Algorithm Overview
//!
//! 1. Build a 256-entry division table from the generator constant
//! 2. Seek the source back to offset 0
//! 3. Initialize the remainder to `0xFFFFFFFF`
//! 4. Fold each byte (or zero, inside the window) with
//!    `crc = (crc >> 8) ^ table[(crc ^ byte) & 0xFF]`
//! 5. Return the bitwise complement of the final remainder
//!
//! Each [`Digester::digest`] call is idempotent and re-seeks on entry, so
//! one open source can be digested once per candidate generator without
//! re-running the header locator.

mod table;

use crate::error::{Error, Result};
use crate::ne;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, trace};

pub use table::{CrcTable, DEFAULT_GENERATOR, GENERATOR_CANDIDATES};

/// Width of a masked checksum field, in bytes.
pub const CHECKSUM_FIELD_LEN: u64 = 4;

/// A byte range folded as zero during digest computation.
///
/// The range may extend past end-of-file; bytes beyond EOF are simply never
/// visited, so the overhang has no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExclusionWindow {
    start: u64,
    len: u64,
}

impl ExclusionWindow {
    /// Window covering a 4-byte checksum field at absolute offset `start`.
    pub fn checksum_field(start: u64) -> Self {
        Self {
            start,
            len: CHECKSUM_FIELD_LEN,
        }
    }

    /// Window masking nothing; every byte is digested as stored.
    pub fn empty() -> Self {
        Self { start: 0, len: 0 }
    }

    /// First masked offset.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Number of masked bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if the window masks no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if the byte at absolute `offset` is masked.
    #[inline]
    pub fn contains(&self, offset: u64) -> bool {
        offset >= self.start && offset - self.start < self.len
    }
}

/// Configuration for the digest engine.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// Read block size in bytes.
    pub block_size: usize,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self { block_size: 1024 }
    }
}

impl DigestConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the read block size.
    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }
}

/// Digest of one source with one generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestResult {
    /// Generator constant the table was built from.
    pub generator: u32,
    /// Final complemented 32-bit digest.
    pub crc: u32,
}

/// Computes masked CRC digests over seekable byte sources.
///
/// The division table is built once at construction and is immutable
/// afterwards, so a digester can be reused across any number of sources.
#[derive(Debug, Clone)]
pub struct Digester {
    table: CrcTable,
    config: DigestConfig,
}

impl Digester {
    /// Creates a digester for `generator` with default configuration.
    pub fn new(generator: u32) -> Self {
        Self::with_config(generator, DigestConfig::default())
    }

    /// Creates a digester for `generator` with custom configuration.
    pub fn with_config(generator: u32, config: DigestConfig) -> Self {
        Self {
            table: CrcTable::new(generator),
            config,
        }
    }

    /// The division table this digester folds with.
    pub fn table(&self) -> &CrcTable {
        &self.table
    }

    /// Digests `source` from offset 0 to EOF, folding `window` bytes as zero.
    ///
    /// The read cursor is reset to offset 0 on entry regardless of where the
    /// caller (typically the header locator) left it.
    pub fn digest<R: Read + Seek>(
        &self,
        source: &mut R,
        window: ExclusionWindow,
    ) -> Result<u32> {
        source.seek(SeekFrom::Start(0)).map_err(|e| Error::seek(0, e))?;

        debug!(
            "digesting with generator {:#010x}, masking {} bytes at {:#x}",
            self.table.generator(),
            window.len(),
            window.start()
        );

        let mut crc = !0u32;
        // A zero block size would never make progress
        let mut block = vec![0u8; self.config.block_size.max(1)];
        let mut position: u64 = 0;

        loop {
            let n = match source.read(&mut block) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::read(position, e)),
            };

            for &byte in &block[..n] {
                let effective = if window.contains(position) { 0 } else { byte };
                crc = self.table.fold(crc, effective);
                position += 1;
            }
        }

        trace!("digested {} bytes, crc {:#010x}", position, !crc);

        Ok(!crc)
    }
}

/// Digests `source` once per generator, in the supplied order.
///
/// The result order matches the generator order so runs are reproducible.
/// Any seek or read failure aborts the whole call; no partial results are
/// returned.
pub fn digest_all<R: Read + Seek>(
    source: &mut R,
    window: ExclusionWindow,
    generators: &[u32],
    config: DigestConfig,
) -> Result<Vec<DigestResult>> {
    let mut results = Vec::with_capacity(generators.len());
    for &generator in generators {
        let digester = Digester::with_config(generator, config.clone());
        let crc = digester.digest(source, window)?;
        results.push(DigestResult { generator, crc });
    }
    Ok(results)
}

/// Locates the checksum field of the executable at `path` and digests the
/// file once per generator.
///
/// This is a convenience function that opens the file in binary mode, runs
/// the header locator, and digests with the default configuration.
pub fn digest_file(
    path: impl AsRef<Path>,
    generators: &[u32],
) -> Result<Vec<DigestResult>> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path).map_err(|e| Error::file_read(path, e))?;
    let header = ne::locate(&mut file)?;
    digest_all(&mut file, header.window(), generators, DigestConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Bit-at-a-time reference division with the same masking rule, kept
    /// independent of the table-driven code under test.
    fn bitwise_crc(data: &[u8], generator: u32, window: ExclusionWindow) -> u32 {
        let mut crc = !0u32;
        for (i, &stored) in data.iter().enumerate() {
            let byte = if window.contains(i as u64) { 0 } else { stored };
            crc ^= u32::from(byte);
            for _ in 0..8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ generator
                } else {
                    crc >> 1
                };
            }
        }
        !crc
    }

    #[test]
    fn test_known_check_value() {
        // CRC-32/ISO-HDLC check value for "123456789"
        let mut source = Cursor::new(b"123456789".to_vec());
        let crc = Digester::new(0xEDB8_8320)
            .digest(&mut source, ExclusionWindow::empty())
            .unwrap();
        assert_eq!(crc, 0xCBF4_3926);
    }

    #[test]
    fn test_known_castagnoli_check_value() {
        // CRC-32C check value for "123456789"
        let mut source = Cursor::new(b"123456789".to_vec());
        let crc = Digester::new(0x82F6_3B78)
            .digest(&mut source, ExclusionWindow::empty())
            .unwrap();
        assert_eq!(crc, 0xE306_9283);
    }

    #[test]
    fn test_digest_is_deterministic() {
        let data: Vec<u8> = (0u8..=255).cycle().take(3000).collect();
        let window = ExclusionWindow::checksum_field(100);
        let digester = Digester::new(DEFAULT_GENERATOR);

        let mut source = Cursor::new(data);
        let first = digester.digest(&mut source, window).unwrap();
        // Cursor is at EOF now; the engine must re-seek on its own
        let second = digester.digest(&mut source, window).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_window_equals_plain_crc() {
        let data: Vec<u8> = (0..200).map(|i| (i * 7) as u8).collect();
        let mut source = Cursor::new(data.clone());
        let crc = Digester::new(DEFAULT_GENERATOR)
            .digest(&mut source, ExclusionWindow::empty())
            .unwrap();
        assert_eq!(
            crc,
            bitwise_crc(&data, DEFAULT_GENERATOR, ExclusionWindow::empty())
        );
    }

    #[test]
    fn test_window_past_eof_has_no_effect() {
        let data: Vec<u8> = (0u8..64).collect();
        let past_eof = ExclusionWindow::checksum_field(1000);

        let mut source = Cursor::new(data.clone());
        let masked = Digester::new(DEFAULT_GENERATOR)
            .digest(&mut source, past_eof)
            .unwrap();
        let plain = Digester::new(DEFAULT_GENERATOR)
            .digest(&mut source, ExclusionWindow::empty())
            .unwrap();
        assert_eq!(masked, plain);
    }

    #[test]
    fn test_window_overlapping_eof_masks_in_bounds_portion_only() {
        let data: Vec<u8> = vec![0xAB; 64];
        // Last two bytes in bounds, two bytes of overhang
        let window = ExclusionWindow::checksum_field(62);

        let mut source = Cursor::new(data.clone());
        let crc = Digester::new(DEFAULT_GENERATOR)
            .digest(&mut source, window)
            .unwrap();
        assert_eq!(crc, bitwise_crc(&data, DEFAULT_GENERATOR, window));
    }

    #[test]
    fn test_masking_makes_digest_invariant_to_field_content() {
        let mut data: Vec<u8> = (0u8..=255).cycle().take(2500).collect();
        let window = ExclusionWindow::checksum_field(0x48);
        let digester = Digester::new(DEFAULT_GENERATOR);

        let mut source = Cursor::new(data.clone());
        let before = digester.digest(&mut source, window).unwrap();

        // Rewrite the masked field to arbitrary other values
        data[0x48..0x4C].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        let mut source = Cursor::new(data);
        let after = digester.digest(&mut source, window).unwrap();

        assert_eq!(before, after);
    }

    #[test]
    fn test_digest_independent_of_block_size() {
        let data: Vec<u8> = (0u8..=255).cycle().take(4096 + 17).collect();
        let window = ExclusionWindow::checksum_field(2000);

        let expected = bitwise_crc(&data, DEFAULT_GENERATOR, window);
        for block_size in [1, 7, 256, 1024, 1 << 16] {
            let digester = Digester::with_config(
                DEFAULT_GENERATOR,
                DigestConfig::new().block_size(block_size),
            );
            let mut source = Cursor::new(data.clone());
            assert_eq!(digester.digest(&mut source, window).unwrap(), expected);
        }
    }

    #[test]
    fn test_complement_recovers_running_remainder() {
        let data = b"new executable".to_vec();
        let digester = Digester::new(DEFAULT_GENERATOR);
        let mut source = Cursor::new(data.clone());
        let digest = digester
            .digest(&mut source, ExclusionWindow::empty())
            .unwrap();

        // Fold the same bytes manually with the digester's own table; the
        // digest must be the complement of the final remainder
        let remainder = data
            .iter()
            .fold(!0u32, |crc, &b| digester.table().fold(crc, b));
        assert_eq!(!digest, remainder);
    }

    #[test]
    fn test_digest_all_preserves_generator_order() {
        let data: Vec<u8> = (0..500).map(|i| (i % 251) as u8).collect();
        let window = ExclusionWindow::checksum_field(40);
        let generators = [
            0x04C1_1DB7,
            0xEDB8_8320,
            0x1EDC_6F41,
            0x82F6_3B78,
            0xD582_8281,
        ];

        let mut source = Cursor::new(data.clone());
        let results =
            digest_all(&mut source, window, &generators, DigestConfig::default()).unwrap();

        assert_eq!(results.len(), generators.len());
        for (result, &generator) in results.iter().zip(generators.iter()) {
            assert_eq!(result.generator, generator);
            assert_eq!(result.crc, bitwise_crc(&data, generator, window));
        }
    }

    #[test]
    fn test_empty_source() {
        let mut source = Cursor::new(Vec::new());
        let crc = Digester::new(DEFAULT_GENERATOR)
            .digest(&mut source, ExclusionWindow::empty())
            .unwrap();
        // Complement of the untouched initial remainder
        assert_eq!(crc, 0);
    }

    #[test]
    fn test_window_contains() {
        let window = ExclusionWindow::checksum_field(0x48);
        assert!(!window.contains(0x47));
        assert!(window.contains(0x48));
        assert!(window.contains(0x4B));
        assert!(!window.contains(0x4C));

        assert!(!ExclusionWindow::empty().contains(0));
    }
}
