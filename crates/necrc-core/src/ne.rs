//! NE ("New Executable") header location.
//!
//! A 16-bit Windows binary opens with the DOS "MZ" header, whose
//! little-endian 32-bit field at offset 0x3C points at the NE header. The NE
//! header stores the file's 32-bit checksum at offset 0x8 from its own
//! start. This module validates both signatures and yields the absolute
//! position of that checksum field, which the digest engine then folds as
//! zero.
//!
//! Multi-byte fields are decoded from byte slices explicitly; nothing here
//! casts raw buffers to structs, so alignment and host endianness never
//! matter.

use crate::digest::ExclusionWindow;
use crate::error::{Error, Result};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use tracing::{debug, trace};

/// DOS "MZ" signature bytes.
pub const MZ_MAGIC: [u8; 2] = *b"MZ";

/// NE "New Executable" signature bytes.
pub const NE_MAGIC: [u8; 2] = *b"NE";

/// Offset of the little-endian u32 pointing at the NE header.
pub const NEW_HEADER_PTR_OFFSET: usize = 0x3C;

/// Offset of the 32-bit checksum field from the NE header start.
pub const NE_CHECKSUM_OFFSET: u64 = 0x8;

/// The MZ header must at least cover the new-header pointer at 0x3C..0x40.
const MZ_HEADER_MIN: usize = 0x40;

/// Block size for header reads, matching the digest engine's chunking.
const HEADER_BLOCK_SIZE: usize = 1024;

/// Location of the checksum field within an MZ/NE executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeHeader {
    /// Absolute offset of the NE header (the value stored at 0x3C).
    pub new_header_offset: u64,
    /// Absolute offset of the 32-bit checksum field. May sit at or past
    /// end-of-file; the window's overhang then masks nothing.
    pub checksum_offset: u64,
    /// The checksum value currently stored in the file, when the field lies
    /// entirely within it.
    pub stored_checksum: Option<u32>,
}

impl NeHeader {
    /// The byte range the digest engine must fold as zero.
    pub fn window(&self) -> ExclusionWindow {
        ExclusionWindow::checksum_field(self.checksum_offset)
    }
}

/// Locates the NE checksum field in an open executable image.
///
/// Validates the "MZ" signature at offset 0, follows the new-header pointer
/// at 0x3C, validates the "NE" signature there, and returns the checksum
/// field's location, along with its stored value when the field lies within
/// the file.
///
/// Leaves the read cursor positioned after the NE header block; the digest
/// engine re-seeks to offset 0 on its own.
pub fn locate<R: Read + Seek>(source: &mut R) -> Result<NeHeader> {
    let mut block = [0u8; HEADER_BLOCK_SIZE];

    let n = read_block(source, 0, &mut block)?;
    if n < 2 {
        return Err(Error::truncated(0, MZ_HEADER_MIN, n));
    }
    if block[..2] != MZ_MAGIC {
        return Err(Error::not_mz([block[0], block[1]]));
    }
    if n < MZ_HEADER_MIN {
        return Err(Error::truncated(0, MZ_HEADER_MIN, n));
    }

    let new_header_offset = u64::from(read_le_u32(&block[NEW_HEADER_PTR_OFFSET..]));
    trace!("new-header pointer: {:#x}", new_header_offset);

    let n = read_block(source, new_header_offset, &mut block)?;
    if n < NE_MAGIC.len() {
        return Err(Error::truncated(new_header_offset, NE_MAGIC.len(), n));
    }
    if block[..2] != NE_MAGIC {
        return Err(Error::not_ne(new_header_offset, [block[0], block[1]]));
    }

    let checksum_offset = new_header_offset + NE_CHECKSUM_OFFSET;

    // The stored value is only decodable when the whole field is inside the
    // file; a field at or past EOF still yields a valid window, whose
    // overhang the engine never visits
    let field_end = NE_CHECKSUM_OFFSET as usize + 4;
    let stored_checksum =
        (n >= field_end).then(|| read_le_u32(&block[NE_CHECKSUM_OFFSET as usize..]));

    match stored_checksum {
        Some(value) => debug!(
            "checksum field at {:#x}, stored value {:#010x}",
            checksum_offset, value
        ),
        None => debug!(
            "checksum field at {:#x} extends past end of file",
            checksum_offset
        ),
    }

    Ok(NeHeader {
        new_header_offset,
        checksum_offset,
        stored_checksum,
    })
}

/// Decode a little-endian u32 from the first four bytes of `bytes`.
fn read_le_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Seek to `offset` and fill as much of `buf` as the source provides.
///
/// Returns the number of bytes read; a short count means EOF, not failure.
fn read_block<R: Read + Seek>(source: &mut R, offset: u64, buf: &mut [u8]) -> Result<usize> {
    source
        .seek(SeekFrom::Start(offset))
        .map_err(|e| Error::seek(offset, e))?;

    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::read(offset + filled as u64, e)),
        }
    }
    Ok(filled)
}
