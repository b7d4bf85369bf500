//! Raw byte access for the deobfuscated session blob.
//!
//! Every multi-byte read in the reader funnels through here so that the
//! endianness and variable-width arithmetic live in exactly one place. All
//! functions are bounds checked and return `None` instead of reading past
//! the buffer; callers treat a short read the same as a missing record.

use std::io::{Read, Seek};

use binrw::{BinRead, BinResult, Endian};

/// Read an unsigned integer of `width` bytes (0 through 5) at `pos`.
///
/// A zero width decodes to zero without consuming anything; widths above
/// five occur in damaged files and also decode to zero, the caller still
/// advances its cursor by the stated width.
pub fn read_uint(buf: &[u8], pos: usize, width: usize, endian: Endian) -> Option<u64> {
    match width {
        0 => Some(0),
        1 => buf.get(pos).map(|b| u64::from(*b)),
        2 => read_u16(buf, pos, endian).map(u64::from),
        3 => read_u24(buf, pos, endian).map(u64::from),
        4 => read_u32(buf, pos, endian).map(u64::from),
        5 => read_u40(buf, pos, endian),
        _ => Some(0),
    }
}

pub fn read_u16(buf: &[u8], pos: usize, endian: Endian) -> Option<u16> {
    let b = buf.get(pos..pos + 2)?;
    Some(match endian {
        Endian::Big => (u16::from(b[0]) << 8) | u16::from(b[1]),
        Endian::Little => (u16::from(b[1]) << 8) | u16::from(b[0]),
    })
}

pub fn read_u24(buf: &[u8], pos: usize, endian: Endian) -> Option<u32> {
    let b = buf.get(pos..pos + 3)?;
    Some(match endian {
        Endian::Big => (u32::from(b[0]) << 16) | (u32::from(b[1]) << 8) | u32::from(b[2]),
        Endian::Little => (u32::from(b[2]) << 16) | (u32::from(b[1]) << 8) | u32::from(b[0]),
    })
}

pub fn read_u32(buf: &[u8], pos: usize, endian: Endian) -> Option<u32> {
    let b: [u8; 4] = buf.get(pos..pos + 4)?.try_into().ok()?;
    Some(match endian {
        Endian::Big => u32::from_be_bytes(b),
        Endian::Little => u32::from_le_bytes(b),
    })
}

pub fn read_u40(buf: &[u8], pos: usize, endian: Endian) -> Option<u64> {
    let b = buf.get(pos..pos + 5)?;
    let mut v = 0u64;
    match endian {
        Endian::Big => {
            for byte in b {
                v = (v << 8) | u64::from(*byte);
            }
        }
        Endian::Little => {
            for byte in b.iter().rev() {
                v = (v << 8) | u64::from(*byte);
            }
        }
    }
    Some(v)
}

pub fn read_u64(buf: &[u8], pos: usize, endian: Endian) -> Option<u64> {
    let b: [u8; 8] = buf.get(pos..pos + 8)?.try_into().ok()?;
    Some(match endian {
        Endian::Big => u64::from_be_bytes(b),
        Endian::Little => u64::from_le_bytes(b),
    })
}

/// Scan forward for a byte literal inside `buf[start..end)`.
///
/// Matches must end strictly before `end`; the offset of the first match is
/// returned.
pub fn find_forward(buf: &[u8], start: usize, end: usize, needle: &[u8]) -> Option<usize> {
    let end = end.min(buf.len());
    let mut k = start;
    while k + needle.len() < end {
        if buf[k..k + needle.len()] == *needle {
            return Some(k);
        }
        k += 1;
    }
    None
}

/// Scan backward from `start` for a byte literal, down to offset zero.
pub fn find_backward(buf: &[u8], start: usize, end: usize, needle: &[u8]) -> Option<usize> {
    let end = end.min(buf.len());
    let mut k = start;
    while k > 0 && k + needle.len() < end {
        if buf[k..k + needle.len()] == *needle {
            return Some(k);
        }
        k -= 1;
    }
    None
}

/// Read a length-prefixed string: a 4-byte count followed by that many bytes
/// of text. The format does not declare an encoding, so undecodable bytes
/// are replaced rather than rejected. Returns the string and the total
/// bytes consumed (4 + count).
pub fn read_string(buf: &[u8], pos: usize, endian: Endian) -> Option<(String, usize)> {
    let len = read_u32(buf, pos, endian)? as usize;
    let bytes = buf.get(pos + 4..pos + 4 + len)?;
    Some((String::from_utf8_lossy(bytes).into_owned(), 4 + len))
}

/// A 5-byte unsigned integer as it appears in MIDI tick fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct U40(pub u64);

impl BinRead for U40 {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(reader: &mut R, endian: Endian, _: ()) -> BinResult<Self> {
        let mut bytes = [0u8; 5];
        reader.read_exact(&mut bytes)?;
        let mut v = 0u64;
        match endian {
            Endian::Big => {
                for b in bytes {
                    v = (v << 8) | u64::from(b);
                }
            }
            Endian::Little => {
                for b in bytes.iter().rev() {
                    v = (v << 8) | u64::from(*b);
                }
            }
        }
        Ok(U40(v))
    }
}
