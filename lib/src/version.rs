//! Format-version and endianness discovery from the plaintext header.

use binrw::Endian;

use crate::error::PtSessionError;
use crate::scan;
use crate::unxor::HEADER_LEN;

/// Secondary header signature, found at offset 1 in some sessions.
pub const BITCODE: &[u8; 16] = b"0010111100101011";

/// End of the header region that carries the version segment.
const HEADER_SCAN_END: usize = 0x100;

/// What the header scan recovers before any block is parsed.
#[derive(Debug, Clone)]
pub struct VersionInfo {
    pub version: u8,
    pub endian: Endian,
    pub product: Option<String>,
}

/// Walk the header segments of the plaintext and pull out the product
/// string and format version. Also fixes the global endianness: a segment
/// length with both leading bytes zero can only be big-endian.
///
/// Sessions whose header carries no product segment fall back to version
/// bytes at fixed offsets.
pub fn detect(plain: &[u8]) -> Result<VersionInfo, PtSessionError> {
    if plain.first() != Some(&0x03)
        && scan::find_forward(plain, 0, HEADER_SCAN_END, BITCODE) != Some(1)
    {
        return Err(PtSessionError::Malformed("no version signature in header"));
    }

    let mut endian = Endian::Little;
    let end = HEADER_SCAN_END.min(plain.len());
    let mut pos = HEADER_LEN;
    while pos + 9 <= end {
        if plain[pos] != crate::block::ZMARK {
            break;
        }
        let seg_type = plain[pos + 1];
        pos += 3;

        if plain[pos] == 0 && plain[pos + 1] == 0 {
            endian = Endian::Big;
        } else {
            endian = Endian::Little;
        }
        let seg_len = match scan::read_u32(plain, pos, endian) {
            Some(v) => v as usize,
            None => break,
        };
        pos += 4;

        if !(seg_type == 0x03 || seg_type == 0x04) || plain.get(pos) != Some(&0x03) {
            pos += seg_len;
            continue;
        }

        // Product segment: `03 00 00`, length-prefixed product string,
        // `03 00 00 00`, then the version byte.
        pos += 3;
        let str_len = match plain.get(pos) {
            Some(n) => usize::from(*n),
            None => break,
        };
        pos += 4;
        let product = match plain.get(pos..pos + str_len) {
            Some(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            None => break,
        };
        pos += str_len;
        pos += 4;

        let mut version = match plain.get(pos) {
            Some(v) => *v,
            None => break,
        };
        if version == 0 {
            version = match plain.get(pos + 3) {
                Some(v) => *v,
                None => break,
            };
        }
        log::debug!("header product segment: '{}' version {}", product, version);
        return Ok(VersionInfo {
            version,
            endian,
            product: Some(product),
        });
    }

    fallback(plain, endian)
}

/// Fixed-offset version heuristics for sessions whose header scan comes up
/// empty.
fn fallback(plain: &[u8], endian: Endian) -> Result<VersionInfo, PtSessionError> {
    if plain.len() < HEADER_SCAN_END {
        return Err(PtSessionError::Malformed("no product segment in header"));
    }
    let mut version = plain[0x40];
    if version == 0 {
        version = plain[0x3d];
    }
    if version == 0 {
        version = plain[0x3a].wrapping_add(2);
    }
    if version == 0 {
        return Err(PtSessionError::Malformed("no product segment in header"));
    }
    log::debug!("header scan found no product segment, version byte {}", version);
    Ok(VersionInfo {
        version,
        endian,
        product: None,
    })
}
