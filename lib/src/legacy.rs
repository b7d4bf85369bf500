//! Header-marker session-rate recovery for sessions whose block tree does
//! not carry the sample-rate block. The marker bytes and offsets differ
//! per version; all of them predate the structured rate record.

use binrw::Endian;

use crate::scan;

pub(crate) fn scan_session_rate(data: &[u8], version: u8, endian: Endian) -> Option<u32> {
    match version {
        5 => {
            match scan::find_forward(data, 0x100, data.len(), b"\x5a\x00\x02") {
                Some(k) => scan::read_u24(data, k + 12, endian),
                None => {
                    let k = scan::find_forward(data, 0x100, data.len(), b"\x5a\x03")?;
                    // The two-byte marker sits one byte later than the
                    // three-byte one.
                    scan::read_u24(data, k + 11, endian)
                }
            }
        }
        6 | 7 => {
            let k = scan::find_forward(data, 0x100, data.len(), b"\x5a\x00\x05")?;
            scan::read_u24(data, k + 12, endian)
        }
        8 => {
            let k = scan::find_forward(data, 0, data.len(), b"\x5a\x05")?;
            scan::read_u24(data, k + 11, endian)
        }
        9 => {
            let k = scan::find_forward(data, 0x100, data.len(), b"\x5a\x06")?;
            scan::read_u24(data, k + 11, endian)
        }
        10..=12 => {
            let k = scan::find_forward(data, 0x100, data.len(), b"\x5a\x09")?;
            scan::read_u24(data, k + 11, endian)
        }
        _ => None,
    }
}
