//! The deobfuscation layer.
//!
//! Session files are XOR-ciphered past a 0x14 byte plaintext header. The
//! header's last two bytes select the cipher family and the key seed; from
//! those a 256-byte keystream is derived and applied to the rest of the
//! file.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::PtSessionError;

/// Length of the unciphered file header.
pub const HEADER_LEN: usize = 0x14;

/// Keystream for one session file, derived from `(xor_type, xor_value)` at
/// header offsets 0x12/0x13.
#[derive(Debug, Clone)]
pub struct XorKey {
    key: [u8; 256],
    /// The newer cipher family advances the key index once per 4 KiB page
    /// instead of once per byte.
    wide_index: bool,
}

impl XorKey {
    pub fn from_header(xor_type: u8, xor_value: u8) -> Result<XorKey, PtSessionError> {
        let (delta, wide_index) = match xor_type {
            0x01 => (Self::gen_delta(xor_value, 53, false), false),
            0x05 => (Self::gen_delta(xor_value, 11, true), true),
            other => return Err(PtSessionError::UnknownCipher(other)),
        };

        let mut key = [0u8; 256];
        for (i, k) in key.iter_mut().enumerate() {
            *k = (i as u8).wrapping_mul(delta);
        }
        Ok(XorKey { key, wide_index })
    }

    /// Smallest `i` with `i * mul == xor_value (mod 256)`, negated for the
    /// newer family. `mul` is odd in both families so a solution always
    /// exists.
    fn gen_delta(xor_value: u8, mul: u8, negative: bool) -> u8 {
        for i in 0u8..=255 {
            if i.wrapping_mul(mul) == xor_value {
                return if negative { i.wrapping_neg() } else { i };
            }
        }
        0
    }

    /// Key byte applied at an absolute file offset.
    pub fn byte_at(&self, file_offset: usize) -> u8 {
        let idx = if self.wide_index {
            (file_offset >> 12) & 0xff
        } else {
            file_offset & 0xff
        };
        self.key[idx]
    }
}

/// Reader adapter that XORs everything it yields with the positional
/// keystream. The same adapter deciphers and re-ciphers; XOR is its own
/// inverse.
pub struct XorRead<R> {
    inner: R,
    key: XorKey,
    offset: usize,
}

impl<R: Read> XorRead<R> {
    pub fn new(inner: R, key: XorKey, start_offset: usize) -> Self {
        Self {
            inner,
            key,
            offset: start_offset,
        }
    }
}

impl<R: Read> Read for XorRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let read_amt = self.inner.read(buf)?;
        for b in &mut buf[..read_amt] {
            *b ^= self.key.byte_at(self.offset);
            self.offset += 1;
        }
        Ok(read_amt)
    }
}

/// Decipher a session file into a plaintext blob of equal length.
pub fn unxor(path: &Path) -> Result<Vec<u8>, PtSessionError> {
    let file = File::open(path).map_err(|e| PtSessionError::FileOpen(path.to_owned(), e))?;
    let file_len = file
        .metadata()
        .map_err(|e| PtSessionError::FileOpen(path.to_owned(), e))?
        .len();
    if file_len < HEADER_LEN as u64 {
        return Err(PtSessionError::Truncated(file_len));
    }

    let mut reader = std::io::BufReader::new(file);
    let mut plain = vec![0u8; HEADER_LEN];
    reader
        .read_exact(&mut plain)
        .map_err(|e| PtSessionError::FileOpen(path.to_owned(), e))?;

    let key = XorKey::from_header(plain[0x12], plain[0x13])?;
    XorRead::new(reader, key, HEADER_LEN)
        .read_to_end(&mut plain)
        .map_err(|e| PtSessionError::FileOpen(path.to_owned(), e))?;
    Ok(plain)
}
