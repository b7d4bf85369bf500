use std::path::PathBuf;

use thiserror::Error;

/// Everything that can abort a session load. Bounded sub-scans inside the
/// extractor never surface here; a failed sub-scan leaves its collection
/// empty and the load still succeeds.
#[derive(Error, Debug)]
pub enum PtSessionError {
    #[error("could not open session file '{0}': {1}")]
    FileOpen(PathBuf, #[source] std::io::Error),
    #[error("session file is {0} bytes, shorter than the 0x14 byte header")]
    Truncated(u64),
    #[error("unknown cipher type 0x{0:02x} (expected 0x01 or 0x05)")]
    UnknownCipher(u8),
    #[error("unsupported session version {0}, only versions 5 through 12 are readable")]
    UnsupportedVersion(u8),
    #[error("session sample rate {0} Hz is outside 44100..=192000")]
    BadSessionRate(i64),
    #[error("session structure not recognized: {0}")]
    Malformed(&'static str),
}
