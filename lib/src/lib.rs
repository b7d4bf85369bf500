//! Reader for obfuscated ProTools session files.
//!
//! A session file is an XOR-ciphered blob of tagged blocks. Loading one
//! runs a fixed pipeline: decipher, discover the format version and
//! endianness, parse the block tree, then walk it into a model of audio
//! sources, regions, MIDI data and track placements. [`session::Session`]
//! is the entry point; everything else supports it.

pub mod block;
pub mod error;
pub mod model;
pub mod scan;
pub mod session;
pub mod unxor;
pub mod version;

mod extract;
mod legacy;

pub use error::PtSessionError;
pub use extract::ZERO_TICKS;
pub use session::Session;
