//! The recovered session model.
//!
//! Everything here is an owned copy; nothing borrows the plaintext blob.
//! Collections are index-dense in well-formed sessions and lookups go by
//! the on-disk identifier, not by vector position.

use unicase::UniCase;

/// A referenced external audio file.
#[derive(Debug, Clone, Default)]
pub struct AudioFile {
    pub filename: String,
    pub index: u16,
    /// Absolute timeline position; only legacy sessions store one.
    pub pos_absolute: Option<i64>,
    /// Length in samples, zero until the metadata pass fills it in.
    pub length: i64,
}

impl AudioFile {
    /// Filenames compare ASCII case-insensitively, matching the flattened
    /// filesystems the sessions were written on.
    pub fn name_matches(&self, other: &str) -> bool {
        UniCase::new(self.filename.as_str()) == UniCase::new(other)
    }
}

impl PartialEq for AudioFile {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index || self.name_matches(&other.filename)
    }
}

/// A single note in a MIDI region, in session tick units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    pub pos: u64,
    pub length: u64,
    pub note: u8,
    pub velocity: u8,
}

/// A time-bounded window into a source, or a container of MIDI events.
#[derive(Debug, Clone, Default)]
pub struct Region {
    pub name: String,
    pub index: u16,
    /// Timeline position in samples at the target rate.
    pub start_pos: i64,
    /// Offset into the source in samples.
    pub sample_offset: i64,
    /// Length in samples.
    pub length: i64,
    /// Index of the source this region windows; `None` for MIDI regions
    /// and for regions whose source never resolved.
    pub source: Option<u16>,
    /// Ordered note list; empty for audio regions.
    pub midi: Vec<MidiEvent>,
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

/// A playback lane holding one region placement. A lane with several
/// regions appears as several `Track` values sharing a name and index.
#[derive(Debug, Clone)]
pub struct Track {
    pub name: String,
    pub index: u16,
    /// Playlist slot; legacy sessions only, usually zero.
    pub playlist: u8,
    /// `None` for an audio lane that never received a placement.
    pub region: Option<Region>,
}

/// A nested region group, reported for the newest sessions. Auxiliary
/// data: nothing in the audio or MIDI placement pipeline consumes it.
#[derive(Debug, Clone)]
pub struct CompoundGroup {
    pub index: u16,
    /// Region-index offset the group's members are numbered from.
    pub level: u16,
    /// Flattened-tree pointer; a group pointing at itself ends its chain.
    pub next_index: u16,
    /// True for a group with no member regions of its own.
    pub root: bool,
    pub name: String,
}
