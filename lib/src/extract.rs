//! The model extractor: walks the block tree and fills the session model.
//!
//! Version differences are confined to content-type codes, captured in a
//! [`Dialect`] looked up once per load. Every phase tolerates missing
//! blocks by leaving its collection empty; only structural reads within a
//! record abort that one record.

use std::io::Cursor;

use binrw::{binread, BinReaderExt, Endian};

use crate::block::Block;
use crate::model::{AudioFile, CompoundGroup, MidiEvent, Region, Track};
use crate::scan::{self, U40};

/// Zero-point for MIDI tick positions, also the initial start of every
/// MIDI region. Numerically 10^12; the format treats it as a literal.
pub const ZERO_TICKS: u64 = 0xe8d4a51000;

/// Three-point records bias 5-byte offset and start values by the same
/// constant.
const WIDE_VALUE_BIAS: u64 = ZERO_TICKS;

const MIDI_CHUNK_MARKER: &[u8] = b"MdNLB";
const MIDI_EVENT_SIZE: usize = 35;

/// Content-type codes the extractor consumes. Codes not listed here are
/// parsed into the tree but never read.
mod content {
    pub const SESSION_RATE: u16 = 0x1028;

    pub const WAV_LIST: u16 = 0x1004;
    pub const WAV_NAMES: u16 = 0x103a;
    pub const WAV_META: u16 = 0x1003;
    pub const WAV_SAMPLE_INFO: u16 = 0x1001;

    pub const TRACK_LIST: u16 = 0x1015;
    pub const TRACK_ENTRY: u16 = 0x1014;

    pub const MIDI_EVENTS: u16 = 0x2000;
    pub const MIDI_REGION_LIST: u16 = 0x2002;
    pub const MIDI_REGION_ENTRY: u16 = 0x2001;
    pub const MIDI_REGION_META: u16 = 0x1007;

    pub const MIDI_TRACK_LIST: u16 = 0x2519;
    pub const MIDI_TRACK_ENTRY: u16 = 0x251a;
    pub const MIDI_TRACK_MAP: u16 = 0x1058;
    pub const MIDI_TRACK_MAP_ENTRY: u16 = 0x1057;
    pub const MIDI_PLACEMENT_LIST: u16 = 0x1056;
    pub const MIDI_PLACEMENT: u16 = 0x104f;

    pub const COMPOUND_MAP: u16 = 0x262c;
    pub const COMPOUND_LIST: u16 = 0x262b;
    pub const COMPOUND_GROUP: u16 = 0x2628;
    pub const COMPOUND_ELEMENT: u16 = 0x2523;
}

/// The content-type codes that moved between format generations. The only
/// place version dispatch happens.
#[derive(Debug, Clone, Copy)]
struct Dialect {
    region_list: u16,
    region_entry: u16,
    track_map: u16,
    track_map_entry: u16,
    placement_list: u16,
    placement: u16,
    /// The newer map records carry the placement start themselves.
    placement_start: bool,
}

impl Dialect {
    fn for_version(version: u8) -> Dialect {
        if version >= 10 {
            Dialect {
                region_list: 0x262a,
                region_entry: 0x2629,
                track_map: 0x1054,
                track_map_entry: 0x1052,
                placement_list: 0x1050,
                placement: 0x104f,
                placement_start: true,
            }
        } else {
            Dialect {
                region_list: 0x100b,
                region_entry: 0x1008,
                track_map: 0x1012,
                track_map_entry: 0x1011,
                placement_list: 0x100f,
                placement: 0x100e,
                placement_start: false,
            }
        }
    }
}

fn blocks_of_type(blocks: &[Block], content_type: u16) -> impl Iterator<Item = &Block> {
    blocks.iter().filter(move |b| b.content_type == content_type)
}

/// Session sample rate from the rate block, if the tree carries one.
pub(crate) fn session_rate(data: &[u8], blocks: &[Block], endian: Endian) -> Option<u32> {
    let mut rate = None;
    for b in blocks_of_type(blocks, content::SESSION_RATE) {
        rate = scan::read_u32(data, b.offset + 4, endian);
    }
    rate
}

/// The `(offset, length, start)` triple preceding each region reference.
/// Widths are packed into the high nibbles of the three bytes after the
/// record tag; values follow back to back, always little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ThreePoint {
    offset: u64,
    length: u64,
    start: u64,
}

/// One note record inside a MIDI chunk. Fixed 35-byte layout with large
/// reserved gaps.
#[binread]
struct MidiEventRecord {
    pos: U40,
    #[br(pad_before = 3)]
    note: u8,
    length: U40,
    #[br(pad_before = 3, pad_after = 17)]
    velocity: u8,
}

struct MidiChunk {
    zero_ticks: u64,
    max_pos: u64,
    events: Vec<MidiEvent>,
}

pub(crate) struct ExtractedModel {
    pub sources: Vec<AudioFile>,
    pub regions: Vec<Region>,
    pub midi_regions: Vec<Region>,
    pub tracks: Vec<Track>,
    pub midi_tracks: Vec<Track>,
    pub compounds: Vec<CompoundGroup>,
}

pub(crate) struct Extractor<'a> {
    data: &'a [u8],
    endian: Endian,
    version: u8,
    rate_factor: f64,
    dialect: Dialect,
}

impl<'a> Extractor<'a> {
    pub(crate) fn new(data: &'a [u8], endian: Endian, version: u8, rate_factor: f64) -> Self {
        Extractor {
            data,
            endian,
            version,
            rate_factor,
            dialect: Dialect::for_version(version),
        }
    }

    pub(crate) fn run(&self, blocks: &[Block]) -> ExtractedModel {
        let sources = self.sources(blocks);
        let mut regions = self.audio_regions(blocks, &sources);
        let mut tracks = self.audio_tracks(blocks);
        self.place_audio_regions(blocks, &mut regions, &mut tracks);

        let chunks = self.midi_chunks(blocks);
        let mut midi_regions = self.midi_regions(blocks, &chunks);
        let mut midi_tracks = self.midi_tracks(blocks);
        self.place_midi_regions(blocks, &mut midi_regions, &mut midi_tracks);

        let compounds = self.compound_groups(blocks);

        log::debug!(
            "extracted {} sources, {} regions, {} midi regions, {} tracks, {} midi tracks",
            sources.len(),
            regions.len(),
            midi_regions.len(),
            tracks.len(),
            midi_tracks.len(),
        );

        ExtractedModel {
            sources,
            regions,
            midi_regions,
            tracks,
            midi_tracks,
            compounds,
        }
    }

    fn read_u16(&self, pos: usize) -> Option<u16> {
        scan::read_u16(self.data, pos, self.endian)
    }

    fn read_u32(&self, pos: usize) -> Option<u32> {
        scan::read_u32(self.data, pos, self.endian)
    }

    fn read_string(&self, pos: usize) -> Option<(String, usize)> {
        scan::read_string(self.data, pos, self.endian)
    }

    /// Timeline samples at the session rate, rescaled to the target rate.
    fn scale(&self, value: u64) -> i64 {
        (value as f64 * self.rate_factor) as i64
    }

    fn three_point(&self, pos: usize) -> Option<ThreePoint> {
        let header = self.data.get(pos..pos + 5)?;
        let (offset_width, length_width, start_width) = match self.endian {
            Endian::Big => (header[4] >> 4, header[3] >> 4, header[2] >> 4),
            Endian::Little => (header[1] >> 4, header[2] >> 4, header[3] >> 4),
        };
        let mut j = pos + 5;
        let offset = scan::read_uint(self.data, j, offset_width as usize, Endian::Little)?;
        j += offset_width as usize;
        let length = scan::read_uint(self.data, j, length_width as usize, Endian::Little)?;
        j += length_width as usize;
        let start = scan::read_uint(self.data, j, start_width as usize, Endian::Little)?;

        Some(ThreePoint {
            offset: debias(offset, offset_width),
            length,
            start: debias(start, start_width),
        })
    }

    fn sources(&self, blocks: &[Block]) -> Vec<AudioFile> {
        let mut files = Vec::new();
        for b in blocks_of_type(blocks, content::WAV_LIST) {
            let Some(nwavs) = self.read_u32(b.offset + 2) else {
                continue;
            };
            for c in b.children_of_type(content::WAV_NAMES) {
                let mut pos = c.offset + 11;
                let mut n: u32 = 0;
                while pos < c.payload_end() && n < nwavs {
                    let Some((filename, consumed)) = self.read_string(pos) else {
                        break;
                    };
                    pos += consumed;
                    let Some(tag) = self.data.get(pos..pos + 4) else {
                        break;
                    };
                    let tag: [u8; 4] = tag.try_into().expect("slice is 4 bytes");
                    pos += 9;

                    if filename.contains(".grp")
                        || filename.contains("Audio Files")
                        || filename.contains("Fade Files")
                    {
                        continue;
                    }
                    if !recognized_file_tag(&tag, &filename) {
                        continue;
                    }

                    files.push(AudioFile {
                        filename,
                        index: n as u16,
                        pos_absolute: None,
                        length: 0,
                    });
                    n += 1;
                }
            }
        }

        // Lengths live in a sibling subtree, matched up by iteration order.
        let mut nth = 0usize;
        for b in blocks_of_type(blocks, content::WAV_LIST) {
            for c in b.children_of_type(content::WAV_META) {
                for d in c.children_of_type(content::WAV_SAMPLE_INFO) {
                    if nth >= files.len() {
                        break;
                    }
                    if let Some(len) = scan::read_u64(self.data, d.offset + 8, self.endian) {
                        files[nth].length = len as i64;
                    }
                    nth += 1;
                }
            }
        }

        files
    }

    fn audio_regions(&self, blocks: &[Block], sources: &[AudioFile]) -> Vec<Region> {
        let mut regions = Vec::new();
        let mut rindex: u16 = 0;
        for b in blocks_of_type(blocks, self.dialect.region_list) {
            for c in b.children_of_type(self.dialect.region_entry) {
                let index = rindex;
                rindex = rindex.wrapping_add(1);
                let Some(region) = self.audio_region_entry(c, sources, index) else {
                    log::debug!("skipping unreadable region entry at 0x{:x}", c.offset);
                    continue;
                };
                if region.length == 0 {
                    log::debug!("dropping zero-length region '{}'", region.name);
                    continue;
                }
                regions.push(region);
            }
        }
        regions
    }

    fn audio_region_entry(
        &self,
        entry: &Block,
        sources: &[AudioFile],
        index: u16,
    ) -> Option<Region> {
        let mut j = entry.offset + 11;
        let (name, consumed) = self.read_string(j)?;
        j += consumed;
        let tp = self.three_point(j)?;

        // The source reference trails the entry's first child block.
        let meta = entry.children.first()?;
        let raw_source = self.read_u32(meta.payload_end())? as u16;
        let source = sources
            .iter()
            .find(|w| w.index == raw_source)
            .map(|w| w.index);
        if source.is_none() {
            log::debug!("region '{}' references unknown source {}", name, raw_source);
        }

        Some(Region {
            name,
            index,
            start_pos: self.scale(tp.start),
            sample_offset: self.scale(tp.offset),
            length: self.scale(tp.length),
            source,
            midi: Vec::new(),
        })
    }

    fn audio_tracks(&self, blocks: &[Block]) -> Vec<Track> {
        let mut tracks: Vec<Track> = Vec::new();
        for b in blocks_of_type(blocks, content::TRACK_LIST) {
            for c in b.children_of_type(content::TRACK_ENTRY) {
                let Some((name, consumed)) = self.read_string(c.offset + 2) else {
                    continue;
                };
                // One pad byte sits between the name and the channel count.
                let mut j = c.offset + 2 + consumed + 1;
                let Some(nch) = self.read_u32(j) else {
                    continue;
                };
                j += 4;
                for _ in 0..nch {
                    let Some(channel) = self.read_u16(j) else {
                        break;
                    };
                    j += 2;
                    if !tracks.iter().any(|t| t.index == channel) {
                        tracks.push(Track {
                            name: name.clone(),
                            index: channel,
                            playlist: 0,
                            region: None,
                        });
                    }
                }
            }
        }
        tracks
    }

    fn place_audio_regions(
        &self,
        blocks: &[Block],
        regions: &mut Vec<Region>,
        tracks: &mut Vec<Track>,
    ) {
        for b in blocks_of_type(blocks, self.dialect.track_map) {
            let mut count: u16 = 0;
            for c in b.children_of_type(self.dialect.track_map_entry) {
                for d in c.children_of_type(self.dialect.placement_list) {
                    for e in d.children_of_type(self.dialect.placement) {
                        self.place_audio_one(e, count, regions, tracks);
                    }
                }
                count = count.wrapping_add(1);
            }
        }
    }

    fn place_audio_one(
        &self,
        record: &Block,
        track_index: u16,
        regions: &mut [Region],
        tracks: &mut Vec<Track>,
    ) {
        let Some(raw_region) = self.read_u32(record.offset + 4) else {
            return;
        };
        let raw_region = raw_region as u16;
        let Some(rpos) = regions.iter().position(|r| r.index == raw_region) else {
            log::debug!("placement references unknown region {}", raw_region);
            return;
        };
        let Some(tpos) = tracks.iter().position(|t| t.index == track_index) else {
            log::debug!("placement references unknown track {}", track_index);
            return;
        };
        if self.dialect.placement_start {
            if let Some(start) = self.read_u32(record.offset + 9) {
                regions[rpos].start_pos = i64::from(start);
            }
        }

        let region = regions[rpos].clone();
        if tracks[tpos].region.is_none() {
            tracks[tpos].region = Some(region);
        } else {
            let mut fanned = tracks[tpos].clone();
            fanned.region = Some(region);
            tracks.push(fanned);
        }
    }

    fn midi_chunks(&self, blocks: &[Block]) -> Vec<MidiChunk> {
        let mut chunks = Vec::new();
        for b in blocks_of_type(blocks, content::MIDI_EVENTS) {
            let mut k = b.offset;
            while k + MIDI_EVENT_SIZE < b.payload_end() {
                let Some(marker) = scan::find_forward(self.data, k, self.data.len(), MIDI_CHUNK_MARKER)
                else {
                    break;
                };
                k = marker + 11;
                let Some(n_events) = self.read_u32(k) else {
                    break;
                };
                k += 4;
                let Some(zero_ticks) = scan::read_u40(self.data, k, self.endian) else {
                    break;
                };
                k += 5;

                let mut events = Vec::new();
                let mut max_pos = 0u64;
                for _ in 0..n_events {
                    let Some(raw) = self.data.get(k..k + MIDI_EVENT_SIZE) else {
                        break;
                    };
                    k += MIDI_EVENT_SIZE;
                    let Ok(record) =
                        Cursor::new(raw).read_type::<MidiEventRecord>(self.endian)
                    else {
                        break;
                    };
                    if record.note > 0x7f || record.velocity > 0x7f {
                        log::debug!(
                            "dropping MIDI event with out-of-range note {} / velocity {}",
                            record.note,
                            record.velocity,
                        );
                        continue;
                    }
                    let pos = record.pos.0.wrapping_sub(zero_ticks);
                    let length = record.length.0;
                    max_pos = max_pos.max(pos + length);
                    events.push(MidiEvent {
                        pos,
                        length,
                        note: record.note,
                        velocity: record.velocity,
                    });
                }
                chunks.push(MidiChunk {
                    zero_ticks,
                    max_pos,
                    events,
                });
            }
        }
        chunks
    }

    fn midi_regions(&self, blocks: &[Block], chunks: &[MidiChunk]) -> Vec<Region> {
        let mut regions = Vec::new();
        let mut number: u16 = 0;
        for b in blocks_of_type(blocks, content::MIDI_REGION_LIST) {
            for c in b.children_of_type(content::MIDI_REGION_ENTRY) {
                for d in c.children_of_type(content::MIDI_REGION_META) {
                    let index = number;
                    number = number.wrapping_add(1);

                    let mut j = d.offset + 2;
                    let Some((name, consumed)) = self.read_string(j) else {
                        continue;
                    };
                    j += consumed;
                    if let Some(tp) = self.three_point(j) {
                        log::debug!("midi region '{}' three-point length {}", name, tp.length);
                    }
                    let Some(raw_chunk) = self.read_u32(d.payload_end()) else {
                        continue;
                    };
                    let Some(chunk) = chunks.get(raw_chunk as usize) else {
                        log::debug!("midi region '{}' references missing chunk {}", name, raw_chunk);
                        continue;
                    };
                    log::debug!(
                        "midi region '{}' bound to chunk {} ({} events, zero ticks {})",
                        name,
                        raw_chunk,
                        chunk.events.len(),
                        chunk.zero_ticks,
                    );

                    regions.push(Region {
                        name,
                        index,
                        start_pos: ZERO_TICKS as i64,
                        sample_offset: 0,
                        length: chunk.max_pos as i64,
                        source: None,
                        midi: chunk.events.clone(),
                    });
                }
            }
        }
        regions
    }

    fn midi_tracks(&self, blocks: &[Block]) -> Vec<Track> {
        let mut tracks = Vec::new();
        let mut tindex: u16 = 0;
        for b in blocks_of_type(blocks, content::MIDI_TRACK_LIST) {
            for c in b.children_of_type(content::MIDI_TRACK_ENTRY) {
                let index = tindex;
                tindex = tindex.wrapping_add(1);
                let Some((name, _)) = self.read_string(c.offset + 4) else {
                    continue;
                };
                tracks.push(Track {
                    name,
                    index,
                    playlist: 0,
                    region: None,
                });
            }
        }
        tracks
    }

    fn place_midi_regions(
        &self,
        blocks: &[Block],
        midi_regions: &mut [Region],
        midi_tracks: &mut Vec<Track>,
    ) {
        for b in blocks_of_type(blocks, content::MIDI_TRACK_MAP) {
            let mut count: u16 = 0;
            for c in b.children_of_type(content::MIDI_TRACK_MAP_ENTRY) {
                for d in c.children_of_type(content::MIDI_PLACEMENT_LIST) {
                    for e in d.children_of_type(content::MIDI_PLACEMENT) {
                        self.place_midi_one(e, count, midi_regions, midi_tracks);
                    }
                }
                count = count.wrapping_add(1);
            }
        }
        // Lanes that never received a region are not real MIDI tracks.
        midi_tracks.retain(|t| t.region.is_some());
    }

    fn place_midi_one(
        &self,
        record: &Block,
        track_index: u16,
        midi_regions: &mut [Region],
        midi_tracks: &mut Vec<Track>,
    ) {
        let Some(raw_region) = self.read_u32(record.offset + 4) else {
            return;
        };
        let raw_region = raw_region as u16;
        let Some(start) = scan::read_u40(self.data, record.offset + 9, self.endian) else {
            return;
        };
        let Some(rpos) = midi_regions.iter().position(|r| r.index == raw_region) else {
            log::debug!("midi placement references unknown region {}", raw_region);
            return;
        };
        let Some(tpos) = midi_tracks.iter().position(|t| t.index == track_index) else {
            log::debug!("midi placement references unknown track {}", track_index);
            return;
        };

        // The encoded start may precede the zero-point marker.
        midi_regions[rpos].start_pos = (start as i64 - ZERO_TICKS as i64).abs();
        let region = midi_regions[rpos].clone();
        if midi_tracks[tpos].region.is_none() {
            midi_tracks[tpos].region = Some(region);
        } else {
            let mut fanned = midi_tracks[tpos].clone();
            fanned.region = Some(region);
            midi_tracks.push(fanned);
        }
    }

    fn compound_groups(&self, blocks: &[Block]) -> Vec<CompoundGroup> {
        if self.version < 10 {
            return Vec::new();
        }
        let mut groups = Vec::new();
        let mut index: u16 = 0;
        for b in blocks_of_type(blocks, content::COMPOUND_MAP) {
            for c in b.children_of_type(content::COMPOUND_LIST) {
                for d in c.children_of_type(content::COMPOUND_GROUP) {
                    let current = index;
                    index = index.wrapping_add(1);
                    let Some((name, _)) = self.read_string(d.offset + 2) else {
                        continue;
                    };
                    let level = self
                        .read_u32(d.payload_end() + 1)
                        .unwrap_or(0) as u16;
                    let members = d.children_of_type(content::COMPOUND_ELEMENT).count();
                    groups.push(CompoundGroup {
                        index: current,
                        level,
                        next_index: current,
                        root: members == 0,
                        name,
                    });
                }
            }
        }
        groups
    }
}

fn debias(value: u64, width: u8) -> u64 {
    if width == 5 {
        value.wrapping_sub(WIDE_VALUE_BIAS)
    } else {
        value
    }
}

fn recognized_file_tag(tag: &[u8; 4], filename: &str) -> bool {
    match tag {
        b"WAVE" | b"AIFF" => true,
        b"EVAW" | b"FFIA" => {
            log::warn!("byte-reversed file type tag on '{}'", filename);
            true
        }
        _ => {
            log::debug!("unrecognized file type tag {:?} on '{}'", tag, filename);
            false
        }
    }
}
