//! The tagged-block tree.
//!
//! Past the file header the plaintext is a sequence of blocks, each opened
//! by the `0x5A` mark and a 7-byte header, with further blocks nested in
//! the payload. The grammar has no child count, so nesting is discovered
//! by trial-parsing every payload position and skipping whole blocks when
//! one parses.

use std::io::{Cursor, Write};

use binrw::{binread, BinReaderExt, Endian};

use crate::unxor::HEADER_LEN;

/// The sentinel byte that opens every block.
pub const ZMARK: u8 = 0x5a;

/// Nesting bound; anything deeper is corrupt or a false positive.
const MAX_DEPTH: usize = 10;

#[binread]
#[br(magic = 0x5au8)]
struct RawBlockHeader {
    block_type: u16,
    block_size: u32,
    content_type: u16,
}

/// One node of the block tree. `offset` addresses the payload (the byte
/// after the 7-byte header); the two content-type bytes are the start of
/// the payload itself.
#[derive(Debug, Clone)]
pub struct Block {
    pub block_type: u16,
    pub block_size: u32,
    pub content_type: u16,
    pub offset: usize,
    pub children: Vec<Block>,
}

impl Block {
    /// End of this block's payload, as a file offset.
    pub fn payload_end(&self) -> usize {
        self.offset + self.block_size as usize
    }

    /// Children carrying the given content type.
    pub fn children_of_type(&self, content_type: u16) -> impl Iterator<Item = &Block> {
        self.children
            .iter()
            .filter(move |c| c.content_type == content_type)
    }
}

fn parse_block_at(data: &[u8], pos: usize, endian: Endian, depth: usize) -> Option<Block> {
    if pos + 7 > data.len() || depth > MAX_DEPTH {
        return None;
    }
    if data[pos] != ZMARK {
        return None;
    }

    let mut cur = Cursor::new(&data[pos..]);
    let raw: RawBlockHeader = cur.read_type(endian).ok()?;
    let offset = pos + 7;
    if offset + raw.block_size as usize > data.len() {
        return None;
    }
    if raw.block_type & 0xff00 != 0 {
        return None;
    }

    let mut children = Vec::new();
    let mut i = 1usize;
    while i < raw.block_size as usize && pos + i < data.len() {
        match parse_block_at(data, pos + i, endian, depth + 1) {
            Some(child) => {
                let jump = child.block_size as usize + 7;
                children.push(child);
                i += jump;
            }
            None => i += 1,
        }
    }

    Some(Block {
        block_type: raw.block_type,
        block_size: raw.block_size,
        content_type: raw.content_type,
        offset,
        children,
    })
}

/// Parse the top-level forest of blocks from the plaintext blob.
pub fn parse_blocks(data: &[u8], endian: Endian) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut pos = HEADER_LEN;
    while pos < data.len() {
        match parse_block_at(data, pos, endian, 0) {
            Some(b) => {
                pos += b.block_size as usize + 7;
                blocks.push(b);
            }
            None => pos += 1,
        }
    }
    blocks
}

/// Human-readable name for a content-type code, for the debug dump.
pub fn describe_content_type(content_type: u16) -> &'static str {
    match content_type {
        0x0030 => "INFO product and version",
        0x1001 => "WAV samplerate, size",
        0x1003 => "WAV metadata",
        0x1004 => "WAV list full",
        0x1007 => "region name, number",
        0x1008 => "AUDIO region name, number (v5)",
        0x100b => "AUDIO region list (v5)",
        0x100e => "AUDIO region->track subentry (v5)",
        0x100f => "AUDIO region->track entry (v5)",
        0x1011 => "AUDIO region->track map entries (v5)",
        0x1012 => "AUDIO region->track full map (v5)",
        0x1014 => "AUDIO track name, number",
        0x1015 => "AUDIO tracks",
        0x1017 => "PLUGIN entry",
        0x1018 => "PLUGIN full list",
        0x1021 => "I/O channel entry",
        0x1022 => "I/O channel list",
        0x1028 => "INFO sample rate",
        0x103a => "WAV names",
        0x104f => "AUDIO region->track subentry (v8)",
        0x1050 => "AUDIO region->track entry (v8)",
        0x1052 => "AUDIO region->track map entries (v8)",
        0x1054 => "AUDIO region->track full map (v8)",
        0x1056 => "MIDI region->track entry",
        0x1057 => "MIDI region->track map entries",
        0x1058 => "MIDI region->track full map",
        0x2000 => "MIDI events block",
        0x2001 => "MIDI region name, number (v5)",
        0x2002 => "MIDI regions map (v5)",
        0x2067 => "INFO path of session",
        0x2511 => "Snaps block",
        0x2519 => "MIDI track full list",
        0x251a => "MIDI track name, number",
        0x2523 => "COMPOUND region element",
        0x2602 => "I/O route",
        0x2603 => "I/O routing table",
        0x2628 => "COMPOUND region group",
        0x2629 => "AUDIO region name, number (v10)",
        0x262a => "AUDIO region list (v10)",
        0x262c => "COMPOUND region full map",
        0x2633 => "MIDI regions name, number (v10)",
        0x2634 => "MIDI regions map (v10)",
        0x271a => "MARKER list",
        _ => "UNKNOWN content type",
    }
}

/// Hexdump cap per block in the debug dump; payloads can be megabytes.
const DUMP_BYTES: usize = 256;

fn hexdump(w: &mut impl Write, data: &[u8], level: usize) -> std::io::Result<()> {
    for row in data.chunks(16) {
        write!(w, "{}", "    ".repeat(level))?;
        for b in row {
            write!(w, "{:02X} ", b)?;
        }
        for b in row {
            if *b > 32 && *b < 128 {
                write!(w, "{}", *b as char)?;
            } else {
                write!(w, ".")?;
            }
        }
        writeln!(w)?;
    }
    Ok(())
}

pub(crate) fn dump_block(
    w: &mut impl Write,
    data: &[u8],
    block: &Block,
    level: usize,
) -> std::io::Result<()> {
    writeln!(
        w,
        "{}{}(0x{:04x}) @ 0x{:x}, {} bytes",
        "    ".repeat(level),
        describe_content_type(block.content_type),
        block.content_type,
        block.offset,
        block.block_size,
    )?;
    let end = block.payload_end().min(block.offset + DUMP_BYTES);
    if let Some(payload) = data.get(block.offset..end) {
        hexdump(w, payload, level)?;
    }
    for child in &block.children {
        dump_block(w, data, child, level + 1)?;
    }
    Ok(())
}
