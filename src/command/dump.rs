use std::path::PathBuf;

use clap::Args;
use owo_colors::Style;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use ptsession::error::PtSessionError;
use ptsession::model::{Region, Track};
use ptsession::Session;

use crate::command::global_args::GlobalArgs;
use crate::command::PtSessionCommand;
use crate::uwu_colors::StreamStyle;

/// The region/source index printed for an unresolved reference.
const UNRESOLVED: u16 = 0xffff;

/// Print the structural model of one or more session files.
#[derive(Args, Debug)]
pub struct Dump {
    /// The session files to dump.
    files: Vec<PathBuf>,
    /// Dump the raw block tree instead of the model.
    #[clap(short, long)]
    blocks: bool,
}

impl PtSessionCommand for Dump {
    fn run(self, global_args: GlobalArgs) -> Result<(), PtSessionError> {
        // Each file renders into its own buffer so parallel loads cannot
        // interleave on stdout.
        let rendered: Vec<(PathBuf, Result<String, PtSessionError>)> = self
            .files
            .par_iter()
            .map(|path| {
                let out = Session::load(path, global_args.target_rate)
                    .map(|session| render(&session, self.blocks));
                (path.clone(), out)
            })
            .collect();

        let mut failed = None;
        for (path, result) in rendered {
            match result {
                Ok(text) => {
                    println!("{}", path.display().outstyle(Style::new().green()));
                    print!("{}", text);
                }
                Err(e) => {
                    log::error!("{}: {}", path.display().errstyle(Style::new().red()), e);
                    failed = Some(e);
                }
            }
        }
        match failed {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn render(session: &Session, blocks: bool) -> String {
    if blocks {
        let mut out = Vec::new();
        if session.dump_blocks(&mut out).is_ok() {
            return String::from_utf8_lossy(&out).into_owned();
        }
        return String::new();
    }

    let mut out = String::new();
    let product = session.product().unwrap_or("ProTools");
    out.push_str(&format!(
        "{} {} Session: Samplerate = {}Hz\nTarget samplerate = {}\n\n",
        product,
        session.version(),
        session.session_rate(),
        session.target_rate(),
    ));
    out.push_str(&format!(
        "{} wavs, {} regions, {} active regions\n\n",
        session.sources().len(),
        session.audio_regions().len(),
        session.audio_tracks().len(),
    ));

    out.push_str("Audio file (WAV#) @ offset, length:\n");
    for wav in session.sources() {
        out.push_str(&format!(
            "`{}` w({}) @ {}, {}\n",
            wav.filename,
            wav.index,
            wav.pos_absolute.unwrap_or(0),
            wav.length,
        ));
    }

    out.push_str("\nRegion (Region#) (WAV#) @ into-sample, length:\n");
    for region in session.audio_regions() {
        out.push_str(&format!(
            "`{}` r({}) w({}) @ {}, {}\n",
            region.name,
            region.index,
            region.source.unwrap_or(UNRESOLVED),
            region.sample_offset,
            region.length,
        ));
    }

    out.push_str("\nMIDI Region (Region#) @ into-sample, length:\n");
    for region in session.midi_regions() {
        out.push_str(&format!(
            "`{}` r({}) @ {}, {}\n",
            region.name, region.index, region.sample_offset, region.length,
        ));
        for ev in &region.midi {
            out.push_str(&format!(
                "    MIDI: n({}) v({}) @ {}, {}\n",
                ev.note, ev.velocity, ev.pos, ev.length,
            ));
        }
    }

    out.push_str("\nTrack name (Track#) (Region#) @ Absolute:\n");
    for track in session.audio_tracks() {
        out.push_str(&track_line(track));
    }

    out.push_str("\nMIDI Track name (MIDITrack#) (MIDIRegion#) @ Absolute:\n");
    for track in session.midi_tracks() {
        out.push_str(&track_line(track));
    }

    if !session.compounds().is_empty() {
        out.push_str("\nCompound group (Group#) -> next, level:\n");
        for group in session.compounds() {
            out.push_str(&format!(
                "`{}` g({}) -> g({}), {}{}\n",
                group.name,
                group.index,
                group.next_index,
                group.level,
                if group.root { " (root)" } else { "" },
            ));
        }
    }

    out.push_str("\nTrack name (Track#) (WAV filename) @ Absolute + Into-sample, Length:\n");
    for track in session.audio_tracks() {
        let (filename, start, offset, length) = match &track.region {
            Some(region) => (
                region
                    .source
                    .and_then(|idx| session.source_by_index(idx))
                    .map(|w| w.filename.as_str())
                    .unwrap_or(""),
                region.start_pos,
                region.sample_offset,
                region.length,
            ),
            None => ("", 0, 0, 0),
        };
        out.push_str(&format!(
            "`{}` t({}) ({}) @ {} + {}, {}\n",
            track.name, track.index, filename, start, offset, length,
        ));
    }

    out
}

fn track_line(track: &Track) -> String {
    let (index, start) = match &track.region {
        Some(Region {
            index, start_pos, ..
        }) => (*index, *start_pos),
        None => (UNRESOLVED, 0),
    };
    format!(
        "`{}` t({}) r({}) @ {}\n",
        track.name, track.index, index, start,
    )
}
