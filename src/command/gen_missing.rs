use std::path::PathBuf;

use clap::Args;
use strum::EnumString;

use ptsession::error::PtSessionError;
use ptsession::Session;

use crate::command::global_args::GlobalArgs;
use crate::command::PtSessionCommand;

/// Write a shell script that synthesizes a placeholder WAV for every
/// source whose length is known.
#[derive(Args, Debug)]
pub struct GenMissing {
    /// The session file to read.
    file: PathBuf,
    /// Waveform for the generated audio.
    #[clap(short, long, default_value = "sine")]
    synth: SynthKind,
}

#[derive(EnumString, Copy, Clone, Debug)]
#[strum(serialize_all = "snake_case")]
pub enum SynthKind {
    Silence,
    Sine,
}

impl SynthKind {
    fn sox_args(&self) -> &'static str {
        match self {
            // `sine 0` synthesizes DC silence; the suffix `s` means samples.
            SynthKind::Silence => "sine 0",
            SynthKind::Sine => "sine 1000 gain -18",
        }
    }
}

impl PtSessionCommand for GenMissing {
    fn run(self, global_args: GlobalArgs) -> Result<(), PtSessionError> {
        let session = Session::load(&self.file, global_args.target_rate)?;

        println!("#!/bin/bash\nset -e\nmkdir \"Audio Files\"");
        for wav in session.sources() {
            if wav.length == 0 {
                println!("# unknown length : {}", wav.filename);
            } else {
                println!(
                    "sox --no-clobber -S -n -r {} -c 1 -b 16 \"Audio Files\"/\"{}\" synth {}s {}",
                    session.session_rate(),
                    wav.filename,
                    wav.length,
                    self.synth.sox_args(),
                );
            }
        }
        Ok(())
    }
}
