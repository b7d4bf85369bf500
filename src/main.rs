use clap::Parser;

use ptsession::error::PtSessionError;

use crate::command::{PtSessionCommand, PtSessionTool};

mod command;
mod uwu_colors;

fn main() -> Result<(), PtSessionError> {
    let args = PtSessionTool::parse();

    env_logger::Builder::new()
        .filter_level(args.global_args.log_level())
        .init();

    args.subcommand.run(args.global_args)
}
