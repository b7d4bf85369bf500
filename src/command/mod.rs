use clap::{Parser, Subcommand};

use ptsession::error::PtSessionError;

use crate::command::global_args::GlobalArgs;

mod dump;
mod gen_missing;
mod global_args;

pub trait PtSessionCommand {
    fn run(self, global_args: GlobalArgs) -> Result<(), PtSessionError>;
}

#[derive(Parser, Debug)]
#[clap(about = "ProTools session file reader", version)]
pub struct PtSessionTool {
    #[clap(flatten)]
    pub global_args: GlobalArgs,
    /// Thing to do.
    #[clap(subcommand)]
    pub subcommand: PtsCommand,
}

#[derive(Subcommand, Debug)]
pub enum PtsCommand {
    Dump(dump::Dump),
    GenMissing(gen_missing::GenMissing),
}

impl PtSessionCommand for PtsCommand {
    fn run(self, global_args: GlobalArgs) -> Result<(), PtSessionError> {
        match self {
            PtsCommand::Dump(v) => v.run(global_args),
            PtsCommand::GenMissing(v) => v.run(global_args),
        }
    }
}
