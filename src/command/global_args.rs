use clap::Args;

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Sample rate all timeline values are rescaled to.
    #[clap(short = 'r', long, default_value_t = 48000)]
    pub target_rate: i64,
    /// Verbosity level, repeat to increase.
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl GlobalArgs {
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
