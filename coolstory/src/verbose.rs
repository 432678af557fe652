//! `-v`/`-q` counting flags mapped onto a tracing level, after clap-verbosity-flag.

use tracing::{level_filters::LevelFilter, Level};

/// Verbosity starts at `ERROR`; each `-v` moves one level towards `TRACE`, each
/// `-q` one level towards off.
#[derive(clap::Args, Debug, Clone)]
pub struct Verbosity {
    /// More output per occurrence
    #[clap(long, short = 'v', parse(from_occurrences), global = true)]
    verbose: i8,

    /// Less output per occurrence
    #[clap(
        long,
        short = 'q',
        parse(from_occurrences),
        global = true,
        conflicts_with = "verbose"
    )]
    quiet: i8,
}

const DEFAULT: i8 = 0;

impl Verbosity {
    pub fn log_level_filter(&self) -> LevelFilter {
        level_for(DEFAULT - self.quiet + self.verbose)
            .map(LevelFilter::from_level)
            .unwrap_or(LevelFilter::OFF)
    }
}

fn level_for(verbosity: i8) -> Option<Level> {
    match verbosity {
        i8::MIN..=-1 => None,
        0 => Some(Level::ERROR),
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        4..=i8::MAX => Some(Level::TRACE),
    }
}
