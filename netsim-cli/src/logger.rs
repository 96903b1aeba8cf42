//! Terminal logger behind the `log` facade.

use log::{Level, LevelFilter, Log, Metadata, Record};

struct TermLogger;

static LOGGER: TermLogger = TermLogger;

const RESET: &str = "\x1b[0m";

fn color(level: Level) -> &'static str {
    match level {
        Level::Error => "\x1b[31m",
        Level::Warn => "\x1b[33m",
        Level::Info => "\x1b[0m",
        Level::Debug | Level::Trace => "\x1b[90m",
    }
}

impl Log for TermLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        eprintln!(
            "{}[{:>5}]{} {}: {}",
            color(record.level()),
            record.level(),
            RESET,
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}

/// Install the logger. Safe to call more than once; later calls only
/// adjust the level.
pub fn init(level: LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}
