use crate::error::Result;
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

/// Maps `-v` occurrences to a level; `--quiet` silences everything.
fn level_for(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::OFF;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Installs the global subscriber: a compact stderr layer filtered by verbosity and, when
/// `log_file` is given, a plain-text file layer that also records when each workflow and
/// phase span closes, with its busy and idle time.
pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact();

    let file_layer = match log_file {
        Some(path) => Some(
            fmt::layer()
                .with_writer(File::create(&path)?)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(level_for(verbosity, quiet))
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}
