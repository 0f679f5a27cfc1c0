//! Helpers shared by the binaries of this workspace: terminal styles for clap,
//! verbosity handling and tracing setup.

use std::{fs::File, sync::Mutex};

pub use clap;
use clap::builder::{styling::AnsiColor, Styles};
use tracing::Level;

/// Clap help styles used by every binary in the workspace.
pub fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Yellow.on_default().bold())
        .literal(AnsiColor::Green.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default())
        .error(AnsiColor::Red.on_default().bold())
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Red.on_default())
}

/// Map the number of `-v` flags given on the command line to a tracing level.
///
/// No flag only shows errors, each extra `-v` unlocks one more level.
pub fn verbose_count_to_trace(count: u8) -> &'static Level {
    match count {
        0 => &Level::ERROR,
        1 => &Level::WARN,
        2 => &Level::INFO,
        3 => &Level::DEBUG,
        _ => &Level::TRACE,
    }
}

/// Install the global tracing subscriber.
///
/// Logs go to stderr, or to `file` (as JSON lines) when one is given. Calling
/// this twice is harmless; the second subscriber is ignored.
pub fn logging_setup(level: &Level, file: Option<&File>) {
    let builder = tracing_subscriber::fmt()
        .with_max_level(*level)
        .with_target(false);

    let file = file.and_then(|f| f.try_clone().ok());
    let r = match file {
        Some(f) => builder.json().with_writer(Mutex::new(f)).try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    if let Err(e) = r {
        eprintln!("tracing already initialized: {e}");
    }
}
