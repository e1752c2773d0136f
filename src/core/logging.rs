//! Logger initialization: terminal output plus a log file.

use std::fs::File;
use std::path::Path;

use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, TermLogger, TerminalMode, WriteLogger,
};

/// Initializes combined terminal + file logging.
///
/// The level comes from `RUST_LOG` (default `info`).
pub fn init_logger(log_path: &Path) -> anyhow::Result<()> {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|v| v.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);

    let config = ConfigBuilder::new().set_time_format_rfc3339().build();

    CombinedLogger::init(vec![
        TermLogger::new(level, config.clone(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(level, config, File::create(log_path)?),
    ])?;

    log::debug!("logger initialized at level {level}, file {}", log_path.display());
    Ok(())
}
