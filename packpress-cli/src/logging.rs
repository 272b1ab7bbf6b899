//! Logging setup: colored console output plus an optional log file from
//! the `[logger]` configuration section.
//!
//! A log file that cannot be opened is reported once on stderr and logging
//! continues console-only; file output is best-effort, never a reason to
//! abort the run.

use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use packpress_core::config::LoggerConfig;

pub fn init(config: &LoggerConfig, verbose: bool) -> Result<(), fern::InitError> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Cyan);

    let console_name = config.name.clone();
    let console = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} [{}] [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                console_name,
                colors.color(record.level()),
                message
            ))
        })
        .chain(std::io::stdout());

    let mut dispatch = fern::Dispatch::new().level(level).chain(console);

    if let Some(path) = &config.file_name {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match fern::log_file(path) {
            Ok(file) => {
                let file_name = config.name.clone();
                let to_file = fern::Dispatch::new()
                    .format(move |out, message, record| {
                        out.finish(format_args!(
                            "{} [{}] [{}] {}",
                            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                            file_name,
                            record.level(),
                            message
                        ))
                    })
                    .chain(file);
                dispatch = dispatch.chain(to_file);
            }
            Err(e) => {
                eprintln!(
                    "warning: cannot open log file '{}': {e}; continuing with console logging only",
                    path.display()
                );
            }
        }
    }

    dispatch.apply()?;
    Ok(())
}
