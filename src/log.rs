//! Logger setup.
//!
//! Messages go to the terminal and, for runs with an output folder, to two log files in that
//! folder: one with the ordinary progress messages and one with warnings and errors only.
use anyhow::{Context, Result, anyhow};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{Level, LevelFilter, Record};
use std::env;
use std::fmt::Arguments;
use std::fs::File;
use std::io::IsTerminal;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// Log level used when neither the environment nor `settings.toml` provide one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable which takes precedence over the `log_level` setting
pub const LOG_LEVEL_ENV_VAR: &str = "MYOPIC_LOG_LEVEL";

const INFO_LOG_FILE_NAME: &str = "myopic_info.log";
const ERROR_LOG_FILE_NAME: &str = "myopic_error.log";

/// Whether [`init`] has already succeeded in this process
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Parse a level name such as `warn` or `DEBUG`. `off` disables logging.
fn parse_log_level(name: &str) -> Result<LevelFilter> {
    LevelFilter::from_str(name.trim()).map_err(|_| anyhow!("Unknown log level: {name}"))
}

/// Pick the level from the environment variable, then the settings file, then the default
fn resolve_log_level(from_settings: Option<&str>) -> Result<LevelFilter> {
    match env::var(LOG_LEVEL_ENV_VAR) {
        Ok(name) => parse_log_level(&name)
            .with_context(|| format!("Invalid value for {LOG_LEVEL_ENV_VAR}")),
        Err(_) => parse_log_level(from_settings.unwrap_or(DEFAULT_LOG_LEVEL)),
    }
}

/// Install the global logger.
///
/// Warnings and errors are printed to stderr and everything else to stdout, in colour when the
/// stream is a terminal. If `log_dir` is given, `myopic_info.log` and `myopic_error.log` are
/// (re)created there. The info file records at least `info` messages whatever the console level.
///
/// Fails if the level name is unknown or a logger has already been installed.
pub fn init(log_level_from_settings: Option<&str>, log_dir: Option<&Path>) -> Result<()> {
    let level = resolve_log_level(log_level_from_settings)?;

    let mut dispatch = Dispatch::new().chain(console_dispatch(level));
    if let Some(log_dir) = log_dir {
        dispatch = dispatch.chain(file_dispatch(log_dir, level)?);
    }

    dispatch.apply().context("Logger already initialised")?;
    LOGGER_INIT
        .set(())
        .map_err(|()| anyhow!("Logger already initialised"))
}

fn is_warning_or_worse(level: Level) -> bool {
    level <= Level::Warn
}

fn console_dispatch(level: LevelFilter) -> Dispatch {
    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);
    let stdout_colour = std::io::stdout().is_terminal().then_some(colours);
    let stderr_colour = std::io::stderr().is_terminal().then_some(colours);

    let stdout = Dispatch::new()
        .level(level)
        .filter(|metadata| !is_warning_or_worse(metadata.level()))
        .format(move |out, message, record| format_line(out, message, record, stdout_colour))
        .chain(std::io::stdout());
    let stderr = Dispatch::new()
        .level(level.min(LevelFilter::Warn))
        .format(move |out, message, record| format_line(out, message, record, stderr_colour))
        .chain(std::io::stderr());

    Dispatch::new().chain(stdout).chain(stderr)
}

fn file_dispatch(log_dir: &Path, level: LevelFilter) -> Result<Dispatch> {
    let create = |name: &str| {
        let path = log_dir.join(name);
        File::create(&path)
            .with_context(|| format!("Could not create log file {}", path.display()))
    };

    let info = Dispatch::new()
        .level(level.max(LevelFilter::Info))
        .filter(|metadata| !is_warning_or_worse(metadata.level()))
        .format(|out, message, record| format_line(out, message, record, None))
        .chain(create(INFO_LOG_FILE_NAME)?);
    let errors = Dispatch::new()
        .level(LevelFilter::Warn)
        .format(|out, message, record| format_line(out, message, record, None))
        .chain(create(ERROR_LOG_FILE_NAME)?);

    Ok(Dispatch::new().chain(info).chain(errors))
}

/// Format a record as `[HH:MM:SS LEVEL target] message`
fn format_line(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    colours: Option<ColoredLevelConfig>,
) {
    let timestamp = Local::now().format("%H:%M:%S");
    let target = record.target();
    match colours {
        Some(colours) => {
            let level = colours.color(record.level());
            out.finish(format_args!("[{timestamp} {level} {target}] {message}"));
        }
        None => {
            let level = record.level();
            out.finish(format_args!("[{timestamp} {level} {target}] {message}"));
        }
    }
}
