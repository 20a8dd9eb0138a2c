// Logger setup plus conditional logging macros that are only active in debug builds

use chrono::Local;
use env_logger::{Builder, Env, Target};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const LOG_DIR_NAME: &str = "witty-guess";
const LOG_FILE_NAME: &str = "witty-guess.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    Stderr,
    File(PathBuf),
    Off,
}

#[must_use]
pub fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join(LOG_DIR_NAME).join(LOG_FILE_NAME))
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Installs `env_logger`, honouring `RUST_LOG` (default `info`).
///
/// Returns the destination actually in use: a log file that cannot be opened
/// turns logging off instead of stopping the game.
pub fn init_logging(destination: &LogDestination) -> LogDestination {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] {}: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        )
    });

    let active = match destination {
        LogDestination::Stderr => {
            builder.target(Target::Stderr);
            LogDestination::Stderr
        }
        LogDestination::File(path) => match open_log_file(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
                LogDestination::File(path.clone())
            }
            Err(e) => {
                eprintln!("Failed to open log file '{}': {e}. Logging is disabled.", path.display());
                builder.filter_level(log::LevelFilter::Off);
                LogDestination::Off
            }
        },
        LogDestination::Off => {
            builder.filter_level(log::LevelFilter::Off);
            LogDestination::Off
        }
    };

    // Only fails when a logger is already installed.
    if builder.try_init().is_err() {
        log::debug!("logger already initialised");
    }
    active
}

#[cfg(debug_assertions)]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        log::debug!($($arg)*);
    };
}

#[cfg(not(debug_assertions))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {{}};
}

#[cfg(debug_assertions)]
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        log::info!($($arg)*);
    };
}

#[cfg(not(debug_assertions))]
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {{}};
}
