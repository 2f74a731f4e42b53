//! Host diagnostics
//!
//! Everything here goes to stderr (and optionally a log file). Stdout is
//! reserved for the buffer dumps the testbench harness compares against.

use anyhow::{Context, Result};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Log levels, ordered from quietest to noisiest
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Nothing = 0,
    User = 1,
    Error = 2,
    Warning = 3,
    Info = 4,
    Debug = 5,
    All = 6,
}

impl LogLevel {
    /// Create a LogLevel from an integer, falling back to Info
    pub fn from_i32(level: i32) -> Self {
        match level {
            0 => LogLevel::Nothing,
            1 => LogLevel::User,
            2 => LogLevel::Error,
            3 => LogLevel::Warning,
            4 => LogLevel::Info,
            5 => LogLevel::Debug,
            6 => LogLevel::All,
            _ => LogLevel::Info,
        }
    }

    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// The `log` record level messages at this level are emitted with.
    /// `Nothing` never emits.
    pub fn to_level(self) -> Option<Level> {
        match self {
            LogLevel::Nothing => None,
            LogLevel::User | LogLevel::Error => Some(Level::Error),
            LogLevel::Warning => Some(Level::Warn),
            LogLevel::Info => Some(Level::Info),
            LogLevel::Debug => Some(Level::Debug),
            LogLevel::All => Some(Level::Trace),
        }
    }

    pub fn to_level_filter(self) -> LevelFilter {
        match self.to_level() {
            Some(level) => level.to_level_filter(),
            None => LevelFilter::Off,
        }
    }
}

// Optional log file the stderr output is mirrored into
static LOG_FILE: Mutex<Option<File>> = Mutex::new(None);

struct HostLogger;

static LOGGER: HostLogger = HostLogger;

impl Log for HostLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] {}", record.level(), record.args());
        eprintln!("{}", line);

        if let Ok(mut guard) = LOG_FILE.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = writeln!(file, "{}", line);
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut guard) = LOG_FILE.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

/// Initialize the logging system.
///
/// Safe to call more than once; later calls only change the level and the
/// log file.
pub fn log_init(level: LogLevel, log_file: Option<&Path>) -> Result<()> {
    let file = match log_file {
        Some(path) => Some(
            File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?,
        ),
        None => None,
    };
    if let Ok(mut guard) = LOG_FILE.lock() {
        *guard = file;
    }

    // Already installed by an earlier call
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level.to_level_filter());
    Ok(())
}

/// Add a log entry at the given level
pub fn log_add(level: LogLevel, message: &str) {
    if let Some(level) = level.to_level() {
        log::log!(target: "extbuf", level, "{}", message);
    }
}

/// Flush the log file, if one is open
pub fn log_flush() {
    LOGGER.flush();
}

/// Convenience macro for fatal errors
#[macro_export]
macro_rules! log_fatal {
    ($($arg:tt)*) => {
        $crate::logging::log_add($crate::logging::LogLevel::User, &format!($($arg)*))
    };
}

/// Convenience macro for errors
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::log_add($crate::logging::LogLevel::Error, &format!($($arg)*))
    };
}

/// Convenience macro for warnings
#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)*) => {
        $crate::logging::log_add($crate::logging::LogLevel::Warning, &format!($($arg)*))
    };
}

/// Convenience macro for info messages
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::log_add($crate::logging::LogLevel::Info, &format!($($arg)*))
    };
}

/// Convenience macro for debug messages
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::log_add($crate::logging::LogLevel::Debug, &format!($($arg)*))
    };
}
