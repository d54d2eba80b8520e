//! Structured logging system with visual formatting.
//!
//! This module provides a logging system designed for suncam's visual output style.
//! It includes different log levels and special formatting functions for creating
//! structured output with Unicode box drawing characters.
//!
//! Besides the console, every line can be mirrored to a log file with a timestamp
//! prefix. Stations run unattended for months, so the file is what gets read after
//! a site visit. Once the oldest line in the file is a week old the file is
//! rotated by [`rotate_log_file`]; the wake loop checks this on every pass through
//! [`Log::rotate_if_due`].
//!
//! The logger supports runtime enable/disable functionality for quiet operation
//! during automated processes or testing, and a debug gate for verbose output.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeDelta};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::constants::{LOG_BACKUP_COUNT, LOG_ROTATION_DAYS};

// Use an AtomicBool instead of thread_local for thread safety
static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_FILE: Mutex<Option<LogSink>> = Mutex::new(None);

/// Timestamp prefix of every line written to the log file.
const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The open log file and where it lives, so it can be reopened after rotation.
struct LogSink {
    file: File,
    path: PathBuf,
}

impl LogSink {
    fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

/// Log level enumeration for categorizing message importance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    Log,   // Normal operational logs
    Debug, // Verbose output, only shown with --debug
    Warn,  // Warning messages (non-fatal issues)
    Err,   // Error messages (recoverable failures)
    Crit,  // Critical errors (may require a site visit)
    Info,  // Informational messages (status updates)
}

impl LogLevel {
    fn prefix(self) -> &'static str {
        match self {
            LogLevel::Log => "[LOG] ",
            LogLevel::Debug => "[DEBUG] ",
            LogLevel::Warn => "[WARN] ",
            LogLevel::Err => "[ERR] ",
            LogLevel::Crit => "[CRIT] ",
            LogLevel::Info => "[INFO] ",
        }
    }
}

/// Main logging interface providing structured output formatting.
pub struct Log;

impl Log {
    /// Enable or disable logging temporarily.
    ///
    /// This is useful for quiet operation during automated processes
    /// or testing where log output would interfere with results.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    /// Check if logging is currently enabled.
    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Enable or disable debug-level output.
    pub fn set_debug(enabled: bool) {
        DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_debug() -> bool {
        DEBUG_ENABLED.load(Ordering::SeqCst)
    }

    /// Mirror all subsequent log lines into `path` (appending).
    ///
    /// The parent directory must already exist.
    pub fn set_log_file(path: &Path) -> Result<()> {
        let sink = LogSink::open(path)?;

        if let Ok(mut guard) = LOG_FILE.lock() {
            *guard = Some(sink);
        }
        Ok(())
    }

    /// Rotate the current log file if it is due, then carry on writing to a fresh one.
    ///
    /// `now` is local wall-clock time, the same clock as the file's line prefixes.
    /// Returns `Ok(false)` when no log file is set or rotation is not yet due.
    pub fn rotate_if_due(now: NaiveDateTime) -> Result<bool> {
        let Ok(mut guard) = LOG_FILE.lock() else {
            return Ok(false);
        };
        let Some(path) = guard.as_ref().map(|sink| sink.path.clone()) else {
            return Ok(false);
        };
        if !rotation_due(&path, now)? {
            return Ok(false);
        }

        // Release the handle before the file is renamed away
        *guard = None;
        let rotated = rotate_log_file(&path, now);
        *guard = Some(LogSink::open(&path)?);
        rotated
    }

    /// Stop mirroring log lines to a file.
    pub fn close_log_file() {
        if let Ok(mut guard) = LOG_FILE.lock() {
            *guard = None;
        }
    }

    fn emit(line: &str) {
        println!("{}", line);

        if let Ok(mut guard) = LOG_FILE.lock() {
            if let Some(sink) = guard.as_mut() {
                let timestamp = Local::now().format(FILE_TIMESTAMP_FORMAT);
                // A full disk must not take the capture loop down with it
                let _ = writeln!(sink.file, "{} {}", timestamp, line);
            }
        }
    }

    /// Main log function with level-based prefixes.
    ///
    /// Outputs messages with appropriate prefixes to indicate severity.
    /// Debug-level messages are dropped unless debug output is enabled.
    ///
    /// # Arguments
    /// * `level` - LogLevel indicating message importance
    /// * `message` - Text content to log
    pub fn log(level: LogLevel, message: &str) {
        // Skip logging if disabled
        if !Self::is_enabled() {
            return;
        }
        if level == LogLevel::Debug && !Self::is_debug() {
            return;
        }

        Self::emit(&format!("{}{}", level.prefix(), message));
    }

    // ═══ Convenience Methods for Common Log Levels ═══

    /// Log an error message.
    pub fn log_error(message: &str) {
        Self::log(LogLevel::Err, message);
    }

    /// Log a warning message.
    pub fn log_warning(message: &str) {
        Self::log(LogLevel::Warn, message);
    }

    /// Log an informational message.
    pub fn log_info(message: &str) {
        Self::log(LogLevel::Info, message);
    }

    /// Log an operational message.
    pub fn log_message(message: &str) {
        Self::log(LogLevel::Log, message);
    }

    /// Log a debug message (only shown with `--debug`).
    pub fn log_debug(message: &str) {
        Self::log(LogLevel::Debug, message);
    }

    /// Log a critical error message.
    pub fn log_critical(message: &str) {
        Self::log(LogLevel::Crit, message);
    }

    // ═══ Visual Formatting Functions ═══

    /// Log a decorated message with visual branching indicator.
    ///
    /// Used for main status messages and important information.
    pub fn log_decorated(message: &str) {
        if !Self::is_enabled() {
            return;
        }
        Self::emit(&format!("┣ {}", message));
    }

    /// Log an indented message for sub-items or details.
    pub fn log_indented(message: &str) {
        if !Self::is_enabled() {
            return;
        }
        Self::emit(&format!("┃   {}", message));
    }

    /// Log a visual pipe separator.
    pub fn log_pipe() {
        if !Self::is_enabled() {
            return;
        }
        Self::emit("┃");
    }

    /// Log a block start message with visual separation.
    ///
    /// Used for major state changes or new operational phases.
    pub fn log_block_start(message: &str) {
        if !Self::is_enabled() {
            return;
        }
        Self::emit("┃");
        Self::emit(&format!("┣ {}", message));
    }

    /// Log the application version header.
    pub fn log_version() {
        if !Self::is_enabled() {
            return;
        }
        Self::emit(&format!("┏ suncam v{} ━━╸", env!("CARGO_PKG_VERSION")));
        Self::emit("┃");
    }

    /// Log the final termination marker.
    pub fn log_end() {
        if !Self::is_enabled() {
            return;
        }
        Self::emit("╹");
    }
}

fn backup_path(path: &Path, index: u32) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

/// When the oldest entry in the log file at `path` was written.
///
/// Read from the first line's timestamp prefix. Files without one (written by
/// something else, or truncated) fall back to their modification time.
fn first_entry_time(path: &Path) -> Result<Option<NaiveDateTime>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read log file {}", path.display()));
        }
    };

    let mut first_line = String::new();
    BufReader::new(&file)
        .read_line(&mut first_line)
        .with_context(|| format!("Failed to read log file {}", path.display()))?;
    if first_line.is_empty() {
        return Ok(None);
    }

    let stamped = first_line
        .get(..19)
        .and_then(|prefix| NaiveDateTime::parse_from_str(prefix, FILE_TIMESTAMP_FORMAT).ok());
    if stamped.is_some() {
        return Ok(stamped);
    }

    let modified = file
        .metadata()
        .and_then(|metadata| metadata.modified())
        .context("Log file modification time is unavailable")?;
    Ok(Some(DateTime::<Local>::from(modified).naive_local()))
}

fn rotation_due(path: &Path, now: NaiveDateTime) -> Result<bool> {
    Ok(match first_entry_time(path)? {
        Some(first) => now - first >= TimeDelta::days(LOG_ROTATION_DAYS as i64),
        None => false,
    })
}

/// Rotate `path` once its oldest entry is a week older than `now`.
///
/// `suncam.log` becomes `suncam.log.1`, `.1` becomes `.2` and so on; the oldest
/// backup beyond [`LOG_BACKUP_COUNT`] is removed. Returns whether a rotation happened.
pub fn rotate_log_file(path: &Path, now: NaiveDateTime) -> Result<bool> {
    if !rotation_due(path, now)? {
        return Ok(false);
    }

    let oldest = backup_path(path, LOG_BACKUP_COUNT);
    if oldest.exists() {
        fs::remove_file(&oldest)
            .with_context(|| format!("Failed to remove {}", oldest.display()))?;
    }
    for index in (1..LOG_BACKUP_COUNT).rev() {
        let from = backup_path(path, index);
        if from.exists() {
            fs::rename(&from, backup_path(path, index + 1))
                .with_context(|| format!("Failed to rotate {}", from.display()))?;
        }
    }
    fs::rename(path, backup_path(path, 1))
        .with_context(|| format!("Failed to rotate {}", path.display()))?;

    Ok(true)
}
