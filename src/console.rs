//! Simple hierarchical console logging
//!
//! This module provides the leveled logger used across the toolkit:
//! - Six ordered levels, from `trace` to `silent`, adjustable at runtime
//! - A process-wide console plus standalone [`Console`] instances
//! - Console, compact and JSON line formats built from structured entries
//! - A [`Logger`] trait so callers can swap in a no-op logger

use crate::error::{AppError, Result};
use chrono::{DateTime, Local};
use colored::Colorize;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, OnceLock};

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level - most detailed
    Trace = 0,
    /// Debug level - detailed information for debugging
    Debug = 1,
    /// Info level - general information (the default)
    Info = 2,
    /// Status level - progress reports that should survive `info` filtering
    Status = 3,
    /// Warning level - potentially harmful situations
    Warn = 4,
    /// Silent - nothing is printed
    Silent = 5,
}

const LEVEL_NAMES: [&str; 6] = ["trace", "debug", "info", "status", "warn", "silent"];

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        LEVEL_NAMES[*self as usize]
    }

    /// Convert a numeric level, clamping anything above silent to silent
    pub fn from_u8(level: u8) -> Self {
        match level {
            0 => LogLevel::Trace,
            1 => LogLevel::Debug,
            2 => LogLevel::Info,
            3 => LogLevel::Status,
            4 => LogLevel::Warn,
            _ => LogLevel::Silent,
        }
    }

    fn colored_tag(&self) -> String {
        let tag = format!("{:>6}", self.as_str().to_uppercase());
        match self {
            LogLevel::Trace => tag.white().to_string(),
            LogLevel::Debug => tag.cyan().to_string(),
            LogLevel::Info => tag.green().to_string(),
            LogLevel::Status => tag.blue().bold().to_string(),
            LogLevel::Warn => tag.yellow().to_string(),
            LogLevel::Silent => tag,
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "status" => Ok(LogLevel::Status),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "silent" | "off" => Ok(LogLevel::Silent),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Timestamp, level tag and message
    Console,
    /// Prefix and message only
    Compact,
    /// One JSON object per line
    Json,
}

/// Structured log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp when the entry was created
    pub timestamp: DateTime<Local>,
    /// Log level
    pub level: LogLevel,
    /// Console prefix at the time of logging
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub prefix: String,
    /// Log message, without a trailing newline
    pub message: String,
    /// Additional structured fields
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// The seam through which library code logs.
pub trait Logger: Send + Sync {
    /// Emit a message at the given level.
    fn log(&self, level: LogLevel, message: &str);

    /// Whether a message at `level` would be printed.
    fn would_log(&self, _level: LogLevel) -> bool {
        true
    }
}

struct ConsoleState {
    level: LogLevel,
    prefix: String,
    format: LogFormat,
    use_color: bool,
}

/// Leveled logger writing formatted lines to a sink (stdout by default).
pub struct Console {
    state: RwLock<ConsoleState>,
    sink: Mutex<Box<dyn Write + Send>>,
}

impl Console {
    /// Create a console that writes to stdout at the info level
    pub fn new() -> Self {
        Self::with_sink(Box::new(io::stdout()))
    }

    /// Create a console writing to an arbitrary sink
    pub fn with_sink(sink: Box<dyn Write + Send>) -> Self {
        Self {
            state: RwLock::new(ConsoleState {
                level: LogLevel::default(),
                prefix: String::new(),
                format: LogFormat::Console,
                use_color: false,
            }),
            sink: Mutex::new(sink),
        }
    }

    /// Set the prefix and output format
    pub fn init(&self, prefix: &str, format: LogFormat) {
        let mut state = self.state.write();
        state.prefix = prefix.to_string();
        state.format = format;
    }

    /// Replace the output sink
    pub fn set_sink(&self, sink: Box<dyn Write + Send>) {
        *self.sink.lock() = sink;
    }

    /// Current minimum level
    pub fn level(&self) -> LogLevel {
        self.state.read().level
    }

    /// Set minimum log level
    pub fn set_level(&self, level: LogLevel) {
        self.state.write().level = level;
    }

    /// Enable or disable colored level tags
    pub fn set_color(&self, use_color: bool) {
        self.state.write().use_color = use_color;
    }

    /// Create a log entry builder
    pub fn entry(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message)
    }

    pub fn trace(&self, message: &str) {
        self.log(LogLevel::Trace, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn status(&self, message: &str) {
        self.log(LogLevel::Status, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    /// Warn with the display text of an error
    pub fn warne(&self, error: &dyn fmt::Display) {
        self.warn(&error.to_string());
    }

    fn write_entry(&self, mut entry: LogEntry) {
        let state = self.state.read();
        if entry.level == LogLevel::Silent || entry.level < state.level {
            return;
        }
        entry.prefix = state.prefix.clone();

        let line = match state.format {
            LogFormat::Console => format_console(&entry, state.use_color),
            LogFormat::Compact => format_compact(&entry),
            LogFormat::Json => format_json(&entry),
        };
        drop(state);

        let mut sink = self.sink.lock();
        let _ = writeln!(sink, "{}", line);
        let _ = sink.flush();
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for Console {
    fn log(&self, level: LogLevel, message: &str) {
        self.entry(level, message).log();
    }

    fn would_log(&self, level: LogLevel) -> bool {
        level != LogLevel::Silent && level >= self.level()
    }
}

/// Strip exactly the trailing newline characters so each line ends once
fn normalize(message: &str) -> String {
    message.trim_end_matches(['\n', '\r']).to_string()
}

fn format_fields(fields: &BTreeMap<String, serde_json::Value>) -> String {
    if fields.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!(" {{{}}}", parts.join(", "))
}

fn format_console(entry: &LogEntry, use_color: bool) -> String {
    let timestamp = entry.timestamp.format("%Y/%m/%d %H:%M:%S");
    let level = if use_color {
        entry.level.colored_tag()
    } else {
        format!("{:>6}", entry.level.as_str().to_uppercase())
    };
    format!(
        "{}{} {} {}{}",
        entry.prefix,
        timestamp,
        level,
        entry.message,
        format_fields(&entry.fields)
    )
}

fn format_compact(entry: &LogEntry) -> String {
    format!("{}{}{}", entry.prefix, entry.message, format_fields(&entry.fields))
}

fn format_json(entry: &LogEntry) -> String {
    match serde_json::to_string(entry) {
        Ok(json) => json,
        Err(_) => format!("{{\"error\": \"Failed to serialize log entry\", \"message\": {:?}}}", entry.message),
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    console: &'a Console,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(console: &'a Console, level: LogLevel, message: &str) -> Self {
        Self {
            console,
            entry: LogEntry {
                timestamp: Local::now(),
                level,
                prefix: String::new(),
                message: normalize(message),
                fields: BTreeMap::new(),
            },
        }
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Write the entry
    pub fn log(self) {
        self.console.write_entry(self.entry);
    }
}

//===========================================================================
// Process-wide console
//===========================================================================

static CONSOLE: OnceLock<Console> = OnceLock::new();

/// The process-wide console
pub fn global() -> &'static Console {
    CONSOLE.get_or_init(Console::new)
}

/// Forwards to the process-wide console; usable wherever a [`Logger`] is expected.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalConsole;

impl Logger for GlobalConsole {
    fn log(&self, level: LogLevel, message: &str) {
        global().log(level, message);
    }

    fn would_log(&self, level: LogLevel) -> bool {
        global().would_log(level)
    }
}

/// Shared handle to the process-wide console
pub fn shared() -> Arc<dyn Logger> {
    Arc::new(GlobalConsole)
}

/// Init the process-wide console with a prefix and output format
pub fn init(prefix: &str, format: LogFormat) {
    global().init(prefix, format);
}

/// Name of the current level
pub fn log_level() -> &'static str {
    global().level().as_str()
}

/// Modify the level of the process-wide console at runtime
pub fn set_log_level(level: LogLevel) {
    global().set_level(level);
}

pub fn trace(message: &str) {
    global().trace(message);
}

pub fn debug(message: &str) {
    global().debug(message);
}

pub fn info(message: &str) {
    global().info(message);
}

pub fn status(message: &str) {
    global().status(message);
}

pub fn warn(message: &str) {
    global().warn(message);
}

/// Warn about an error received
pub fn warne(error: &dyn fmt::Display) {
    global().warne(error);
}

/// Log at trace level on the process-wide console with `format!` arguments
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::console::trace(&format!($($arg)*)) };
}

/// Log at debug level on the process-wide console with `format!` arguments
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::console::debug(&format!($($arg)*)) };
}

/// Log at info level on the process-wide console with `format!` arguments
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::console::info(&format!($($arg)*)) };
}

/// Log at status level on the process-wide console with `format!` arguments
#[macro_export]
macro_rules! status {
    ($($arg:tt)*) => { $crate::console::status(&format!($($arg)*)) };
}

/// Log at warn level on the process-wide console with `format!` arguments
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::console::warn(&format!($($arg)*)) };
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Cloneable in-memory sink for capturing output
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuffer(pub Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    fn captured(format: LogFormat) -> (Console, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let console = Console::with_sink(Box::new(buffer.clone()));
        console.init("", format);
        (console, buffer)
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("trace".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert_eq!("STATUS".parse::<LogLevel>().unwrap(), LogLevel::Status);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("silent".parse::<LogLevel>().unwrap(), LogLevel::Silent);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Info < LogLevel::Status);
        assert!(LogLevel::Warn < LogLevel::Silent);
    }

    #[test]
    fn test_level_clamps_to_silent() {
        assert_eq!(LogLevel::from_u8(3), LogLevel::Status);
        assert_eq!(LogLevel::from_u8(42), LogLevel::Silent);
    }

    #[test]
    fn test_default_level_is_info() {
        let (console, _) = captured(LogFormat::Compact);
        assert_eq!(console.level(), LogLevel::Info);
        assert_eq!(console.level().as_str(), "info");
    }

    #[test]
    fn test_messages_below_level_are_filtered() {
        let (console, buffer) = captured(LogFormat::Compact);
        console.set_level(LogLevel::Status);

        console.trace("trace");
        console.debug("debug");
        console.info("info");
        console.status("status");
        console.warn("warn");

        assert_eq!(buffer.contents(), "status\nwarn\n");
    }

    #[test]
    fn test_silent_prints_nothing() {
        let (console, buffer) = captured(LogFormat::Compact);
        console.set_level(LogLevel::Silent);
        console.warn("nope");
        console.log(LogLevel::Silent, "never");
        assert!(buffer.contents().is_empty());
        assert!(!console.would_log(LogLevel::Warn));
    }

    #[test]
    fn test_single_trailing_newline() {
        let (console, buffer) = captured(LogFormat::Compact);
        console.info("already terminated\n");
        console.info("bare");
        assert_eq!(buffer.contents(), "already terminated\nbare\n");
    }

    #[test]
    fn test_prefix_and_fields() {
        let (console, buffer) = captured(LogFormat::Compact);
        console.init("[x] ", LogFormat::Compact);
        console.entry(LogLevel::Info, "tick").field("calls", 3).log();
        assert_eq!(buffer.contents(), "[x] tick {calls=3}\n");
    }

    #[test]
    fn test_console_format_has_level_tag() {
        let (console, buffer) = captured(LogFormat::Console);
        console.warn("disk almost full");
        let out = buffer.contents();
        assert!(out.contains("  WARN disk almost full"));
    }

    #[test]
    fn test_json_format() {
        let (console, buffer) = captured(LogFormat::Json);
        console.entry(LogLevel::Status, "saved").field("path", "/tmp/x.pid").log();

        let line = buffer.contents();
        let entry: LogEntry = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(entry.level, LogLevel::Status);
        assert_eq!(entry.message, "saved");
        assert_eq!(entry.fields["path"], "/tmp/x.pid");
    }

    #[test]
    fn test_warne_uses_error_text() {
        let (console, buffer) = captured(LogFormat::Compact);
        console.warne(&AppError::not_found("peer alpha"));
        assert_eq!(buffer.contents(), "Not found: peer alpha\n");
    }
}
