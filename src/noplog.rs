//! A no-op logger backed by a null writer
//!
//! Some libraries log internally in ways that interfere with application
//! output. Handing them a [`NopLogger`] silences them.

use crate::console::{LogLevel, Logger};
use std::fmt;
use std::io::{self, Write};

/// `io::Write` implementation that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullWriter;

impl Write for NullWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Claim the whole buffer so write_all terminates
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Logger whose every method does nothing. The fatal variants do not exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopLogger {
    writer: NullWriter,
}

impl NopLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The writer backing this logger
    pub fn writer(&self) -> NullWriter {
        self.writer
    }

    pub fn print(&self, _message: &str) {}

    pub fn printf(&self, _args: fmt::Arguments<'_>) {}

    pub fn println(&self, _message: &str) {}

    pub fn fatal(&self, _message: &str) {}

    pub fn fatalf(&self, _args: fmt::Arguments<'_>) {}

    pub fn fatalln(&self, _message: &str) {}
}

impl Logger for NopLogger {
    fn log(&self, _level: LogLevel, _message: &str) {}

    fn would_log(&self, _level: LogLevel) -> bool {
        false
    }
}
