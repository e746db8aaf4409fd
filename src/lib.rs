//! xkit
//!
//! A personal toolkit of small, independent utilities. Each module stands on
//! its own: leveled console logging, online statistics and benchmarks,
//! cancellable interval timers, PID files, a JSON peer registry, Lamport
//! scalar versions, bandit strategies, a file editor wrapper and a toy
//! certificate authority.

pub mod bandit;
pub mod ca;
pub mod cfrv;
pub mod cli;
pub mod clock;
pub mod config;
pub mod console;
pub mod editor;
pub mod error;
pub mod events;
pub mod interval;
pub mod lock;
pub mod net;
pub mod noplog;
pub mod peers;
pub mod pid;
pub mod stats;
pub mod unique;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use console::{LogFormat, LogLevel, Logger};
pub use error::{AppError, Result};
pub use events::{Dispatcher, Event, EventType};
pub use interval::{FixedInterval, Interval, RandomInterval};
pub use stats::{Benchmark, Statistics};

/// Serializes tests that read or modify process environment variables
#[cfg(test)]
pub(crate) static ENV_LOCK: parking_lot::Mutex<()> = parking_lot::const_mutex(());

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Version with build details, shown by `--version` on every binary
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT"),
    ", built ",
    env!("BUILD_TIME"),
    " for ",
    env!("TARGET_TRIPLE"),
    ")"
);

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    /// Port used by `net::resolve_addr` when none is given
    pub const DEFAULT_PORT: u16 = 3264;
    pub const DEFAULT_LOG_LEVEL: &str = "info";
    pub const DEFAULT_ENABLE_COLOR: bool = true;
    pub const DEFAULT_CERT_DIRECTORY: &str = "fixtures/certs";
    pub const DEFAULT_TIMEZONE: &str = "Local";
    pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
    pub const PUBLIC_IP_URL: &str = "http://ipv4.myexternalip.com/json";
    pub const DEFAULT_EDITORS: &[&str] = &["vim", "emacs", "nano"];
    /// Capacity of the channel feeding the statistics workers
    pub const WORKER_CHANNEL_CAPACITY: usize = 1024;
}
