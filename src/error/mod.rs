//! Error handling for the xkit utilities

use thiserror::Error;

/// Error categories shared by every utility in the toolkit
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors (file operations, sockets, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (versions, durations, JSON, etc.)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Network lookups and HTTP requests
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid arguments or input
    #[error("Validation error: {0}")]
    Validation(String),

    /// A lookup did not find the requested item
    #[error("Not found: {0}")]
    NotFound(String),

    /// A file or resource that must not exist already does
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Interval timer and event dispatch errors
    #[error("Timer error: {0}")]
    Timer(String),

    /// Process lookup and signalling errors
    #[error("Process error: {0}")]
    Process(String),

    /// External editor errors
    #[error("Editor error: {0}")]
    Editor(String),

    /// Certificate generation and signing errors
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a new already-exists error
    pub fn already_exists<S: Into<String>>(message: S) -> Self {
        Self::AlreadyExists(message.into())
    }

    /// Create a new timer error
    pub fn timer<S: Into<String>>(message: S) -> Self {
        Self::Timer(message.into())
    }

    /// Create a new process error
    pub fn process<S: Into<String>>(message: S) -> Self {
        Self::Process(message.into())
    }

    /// Create a new editor error
    pub fn editor<S: Into<String>>(message: S) -> Self {
        Self::Editor(message.into())
    }

    /// Create a new certificate error
    pub fn certificate<S: Into<String>>(message: S) -> Self {
        Self::Certificate(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::Network(_) => "NETWORK",
            Self::Validation(_) => "VALIDATION",
            Self::NotFound(_) => "NOT_FOUND",
            Self::AlreadyExists(_) => "EXISTS",
            Self::Timer(_) => "TIMER",
            Self::Process(_) => "PROCESS",
            Self::Editor(_) => "EDITOR",
            Self::Certificate(_) => "CERT",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Check if error is recoverable (can retry)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timer(_) => true,
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => false,
            Self::NotFound(_) | Self::AlreadyExists(_) | Self::Process(_) => false,
            Self::Io(_) | Self::Editor(_) | Self::Certificate(_) | Self::Internal(_) => false,
        }
    }

    /// Get user-friendly error message with suggestions
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Config(msg) => {
                format!("Configuration problem: {}\n\nSuggestion: Check your .env file, environment variables or command line arguments.", msg)
            }
            Self::Io(msg) => {
                format!("File operation failed: {}\n\nSuggestion: Check file permissions and disk space.", msg)
            }
            Self::Parse(msg) => {
                format!("Failed to parse data: {}\n\nSuggestion: Check the format of your input.", msg)
            }
            Self::Network(msg) => {
                format!("Network issue: {}\n\nSuggestion: Check your network connection and try again.", msg)
            }
            Self::Validation(msg) => {
                format!("Invalid input: {}\n\nSuggestion: Check the values passed on the command line.", msg)
            }
            Self::NotFound(msg) => {
                format!("Nothing found: {}\n\nSuggestion: Check the name or path you are looking up.", msg)
            }
            Self::AlreadyExists(msg) => {
                format!("Refusing to overwrite: {}\n\nSuggestion: Remove the existing file or use the force option.", msg)
            }
            Self::Timer(msg) => {
                format!("Timer failure: {}\n\nSuggestion: A registered callback reported an error.", msg)
            }
            Self::Process(msg) => {
                format!("Process problem: {}\n\nSuggestion: Check that the process is still running.", msg)
            }
            Self::Editor(msg) => {
                format!("Editing failed: {}\n\nSuggestion: Set $EDITOR or pass an editor explicitly.", msg)
            }
            Self::Certificate(msg) => {
                format!("Certificate operation failed: {}\n\nSuggestion: Run `ca init` before issuing certificates.", msg)
            }
            Self::Internal(msg) => {
                format!("Internal error: {}\n\nThis is likely a bug. Please report this issue with the error details.", msg)
            }
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => 1,  // Invalid configuration/usage
            Self::Network(_) => 2,
            Self::NotFound(_) | Self::AlreadyExists(_) => 3,
            Self::Process(_) | Self::Timer(_) => 4,
            Self::Io(_) | Self::Editor(_) => 5,
            Self::Certificate(_) => 6,
            Self::Internal(_) => 99,  // Internal/unexpected errors
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Validation(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Network(_) | Self::Timer(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::NotFound(_) | Self::AlreadyExists(_) | Self::Process(_) => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::Io(_) | Self::Editor(_) | Self::Certificate(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(error.to_string()),
            std::io::ErrorKind::AlreadyExists => Self::already_exists(error.to_string()),
            _ => Self::io(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        Self::network(error.to_string())
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<rcgen::Error> for AppError {
    fn from(error: rcgen::Error) -> Self {
        Self::certificate(error.to_string())
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::num::ParseFloatError> for AppError {
    fn from(error: std::num::ParseFloatError) -> Self {
        Self::parse(format!("Float parse error: {}", error))
    }
}

impl From<std::str::ParseBoolError> for AppError {
    fn from(error: std::str::ParseBoolError) -> Self {
        Self::parse(format!("Boolean parse error: {}", error))
    }
}

impl From<std::net::AddrParseError> for AppError {
    fn from(error: std::net::AddrParseError) -> Self {
        Self::parse(format!("IP address parse error: {}", error))
    }
}

#[cfg(unix)]
impl From<nix::Error> for AppError {
    fn from(error: nix::Error) -> Self {
        Self::process(error.to_string())
    }
}

// Anyhow integration
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

/// Custom Result type for the toolkit
pub type Result<T> = std::result::Result<T, AppError>;

/// Error context trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error, keeping its category
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add static context to an error
    fn context(self, message: &'static str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<AppError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let original = e.into();
            original.prefixed(&f())
        })
    }

    fn context(self, message: &'static str) -> Result<T> {
        self.with_context(|| message.to_string())
    }
}

impl AppError {
    /// Rebuild the error with `prefix: ` prepended to its message
    fn prefixed(self, prefix: &str) -> Self {
        let wrap = |msg: String| format!("{}: {}", prefix, msg);
        match self {
            Self::Config(m) => Self::Config(wrap(m)),
            Self::Io(m) => Self::Io(wrap(m)),
            Self::Parse(m) => Self::Parse(wrap(m)),
            Self::Network(m) => Self::Network(wrap(m)),
            Self::Validation(m) => Self::Validation(wrap(m)),
            Self::NotFound(m) => Self::NotFound(wrap(m)),
            Self::AlreadyExists(m) => Self::AlreadyExists(wrap(m)),
            Self::Timer(m) => Self::Timer(wrap(m)),
            Self::Process(m) => Self::Process(wrap(m)),
            Self::Editor(m) => Self::Editor(wrap(m)),
            Self::Certificate(m) => Self::Certificate(wrap(m)),
            Self::Internal(m) => Self::Internal(wrap(m)),
        }
    }
}

/// Error reporter used by the binaries for user feedback
pub struct ErrorReporter {
    pub use_color: bool,
    pub verbose: bool,
}

impl ErrorReporter {
    /// Create a new error reporter
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    /// Report an error to the user
    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", error.format_for_console(self.use_color));

        if self.verbose {
            eprintln!();
            eprintln!("{}", error.user_friendly_message());

            if error.is_recoverable() {
                eprintln!();
                if self.use_color {
                    use colored::Colorize;
                    eprintln!("{}", "This error might be temporary. You can try running the command again.".green());
                } else {
                    eprintln!("This error might be temporary. You can try running the command again.");
                }
            }
        }
    }

    /// Get formatted error summary
    pub fn format_error_summary(&self, errors: &[AppError]) -> String {
        if errors.is_empty() {
            return "No errors".to_string();
        }

        let mut summary = format!("Found {} error(s):", errors.len());

        // Group errors by category, keeping first-seen order
        let mut groups: Vec<(&'static str, Vec<&AppError>)> = Vec::new();
        for error in errors {
            match groups.iter_mut().find(|(category, _)| *category == error.category()) {
                Some((_, group)) => group.push(error),
                None => groups.push((error.category(), vec![error])),
            }
        }

        for (category, group) in groups {
            summary.push_str(&format!("\n  {}: {} error(s)", category, group.len()));
            if self.verbose {
                for error in group {
                    summary.push_str(&format!("\n    - {}", error));
                }
            }
        }

        summary
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}
