//! Logging system for the Neon engine
//!
//! This module provides a flexible logging system with:
//! - Customizable logger via Logger trait
//! - Severity levels (Trace, Debug, Info, Warn, Error)
//! - Colored console output by default
//! - An explicitly constructed `Diagnostics` context handed to every subsystem
//! - File and line information for detailed ERROR logs

use colored::*;
use std::sync::Arc;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Logger trait for custom logging implementations
///
/// Implement this trait to create custom loggers (file logging, network logging, etc.)
///
/// # Example
///
/// ```no_run
/// use neon_engine::neon::log::{Logger, LogEntry};
///
/// struct FileLogger {
///     file: std::fs::File,
/// }
///
/// impl Logger for FileLogger {
///     fn log(&self, entry: &LogEntry) {
///         // Write to file...
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Log an entry
    ///
    /// # Arguments
    ///
    /// * `entry` - The log entry to process
    fn log(&self, entry: &LogEntry);
}

/// Log entry containing all information about a log message
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Severity level (Trace, Debug, Info, Warn, Error)
    pub severity: LogSeverity,

    /// Timestamp when the log was created
    pub timestamp: SystemTime,

    /// Source module (e.g., "neon::shader", "neon::vulkan")
    pub source: String,

    /// Log message
    pub message: String,

    /// Source file (only for detailed ERROR logs)
    pub file: Option<&'static str>,

    /// Source line (only for detailed ERROR logs)
    pub line: Option<u32>,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    /// Very verbose debug information (typically disabled in release)
    Trace,

    /// Development/debugging information
    Debug,

    /// Important informational messages
    Info,

    /// Warning messages (potential issues)
    Warn,

    /// Error messages (critical issues with file:line details)
    Error,
}

/// Default logger implementation using colored console output
///
/// Colors:
/// - Trace: bright_black
/// - Debug: cyan
/// - Info: green
/// - Warn: yellow
/// - Error: red + bold
///
/// Format:
/// - Normal: `[timestamp] [SEVERITY] [source] message`
/// - Error: `[timestamp] [ERROR] [source] message (file:line)`
pub struct DefaultLogger;

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        // Format timestamp as YYYY-MM-DD HH:MM:SS.mmm
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        let severity_str = match entry.severity {
            LogSeverity::Trace => "TRACE".bright_black(),
            LogSeverity::Debug => "DEBUG".cyan(),
            LogSeverity::Info => "INFO ".green(),
            LogSeverity::Warn => "WARN ".yellow(),
            LogSeverity::Error => "ERROR".red().bold(),
        };

        let source = entry.source.bright_blue();

        if let (Some(file), Some(line)) = (entry.file, entry.line) {
            println!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp,
                severity_str,
                source,
                entry.message,
                file,
                line
            );
        } else {
            println!(
                "[{}] [{}] [{}] {}",
                timestamp,
                severity_str,
                source,
                entry.message
            );
        }
    }
}

// ===== DIAGNOSTICS CONTEXT =====

/// Logging context passed explicitly to every engine subsystem
///
/// Cloning is cheap (shared logger). Entries below `min_severity` are
/// dropped before reaching the logger.
#[derive(Clone)]
pub struct Diagnostics {
    logger: Arc<dyn Logger>,
    min_severity: LogSeverity,
}

impl Diagnostics {
    /// Create a context around a custom logger, forwarding every severity
    pub fn new<L: Logger + 'static>(logger: L) -> Self {
        Self::from_shared(Arc::new(logger))
    }

    /// Create a context around an already shared logger
    pub fn from_shared(logger: Arc<dyn Logger>) -> Self {
        Self {
            logger,
            min_severity: LogSeverity::Trace,
        }
    }

    /// Return a copy of this context that drops entries below `severity`
    pub fn with_min_severity(mut self, severity: LogSeverity) -> Self {
        self.min_severity = severity;
        self
    }

    /// Current severity threshold
    pub fn min_severity(&self) -> LogSeverity {
        self.min_severity
    }

    /// Whether an entry of `severity` would reach the logger
    pub fn enabled(&self, severity: LogSeverity) -> bool {
        severity >= self.min_severity
    }

    /// Log a message without source location
    ///
    /// Used by the engine_trace!/debug!/info!/warn! macros.
    pub fn log(&self, severity: LogSeverity, source: &str, message: String) {
        if !self.enabled(severity) {
            return;
        }
        self.logger.log(&LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: None,
            line: None,
        });
    }

    /// Log a message with file:line information (for ERROR logs)
    ///
    /// Used by engine_error! and engine_err! to include source location.
    pub fn log_detailed(
        &self,
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if !self.enabled(severity) {
            return;
        }
        self.logger.log(&LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: Some(file),
            line: Some(line),
        });
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(DefaultLogger)
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("min_severity", &self.min_severity)
            .finish()
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message (very verbose, typically disabled)
///
/// # Example
///
/// ```no_run
/// # use neon_engine::{engine_trace, neon::log::Diagnostics};
/// # let diag = Diagnostics::default();
/// engine_trace!(diag, "neon::shader", "Entering function foo()");
/// ```
#[macro_export]
macro_rules! engine_trace {
    ($diag:expr, $source:expr, $($arg:tt)*) => {
        $diag.log(
            $crate::neon::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a DEBUG message (development information)
#[macro_export]
macro_rules! engine_debug {
    ($diag:expr, $source:expr, $($arg:tt)*) => {
        $diag.log(
            $crate::neon::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an INFO message (important events)
///
/// # Example
///
/// ```no_run
/// # use neon_engine::{engine_info, neon::log::Diagnostics};
/// # let diag = Diagnostics::default();
/// engine_info!(diag, "neon::renderer", "Renderer initialized successfully");
/// ```
#[macro_export]
macro_rules! engine_info {
    ($diag:expr, $source:expr, $($arg:tt)*) => {
        $diag.log(
            $crate::neon::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a WARN message (potential issues)
#[macro_export]
macro_rules! engine_warn {
    ($diag:expr, $source:expr, $($arg:tt)*) => {
        $diag.log(
            $crate::neon::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
#[macro_export]
macro_rules! engine_error {
    ($diag:expr, $source:expr, $($arg:tt)*) => {
        $diag.log_detailed(
            $crate::neon::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Log an ERROR message and evaluate to `Error::BackendError` with the same text
///
/// # Example
///
/// ```no_run
/// # use neon_engine::{engine_err, neon::log::Diagnostics};
/// # let diag = Diagnostics::default();
/// let err = engine_err!(diag, "neon::vulkan", "Failed to create buffer: {}", 42);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($diag:expr, $source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $diag.log_detailed(
            $crate::neon::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::neon::Error::BackendError(message)
    }};
}

/// Log an ERROR message and return `Err(Error::BackendError)` from the enclosing function
#[macro_export]
macro_rules! engine_bail {
    ($diag:expr, $source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($diag, $source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
