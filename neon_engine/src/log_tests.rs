//! Unit tests for log.rs
//!
//! Tests Logger trait, LogEntry, LogSeverity, DefaultLogger and Diagnostics.

use crate::error::Error;
use crate::log::{DefaultLogger, Diagnostics, LogEntry, LogSeverity, Logger};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Logger that captures entries for verification
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

fn capture() -> (Diagnostics, Arc<Mutex<Vec<LogEntry>>>) {
    let entries = Arc::new(Mutex::new(Vec::new()));
    let diag = Diagnostics::new(CaptureLogger { entries: entries.clone() });
    (diag, entries)
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_debug() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Error), "Error");
}

// ============================================================================
// LOG ENTRY TESTS
// ============================================================================

#[test]
fn test_log_entry_creation_with_file_line() {
    let entry = LogEntry {
        severity: LogSeverity::Error,
        timestamp: SystemTime::now(),
        source: "neon::vulkan".to_string(),
        message: "Vulkan error".to_string(),
        file: Some("vulkan.rs"),
        line: Some(42),
    };

    assert_eq!(entry.severity, LogSeverity::Error);
    assert_eq!(entry.source, "neon::vulkan");
    assert_eq!(entry.file, Some("vulkan.rs"));
    assert_eq!(entry.line, Some(42));
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_all_severities() {
    let logger = DefaultLogger;
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        logger.log(&LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: "test".to_string(),
            message: "message".to_string(),
            file: None,
            line: None,
        });
    }
}

#[test]
fn test_default_logger_error_with_file_line() {
    DefaultLogger.log(&LogEntry {
        severity: LogSeverity::Error,
        timestamp: SystemTime::now(),
        source: "neon::vulkan".to_string(),
        message: "Critical Vulkan error".to_string(),
        file: Some("vulkan.rs"),
        line: Some(123),
    });
}

// ============================================================================
// DIAGNOSTICS TESTS
// ============================================================================

#[test]
fn test_diagnostics_forwards_entries() {
    let (diag, entries) = capture();

    crate::engine_info!(diag, "neon::test", "loaded {} shaders", 3);
    crate::engine_warn!(diag, "neon::test", "slow path");

    let entries = entries.lock().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].severity, LogSeverity::Info);
    assert_eq!(entries[0].source, "neon::test");
    assert_eq!(entries[0].message, "loaded 3 shaders");
    assert!(entries[0].file.is_none());
    assert_eq!(entries[1].severity, LogSeverity::Warn);
}

#[test]
fn test_diagnostics_min_severity_filters() {
    let (diag, entries) = capture();
    let diag = diag.with_min_severity(LogSeverity::Warn);

    crate::engine_trace!(diag, "neon::test", "dropped");
    crate::engine_debug!(diag, "neon::test", "dropped");
    crate::engine_info!(diag, "neon::test", "dropped");
    crate::engine_warn!(diag, "neon::test", "kept");

    let entries = entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, "kept");
    assert!(!diag.enabled(LogSeverity::Info));
    assert!(diag.enabled(LogSeverity::Error));
}

#[test]
fn test_diagnostics_clones_share_logger() {
    let (diag, entries) = capture();
    let other = diag.clone();

    crate::engine_info!(diag, "a", "one");
    crate::engine_info!(other, "b", "two");

    assert_eq!(entries.lock().unwrap().len(), 2);
}

#[test]
fn test_engine_error_records_location() {
    let (diag, entries) = capture();

    crate::engine_error!(diag, "neon::test", "boom");

    let entries = entries.lock().unwrap();
    assert_eq!(entries[0].severity, LogSeverity::Error);
    assert!(entries[0].file.unwrap().ends_with("log_tests.rs"));
    assert!(entries[0].line.is_some());
}

#[test]
fn test_engine_err_logs_and_builds_backend_error() {
    let (diag, entries) = capture();

    let err = crate::engine_err!(diag, "neon::test", "device lost ({})", 7);

    match err {
        Error::BackendError(msg) => assert_eq!(msg, "device lost (7)"),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(entries.lock().unwrap()[0].message, "device lost (7)");
}

#[test]
fn test_engine_bail_returns_early() {
    fn fails(diag: &Diagnostics) -> crate::error::Result<u32> {
        crate::engine_bail!(diag, "neon::test", "bail out");
    }

    let (diag, entries) = capture();
    assert!(fails(&diag).is_err());
    assert_eq!(entries.lock().unwrap().len(), 1);
}
