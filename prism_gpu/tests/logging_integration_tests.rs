//! Integration tests for the Prism logging facade
//!
//! No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests

use prism_gpu::prism::Gpu;
use prism_gpu::prism::log::{Logger, LogEntry, LogSeverity};
use std::sync::{Arc, Mutex};
use serial_test::serial;

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

#[test]
#[serial]
fn test_integration_custom_logger() {
    let (test_logger, entries) = TestLogger::new();
    Gpu::set_logger(test_logger);

    Gpu::log(LogSeverity::Info, "test::module", "Test info message".to_string());
    Gpu::log(LogSeverity::Warn, "test::module", "Test warning message".to_string());

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0].severity, LogSeverity::Info);
        assert_eq!(captured[0].message, "Test info message");
        assert_eq!(captured[1].severity, LogSeverity::Warn);
        assert_eq!(captured[1].source, "test::module");
    }

    Gpu::reset_logger();
}

#[test]
#[serial]
fn test_integration_error_logging_with_location() {
    let (test_logger, entries) = TestLogger::new();
    Gpu::set_logger(test_logger);

    prism_gpu::gpu_error!("test::module", "Failed with code {}", 42);

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].severity, LogSeverity::Error);
        assert_eq!(captured[0].message, "Failed with code 42");
        assert!(captured[0].file.unwrap().ends_with("logging_integration_tests.rs"));
        assert!(captured[0].line.is_some());
    }

    Gpu::reset_logger();
}

#[test]
#[serial]
fn test_integration_reset_logger_stops_capture() {
    let (test_logger, entries) = TestLogger::new();
    Gpu::set_logger(test_logger);
    Gpu::reset_logger();

    prism_gpu::gpu_info!("test::module", "goes to the default logger");

    assert!(entries.lock().unwrap().is_empty());
}
