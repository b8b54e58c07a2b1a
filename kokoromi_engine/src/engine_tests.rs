//! Unit tests for engine.rs
//!
//! Tests logger replacement, severity filtering and the error helper macros.
//! Every test touches the global logger, hence #[serial].

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::log::{Logger, LogEntry, LogSeverity};
use serial_test::serial;
use std::sync::{Arc, Mutex};

/// Logger that keeps every entry in memory
///
/// Other tests may log concurrently, so only entries from `SOURCE` are kept.
#[derive(Clone, Default)]
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        if entry.source == SOURCE {
            self.entries.lock().unwrap().push(entry.clone());
        }
    }
}

const SOURCE: &str = "kokoromi::EngineTest";

fn install_capture(min: LogSeverity) -> CaptureLogger {
    let capture = CaptureLogger::default();
    Engine::set_logger(capture.clone());
    Engine::set_min_severity(min);
    capture
}

fn restore() {
    Engine::reset_logger();
    Engine::set_min_severity(LogSeverity::Info);
}

// ============================================================================
// LOGGER REGISTRY
// ============================================================================

#[test]
#[serial]
fn test_custom_logger_receives_entries() {
    let capture = install_capture(LogSeverity::Trace);

    crate::engine_info!(SOURCE, "hello {}", 42);

    let entries = capture.entries.lock().unwrap().clone();
    restore();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, LogSeverity::Info);
    assert_eq!(entries[0].source, "kokoromi::EngineTest");
    assert_eq!(entries[0].message, "hello 42");
    assert!(entries[0].file.is_none());
}

#[test]
#[serial]
fn test_min_severity_filters_lower_levels() {
    let capture = install_capture(LogSeverity::Warn);

    crate::engine_trace!(SOURCE, "trace");
    crate::engine_debug!(SOURCE, "debug");
    crate::engine_info!(SOURCE, "info");
    crate::engine_warn!(SOURCE, "warn");

    let entries = capture.entries.lock().unwrap().clone();
    restore();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, "warn");
}

#[test]
#[serial]
fn test_error_macro_records_file_and_line() {
    let capture = install_capture(LogSeverity::Trace);

    crate::engine_error!(SOURCE, "failed: {}", "device lost");

    let entries = capture.entries.lock().unwrap().clone();
    restore();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, LogSeverity::Error);
    assert!(entries[0].file.unwrap().ends_with("engine_tests.rs"));
    assert!(entries[0].line.unwrap() > 0);
}

#[test]
#[serial]
fn test_min_severity_roundtrip() {
    Engine::set_min_severity(LogSeverity::Debug);
    assert_eq!(Engine::min_severity(), LogSeverity::Debug);
    Engine::set_min_severity(LogSeverity::Error);
    assert_eq!(Engine::min_severity(), LogSeverity::Error);
    restore();
    assert_eq!(Engine::min_severity(), LogSeverity::Info);
}

// ============================================================================
// ERROR HELPER MACROS
// ============================================================================

fn bail_if_odd(value: u32) -> Result<u32> {
    if value % 2 == 1 {
        crate::engine_bail!(SOURCE, "odd value {}", value);
    }
    Ok(value / 2)
}

fn bail_init() -> Result<()> {
    crate::engine_bail_init!(SOURCE, "no device");
}

#[test]
#[serial]
fn test_engine_err_logs_and_builds_backend_error() {
    let capture = install_capture(LogSeverity::Trace);

    let err = crate::engine_err!(SOURCE, "code {}", 7);

    let entries = capture.entries.lock().unwrap().clone();
    restore();

    assert_eq!(err, Error::BackendError("code 7".to_string()));
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, "code 7");
}

#[test]
#[serial]
fn test_engine_bail_returns_early() {
    let _capture = install_capture(LogSeverity::Error);

    assert_eq!(bail_if_odd(4), Ok(2));
    assert_eq!(bail_if_odd(3), Err(Error::BackendError("odd value 3".to_string())));

    restore();
}

#[test]
#[serial]
fn test_engine_bail_init_returns_initialization_failed() {
    let _capture = install_capture(LogSeverity::Error);

    assert_eq!(bail_init(), Err(Error::InitializationFailed("no device".to_string())));

    restore();
}
