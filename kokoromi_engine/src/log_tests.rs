//! Unit tests for log.rs
//!
//! Tests LogSeverity, LogEntry and the plain DefaultLogger format.

use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
use std::time::SystemTime;

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
fn test_log_severity_labels_have_fixed_width() {
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        assert_eq!(severity.label().len(), 5);
    }
    assert_eq!(LogSeverity::Warn.label(), "WARN ");
}

// ============================================================================
// DEFAULT LOGGER FORMAT
// ============================================================================

fn entry(file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity: LogSeverity::Error,
        timestamp: SystemTime::now(),
        source: "kokoromi::vulkan".to_string(),
        message: "Failed to create swapchain".to_string(),
        file,
        line,
    }
}

#[test]
fn test_format_plain_without_location() {
    let text = DefaultLogger::format_plain(&entry(None, None));
    assert!(text.contains("[ERROR] [kokoromi::vulkan] Failed to create swapchain"));
    assert!(!text.contains("("));
}

#[test]
fn test_format_plain_with_location() {
    let text = DefaultLogger::format_plain(&entry(Some("vulkan_swapchain.rs"), Some(120)));
    assert!(text.ends_with("(vulkan_swapchain.rs:120)"));
}

#[test]
fn test_format_plain_timestamp_shape() {
    let text = DefaultLogger::format_plain(&entry(None, None));
    // [YYYY-MM-DD HH:MM:SS.mmm]
    let closing = text.find(']').unwrap();
    assert_eq!(closing, 24);
}

#[test]
fn test_default_logger_does_not_panic() {
    let logger = DefaultLogger;
    logger.log(&entry(None, None));
    logger.log(&entry(Some("file.rs"), Some(1)));
}
