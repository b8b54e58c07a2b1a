use ash::vk;
use kokoromi_engine::kokoromi::log::LogSeverity;
use kokoromi_engine::kokoromi::render::DebugSeverity;
use crate::debug::{log_severity, severity_flags, ValidationStats};

#[test]
fn test_severity_flags_widen_with_filter() {
    let errors = severity_flags(DebugSeverity::ErrorsOnly);
    let warnings = severity_flags(DebugSeverity::ErrorsAndWarnings);
    let all = severity_flags(DebugSeverity::All);

    assert_eq!(errors, vk::DebugUtilsMessageSeverityFlagsEXT::ERROR);
    assert!(warnings.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING));
    assert!(!warnings.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO));
    assert!(all.contains(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE));
}

#[test]
fn test_validation_severity_maps_to_log_severity() {
    assert_eq!(log_severity(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR), LogSeverity::Error);
    assert_eq!(log_severity(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING), LogSeverity::Warn);
    assert_eq!(log_severity(vk::DebugUtilsMessageSeverityFlagsEXT::INFO), LogSeverity::Debug);
    assert_eq!(log_severity(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE), LogSeverity::Trace);
}

#[test]
fn test_validation_stats_total() {
    let stats = ValidationStats { errors: 1, warnings: 2, info: 3, verbose: 4 };
    assert_eq!(stats.total(), 10);
    assert_eq!(ValidationStats::default().total(), 0);
}
