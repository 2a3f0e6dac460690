//! Unit tests for validation message routing helpers

use super::*;
use ash::vk;
use prism_gpu::prism::log::LogSeverity;
use prism_gpu::prism::render::DebugSeverity;

#[test]
fn test_severity_flags_errors_only() {
    assert_eq!(
        severity_flags(DebugSeverity::ErrorsOnly),
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
    );
}

#[test]
fn test_severity_flags_widen_with_verbosity() {
    let warnings = severity_flags(DebugSeverity::ErrorsAndWarnings);
    assert!(warnings.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING));
    assert!(!warnings.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO));

    let all = severity_flags(DebugSeverity::All);
    assert!(all.contains(warnings));
    assert!(all.contains(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE));
}

#[test]
fn test_log_severity_mapping() {
    assert_eq!(log_severity(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR), LogSeverity::Error);
    assert_eq!(log_severity(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING), LogSeverity::Warn);
    assert_eq!(log_severity(vk::DebugUtilsMessageSeverityFlagsEXT::INFO), LogSeverity::Info);
    assert_eq!(log_severity(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE), LogSeverity::Trace);
}

#[test]
fn test_message_type_label() {
    assert_eq!(message_type_label(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION), "Validation");
    assert_eq!(message_type_label(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE), "Performance");
    assert_eq!(message_type_label(vk::DebugUtilsMessageTypeFlagsEXT::GENERAL), "General");
}

#[test]
fn test_stats_total() {
    let stats = ValidationStats {
        errors: 1,
        warnings: 2,
        info: 3,
        verbose: 4,
    };
    assert_eq!(stats.total(), 10);
    assert_eq!(ValidationStats::default().total(), 0);
}

#[test]
fn test_stats_tracker_counts_by_severity() {
    let tracker = ValidationStatsTracker::new();
    tracker.record(LogSeverity::Error);
    tracker.record(LogSeverity::Warn);
    tracker.record(LogSeverity::Warn);
    tracker.record(LogSeverity::Trace);

    let stats = tracker.get();
    assert_eq!((stats.errors, stats.warnings, stats.info, stats.verbose), (1, 2, 0, 1));

    tracker.reset();
    assert_eq!(tracker.get().total(), 0);
}
