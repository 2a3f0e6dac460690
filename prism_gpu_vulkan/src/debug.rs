/// Vulkan Debug Messenger - Routes validation layer messages into the Prism logger
///
/// With the `vulkan-validation` feature, the messenger callback forwards every
/// message to `Gpu::log` under the `prism::vulkan::validation` source and keeps
/// per-severity counters. Without the feature only the (always zero) counters
/// and the report remain.

use ash::vk;
use colored::*;
use prism_gpu::prism::log::LogSeverity;
use prism_gpu::prism::render::DebugSeverity;
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "vulkan-validation")]
use prism_gpu::prism::{Error, Gpu, Result};
#[cfg(feature = "vulkan-validation")]
use std::ffi::CStr;

/// Log source for validation messages
pub const VALIDATION_LOG_SOURCE: &str = "prism::vulkan::validation";

static VALIDATION_STATS: ValidationStatsTracker = ValidationStatsTracker::new();

/// Validation message counts since the last context creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

const ERRORS: usize = 0;
const WARNINGS: usize = 1;
const INFO: usize = 2;
const VERBOSE: usize = 3;

/// One relaxed counter per bucket, indexed by the constants above
struct ValidationStatsTracker {
    counters: [AtomicU32; 4],
}

impl ValidationStatsTracker {
    const fn new() -> Self {
        Self {
            counters: [
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
            ],
        }
    }

    #[cfg_attr(not(feature = "vulkan-validation"), allow(dead_code))]
    fn record(&self, severity: LogSeverity) {
        let bucket = match severity {
            LogSeverity::Error => ERRORS,
            LogSeverity::Warn => WARNINGS,
            LogSeverity::Info => INFO,
            LogSeverity::Debug | LogSeverity::Trace => VERBOSE,
        };
        self.counters[bucket].fetch_add(1, Ordering::Relaxed);
    }

    fn get(&self) -> ValidationStats {
        let load = |bucket: usize| self.counters[bucket].load(Ordering::Relaxed);
        ValidationStats {
            errors: load(ERRORS),
            warnings: load(WARNINGS),
            info: load(INFO),
            verbose: load(VERBOSE),
        }
    }

    #[cfg_attr(not(feature = "vulkan-validation"), allow(dead_code))]
    fn reset(&self) {
        for counter in &self.counters {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Current validation statistics
pub fn validation_stats() -> ValidationStats {
    VALIDATION_STATS.get()
}

/// Print a colored summary of the validation messages seen so far
pub fn print_validation_stats_report() {
    let stats = validation_stats();

    if stats.total() == 0 {
        println!("\n{}", "Validation: no messages".green().bold());
        return;
    }

    let rows = [
        ("errors", stats.errors, Color::Red),
        ("warnings", stats.warnings, Color::Yellow),
        ("info", stats.info, Color::Cyan),
        ("verbose", stats.verbose, Color::BrightBlack),
    ];

    println!("\n{}", "Validation messages".bright_blue().bold());
    for (label, count, color) in rows.iter().filter(|(_, count, _)| *count > 0) {
        println!("  {:<9} {}", label.color(*color).bold(), count);
    }
    println!("  {:<9} {}", "total".bold(), stats.total());
}

/// Messenger severity mask for a configured verbosity
#[cfg_attr(not(feature = "vulkan-validation"), allow(dead_code))]
pub(crate) fn severity_flags(severity: DebugSeverity) -> vk::DebugUtilsMessageSeverityFlagsEXT {
    match severity {
        DebugSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        DebugSeverity::ErrorsAndWarnings => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        }
        DebugSeverity::All => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        }
    }
}

/// Logger severity for a validation message
#[cfg_attr(not(feature = "vulkan-validation"), allow(dead_code))]
pub(crate) fn log_severity(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> LogSeverity {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        LogSeverity::Error
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        LogSeverity::Warn
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        LogSeverity::Info
    } else {
        LogSeverity::Trace
    }
}

#[cfg_attr(not(feature = "vulkan-validation"), allow(dead_code))]
pub(crate) fn message_type_label(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

/// Vulkan debug messenger callback
#[cfg(feature = "vulkan-validation")]
unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }

    let callback_data = *p_callback_data;
    let message_id_name = if callback_data.p_message_id_name.is_null() {
        "Unknown"
    } else {
        CStr::from_ptr(callback_data.p_message_id_name)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };
    let message = if callback_data.p_message.is_null() {
        "No message"
    } else {
        CStr::from_ptr(callback_data.p_message)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };

    let severity = log_severity(message_severity);
    VALIDATION_STATS.record(severity);

    Gpu::log(
        severity,
        VALIDATION_LOG_SOURCE,
        format!(
            "[{}] {}: {}",
            message_type_label(message_type),
            message_id_name,
            message
        ),
    );

    vk::FALSE // Don't abort Vulkan execution
}

/// Create the debug utils loader and messenger for an instance
#[cfg(feature = "vulkan-validation")]
pub(crate) unsafe fn create_debug_messenger(
    entry: &ash::Entry,
    instance: &ash::Instance,
    severity: DebugSeverity,
) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
    VALIDATION_STATS.reset();

    let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);
    let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(severity_flags(severity))
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback));

    let messenger = debug_utils
        .create_debug_utils_messenger(&debug_info, None)
        .map_err(|e| {
            prism_gpu::gpu_error!("prism::vulkan", "Failed to create debug messenger: {:?}", e);
            Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
        })?;

    Ok((debug_utils, messenger))
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
