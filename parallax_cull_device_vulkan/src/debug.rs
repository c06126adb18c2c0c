/// Vulkan debug messenger - handles validation layer messages
///
/// The callback runs on whatever thread the Vulkan driver invokes it
/// from, so everything here is static atomics and direct stderr output.

use ash::vk;
use colored::*;
use std::ffi::CStr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Whether the callback should process messages. Cleared during device
/// destruction so late driver callbacks cannot race teardown.
static CALLBACKS_ENABLED: AtomicBool = AtomicBool::new(false);

static VALIDATION_ERRORS: AtomicU32 = AtomicU32::new(0);
static VALIDATION_WARNINGS: AtomicU32 = AtomicU32::new(0);

/// Validation message counts since the device was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
}

/// Get current validation statistics
///
/// Counts are zero unless the device was created with
/// `enable_validation` and the Khronos validation layer is installed.
pub fn validation_stats() -> ValidationStats {
    ValidationStats {
        errors: VALIDATION_ERRORS.load(Ordering::Relaxed),
        warnings: VALIDATION_WARNINGS.load(Ordering::Relaxed),
    }
}

/// Arm the callback and reset statistics. Called during device init.
pub(crate) fn enable_callbacks() {
    VALIDATION_ERRORS.store(0, Ordering::Relaxed);
    VALIDATION_WARNINGS.store(0, Ordering::Relaxed);
    CALLBACKS_ENABLED.store(true, Ordering::Relaxed);
}

/// Silence the callback. Called before the messenger is destroyed.
pub(crate) fn disable_callbacks() {
    CALLBACKS_ENABLED.store(false, Ordering::Relaxed);
}

/// Vulkan debug messenger callback
///
/// Called by the validation layers when they detect issues. Formats the
/// message with colors on stderr and tracks error/warning counts.
pub(crate) unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if !CALLBACKS_ENABLED.load(Ordering::Relaxed) {
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

    let severity_colored = if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        VALIDATION_ERRORS.fetch_add(1, Ordering::Relaxed);
        "ERROR".red().bold()
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        VALIDATION_WARNINGS.fetch_add(1, Ordering::Relaxed);
        "WARNING".yellow().bold()
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        "INFO".cyan()
    } else {
        "VERBOSE".bright_black()
    };

    let type_str = if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    };

    eprint!(
        "{} {} [{}]\n  ├─ {}: {}\n  └─ {}\n",
        "[VULKAN".bright_blue().bold(),
        format!("{}]", severity_colored).bright_blue().bold(),
        type_str.bright_black(),
        "Message ID".bright_black(),
        message_id_name.white(),
        message.white()
    );

    vk::FALSE // Don't abort Vulkan execution
}
