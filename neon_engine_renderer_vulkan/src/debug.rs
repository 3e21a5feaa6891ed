/// Vulkan Debug Messenger - routes validation layer messages into Diagnostics
///
/// Only compiled with the `vulkan-validation` feature. The callback receives
/// a pointer to a boxed `ValidationSink` as user data; the box outlives the
/// messenger because `DebugMessenger` owns both and destroys the messenger
/// first.

use ash::vk;
use neon_engine::neon::log::{Diagnostics, LogSeverity};
use neon_engine::neon::{Error, Result};
use std::ffi::{c_void, CStr};
use std::sync::atomic::{AtomicU32, Ordering};

const LOG_SOURCE: &str = "neon::vulkan::validation";

/// Error and warning counts reported by the validation layers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
}

struct ValidationSink {
    diagnostics: Diagnostics,
    errors: AtomicU32,
    warnings: AtomicU32,
}

impl ValidationSink {
    fn record(&self, severity: vk::DebugUtilsMessageSeverityFlagsEXT, kind: &str, id: &str, message: &str) {
        let severity = if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            self.errors.fetch_add(1, Ordering::Relaxed);
            LogSeverity::Error
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            self.warnings.fetch_add(1, Ordering::Relaxed);
            LogSeverity::Warn
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            LogSeverity::Debug
        } else {
            LogSeverity::Trace
        };

        self.diagnostics
            .log(severity, LOG_SOURCE, format!("[{}] {}: {}", kind, id, message));
    }

    fn stats(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
        }
    }
}

/// Debug messenger together with the sink its callback writes to
pub(crate) struct DebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
    sink: Box<ValidationSink>,
}

impl DebugMessenger {
    pub(crate) fn new(entry: &ash::Entry, instance: &ash::Instance, diagnostics: Diagnostics) -> Result<Self> {
        let loader = ash::ext::debug_utils::Instance::new(entry, instance);
        let sink = Box::new(ValidationSink {
            diagnostics,
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
        });

        let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                    | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(vulkan_debug_callback))
            .user_data(&*sink as *const ValidationSink as *mut c_void);

        let messenger = unsafe { loader.create_debug_utils_messenger(&debug_info, None) }
            .map_err(|e| Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e)))?;

        Ok(Self { loader, messenger, sink })
    }

    pub(crate) fn stats(&self) -> ValidationStats {
        self.sink.stats()
    }

    /// Destroy the messenger; must run before the instance is destroyed
    pub(crate) unsafe fn destroy(self) {
        self.loader.destroy_debug_utils_messenger(self.messenger, None);
    }
}

unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    user_data: *mut c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || user_data.is_null() {
        return vk::FALSE;
    }
    let callback_data = *p_callback_data;
    let sink = &*(user_data as *const ValidationSink);

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

    let kind = if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    };

    sink.record(message_severity, kind, message_id_name, message);

    vk::FALSE
}
