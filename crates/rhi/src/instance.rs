//! Vulkan instance management.
//!
//! [`Instance`] owns the loader entry, the `VkInstance` and, when diagnostics
//! are enabled, a debug-utils messenger that forwards validation messages
//! into `tracing`.
//!
//! The window-system surface extensions are not hard-coded here; the caller
//! passes whatever the windowing layer reports as required.
//!
//! # Example
//!
//! ```no_run
//! use vkframe_rhi::instance::Instance;
//!
//! # fn example(surface_extensions: &[*const std::ffi::c_char]) -> Result<(), vkframe_rhi::RhiError> {
//! let instance = Instance::new(c"my-app", cfg!(debug_assertions), surface_extensions)?;
//! if !instance.has_validation() {
//!     println!("running without validation");
//! }
//! # Ok(())
//! # }
//! ```

use std::ffi::{CStr, c_char};

use ash::{Entry, vk};
use tracing::{debug, error, info, trace, warn};

use crate::error::{RhiError, RhiResult};

/// The Khronos validation layer name.
const VALIDATION_LAYER_NAME: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Vulkan instance with optional validation diagnostics.
pub struct Instance {
    entry: Entry,
    instance: ash::Instance,
    debug_utils: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl Instance {
    /// Creates a new Vulkan instance.
    ///
    /// # Arguments
    ///
    /// * `app_name` - Application name reported to the driver
    /// * `enable_validation` - Request the Khronos validation layer. A missing
    ///   layer is not an error; the instance is created without it.
    /// * `surface_extensions` - Instance extensions the window system needs
    ///   to create a presentation surface
    ///
    /// # Errors
    ///
    /// Returns an error if the Vulkan library cannot be loaded or instance
    /// creation fails.
    pub fn new(
        app_name: &CStr,
        enable_validation: bool,
        surface_extensions: &[*const c_char],
    ) -> RhiResult<Self> {
        let entry = unsafe { Entry::load()? };

        let validation_available =
            enable_validation && Self::is_validation_layer_available(&entry)?;
        if enable_validation && !validation_available {
            warn!("Validation layer requested but not available, proceeding without it");
        }

        let app_info = vk::ApplicationInfo::default()
            .application_name(app_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(c"vkframe")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_0);

        let extensions = Self::instance_extensions(surface_extensions, validation_available);

        let layers = if validation_available {
            vec![VALIDATION_LAYER_NAME.as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers);

        let instance = unsafe { entry.create_instance(&create_info, None)? };

        info!(
            "Vulkan instance created ({} extensions, validation {})",
            extensions.len(),
            if validation_available { "on" } else { "off" }
        );

        let (debug_utils, debug_messenger) = if validation_available {
            let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
            match Self::setup_debug_messenger(&debug_utils) {
                Ok(messenger) => {
                    debug!("Debug messenger created");
                    (Some(debug_utils), Some(messenger))
                }
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            (None, None)
        };

        Ok(Self {
            entry,
            instance,
            debug_utils,
            debug_messenger,
        })
    }

    /// Returns the ash instance.
    #[inline]
    pub fn handle(&self) -> &ash::Instance {
        &self.instance
    }

    /// Returns the loader entry.
    #[inline]
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Whether the validation messenger is active.
    #[inline]
    pub fn has_validation(&self) -> bool {
        self.debug_messenger.is_some()
    }

    fn instance_extensions(
        surface_extensions: &[*const c_char],
        with_debug_utils: bool,
    ) -> Vec<*const c_char> {
        let mut extensions = surface_extensions.to_vec();
        if with_debug_utils {
            extensions.push(ash::ext::debug_utils::NAME.as_ptr());
        }
        extensions
    }

    fn is_validation_layer_available(entry: &Entry) -> RhiResult<bool> {
        let available_layers = unsafe { entry.enumerate_instance_layer_properties()? };

        let found = available_layers.iter().any(|layer| {
            layer
                .layer_name_as_c_str()
                .is_ok_and(|name| name == VALIDATION_LAYER_NAME)
        });

        Ok(found)
    }

    fn setup_debug_messenger(
        debug_utils: &ash::ext::debug_utils::Instance,
    ) -> Result<vk::DebugUtilsMessengerEXT, RhiError> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None)? };

        Ok(messenger)
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            // Messenger before instance
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils, self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        info!("Vulkan instance destroyed");
    }
}

unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }

    let callback_data = unsafe { &*p_callback_data };
    let message = if callback_data.p_message.is_null() {
        std::borrow::Cow::Borrowed("(no message)")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message).to_string_lossy() }
    };

    let kind = message_kind(message_type);

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => error!("[Vulkan {}] {}", kind, message),
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => warn!("[Vulkan {}] {}", kind, message),
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => debug!("[Vulkan {}] {}", kind, message),
        _ => trace!("[Vulkan {}] {}", kind, message),
    }

    vk::FALSE
}

fn message_kind(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::GENERAL) {
        "General"
    } else {
        "Unknown"
    }
}
