use log::*;
use std::collections::HashSet;
use std::ffi::CStr;
use std::os::raw::c_void;
use vulkanalia::prelude::v1_0::*;
use vulkanalia::vk;
use vulkanalia::vk::ExtDebugUtilsExtension;
use vulkanalia::vk::KhrSurfaceExtension;
use vulkanalia::Entry;
use vulkanalia::Instance;

use super::constants;
use crate::error::{ErrorKind, RenderError, Result, VkResultExt};
use crate::window::AppWindow;

/// The Vulkan instance together with the window surface it presents to.
#[derive(Debug)]
pub struct VulkanInstance {
    pub vk_instance: Instance,
    pub surface: vk::SurfaceKHR,
    messenger: vk::DebugUtilsMessengerEXT,
    validation: bool,
}

impl VulkanInstance {
    pub unsafe fn new(window: &AppWindow, entry: &Entry, validation: bool) -> Result<VulkanInstance> {
        // Application Info
        let application_info = vk::ApplicationInfo::builder()
            .application_name(constants::APPLICATION_NAME)
            .application_version(vk::make_version(1, 0, 0))
            .engine_name(constants::ENGINE_NAME)
            .engine_version(vk::make_version(1, 0, 0))
            .api_version(vk::make_version(1, 0, 0));

        // Layers
        let available_layers = entry
            .enumerate_instance_layer_properties()
            .or_fail(ErrorKind::Environment, "enumerate instance layers")?
            .iter()
            .map(|l| l.layer_name)
            .collect::<HashSet<_>>();

        if validation && !available_layers.contains(&constants::VALIDATION_LAYER) {
            return Err(RenderError::new(
                ErrorKind::Environment,
                "enable validation",
                "validation layer requested but not supported",
            ));
        }

        let layers = if validation {
            vec![constants::VALIDATION_LAYER.as_ptr()]
        } else {
            Vec::new()
        };

        // Extensions
        let mut extensions = window
            .required_extensions()?
            .iter()
            .map(|e| e.as_ptr())
            .collect::<Vec<_>>();

        // Required by Vulkan SDK on macOS since 1.3.216.
        let version = entry
            .version()
            .or_fail(ErrorKind::Environment, "query instance version")?;
        let flags = if cfg!(target_os = "macos") && version >= constants::PORTABILITY_MACOS_VERSION {
            info!("Enabling extensions for macOS portability.");
            extensions.push(
                vk::KHR_GET_PHYSICAL_DEVICE_PROPERTIES2_EXTENSION
                    .name
                    .as_ptr(),
            );
            extensions.push(vk::KHR_PORTABILITY_ENUMERATION_EXTENSION.name.as_ptr());
            vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
        } else {
            vk::InstanceCreateFlags::empty()
        };

        if validation {
            extensions.push(vk::EXT_DEBUG_UTILS_EXTENSION.name.as_ptr());
        }

        // Create
        let mut info = vk::InstanceCreateInfo::builder()
            .application_info(&application_info)
            .enabled_layer_names(&layers)
            .enabled_extension_names(&extensions)
            .flags(flags);

        let mut debug_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(vk::DebugUtilsMessageSeverityFlagsEXT::all())
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .user_callback(Some(debug_callback));

        if validation {
            info = info.push_next(&mut debug_info);
        }

        let instance = entry
            .create_instance(&info, None)
            .or_fail(ErrorKind::Environment, "create instance")?;

        // Messenger
        let messenger = if validation {
            match instance.create_debug_utils_messenger_ext(&debug_info, None) {
                Ok(messenger) => messenger,
                Err(code) => {
                    instance.destroy_instance(None);
                    return Err(RenderError::vulkan(
                        ErrorKind::Resource,
                        "create debug messenger",
                        vk::Result::from_raw(code.as_raw()),
                    ));
                }
            }
        } else {
            vk::DebugUtilsMessengerEXT::null()
        };

        let mut vk_instance = VulkanInstance {
            vk_instance: instance,
            surface: vk::SurfaceKHR::null(),
            messenger,
            validation,
        };

        // Surface
        match window.create_surface(&vk_instance.vk_instance) {
            Ok(surface) => vk_instance.surface = surface,
            Err(err) => {
                vk_instance.destroy();
                return Err(err);
            }
        }

        info!("Created instance and window surface.");
        Ok(vk_instance)
    }

    pub unsafe fn destroy(&mut self) {
        if !self.surface.is_null() {
            self.vk_instance.destroy_surface_khr(self.surface, None);
        }
        if self.validation {
            self.vk_instance
                .destroy_debug_utils_messenger_ext(self.messenger, None);
        }
        self.vk_instance.destroy_instance(None);
    }
}

extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    type_: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _: *mut c_void,
) -> vk::Bool32 {
    let data = unsafe { *data };
    let message = unsafe { CStr::from_ptr(data.message) }.to_string_lossy();

    if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR {
        error!("({:?}) {}", type_, message);
    } else if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::WARNING {
        warn!("({:?}) {}", type_, message);
    } else if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::INFO {
        debug!("({:?}) {}", type_, message);
    } else {
        trace!("({:?}) {}", type_, message);
    }

    vk::FALSE
}
