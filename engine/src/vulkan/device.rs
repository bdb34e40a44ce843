use log::*;
use std::collections::HashSet;
use vulkanalia::{
    vk::{self, DeviceV1_0, HasBuilder, InstanceV1_0},
    Device, Entry,
};

use super::{constants, instance::VulkanInstance};
use crate::error::{ErrorKind, RenderError, Result, VkResultExt};
use crate::window::AppWindow;

/// One GPU, its logical device, and the single queue used for both drawing
/// and presentation.
#[derive(Debug)]
pub struct DeviceContext {
    pub physical_device: vk::PhysicalDevice,
    pub vk_device: Device,
    pub queue_family: u32,
    pub queue: vk::Queue,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
}

impl DeviceContext {
    pub unsafe fn new(
        entry: &Entry,
        instance: &VulkanInstance,
        window: &AppWindow,
        validation: bool,
    ) -> Result<DeviceContext> {
        let physical_device = pick_physical_device(instance)?;

        let families = instance
            .vk_instance
            .get_physical_device_queue_family_properties(physical_device);
        let queue_family = select_queue_family(&families).ok_or_else(|| {
            RenderError::new(
                ErrorKind::Environment,
                "select queue family",
                "no queue family with graphics support",
            )
        })?;

        if !window.presentation_support(
            &instance.vk_instance,
            physical_device,
            queue_family,
            instance.surface,
        )? {
            return Err(RenderError::new(
                ErrorKind::Environment,
                "select queue family",
                format!("queue family {} cannot present to the window surface", queue_family),
            ));
        }

        check_device_extensions(instance, physical_device)?;

        let queue_priorities = &[1.0];
        let queue_info = vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(queue_family)
            .queue_priorities(queue_priorities);

        let layers = if validation {
            vec![constants::VALIDATION_LAYER.as_ptr()]
        } else {
            vec![]
        };

        let mut extensions = vec![vk::KHR_SWAPCHAIN_EXTENSION.name.as_ptr()];

        // Required by Vulkan SDK on macOS since 1.3.216.
        let version = entry
            .version()
            .or_fail(ErrorKind::Environment, "query instance version")?;
        if cfg!(target_os = "macos") && version >= constants::PORTABILITY_MACOS_VERSION {
            extensions.push(vk::KHR_PORTABILITY_SUBSET_EXTENSION.name.as_ptr());
        }

        let features = vk::PhysicalDeviceFeatures::builder();

        let queue_infos = &[queue_info];
        let info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(queue_infos)
            .enabled_layer_names(&layers)
            .enabled_extension_names(&extensions)
            .enabled_features(&features);

        let device = instance
            .vk_instance
            .create_device(physical_device, &info, None)
            .or_fail(ErrorKind::Resource, "create device")?;

        let queue = device.get_device_queue(queue_family, 0);
        let memory_properties = instance
            .vk_instance
            .get_physical_device_memory_properties(physical_device);

        info!("Created logical device on queue family {}.", queue_family);

        Ok(DeviceContext {
            physical_device,
            vk_device: device,
            queue_family,
            queue,
            memory_properties,
        })
    }

    pub unsafe fn destroy(&mut self) {
        self.vk_device.destroy_device(None);
    }
}

/// Takes the first accelerator the instance reports. No ranking is done.
unsafe fn pick_physical_device(instance: &VulkanInstance) -> Result<vk::PhysicalDevice> {
    let physical_device = instance
        .vk_instance
        .enumerate_physical_devices()
        .or_fail(ErrorKind::Environment, "enumerate physical devices")?
        .first()
        .copied()
        .ok_or_else(|| {
            RenderError::new(
                ErrorKind::Environment,
                "enumerate physical devices",
                "no graphics hardware was found",
            )
        })?;

    let properties = instance
        .vk_instance
        .get_physical_device_properties(physical_device);
    info!("Selected physical device (`{}`).", properties.device_name);

    Ok(physical_device)
}

unsafe fn check_device_extensions(
    instance: &VulkanInstance,
    physical_device: vk::PhysicalDevice,
) -> Result<()> {
    let available = instance
        .vk_instance
        .enumerate_device_extension_properties(physical_device, None)
        .or_fail(ErrorKind::Environment, "enumerate device extensions")?
        .iter()
        .map(|e| e.extension_name)
        .collect::<HashSet<_>>();

    if available.contains(&vk::KHR_SWAPCHAIN_EXTENSION.name) {
        Ok(())
    } else {
        Err(RenderError::new(
            ErrorKind::Environment,
            "enumerate device extensions",
            "VK_KHR_swapchain is not supported",
        ))
    }
}

/// Index of the first queue family that can run graphics work.
pub fn select_queue_family(families: &[vk::QueueFamilyProperties]) -> Option<u32> {
    families
        .iter()
        .position(|p| p.queue_count > 0 && p.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .map(|i| i as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags, count: u32) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: count,
            ..Default::default()
        }
    }

    #[test]
    fn picks_first_graphics_family() {
        let families = [
            family(vk::QueueFlags::TRANSFER, 2),
            family(vk::QueueFlags::COMPUTE, 1),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, 1),
            family(vk::QueueFlags::GRAPHICS, 4),
        ];

        assert_eq!(select_queue_family(&families), Some(2));
    }

    #[test]
    fn no_graphics_family_selects_nothing() {
        let families = [family(vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER, 1)];
        assert_eq!(select_queue_family(&families), None);
        assert_eq!(select_queue_family(&[]), None);
    }

    #[test]
    fn empty_family_is_skipped() {
        let families = [family(vk::QueueFlags::GRAPHICS, 0), family(vk::QueueFlags::GRAPHICS, 1)];
        assert_eq!(select_queue_family(&families), Some(1));
    }
}
