use log::*;
use vulkanalia::vk::{self, DeviceV1_0, HasBuilder, InstanceV1_0};

use super::constants;
use super::device::DeviceContext;
use super::instance::VulkanInstance;
use super::memory::{self, MemoryVisibility};
use super::teardown::{Resource, Teardown};
use crate::error::{ErrorKind, RenderError, Result, VkResultExt};

/// The depth/stencil image shared by every framebuffer. The image and its
/// memory are owned by the teardown list.
#[derive(Copy, Clone, Debug)]
pub struct DepthTarget {
    pub format: vk::Format,
    pub view: vk::ImageView,
}

impl DepthTarget {
    pub unsafe fn new(
        instance: &VulkanInstance,
        device: &DeviceContext,
        extent: vk::Extent2D,
        teardown: &mut Teardown,
    ) -> Result<DepthTarget> {
        let format = choose_depth_format(&constants::DEPTH_FORMAT_CANDIDATES, |format| {
            instance
                .vk_instance
                .get_physical_device_format_properties(device.physical_device, format)
        })
        .ok_or_else(|| {
            RenderError::new(
                ErrorKind::Environment,
                "select depth format",
                "no candidate supports depth-stencil attachment with optimal tiling",
            )
        })?;
        info!("Selected depth format {:?}.", format);

        let info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = device
            .vk_device
            .create_image(&info, None)
            .or_fail(ErrorKind::Resource, "create depth image")?;
        teardown.push(Resource::Image(image));

        let requirements = device.vk_device.get_image_memory_requirements(image);
        let memory = memory::allocate(
            device,
            requirements,
            MemoryVisibility::DeviceLocal,
            "allocate depth image memory",
        )?;
        teardown.push(Resource::Memory(memory));

        device
            .vk_device
            .bind_image_memory(image, memory, 0)
            .or_fail(ErrorKind::Resource, "bind depth image memory")?;

        let subresource_range = vk::ImageSubresourceRange::builder()
            .aspect_mask(depth_aspect(format))
            .base_mip_level(0)
            .level_count(1)
            .base_array_layer(0)
            .layer_count(1);

        let info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::_2D)
            .format(format)
            .subresource_range(subresource_range);

        let view = device
            .vk_device
            .create_image_view(&info, None)
            .or_fail(ErrorKind::Resource, "create depth image view")?;
        teardown.push(Resource::ImageView(view));

        Ok(DepthTarget {
            format,
            view,
        })
    }
}

/// First candidate usable as a depth-stencil attachment with optimal tiling.
pub fn choose_depth_format(
    candidates: &[vk::Format],
    properties: impl Fn(vk::Format) -> vk::FormatProperties,
) -> Option<vk::Format> {
    candidates.iter().copied().find(|format| {
        properties(*format)
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
    })
}

pub fn has_stencil_component(format: vk::Format) -> bool {
    matches!(
        format,
        vk::Format::D16_UNORM_S8_UINT | vk::Format::D24_UNORM_S8_UINT | vk::Format::D32_SFLOAT_S8_UINT
    )
}

pub fn depth_aspect(format: vk::Format) -> vk::ImageAspectFlags {
    if has_stencil_component(format) {
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    } else {
        vk::ImageAspectFlags::DEPTH
    }
}
