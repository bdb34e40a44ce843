use log::*;
use vulkanalia::vk::{
    self, DeviceV1_0, Handle, HasBuilder, KhrSurfaceExtension, KhrSwapchainExtension,
};

use super::constants;
use super::device::DeviceContext;
use super::instance::VulkanInstance;
use super::teardown::{Resource, Teardown};
use crate::error::{ErrorKind, RenderError, Result, VkResultExt};

/// The rotating set of presentable images and their views.
#[derive(Clone, Debug)]
pub struct Swapchain {
    pub handle: vk::SwapchainKHR,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
}

impl Swapchain {
    pub unsafe fn new(
        instance: &VulkanInstance,
        device: &DeviceContext,
        fallback_extent: vk::Extent2D,
        teardown: &mut Teardown,
    ) -> Result<Swapchain> {
        let formats = instance
            .vk_instance
            .get_physical_device_surface_formats_khr(device.physical_device, instance.surface)
            .or_fail(ErrorKind::Environment, "query surface formats")?;

        let surface_format =
            choose_surface_format(&formats, constants::PREFERRED_COLOR_FORMAT).ok_or_else(|| {
                RenderError::new(
                    ErrorKind::Environment,
                    "query surface formats",
                    format!(
                        "the window surface does not offer {:?}",
                        constants::PREFERRED_COLOR_FORMAT
                    ),
                )
            })?;

        let capabilities = instance
            .vk_instance
            .get_physical_device_surface_capabilities_khr(device.physical_device, instance.surface)
            .or_fail(ErrorKind::Environment, "query surface capabilities")?;

        let extent = resolve_extent(&capabilities, fallback_extent);
        let composite_alpha = choose_composite_alpha(capabilities.supported_composite_alpha);
        let image_count = choose_image_count(&capabilities);

        let info = vk::SwapchainCreateInfoKHR::builder()
            .surface(instance.surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(image_usage(capabilities.supported_usage_flags))
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(composite_alpha)
            .present_mode(vk::PresentModeKHR::FIFO)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        let handle = device
            .vk_device
            .create_swapchain_khr(&info, None)
            .or_fail(ErrorKind::Resource, "create swapchain")?;
        teardown.push(Resource::Swapchain(handle));

        // The driver may hand back more images than requested.
        let images = device
            .vk_device
            .get_swapchain_images_khr(handle)
            .or_fail(ErrorKind::Resource, "get swapchain images")?;
        if images.is_empty() {
            return Err(RenderError::new(
                ErrorKind::Resource,
                "get swapchain images",
                "the swapchain has no images",
            ));
        }

        info!(
            "Created swapchain: {} images, {:?}, {}x{}, {:?}.",
            images.len(),
            surface_format.format,
            extent.width,
            extent.height,
            composite_alpha
        );

        let mut image_views = Vec::with_capacity(images.len());
        for image in &images {
            let view = create_color_view(device, *image, surface_format.format)?;
            teardown.push(Resource::ImageView(view));
            image_views.push(view);
        }

        Ok(Swapchain {
            handle,
            format: surface_format.format,
            extent,
            images,
            image_views,
        })
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

unsafe fn create_color_view(
    device: &DeviceContext,
    image: vk::Image,
    format: vk::Format,
) -> Result<vk::ImageView> {
    let components = vk::ComponentMapping::builder()
        .r(vk::ComponentSwizzle::IDENTITY)
        .g(vk::ComponentSwizzle::IDENTITY)
        .b(vk::ComponentSwizzle::IDENTITY)
        .a(vk::ComponentSwizzle::IDENTITY);

    let subresource_range = vk::ImageSubresourceRange::builder()
        .aspect_mask(vk::ImageAspectFlags::COLOR)
        .base_mip_level(0)
        .level_count(1)
        .base_array_layer(0)
        .layer_count(1);

    let info = vk::ImageViewCreateInfo::builder()
        .image(image)
        .view_type(vk::ImageViewType::_2D)
        .format(format)
        .components(components)
        .subresource_range(subresource_range);

    device
        .vk_device
        .create_image_view(&info, None)
        .or_fail(ErrorKind::Resource, "create swapchain image view")
}

/// The surface format matching `preferred` exactly. There is no fallback.
pub fn choose_surface_format(
    formats: &[vk::SurfaceFormatKHR],
    preferred: vk::Format,
) -> Option<vk::SurfaceFormatKHR> {
    formats.iter().find(|f| f.format == preferred).copied()
}

/// The surface's current extent, or the window size when the surface leaves
/// it to the swapchain.
pub fn resolve_extent(capabilities: &vk::SurfaceCapabilitiesKHR, window: vk::Extent2D) -> vk::Extent2D {
    if capabilities.current_extent.width == u32::MAX {
        window
    } else {
        capabilities.current_extent
    }
}

pub fn choose_composite_alpha(supported: vk::CompositeAlphaFlagsKHR) -> vk::CompositeAlphaFlagsKHR {
    constants::COMPOSITE_ALPHA_PREFERENCE
        .iter()
        .find(|mode| supported.contains(**mode))
        .copied()
        .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE)
}

/// One more than the minimum, capped by the maximum when there is one.
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 && count > capabilities.max_image_count {
        capabilities.max_image_count
    } else {
        count
    }
}

pub fn image_usage(supported: vk::ImageUsageFlags) -> vk::ImageUsageFlags {
    vk::ImageUsageFlags::COLOR_ATTACHMENT
        | (supported & (vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST))
}
